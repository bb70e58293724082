#![forbid(unsafe_code)]

//! Just has shorthands for the length-checked reads the parsers want to do.

use crate::{PngError, PngResult};

/// Splits `N` bytes off the front of `bytes`.
///
/// Fails with [`PngError::UnexpectedEndOfInput`] when there's not enough.
#[inline]
pub(crate) fn try_pull_byte_array<const N: usize>(bytes: &[u8]) -> PngResult<([u8; N], &[u8])> {
  match bytes.split_first_chunk::<N>() {
    Some((head, tail)) => Ok((*head, tail)),
    None => Err(PngError::UnexpectedEndOfInput),
  }
}

#[inline]
pub(crate) fn try_pull_u32_be(bytes: &[u8]) -> PngResult<(u32, &[u8])> {
  let (a, tail) = try_pull_byte_array::<4>(bytes)?;
  Ok((u32::from_be_bytes(a), tail))
}

#[inline]
pub(crate) fn try_pull_u8(bytes: &[u8]) -> PngResult<(u8, &[u8])> {
  match bytes.split_first() {
    Some((b, tail)) => Ok((*b, tail)),
    None => Err(PngError::UnexpectedEndOfInput),
  }
}

#[test]
fn test_try_pull_byte_array() {
  let bytes = [1_u8, 2, 3, 4, 5];
  let (a, rest) = try_pull_byte_array::<2>(&bytes).unwrap();
  assert_eq!(a, [1, 2]);
  assert_eq!(rest, &[3, 4, 5]);
  assert_eq!(try_pull_byte_array::<6>(&bytes), Err(PngError::UnexpectedEndOfInput));
  let (x, rest) = try_pull_u32_be(&bytes).unwrap();
  assert_eq!(x, 0x01020304);
  assert_eq!(try_pull_u8(rest), Ok((5, &[][..])));
  assert_eq!(try_pull_u8(&[]), Err(PngError::UnexpectedEndOfInput));
}
