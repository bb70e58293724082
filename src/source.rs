#![forbid(unsafe_code)]

//! Strictly forward byte input for the chunk parser.

use alloc::vec::Vec;

use crate::{PngError, PngResult};

/// How many bytes get pulled into a `Vec` per step by
/// [`read_into_vec`](ByteSource::read_into_vec).
///
/// Declared chunk lengths are never trusted for up-front allocation.
const PULL_STEP: usize = 64 * 1024;

/// A source of bytes that is only ever read front to back.
pub trait ByteSource {
  /// Fills all of `buf`, or fails with [`PngError::UnexpectedEndOfInput`].
  fn read_exact(&mut self, buf: &mut [u8]) -> PngResult<()>;

  /// How many bytes are left, if that's known.
  #[inline]
  fn remaining_hint(&self) -> Option<usize> {
    None
  }

  /// Appends exactly `count` bytes to `out`.
  fn read_into_vec(&mut self, count: usize, out: &mut Vec<u8>) -> PngResult<()> {
    if let Some(remaining) = self.remaining_hint() {
      if remaining < count {
        return Err(PngError::UnexpectedEndOfInput);
      }
    }
    let mut left = count;
    while left > 0 {
      let step = left.min(PULL_STEP);
      let start = out.len();
      out.resize(start + step, 0);
      self.read_exact(&mut out[start..])?;
      left -= step;
    }
    Ok(())
  }

  /// Reads and discards `count` bytes, passing each piece to `op` on the way.
  fn skip_with(&mut self, count: usize, mut op: impl FnMut(&[u8])) -> PngResult<()>
  where
    Self: Sized,
  {
    let mut buf = [0_u8; 1024];
    let mut left = count;
    while left > 0 {
      let step = left.min(buf.len());
      self.read_exact(&mut buf[..step])?;
      op(&buf[..step]);
      left -= step;
    }
    Ok(())
  }
}

/// Reads from an in-memory byte slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct SliceSource<'b>(&'b [u8]);
impl<'b> SliceSource<'b> {
  /// Wraps the bytes.
  #[inline]
  #[must_use]
  pub const fn new(bytes: &'b [u8]) -> Self {
    Self(bytes)
  }

  /// The bytes not read yet.
  #[inline]
  #[must_use]
  pub const fn remaining(&self) -> &'b [u8] {
    self.0
  }
}
impl ByteSource for SliceSource<'_> {
  #[inline]
  fn read_exact(&mut self, buf: &mut [u8]) -> PngResult<()> {
    if self.0.len() < buf.len() {
      return Err(PngError::UnexpectedEndOfInput);
    }
    let (head, tail) = self.0.split_at(buf.len());
    buf.copy_from_slice(head);
    self.0 = tail;
    Ok(())
  }

  #[inline]
  fn remaining_hint(&self) -> Option<usize> {
    Some(self.0.len())
  }

  #[inline]
  fn read_into_vec(&mut self, count: usize, out: &mut Vec<u8>) -> PngResult<()> {
    if self.0.len() < count {
      return Err(PngError::UnexpectedEndOfInput);
    }
    let (head, tail) = self.0.split_at(count);
    out.extend_from_slice(head);
    self.0 = tail;
    Ok(())
  }

  #[inline]
  fn skip_with(&mut self, count: usize, mut op: impl FnMut(&[u8])) -> PngResult<()> {
    if self.0.len() < count {
      return Err(PngError::UnexpectedEndOfInput);
    }
    let (head, tail) = self.0.split_at(count);
    op(head);
    self.0 = tail;
    Ok(())
  }
}

/// Reads from any [`std::io::Read`].
///
/// IO errors of any sort are reported as [`PngError::UnexpectedEndOfInput`].
#[cfg(feature = "std")]
#[cfg_attr(docs_rs, doc(cfg(feature = "std")))]
#[derive(Debug)]
pub struct ReadSource<R>(R);
#[cfg(feature = "std")]
impl<R: std::io::Read> ReadSource<R> {
  /// Wraps the reader.
  #[inline]
  #[must_use]
  pub const fn new(reader: R) -> Self {
    Self(reader)
  }

  /// Unwraps the reader.
  #[inline]
  #[must_use]
  pub fn into_inner(self) -> R {
    self.0
  }
}
#[cfg(feature = "std")]
impl<R: std::io::Read> ByteSource for ReadSource<R> {
  #[inline]
  fn read_exact(&mut self, buf: &mut [u8]) -> PngResult<()> {
    self.0.read_exact(buf).map_err(|_| PngError::UnexpectedEndOfInput)
  }
}

#[test]
fn test_slice_source_reads_forward() {
  let bytes = [1_u8, 2, 3, 4, 5, 6];
  let mut src = SliceSource::new(&bytes);
  let mut two = [0_u8; 2];
  src.read_exact(&mut two).unwrap();
  assert_eq!(two, [1, 2]);
  let mut v = Vec::new();
  src.read_into_vec(2, &mut v).unwrap();
  assert_eq!(v, [3, 4]);
  let mut seen = Vec::new();
  src.skip_with(1, |b| seen.extend_from_slice(b)).unwrap();
  assert_eq!(seen, [5]);
  assert_eq!(src.remaining(), &[6]);
  assert_eq!(src.read_into_vec(2, &mut v), Err(PngError::UnexpectedEndOfInput));
}

#[cfg(feature = "std")]
#[test]
fn test_read_source_matches_slice_source() {
  let bytes: Vec<u8> = (0..=255_u8).cycle().take(200_000).collect();
  let mut a = SliceSource::new(&bytes);
  let mut b = ReadSource::new(std::io::Cursor::new(&bytes));
  let mut va = Vec::new();
  let mut vb = Vec::new();
  a.read_into_vec(150_000, &mut va).unwrap();
  b.read_into_vec(150_000, &mut vb).unwrap();
  assert_eq!(va, vb);
  let mut sa = 0_usize;
  let mut sb = 0_usize;
  a.skip_with(40_000, |x| sa += x.len()).unwrap();
  b.skip_with(40_000, |x| sb += x.len()).unwrap();
  assert_eq!((sa, sb), (40_000, 40_000));
  assert_eq!(b.read_into_vec(10_001, &mut vb), Err(PngError::UnexpectedEndOfInput));
}
