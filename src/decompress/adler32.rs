use super::*;

const BASE: u32 = 65_521;
/// Most bytes that can be summed before `b` could overflow a `u32`.
const NMAX: usize = 5_552;

/// The Adler-32 checksum of some bytes, as used by the zlib trailer.
#[must_use]
pub fn adler32(bytes: &[u8]) -> u32 {
  let mut a: u32 = 1;
  let mut b: u32 = 0;
  for chunk in bytes.chunks(NMAX) {
    for byte in chunk.iter().copied() {
      a += u32::from(byte);
      b += a;
    }
    a %= BASE;
    b %= BASE;
  }
  (b << 16) | a
}

#[test]
fn test_adler32() {
  assert_eq!(adler32(b""), 1);
  assert_eq!(adler32(b"abc"), 0x024D_0127);
  assert_eq!(adler32(b"Wikipedia"), 0x11E6_0398);
  // long enough to need several reductions.
  let v: Vec<u8> = core::iter::repeat(0xFF).take(3 * NMAX + 17).collect();
  let mut a = 1_u64;
  let mut b = 0_u64;
  for byte in v.iter().copied() {
    a = (a + u64::from(byte)) % u64::from(BASE);
    b = (b + a) % u64::from(BASE);
  }
  assert_eq!(adler32(&v), ((b << 16) | a) as u32);
}
