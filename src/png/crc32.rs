const CRC_TABLE: [u32; 256] = make_crc_table();

const fn make_crc_table() -> [u32; 256] {
  let mut out = [0; 256];
  let mut n = 0;
  while n < 256 {
    let mut c = n as u32;
    let mut k = 0;
    while k < 8 {
      c = if (c & 1) != 0 { 0xEDB8_8320_u32 ^ (c >> 1) } else { c >> 1 };
      k += 1;
    }
    out[n] = c;
    n += 1;
  }
  out
}

/// Running CRC-32, fed a piece at a time.
///
/// PNG chunk CRCs cover the 4 tag bytes and then the chunk data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Crc32(u32);
impl Default for Crc32 {
  #[inline]
  fn default() -> Self {
    Self::new()
  }
}
impl Crc32 {
  /// A fresh CRC, nothing hashed yet.
  #[inline]
  #[must_use]
  pub const fn new() -> Self {
    Self(u32::MAX)
  }

  /// Hashes more bytes.
  #[inline]
  pub fn update(&mut self, bytes: &[u8]) {
    let mut crc = self.0;
    for byte in bytes.iter().copied() {
      let i = (crc ^ u32::from(byte)) as u8 as usize;
      crc = CRC_TABLE[i] ^ (crc >> 8);
    }
    self.0 = crc;
  }

  /// The CRC of everything hashed so far.
  #[inline]
  #[must_use]
  pub const fn finish(&self) -> u32 {
    self.0 ^ u32::MAX
  }
}

/// CRC of a chunk's tag followed by its data.
#[inline]
#[must_use]
pub fn png_crc(tag: [u8; 4], data: &[u8]) -> u32 {
  let mut crc = Crc32::new();
  crc.update(&tag);
  crc.update(data);
  crc.finish()
}

#[test]
fn test_png_crc() {
  assert_eq!(png_crc(*b"IEND", &[]), 0xAE42_6082);
  // the 2x2 RGBA header from the test images.
  let ihdr = [0, 0, 0, 2, 0, 0, 0, 2, 8, 6, 0, 0, 0];
  assert_eq!(png_crc(*b"IHDR", &ihdr), 0x72B6_0D24);
  // piece by piece gives the same answer.
  let mut crc = Crc32::new();
  crc.update(b"IH");
  crc.update(b"DR");
  for b in ihdr {
    crc.update(&[b]);
  }
  assert_eq!(crc.finish(), 0x72B6_0D24);
}
