use super::*;

/// The 4 ASCII bytes naming a chunk.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct PngChunkTag(pub [u8; 4]);
#[allow(nonstandard_style)]
impl PngChunkTag {
  /// Image header
  pub const IHDR: Self = Self(*b"IHDR");
  /// Image data
  pub const IDAT: Self = Self(*b"IDAT");
  /// Image end
  pub const IEND: Self = Self(*b"IEND");

  /// Ancillary chunks have bit 5 of the first byte set (lowercase).
  #[inline]
  #[must_use]
  pub const fn is_ancillary(self) -> bool {
    (self.0[0] & 0b10_0000) != 0
  }
}
impl Debug for PngChunkTag {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    for b in self.0 {
      if b.is_ascii_graphic() {
        f.write_char(b as char)?;
      } else {
        write!(f, "\\x{b:02X}")?;
      }
    }
    Ok(())
  }
}

/// An unparsed chunk from in-memory PNG bytes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PngRawChunk<'b> {
  /// Chunk name.
  pub tag: PngChunkTag,
  /// Chunk payload.
  pub data: &'b [u8],
  /// The CRC stored after the payload.
  pub declared_crc: u32,
}
impl PngRawChunk<'_> {
  /// The CRC computed over the tag and data.
  #[inline]
  #[must_use]
  pub fn actual_crc(&self) -> u32 {
    png_crc(self.tag.0, self.data)
  }

  /// If the declared and computed CRCs agree.
  #[inline]
  #[must_use]
  pub fn crc_ok(&self) -> bool {
    self.declared_crc == self.actual_crc()
  }
}
impl Debug for PngRawChunk<'_> {
  #[inline]
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("PngRawChunk")
      .field("tag", &self.tag)
      .field("data", &(&self.data[..self.data.len().min(12)], self.data.len()))
      .field("declared_crc", &self.declared_crc)
      .finish()
  }
}

/// An iterator that produces successive raw chunks from PNG bytes.
///
/// This doesn't validate anything. It stops at the first chunk that would run
/// past the end of the bytes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct PngRawChunkIter<'b>(&'b [u8]);
impl<'b> PngRawChunkIter<'b> {
  /// Pass the full PNG bytes, it will remove the PNG signature automatically.
  #[inline]
  #[must_use]
  pub const fn new(bytes: &'b [u8]) -> Self {
    match bytes {
      [_, _, _, _, _, _, _, _, rest @ ..] => Self(rest),
      _ => Self(&[]),
    }
  }

  fn try_next(&mut self) -> PngResult<PngRawChunk<'b>> {
    let (len, rest) = try_pull_u32_be(self.0)?;
    let (tag, rest) = try_pull_byte_array::<4>(rest)?;
    let len = len as usize;
    if rest.len() < len {
      return Err(PngError::UnexpectedEndOfInput);
    }
    let (data, rest) = rest.split_at(len);
    let (declared_crc, rest) = try_pull_u32_be(rest)?;
    self.0 = rest;
    Ok(PngRawChunk { tag: PngChunkTag(tag), data, declared_crc })
  }
}
impl<'b> Iterator for PngRawChunkIter<'b> {
  type Item = PngRawChunk<'b>;
  #[inline]
  fn next(&mut self) -> Option<Self::Item> {
    match self.try_next() {
      Ok(chunk) => Some(chunk),
      Err(_) => {
        self.0 = &[];
        None
      }
    }
  }
}

#[test]
fn test_raw_chunk_iter() {
  let mut png = Vec::from(PNG_SIGNATURE);
  png.extend_from_slice(&[0, 0, 0, 1]);
  png.extend_from_slice(b"abCd");
  png.push(7);
  png.extend_from_slice(&png_crc(*b"abCd", &[7]).to_be_bytes());
  png.extend_from_slice(&[0, 0, 0, 0]);
  png.extend_from_slice(b"IEND");
  png.extend_from_slice(&[0xAE, 0x42, 0x60, 0x82]);
  // a partial chunk on the end is just ignored.
  png.extend_from_slice(&[0, 0, 0, 9, b'I']);

  let chunks: Vec<_> = PngRawChunkIter::new(&png).collect();
  assert_eq!(chunks.len(), 2);
  assert_eq!(chunks[0].tag, PngChunkTag(*b"abCd"));
  assert!(chunks[0].tag.is_ancillary());
  assert_eq!(chunks[0].data, &[7]);
  assert!(chunks[0].crc_ok());
  assert_eq!(chunks[1].tag, PngChunkTag::IEND);
  assert!(!chunks[1].tag.is_ancillary());
  assert!(chunks[1].crc_ok());
}
