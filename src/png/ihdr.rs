use super::*;

/// The types of color that PNG supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum PngColorType {
  /// Greyscale
  Y = 0,
  /// Red, Green, Blue
  RGB = 2,
  /// Index into a palette (not decodable here, but it's legal PNG).
  Index = 3,
  /// Greyscale + Alpha
  YA = 4,
  /// Red, Green, Blue, Alpha
  RGBA = 6,
}
impl PngColorType {
  /// The number of channels in this type of color.
  #[inline]
  #[must_use]
  pub const fn channel_count(self) -> u8 {
    match self {
      Self::Y => 1,
      Self::RGB => 3,
      Self::Index => 1,
      Self::YA => 2,
      Self::RGBA => 4,
    }
  }
}
impl TryFrom<u8> for PngColorType {
  type Error = PngError;
  #[inline]
  fn try_from(value: u8) -> Result<Self, Self::Error> {
    Ok(match value {
      0 => PngColorType::Y,
      2 => PngColorType::RGB,
      3 => PngColorType::Index,
      4 => PngColorType::YA,
      6 => PngColorType::RGBA,
      _ => return Err(PngError::IllegalColorType),
    })
  }
}

/// The image header, from the `IHDR` chunk.
///
/// Only headers this decoder can actually decode get built, so `bit_depth` is
/// always 8, `color_type` is never [`Index`](PngColorType::Index), and
/// `interlace_method` is always 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImageInfo {
  /// width in pixels
  pub width: u32,
  /// height in pixels
  pub height: u32,
  /// bits per channel
  pub bit_depth: u8,
  /// pixel color type
  pub color_type: PngColorType,
  /// always 0 (zlib)
  pub compression_method: u8,
  /// always 0 (adaptive, per scanline)
  pub filter_method: u8,
  /// 0 for none
  pub interlace_method: u8,
}

impl ImageInfo {
  /// Largest width or height allowed.
  pub const MAX_DIMENSION: u32 = 1 << 24;

  /// Parses and validates the 13 bytes of `IHDR` data.
  ///
  /// ## Failure
  /// Checks happen in field order, and the first problem found is reported:
  /// * [`PngError::IllegalIHDRLength`] unless there's exactly 13 bytes.
  /// * [`PngError::IllegalDimensions`] for a zero or over-large dimension.
  /// * [`PngError::IllegalBitDepth`] / [`PngError::UnsupportedBitDepth`]
  /// * [`PngError::IllegalColorType`] / [`PngError::UnsupportedPalette`]
  /// * [`PngError::IllegalCompressionMethod`]
  /// * [`PngError::IllegalFilterMethod`]
  /// * [`PngError::IllegalInterlaceMethod`] /
  ///   [`PngError::UnsupportedInterlace`]
  pub fn try_parse(data: &[u8]) -> PngResult<Self> {
    if data.len() != 13 {
      return Err(PngError::IllegalIHDRLength);
    }
    let (width, rest) = try_pull_u32_be(data)?;
    let (height, rest) = try_pull_u32_be(rest)?;
    let (bit_depth, rest) = try_pull_u8(rest)?;
    let (color_type, rest) = try_pull_u8(rest)?;
    let [compression_method, filter_method, interlace_method] = try_pull_byte_array::<3>(rest)?.0;

    let dimension_ok = |d: u32| d > 0 && d <= Self::MAX_DIMENSION;
    if !dimension_ok(width) || !dimension_ok(height) {
      return Err(PngError::IllegalDimensions);
    }
    if ![1, 2, 4, 8, 16].contains(&bit_depth) {
      return Err(PngError::IllegalBitDepth);
    }
    if bit_depth != 8 {
      return Err(PngError::UnsupportedBitDepth);
    }
    let color_type = PngColorType::try_from(color_type)?;
    if color_type == PngColorType::Index {
      return Err(PngError::UnsupportedPalette);
    }
    if compression_method != 0 {
      return Err(PngError::IllegalCompressionMethod);
    }
    if filter_method != 0 {
      return Err(PngError::IllegalFilterMethod);
    }
    match interlace_method {
      0 => (),
      1 => return Err(PngError::UnsupportedInterlace),
      _ => return Err(PngError::IllegalInterlaceMethod),
    }
    Ok(Self {
      width,
      height,
      bit_depth,
      color_type,
      compression_method,
      filter_method,
      interlace_method,
    })
  }

  /// Channels per pixel in the stored data.
  #[inline]
  #[must_use]
  pub const fn raw_channel_count(&self) -> u8 {
    self.color_type.channel_count()
  }

  /// Bytes of pixel data per row, without the filter byte.
  #[inline]
  #[must_use]
  pub const fn row_bytes(&self) -> usize {
    self.width as usize * self.raw_channel_count() as usize
  }

  /// `width * height * channels` for a given channel count.
  ///
  /// ## Failure
  /// * [`PngError::ImageTooLarge`] if that doesn't fit in a `u32`.
  #[inline]
  pub const fn checked_image_bytes(&self, channels: u8) -> PngResult<u32> {
    match self.width.checked_mul(channels as u32) {
      Some(row) => match row.checked_mul(self.height) {
        Some(total) => Ok(total),
        None => Err(PngError::ImageTooLarge),
      },
      None => Err(PngError::ImageTooLarge),
    }
  }

  /// Bytes of decompressed data: every row plus its filter byte.
  #[inline]
  #[must_use]
  pub const fn filtered_bytes(&self) -> usize {
    (self.row_bytes() + 1).saturating_mul(self.height as usize)
  }

  /// A guess at the total `IDAT` size, `(width + 1) * height * channels`.
  ///
  /// Only used to pick a starting capacity.
  #[inline]
  #[must_use]
  pub const fn compressed_size_estimate(&self) -> usize {
    (self.width as usize + 1)
      .saturating_mul(self.height as usize)
      .saturating_mul(self.raw_channel_count() as usize)
  }
}

#[cfg(test)]
fn ihdr_bytes(width: u32, height: u32, depth: u8, color: u8, c: u8, f: u8, i: u8) -> [u8; 13] {
  let mut out = [0; 13];
  out[..4].copy_from_slice(&width.to_be_bytes());
  out[4..8].copy_from_slice(&height.to_be_bytes());
  out[8..].copy_from_slice(&[depth, color, c, f, i]);
  out
}

#[test]
fn test_ihdr_validation() {
  let good = ImageInfo::try_parse(&ihdr_bytes(2, 3, 8, 6, 0, 0, 0)).unwrap();
  assert_eq!((good.width, good.height, good.raw_channel_count()), (2, 3, 4));
  assert_eq!(good.filtered_bytes(), (2 * 4 + 1) * 3);
  assert_eq!(good.compressed_size_estimate(), 3 * 3 * 4);

  let parse = |w, h, d, ct, c, f, i| ImageInfo::try_parse(&ihdr_bytes(w, h, d, ct, c, f, i));
  assert_eq!(ImageInfo::try_parse(&[0; 12]), Err(PngError::IllegalIHDRLength));
  assert_eq!(parse(0, 1, 8, 0, 0, 0, 0), Err(PngError::IllegalDimensions));
  assert_eq!(parse(1, (1 << 24) + 1, 8, 0, 0, 0, 0), Err(PngError::IllegalDimensions));
  assert!(parse(1 << 24, 1, 8, 0, 0, 0, 0).is_ok());
  assert_eq!(parse(1, 1, 3, 0, 0, 0, 0), Err(PngError::IllegalBitDepth));
  assert_eq!(parse(1, 1, 16, 0, 0, 0, 0), Err(PngError::UnsupportedBitDepth));
  assert_eq!(parse(1, 1, 8, 7, 0, 0, 0), Err(PngError::IllegalColorType));
  assert_eq!(parse(1, 1, 8, 1, 0, 0, 0), Err(PngError::IllegalColorType));
  assert_eq!(parse(1, 1, 8, 3, 0, 0, 0), Err(PngError::UnsupportedPalette));
  assert_eq!(parse(1, 1, 8, 2, 1, 0, 0), Err(PngError::IllegalCompressionMethod));
  assert_eq!(parse(1, 1, 8, 2, 0, 1, 0), Err(PngError::IllegalFilterMethod));
  assert_eq!(parse(1, 1, 8, 2, 0, 0, 1), Err(PngError::UnsupportedInterlace));
  assert_eq!(parse(1, 1, 8, 2, 0, 0, 2), Err(PngError::IllegalInterlaceMethod));
}

#[test]
fn test_image_size_overflow() {
  let big = ImageInfo::try_parse(&ihdr_bytes(65536, 65536, 8, 6, 0, 0, 0)).unwrap();
  assert_eq!(big.checked_image_bytes(4), Err(PngError::ImageTooLarge));
  let wide = ImageInfo::try_parse(&ihdr_bytes(1 << 24, 64, 8, 0, 0, 0, 0)).unwrap();
  assert_eq!(wide.checked_image_bytes(4), Err(PngError::ImageTooLarge));
  assert_eq!(wide.checked_image_bytes(1), Ok(1 << 30));
}
