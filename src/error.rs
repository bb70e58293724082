#![forbid(unsafe_code)]

use core::fmt::{self, Display};

/// Broad grouping of the ways a decode can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PngErrorKind {
  /// The PNG container itself is wrong or uses something we don't support.
  Container,
  /// The zlib / DEFLATE stream inside the `IDAT` chunks is wrong.
  Compressed,
  /// The image is too large, or the data doesn't fill the image.
  Capacity,
  /// The general allocator couldn't give us the output buffer.
  Alloc,
  /// The [`DecodeConfig`](crate::png::DecodeConfig) can't be satisfied.
  Config,
}

/// An error from the `pngcore` crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[non_exhaustive]
pub enum PngError {
  /// The first 8 bytes aren't the PNG signature.
  NotPng,
  /// The input ended in the middle of a chunk.
  UnexpectedEndOfInput,
  /// The first chunk wasn't `IHDR`.
  FirstChunkNotIHDR,
  /// More than one `IHDR` chunk.
  DuplicateIHDR,
  /// `IHDR` wasn't exactly 13 bytes.
  IllegalIHDRLength,
  /// Width or height is 0, or more than 2^24.
  IllegalDimensions,
  /// Bit depth isn't one of 1, 2, 4, 8, or 16.
  IllegalBitDepth,
  /// Bit depth is legal PNG, but this decoder only handles 8.
  UnsupportedBitDepth,
  /// Color type isn't one of 0, 2, 3, 4, or 6.
  IllegalColorType,
  /// Palette-indexed images aren't supported.
  UnsupportedPalette,
  /// Compression method isn't 0.
  IllegalCompressionMethod,
  /// Filter method isn't 0.
  IllegalFilterMethod,
  /// Interlace method isn't 0 or 1.
  IllegalInterlaceMethod,
  /// Adam7 interlacing isn't supported.
  UnsupportedInterlace,
  /// An `IDAT` chunk showed up before the `IHDR`.
  IdatBeforeIHDR,
  /// A chunk declared a length over 2^31-1.
  IllegalChunkLength,
  /// `IEND` had a non-zero length.
  IllegalIEND,
  /// `IEND` was reached without any `IDAT`.
  NoIdat,
  /// A chunk's CRC-32 doesn't match its data.
  ChunkCrcMismatch,
  /// A scanline filter byte over 4.
  IllegalFilterType,

  /// The 2-byte zlib header is invalid.
  BadZlibHeader,
  /// DEFLATE block type 3.
  BadBlockType,
  /// A stored block's `NLEN` isn't the complement of `LEN`.
  StoredLengthMismatch,
  /// The compressed bits ran out before the stream was done.
  InsufficientData,
  /// A set of code lengths doesn't make a valid Huffman code.
  InvalidHuffmanTree,
  /// The bits don't match any code in the current Huffman table.
  BadHuffmanCode,
  /// A back-reference reaches before the start of the output.
  DistanceTooFarBack,
  /// The Adler-32 trailer doesn't match the decompressed data.
  BadAdlerChecksum,

  /// `width * height * channels` doesn't fit in 32 bits.
  ImageTooLarge,
  /// Decompression made fewer bytes than the image needs.
  NotEnoughImageData,
  /// Decompression made more bytes than the image needs.
  TooMuchImageData,

  /// The allocator couldn't give us enough space.
  Alloc,

  /// The requested channel count can't be produced from this image.
  UnsupportedChannelRequest,
}

/// Alias for `Result<T, PngError>`.
pub type PngResult<T> = Result<T, PngError>;

impl PngError {
  /// Which part of the decode this error belongs to.
  #[must_use]
  pub const fn kind(self) -> PngErrorKind {
    use PngError::*;
    match self {
      NotPng | UnexpectedEndOfInput | FirstChunkNotIHDR | DuplicateIHDR | IllegalIHDRLength
      | IllegalDimensions | IllegalBitDepth | UnsupportedBitDepth | IllegalColorType
      | UnsupportedPalette | IllegalCompressionMethod | IllegalFilterMethod
      | IllegalInterlaceMethod | UnsupportedInterlace | IdatBeforeIHDR | IllegalChunkLength
      | IllegalIEND | NoIdat | ChunkCrcMismatch | IllegalFilterType => PngErrorKind::Container,
      BadZlibHeader | BadBlockType | StoredLengthMismatch | InsufficientData
      | InvalidHuffmanTree | BadHuffmanCode | DistanceTooFarBack | BadAdlerChecksum => {
        PngErrorKind::Compressed
      }
      ImageTooLarge | NotEnoughImageData | TooMuchImageData => PngErrorKind::Capacity,
      Alloc => PngErrorKind::Alloc,
      UnsupportedChannelRequest => PngErrorKind::Config,
    }
  }

  /// A short, static, human readable description.
  #[must_use]
  pub const fn message(self) -> &'static str {
    use PngError::*;
    match self {
      NotPng => "not a PNG file",
      UnexpectedEndOfInput => "unexpected end of input",
      FirstChunkNotIHDR => "first chunk is not IHDR",
      DuplicateIHDR => "multiple IHDR chunks",
      IllegalIHDRLength => "bad IHDR length",
      IllegalDimensions => "bad image dimensions",
      IllegalBitDepth => "bad bit depth",
      UnsupportedBitDepth => "only 8 bits per channel is supported",
      IllegalColorType => "bad color type",
      UnsupportedPalette => "palette images are not supported",
      IllegalCompressionMethod => "bad compression method",
      IllegalFilterMethod => "bad filter method",
      IllegalInterlaceMethod => "bad interlace method",
      UnsupportedInterlace => "interlaced images are not supported",
      IdatBeforeIHDR => "IDAT before IHDR",
      IllegalChunkLength => "chunk length too large",
      IllegalIEND => "bad IEND length",
      NoIdat => "no IDAT chunk",
      ChunkCrcMismatch => "chunk CRC mismatch",
      IllegalFilterType => "bad scanline filter type",
      BadZlibHeader => "bad zlib header",
      BadBlockType => "bad DEFLATE block type",
      StoredLengthMismatch => "corrupt stored block length",
      InsufficientData => "compressed data ended early",
      InvalidHuffmanTree => "bad huffman code lengths",
      BadHuffmanCode => "bad huffman code",
      DistanceTooFarBack => "distance longer than data",
      BadAdlerChecksum => "bad adler-32 checksum",
      ImageTooLarge => "image too large",
      NotEnoughImageData => "not enough image data",
      TooMuchImageData => "too much image data",
      Alloc => "out of memory",
      UnsupportedChannelRequest => "unsupported channel request",
    }
  }
}

impl Display for PngError {
  #[inline]
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.message())
  }
}

#[cfg(feature = "std")]
impl std::error::Error for PngError {}

impl From<alloc::collections::TryReserveError> for PngError {
  #[inline]
  fn from(_: alloc::collections::TryReserveError) -> Self {
    Self::Alloc
  }
}

/// A caller-owned slot for the first failure message of a decode.
///
/// Once a message is recorded, later failures leave it alone. Call
/// [`clear`](Diagnostic::clear) to reuse the slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Diagnostic(Option<&'static str>);
impl Diagnostic {
  /// An empty slot.
  #[inline]
  #[must_use]
  pub const fn new() -> Self {
    Self(None)
  }

  /// Records `message` unless something was already recorded.
  #[inline]
  pub fn record(&mut self, message: &'static str) {
    if self.0.is_none() {
      self.0 = Some(message);
    }
  }

  /// The recorded message, if any.
  #[inline]
  #[must_use]
  pub const fn message(&self) -> Option<&'static str> {
    self.0
  }

  /// Empties the slot.
  #[inline]
  pub fn clear(&mut self) {
    self.0 = None;
  }
}

#[test]
fn test_diagnostic_keeps_first_message() {
  let mut d = Diagnostic::new();
  assert_eq!(d.message(), None);
  d.record(PngError::NotPng.message());
  d.record(PngError::NoIdat.message());
  assert_eq!(d.message(), Some("not a PNG file"));
  d.clear();
  d.record(PngError::NoIdat.message());
  assert_eq!(d.message(), Some("no IDAT chunk"));
}

#[test]
fn test_error_kinds() {
  assert_eq!(PngError::NotPng.kind(), PngErrorKind::Container);
  assert_eq!(PngError::DistanceTooFarBack.kind(), PngErrorKind::Compressed);
  assert_eq!(PngError::ImageTooLarge.kind(), PngErrorKind::Capacity);
  assert_eq!(PngError::Alloc.kind(), PngErrorKind::Alloc);
  assert_eq!(PngError::UnsupportedChannelRequest.kind(), PngErrorKind::Config);
}
