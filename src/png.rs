#![forbid(unsafe_code)]

//! Module for decoding PNG data.
//!
//! * [Portable Network Graphics Specification (Second Edition)][png-spec]
//!
//! [png-spec]: https://www.w3.org/TR/2003/REC-PNG-20031110/
//!
//! ## Supported Images
//!
//! Non-interlaced images with 8 bits per channel, in any of the greyscale,
//! greyscale + alpha, RGB, or RGBA color types. Palette images, other bit
//! depths, and Adam7 interlacing are rejected with an "unsupported" error.
//!
//! Only the `IHDR`, `IDAT`, and `IEND` chunks are looked at. Every other chunk
//! is skipped, though its CRC is still checked (unless you turn that off).
//!
//! ## Decoding
//!
//! Call [`decode_png`] with the PNG bytes, or [`decode_png_from_source`] /
//! `decode_png_from_reader` if the bytes arrive from somewhere else. Input is
//! only ever read front to back.
//!
//! The decode goes in three stages:
//! 1) The chunks are walked, and the `IDAT` payloads are gathered into the
//!    [`Scratch`] compressed buffer.
//! 2) The gathered data is inflated (see [`decompress`](crate::decompress))
//!    into the scratch inflated buffer. This is still filtered data: each line
//!    has a filter byte and then the line's filtered bytes.
//! 3) Each line is unfiltered into a two line scratch buffer, then copied into
//!    the output [`Image`], possibly adding an alpha channel along the way.
//!
//! Only the final `Image` outlives the call. The scratch buffers are reset
//! (but keep their memory) when the decode ends, success or not.

use core::fmt::{Debug, Write};

#[cfg(test)]
use alloc::vec::Vec;

use crate::{
  decompress::{zlib_decompress, ZlibOptions},
  image::Image,
  parser_helpers::*,
  scratch::Scratch,
  source::{ByteSource, SliceSource},
  Diagnostic, PngError, PngResult,
};

mod crc32;
pub use crc32::*;

mod ihdr;
pub use ihdr::*;

mod raw_chunk;
pub use raw_chunk::*;

mod chunk;
use chunk::ChunkReader;

mod unfilter;
pub use unfilter::{paeth_predict, FilterType};
use unfilter::unfilter_image;

/// The 8 bytes every PNG starts with.
pub const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Most bytes reserved up front for the inflated data.
const INFLATE_RESERVE_LIMIT: usize = 16 << 20;

/// Checks if the PNG signature is correct.
#[inline]
#[must_use]
pub const fn is_png_header_correct(bytes: &[u8]) -> bool {
  matches!(bytes, [137, 80, 78, 71, 13, 10, 26, 10, ..])
}

/// Settings for a decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecodeConfig {
  /// Put the bottom row first in the output.
  pub flip_vertical_on_load: bool,
  /// Output channel count: 0 for "whatever the PNG has", or 3 or 4.
  ///
  /// Asking for one channel more than the PNG stores (other than asking for 3)
  /// adds an opaque alpha channel. Asking for the stored count is the same as
  /// asking for 0. Anything else fails with
  /// [`PngError::UnsupportedChannelRequest`].
  pub requested_channels: u8,
  /// Check every chunk's CRC.
  pub verify_crc: bool,
  /// Check the zlib stream's Adler-32.
  pub verify_adler32: bool,
}
impl Default for DecodeConfig {
  #[inline]
  fn default() -> Self {
    Self {
      flip_vertical_on_load: false,
      requested_channels: 0,
      verify_crc: true,
      verify_adler32: true,
    }
  }
}

/// Works out the output channel count for a header and request.
///
/// ## Failure
/// * [`PngError::UnsupportedChannelRequest`]
pub const fn output_channels(info: &ImageInfo, requested: u8) -> PngResult<u8> {
  let raw = info.raw_channel_count();
  match requested {
    0 => Ok(raw),
    3 | 4 if requested == raw => Ok(raw),
    4 if raw == 3 => Ok(4),
    _ => Err(PngError::UnsupportedChannelRequest),
  }
}

/// Reads just the header of in-memory PNG bytes.
///
/// The `IHDR` CRC is checked.
///
/// ## Failure
/// * [`PngError::NotPng`] and the other header errors.
pub fn png_get_header(bytes: &[u8]) -> PngResult<ImageInfo> {
  let mut source = SliceSource::new(bytes);
  ChunkReader::new(&mut source, true).read_header()
}

/// Decodes in-memory PNG bytes.
///
/// * `scratch` holds the temporary buffers. Reuse it across decodes to avoid
///   allocating them each time.
/// * `diagnostic`, if given, gets the message of the error when the decode
///   fails (unless it already holds one).
///
/// ## Panics
/// * If `scratch` has a byte limit and the decode goes over it (see
///   [`Scratch`]).
///
/// ## Failure
/// Any of the [`PngError`] values, see [`PngError::kind`] for the groups.
#[inline]
pub fn decode_png(
  bytes: &[u8], scratch: &mut Scratch, diagnostic: Option<&mut Diagnostic>,
  config: &DecodeConfig,
) -> PngResult<Image> {
  decode_png_from_source(&mut SliceSource::new(bytes), scratch, diagnostic, config)
}

/// Decodes a PNG from a [`std::io::Read`].
///
/// Read errors are reported as [`PngError::UnexpectedEndOfInput`].
#[cfg(feature = "std")]
#[cfg_attr(docs_rs, doc(cfg(feature = "std")))]
#[inline]
pub fn decode_png_from_reader<R: std::io::Read>(
  reader: R, scratch: &mut Scratch, diagnostic: Option<&mut Diagnostic>, config: &DecodeConfig,
) -> PngResult<Image> {
  let mut source = crate::source::ReadSource::new(reader);
  decode_png_from_source(&mut source, scratch, diagnostic, config)
}

/// Decodes a PNG from any [`ByteSource`].
///
/// This is what the other decode functions call.
pub fn decode_png_from_source<S: ByteSource>(
  source: &mut S, scratch: &mut Scratch, diagnostic: Option<&mut Diagnostic>,
  config: &DecodeConfig,
) -> PngResult<Image> {
  let result = decode_stages(source, scratch, config);
  scratch.reset();
  match result {
    Ok(image) => {
      log::debug!(
        "decoded PNG: {}x{}, {} channel(s), forced transparency: {}",
        image.width,
        image.height,
        image.channels,
        image.forced_transparency
      );
      Ok(image)
    }
    Err(e) => {
      log::debug!("PNG decode failed: {e:?} ({e})");
      if let Some(d) = diagnostic {
        d.record(e.message());
      }
      Err(e)
    }
  }
}

fn decode_stages<S: ByteSource>(
  source: &mut S, scratch: &mut Scratch, config: &DecodeConfig,
) -> PngResult<Image> {
  let mut reader = ChunkReader::new(source, config.verify_crc);
  let info = reader.read_header()?;
  let channels = output_channels(&info, config.requested_channels)?;
  info.checked_image_bytes(info.raw_channel_count())?;
  info.checked_image_bytes(channels)?;
  log::debug!(
    "PNG header: {}x{}, {:?}, output channels: {channels}",
    info.width,
    info.height,
    info.color_type
  );

  reader.read_image_data(&info, scratch)?;

  let filtered_len = info.filtered_bytes();
  scratch.claim(filtered_len);
  scratch.inflated.reserve(filtered_len.min(INFLATE_RESERVE_LIMIT));
  let options = ZlibOptions { verify_adler32: config.verify_adler32, output_limit: Some(filtered_len) };
  zlib_decompress(&scratch.compressed, &mut scratch.inflated, options)?;
  if scratch.inflated.len() < filtered_len {
    return Err(PngError::NotEnoughImageData);
  }

  let mut image = Image::try_new_zeroed(info.width, info.height, channels)?;
  image.forced_transparency = channels != info.raw_channel_count();
  scratch.zeroed_rows(2 * info.row_bytes());
  unfilter_image(&info, &scratch.inflated, &mut scratch.rows, channels, &mut image.data)?;
  if config.flip_vertical_on_load {
    image.flip_vertical();
  }
  Ok(image)
}

#[test]
fn test_output_channels() {
  let info = |color_type| ImageInfo {
    width: 1,
    height: 1,
    bit_depth: 8,
    color_type,
    compression_method: 0,
    filter_method: 0,
    interlace_method: 0,
  };
  use PngColorType::*;
  assert_eq!(output_channels(&info(Y), 0), Ok(1));
  assert_eq!(output_channels(&info(YA), 0), Ok(2));
  assert_eq!(output_channels(&info(RGB), 0), Ok(3));
  assert_eq!(output_channels(&info(RGB), 3), Ok(3));
  assert_eq!(output_channels(&info(RGB), 4), Ok(4));
  assert_eq!(output_channels(&info(RGBA), 4), Ok(4));
  assert_eq!(output_channels(&info(RGBA), 0), Ok(4));
  // 3 never adds alpha, and there's no channel dropping.
  assert_eq!(output_channels(&info(YA), 3), Err(PngError::UnsupportedChannelRequest));
  assert_eq!(output_channels(&info(RGBA), 3), Err(PngError::UnsupportedChannelRequest));
  assert_eq!(output_channels(&info(YA), 4), Err(PngError::UnsupportedChannelRequest));
  assert_eq!(output_channels(&info(Y), 4), Err(PngError::UnsupportedChannelRequest));
  assert_eq!(output_channels(&info(Y), 2), Err(PngError::UnsupportedChannelRequest));
  assert_eq!(output_channels(&info(Y), 1), Err(PngError::UnsupportedChannelRequest));
}
