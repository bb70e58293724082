//! Builds small PNG files for the tests, using `miniz_oxide` for the
//! compression side.

use pngcore::png::{png_crc, PNG_SIGNATURE};

pub const IEND: [u8; 12] = [0, 0, 0, 0, b'I', b'E', b'N', b'D', 0xAE, 0x42, 0x60, 0x82];

/// A 2x2 RGBA image: red, half-transparent green, blue, almost-white.
pub const TINY_RGBA: &[u8] = &[
  0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44, 0x52,
  0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x02, 0x08, 0x06, 0x00, 0x00, 0x00, 0x72, 0xb6, 0x0d,
  0x24, 0x00, 0x00, 0x00, 0x15, 0x49, 0x44, 0x41, 0x54, 0x78, 0xda, 0x63, 0xf8, 0xcf, 0xc0, 0xf0,
  0x1f, 0x08, 0x1b, 0x18, 0x81, 0x34, 0x08, 0x30, 0x00, 0x00, 0x43, 0xdc, 0x08, 0x7a, 0x05, 0x59,
  0x5c, 0x75, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

pub const TINY_RGBA_PIXELS: [u8; 16] =
  [0xFF, 0, 0, 0xFF, 0, 0xFF, 0, 0x80, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE, 0xFF];

pub fn push_chunk(out: &mut Vec<u8>, tag: [u8; 4], data: &[u8]) {
  out.extend_from_slice(&(data.len() as u32).to_be_bytes());
  out.extend_from_slice(&tag);
  out.extend_from_slice(data);
  out.extend_from_slice(&png_crc(tag, data).to_be_bytes());
}

pub fn ihdr_data(width: u32, height: u32, bit_depth: u8, color_type: u8, interlace: u8) -> [u8; 13] {
  let mut data = [0_u8; 13];
  data[0..4].copy_from_slice(&width.to_be_bytes());
  data[4..8].copy_from_slice(&height.to_be_bytes());
  data[8] = bit_depth;
  data[9] = color_type;
  data[12] = interlace;
  data
}

/// Signature and IHDR, no image data yet.
pub fn png_start(width: u32, height: u32, color_type: u8) -> Vec<u8> {
  let mut png = Vec::from(PNG_SIGNATURE);
  push_chunk(&mut png, *b"IHDR", &ihdr_data(width, height, 8, color_type, 0));
  png
}

/// A complete PNG with the zlib data split over `IDAT` chunks of at most
/// `idat_size` bytes.
pub fn png_from_zlib(
  width: u32, height: u32, color_type: u8, zlib: &[u8], idat_size: usize,
) -> Vec<u8> {
  let mut png = png_start(width, height, color_type);
  push_chunk(&mut png, *b"tEXt", b"Comment\0made by the test suite");
  for piece in zlib.chunks(idat_size.max(1)) {
    push_chunk(&mut png, *b"IDAT", piece);
  }
  png.extend_from_slice(&IEND);
  png
}

/// A complete PNG from already filtered scanlines.
pub fn png_from_filtered(
  width: u32, height: u32, color_type: u8, filtered: &[u8], level: u8,
) -> Vec<u8> {
  let zlib = miniz_oxide::deflate::compress_to_vec_zlib(filtered, level);
  png_from_zlib(width, height, color_type, &zlib, 8192)
}

pub fn channels_of(color_type: u8) -> usize {
  match color_type {
    0 => 1,
    2 => 3,
    4 => 2,
    6 => 4,
    _ => panic!("no test support for color type {color_type}"),
  }
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
  let p = i16::from(a) + i16::from(b) - i16::from(c);
  let pa = (p - i16::from(a)).abs();
  let pb = (p - i16::from(b)).abs();
  let pc = (p - i16::from(c)).abs();
  if pa <= pb && pa <= pc {
    a
  } else if pb <= pc {
    b
  } else {
    c
  }
}

/// Applies a filter to every row of `pixels`, giving the bytes an encoder would
/// compress.
///
/// `filter` 5 means "cycle through all of them", starting from a row number.
pub fn filter_image(pixels: &[u8], width: u32, height: u32, channels: usize, filter: u8) -> Vec<u8> {
  let stride = width as usize * channels;
  assert_eq!(pixels.len(), stride * height as usize);
  let zero_row = vec![0_u8; stride];
  let mut out = Vec::with_capacity((stride + 1) * height as usize);
  for y in 0..height as usize {
    let row = &pixels[y * stride..(y + 1) * stride];
    let prev = if y == 0 { &zero_row[..] } else { &pixels[(y - 1) * stride..y * stride] };
    let f = if filter == 5 { (y % 5) as u8 } else { filter };
    out.push(f);
    for i in 0..stride {
      let a = if i >= channels { row[i - channels] } else { 0 };
      let b = prev[i];
      let c = if i >= channels { prev[i - channels] } else { 0 };
      let predicted = match f {
        0 => 0,
        1 => a,
        2 => b,
        3 => ((u16::from(a) + u16::from(b)) / 2) as u8,
        4 => paeth(a, b, c),
        _ => unreachable!(),
      };
      out.push(row[i].wrapping_sub(predicted));
    }
  }
  out
}

/// Pixel bytes that have some structure to them, so every filter has
/// something to do.
pub fn pattern_pixels(width: u32, height: u32, channels: usize, seed: u8) -> Vec<u8> {
  let mut out = Vec::with_capacity(width as usize * height as usize * channels);
  for y in 0..height {
    for x in 0..width {
      for c in 0..channels as u32 {
        let v = x.wrapping_mul(7) ^ y.wrapping_mul(13) ^ (c << 5);
        out.push((v as u8).wrapping_add(seed).wrapping_mul(if (x + y) % 3 == 0 { 3 } else { 1 }));
      }
    }
  }
  out
}
