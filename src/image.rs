#![forbid(unsafe_code)]

//! The decoded image type.

use alloc::vec::Vec;

use bytemuck::Pod;

use crate::{
  pixel_formats::{RGB8, RGBA8, Y8, YA8},
  PngError, PngResult,
};

/// Temp buffer size used when flipping, rows are swapped a page at a time.
const FLIP_CHUNK: usize = 4096;

/// Decoded pixels, 8 bits per channel, rows top to bottom.
///
/// `data` is exactly `width * height * channels` bytes. This buffer belongs to
/// the caller, it's not part of the decoder's scratch memory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Image {
  /// width in pixels
  pub width: u32,
  /// height in pixels
  pub height: u32,
  /// 1 (Y), 2 (YA), 3 (RGB), or 4 (RGBA)
  pub channels: u8,
  /// If the alpha channel was added by the decoder rather than stored in the
  /// PNG (it's then always 255).
  pub forced_transparency: bool,
  /// The pixel bytes.
  pub data: Vec<u8>,
}

impl Image {
  /// An all-zero image.
  ///
  /// ## Failure
  /// * [`PngError::ImageTooLarge`] if the byte count overflows.
  /// * [`PngError::Alloc`] if the allocator can't provide the memory.
  pub fn try_new_zeroed(width: u32, height: u32, channels: u8) -> PngResult<Self> {
    let len = (width as usize)
      .checked_mul(height as usize)
      .and_then(|px| px.checked_mul(usize::from(channels)))
      .ok_or(PngError::ImageTooLarge)?;
    let mut data = Vec::new();
    data.try_reserve_exact(len)?;
    data.resize(len, 0);
    Ok(Self { width, height, channels, forced_transparency: false, data })
  }

  /// Bytes per row.
  #[inline]
  #[must_use]
  pub const fn stride(&self) -> usize {
    self.width as usize * self.channels as usize
  }

  /// The bytes of row `y`, if it's in bounds.
  #[inline]
  #[must_use]
  pub fn row(&self, y: u32) -> Option<&[u8]> {
    let stride = self.stride();
    let start = (y as usize).checked_mul(stride)?;
    self.data.get(start..start.checked_add(stride)?)
  }

  /// Mutable bytes of row `y`, if it's in bounds.
  #[inline]
  #[must_use]
  pub fn row_mut(&mut self, y: u32) -> Option<&mut [u8]> {
    let stride = self.stride();
    let start = (y as usize).checked_mul(stride)?;
    self.data.get_mut(start..start.checked_add(stride)?)
  }

  /// The channel bytes of the pixel at `(x, y)`, if it's in bounds.
  #[inline]
  #[must_use]
  pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
    if x >= self.width {
      return None;
    }
    let channels = usize::from(self.channels);
    let start = x as usize * channels;
    self.row(y)?.get(start..start + channels)
  }

  /// Views the data as pixels of type `P`.
  ///
  /// Gives `None` unless `P` is exactly `channels` bytes (so `RGBA8` for a
  /// 4 channel image, `Y8` for 1, and so on).
  #[inline]
  #[must_use]
  pub fn pixels<P: Pod>(&self) -> Option<&[P]> {
    if core::mem::size_of::<P>() != usize::from(self.channels) {
      return None;
    }
    bytemuck::try_cast_slice(&self.data).ok()
  }

  /// Converts every pixel to RGBA, whatever the channel count.
  ///
  /// ## Failure
  /// * [`PngError::Alloc`] if the allocator can't provide the memory.
  pub fn to_rgba8(&self) -> PngResult<Vec<RGBA8>> {
    let mut out: Vec<RGBA8> = Vec::new();
    out.try_reserve_exact(self.data.len() / usize::from(self.channels.max(1)))?;
    match self.channels {
      1 => out.extend(self.pixels::<Y8>().unwrap_or(&[]).iter().copied().map(RGBA8::from)),
      2 => out.extend(self.pixels::<YA8>().unwrap_or(&[]).iter().copied().map(RGBA8::from)),
      3 => out.extend(self.pixels::<RGB8>().unwrap_or(&[]).iter().copied().map(RGBA8::from)),
      4 => out.extend_from_slice(self.pixels::<RGBA8>().unwrap_or(&[])),
      _ => (),
    }
    Ok(out)
  }

  /// Flips the image top to bottom.
  ///
  /// Rows are swapped a page (4096 bytes) at a time through a fixed buffer, so
  /// no extra row sized allocation is needed.
  pub fn flip_vertical(&mut self) {
    let stride = self.stride();
    let height = self.height as usize;
    if stride == 0 {
      return;
    }
    let mut temp = [0_u8; FLIP_CHUNK];
    for y in 0..height / 2 {
      let (top, bottom) = self.data.split_at_mut((height - 1 - y) * stride);
      let top = &mut top[y * stride..(y + 1) * stride];
      let bottom = &mut bottom[..stride];
      for (t, b) in top.chunks_mut(FLIP_CHUNK).zip(bottom.chunks_mut(FLIP_CHUNK)) {
        let temp = &mut temp[..t.len()];
        temp.copy_from_slice(t);
        t.copy_from_slice(b);
        b.copy_from_slice(temp);
      }
    }
  }
}

#[test]
fn test_flip_vertical() {
  for height in [1_u32, 2, 3, 6] {
    let mut img = Image::try_new_zeroed(3, height, 2).unwrap();
    for (i, b) in img.data.iter_mut().enumerate() {
      *b = i as u8;
    }
    let before = img.clone();
    img.flip_vertical();
    for y in 0..height {
      assert_eq!(img.row(y), before.row(height - 1 - y));
    }
    img.flip_vertical();
    assert_eq!(img, before);
  }
}

#[test]
fn test_flip_wide_rows() {
  // rows longer than the temp buffer
  let mut img = Image::try_new_zeroed(1500, 3, 4).unwrap();
  assert!(img.stride() > FLIP_CHUNK);
  img.row_mut(0).unwrap().fill(1);
  img.row_mut(2).unwrap().fill(3);
  img.flip_vertical();
  assert!(img.row(0).unwrap().iter().all(|b| *b == 3));
  assert!(img.row(1).unwrap().iter().all(|b| *b == 0));
  assert!(img.row(2).unwrap().iter().all(|b| *b == 1));
}

#[test]
fn test_typed_pixels() {
  let mut img = Image::try_new_zeroed(2, 1, 3).unwrap();
  img.data.copy_from_slice(&[1, 2, 3, 4, 5, 6]);
  assert_eq!(img.pixels::<RGB8>(), Some(&[RGB8 { r: 1, g: 2, b: 3 }, RGB8 { r: 4, g: 5, b: 6 }][..]));
  assert_eq!(img.pixels::<RGBA8>(), None);
  assert_eq!(img.pixel(1, 0), Some(&[4, 5, 6][..]));
  assert_eq!(img.pixel(2, 0), None);
  assert_eq!(img.pixel(0, 1), None);
  let rgba = img.to_rgba8().unwrap();
  assert_eq!(rgba[1], RGBA8 { r: 4, g: 5, b: 6, a: 255 });
}
