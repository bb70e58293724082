//! Pixel types for viewing decoded image bytes.
//!
//! Every type here is 8 bits per channel with an alignment of 1, so a byte
//! slice of the right length can be viewed as a slice of pixels (see
//! [`Image::pixels`](crate::image::Image::pixels)).
//!
//! Channels are named by letter: "Y" is greyscale, and "A" is alpha.

use bytemuck::{Pod, Zeroable};

/// An 8-bit greyscale pixel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Pod, Zeroable)]
#[repr(C)]
#[allow(missing_docs)]
pub struct Y8 {
  pub y: u8,
}

/// An 8-bits per channel greyscale + alpha pixel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Pod, Zeroable)]
#[repr(C)]
#[allow(missing_docs)]
pub struct YA8 {
  pub y: u8,
  pub a: u8,
}

/// An RGB value, 8-bits per channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Pod, Zeroable)]
#[repr(C)]
#[allow(missing_docs)]
pub struct RGB8 {
  pub r: u8,
  pub g: u8,
  pub b: u8,
}

/// An 8-bits per channel RGBA pixel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Pod, Zeroable)]
#[repr(C)]
#[allow(missing_docs)]
pub struct RGBA8 {
  pub r: u8,
  pub g: u8,
  pub b: u8,
  pub a: u8,
}
impl From<Y8> for RGBA8 {
  #[inline]
  fn from(Y8 { y }: Y8) -> Self {
    Self { r: y, g: y, b: y, a: u8::MAX }
  }
}
impl From<YA8> for RGBA8 {
  #[inline]
  fn from(YA8 { y, a }: YA8) -> Self {
    Self { r: y, g: y, b: y, a }
  }
}
impl From<RGB8> for RGBA8 {
  #[inline]
  fn from(RGB8 { r, g, b }: RGB8) -> Self {
    Self { r, g, b, a: u8::MAX }
  }
}
