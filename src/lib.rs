#![no_std]
#![cfg_attr(docs_rs, feature(doc_cfg))]
#![warn(missing_docs)]

//! A small PNG decoder, with its own zlib / DEFLATE decompressor.
//!
//! * [`png`] walks the PNG container and turns the image data into an
//!   [`Image`].
//! * [`decompress`] is the inflate engine, usable on its own for any zlib or
//!   raw DEFLATE data.
//!
//! ```
//! use pngcore::{png::{decode_png, DecodeConfig}, Diagnostic, Image, Scratch};
//!
//! fn load_rgba(bytes: &[u8], scratch: &mut Scratch) -> Result<Image, &'static str> {
//!   let mut diagnostic = Diagnostic::new();
//!   let config = DecodeConfig { requested_channels: 4, ..DecodeConfig::default() };
//!   decode_png(bytes, scratch, Some(&mut diagnostic), &config)
//!     .map_err(|_| diagnostic.message().unwrap_or("unknown error"))
//! }
//!
//! let mut scratch = Scratch::new();
//! assert_eq!(load_rgba(b"not a png", &mut scratch), Err("not a PNG file"));
//! ```
//!
//! ## Memory
//!
//! Decoding uses two kinds of memory. The temporary buffers live in a
//! [`Scratch`] that you own and can reuse between decodes, and running out of
//! scratch memory is fatal (see the [`scratch`] module). The output
//! [`Image`] is allocated separately, and failure to allocate it is an
//! ordinary [`PngError::Alloc`].
//!
//! ## Logging
//!
//! The crate logs through the [`log`] facade: `debug` for the start and end
//! of each decode, and `trace` for each chunk skipped and each DEFLATE block.
//! It never installs a logger itself.
//!
//! ## Features
//!
//! * `std` (default): [`source::ReadSource`], `decode_png_from_reader`, and
//!   `std::error::Error` for [`PngError`].

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

#[cfg(target_pointer_width = "16")]
compile_error!("this crate assumes 32-bit or bigger pointers!");

mod error;
pub use error::*;

mod parser_helpers;

pub mod source;

pub mod scratch;
pub use scratch::Scratch;

pub mod decompress;

pub mod png;

pub mod pixel_formats;
pub use pixel_formats::*;

pub mod image;
pub use image::Image;
