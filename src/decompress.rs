#![forbid(unsafe_code)]

//! Zlib and raw DEFLATE decompression.
//!
//! * [RFC 1950: ZLIB Compressed Data Format](https://www.rfc-editor.org/rfc/rfc1950)
//! * [RFC 1951: DEFLATE Compressed Data Format](https://www.rfc-editor.org/rfc/rfc1951)
//!
//! The whole compressed stream must be in memory as one slice. Output is
//! appended to a `Vec<u8>`, since a back-reference can reach up to 32k bytes
//! back into everything produced so far.
//!
//! Nothing here can resume after an error. A corrupt stream fails the whole
//! call, and whatever had been appended to the output up to that point should
//! be ignored.

use alloc::vec::Vec;

use crate::{PngError, PngResult};

mod bit_source;
pub use bit_source::*;

mod huffman_table;
pub use huffman_table::{HuffmanTable, MAX_SYMBOLS};
pub(crate) use huffman_table::{FIXED_DIST, FIXED_LIT_LEN};

mod code_length_alphabet;
use code_length_alphabet::read_dynamic_tables;

mod huff_symbol;
use huff_symbol::HuffSymbol;

mod adler32;
pub use adler32::*;

/// Options for [`zlib_decompress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ZlibOptions {
  /// Check the Adler-32 trailer against the output.
  pub verify_adler32: bool,
  /// Most bytes the call may append to the output.
  pub output_limit: Option<usize>,
}
impl Default for ZlibOptions {
  #[inline]
  fn default() -> Self {
    Self { verify_adler32: true, output_limit: None }
  }
}

/// Checks the 2-byte zlib header.
///
/// The method must be 8 (DEFLATE) with a window of at most 32k, there must not
/// be a preset dictionary, and the header check bits must work out.
///
/// ## Failure
/// * [`PngError::BadZlibHeader`]
#[inline]
pub const fn check_zlib_header(cmf: u8, flg: u8) -> PngResult<()> {
  let method = cmf & 0b1111;
  let window_info = cmf >> 4;
  let check = ((cmf as u16) << 8 | flg as u16) % 31;
  let preset_dictionary = (flg & 0b10_0000) != 0;
  if check != 0 || method != 8 || window_info > 7 || preset_dictionary {
    Err(PngError::BadZlibHeader)
  } else {
    Ok(())
  }
}

/// Decompresses a zlib stream, appending to `out`.
///
/// ## Failure
/// * [`PngError::BadZlibHeader`] if the header is wrong.
/// * [`PngError::BadAdlerChecksum`] if the trailer doesn't match (and the
///   options say to check it).
/// * [`PngError::TooMuchImageData`] if the output limit would be passed.
/// * Any of the compressed data errors from [`Inflater::inflate_into`].
pub fn zlib_decompress(zlib: &[u8], out: &mut Vec<u8>, options: ZlibOptions) -> PngResult<()> {
  let (cmf, flg, deflate) = match zlib {
    [cmf, flg, deflate @ ..] => (*cmf, *flg, deflate),
    _ => return Err(PngError::InsufficientData),
  };
  check_zlib_header(cmf, flg)?;
  let start = out.len();
  let mut inflater = Inflater::new(deflate);
  if let Some(limit) = options.output_limit {
    inflater = inflater.with_output_limit(start.saturating_add(limit));
  }
  inflater.inflate_into(out)?;
  if options.verify_adler32 {
    let declared = inflater.read_zlib_trailer()?;
    let actual = adler32(&out[start..]);
    if declared != actual {
      log::debug!("adler-32 mismatch: declared {declared:08X}, actual {actual:08X}");
      return Err(PngError::BadAdlerChecksum);
    }
  }
  Ok(())
}

/// Decompresses raw DEFLATE data (no zlib header or trailer), appending to
/// `out`.
#[inline]
pub fn deflate_decompress(deflate: &[u8], out: &mut Vec<u8>) -> PngResult<()> {
  Inflater::new(deflate).inflate_into(out)
}

/// Block by block DEFLATE decoder over a byte slice.
#[derive(Debug, Clone)]
pub struct Inflater<'b> {
  bits: BitSource<'b>,
  final_block_seen: bool,
  output_limit: Option<usize>,
}
impl<'b> Inflater<'b> {
  /// Makes an inflater for the DEFLATE bytes.
  #[inline]
  #[must_use]
  pub const fn new(deflate: &'b [u8]) -> Self {
    Self { bits: BitSource::new(deflate), final_block_seen: false, output_limit: None }
  }

  /// Sets the longest that the output `Vec` is allowed to become.
  #[inline]
  #[must_use]
  pub const fn with_output_limit(self, limit: usize) -> Self {
    Self { output_limit: Some(limit), ..self }
  }

  /// If the block marked as final has been read.
  #[inline]
  #[must_use]
  pub const fn final_block_seen(&self) -> bool {
    self.final_block_seen
  }

  /// Decodes blocks until the final block is done.
  ///
  /// ## Failure
  /// * [`PngError::BadBlockType`] for block type 3.
  /// * [`PngError::StoredLengthMismatch`] if a stored block's `NLEN` isn't
  ///   `!LEN`.
  /// * [`PngError::InvalidHuffmanTree`] if a dynamic block's code lengths are
  ///   bad.
  /// * [`PngError::BadHuffmanCode`] if the bits aren't a code.
  /// * [`PngError::DistanceTooFarBack`] if a back-reference reaches before the
  ///   first byte this call wrote. Bytes already in `out` can't be referenced.
  /// * [`PngError::InsufficientData`] if the input ends too soon.
  /// * [`PngError::TooMuchImageData`] if the output limit would be passed.
  pub fn inflate_into(&mut self, out: &mut Vec<u8>) -> PngResult<()> {
    let output_start = out.len();
    while !self.final_block_seen {
      self.final_block_seen = self.bits.consume(1)? != 0;
      let block_type = self.bits.consume(2)?;
      let before = out.len();
      match block_type {
        0 => self.stored_block(out)?,
        1 => self.huffman_block(out, output_start, &FIXED_LIT_LEN, &FIXED_DIST)?,
        2 => {
          let (lit_len, dist) = read_dynamic_tables(&mut self.bits)?;
          self.huffman_block(out, output_start, &lit_len, &dist)?
        }
        _ => return Err(PngError::BadBlockType),
      }
      log::trace!(
        "DEFLATE block: type={block_type}, final={final_}, +{added} bytes",
        final_ = self.final_block_seen,
        added = out.len() - before,
      );
    }
    Ok(())
  }

  /// Reads the big-endian Adler-32 that follows the final block.
  pub fn read_zlib_trailer(&mut self) -> PngResult<u32> {
    self.bits.align_to_byte();
    let mut declared = 0_u32;
    for _ in 0..4 {
      declared = (declared << 8) | self.bits.consume(8)?;
    }
    Ok(declared)
  }

  #[inline]
  fn check_room(&self, out: &[u8], extra: usize) -> PngResult<()> {
    match self.output_limit {
      Some(limit) if out.len().saturating_add(extra) > limit => Err(PngError::TooMuchImageData),
      _ => Ok(()),
    }
  }

  fn stored_block(&mut self, out: &mut Vec<u8>) -> PngResult<()> {
    self.bits.align_to_byte();
    let len = self.bits.consume(16)?;
    let nlen = self.bits.consume(16)?;
    if nlen != len ^ 0xFFFF {
      return Err(PngError::StoredLengthMismatch);
    }
    self.check_room(out, len as usize)?;
    self.bits.take_aligned_bytes(len as usize, out)
  }

  fn huffman_block(
    &mut self, out: &mut Vec<u8>, output_start: usize, lit_len: &HuffmanTable,
    dist: &HuffmanTable,
  ) -> PngResult<()> {
    loop {
      match HuffSymbol::read(&mut self.bits, lit_len, dist)? {
        HuffSymbol::Literal(byte) => {
          self.check_room(out, 1)?;
          out.push(byte);
        }
        HuffSymbol::EndOfBlock => return Ok(()),
        HuffSymbol::BackRef { length, distance } => {
          if distance > out.len() - output_start {
            return Err(PngError::DistanceTooFarBack);
          }
          self.check_room(out, length)?;
          copy_back_ref(out, length, distance);
        }
      }
    }
  }
}

/// Appends `length` bytes copied from `distance` bytes back.
///
/// The copy goes a byte at a time, so when `distance < length` the bytes
/// written early in the copy are read again later in the copy.
#[inline]
fn copy_back_ref(out: &mut Vec<u8>, length: usize, distance: usize) {
  debug_assert!(distance >= 1 && distance <= out.len());
  let start = out.len() - distance;
  if distance == 1 {
    let byte = out[start];
    out.resize(out.len() + length, byte);
  } else {
    out.reserve(length);
    for i in start..start + length {
      let byte = out[i];
      out.push(byte);
    }
  }
}

/// Writes bits the way DEFLATE packs them, for building test streams.
#[cfg(test)]
pub(crate) struct BitWriter {
  bytes: Vec<u8>,
  acc: u64,
  count: u32,
}
#[cfg(test)]
impl BitWriter {
  pub(crate) fn new() -> Self {
    Self { bytes: Vec::new(), acc: 0, count: 0 }
  }

  /// `count` bits of `value`, low bit first (header fields, extra bits).
  pub(crate) fn put(&mut self, value: u32, count: u32) {
    let mask = (1_u64 << count) - 1;
    self.acc |= (u64::from(value) & mask) << self.count;
    self.count += count;
    while self.count >= 8 {
      self.bytes.push(self.acc as u8);
      self.acc >>= 8;
      self.count -= 8;
    }
  }

  /// A Huffman code of `len` bits, high bit first.
  pub(crate) fn put_code(&mut self, code: u32, len: u32) {
    for i in (0..len).rev() {
      self.put((code >> i) & 1, 1);
    }
  }

  pub(crate) fn finish(mut self) -> Vec<u8> {
    if self.count > 0 {
      self.bytes.push(self.acc as u8);
    }
    self.bytes
  }
}

#[cfg(test)]
fn fixed_literal(w: &mut BitWriter, byte: u8) {
  match byte {
    0..=143 => w.put_code(0x30 + u32::from(byte), 8),
    _ => w.put_code(0x190 + u32::from(byte) - 144, 9),
  }
}

#[cfg(test)]
fn inflate(deflate: &[u8]) -> PngResult<Vec<u8>> {
  let mut out = Vec::new();
  deflate_decompress(deflate, &mut out).map(|_| out)
}

#[test]
fn test_stored_block() {
  assert_eq!(inflate(&[0x01, 3, 0, 0xFC, 0xFF, b'a', b'b', b'c']).unwrap(), b"abc");
  assert_eq!(inflate(&[0x01, 0, 0, 0xFF, 0xFF]).unwrap(), b"");
}

#[test]
fn test_stored_block_nlen_mismatch() {
  assert_eq!(inflate(&[0x01, 0x05, 0, 0, 0]), Err(PngError::StoredLengthMismatch));
}

#[test]
fn test_stored_block_truncated() {
  assert_eq!(inflate(&[0x01, 3, 0, 0xFC, 0xFF, b'a']), Err(PngError::InsufficientData));
  assert_eq!(inflate(&[0x01, 3, 0]), Err(PngError::InsufficientData));
  assert_eq!(inflate(&[]), Err(PngError::InsufficientData));
}

#[test]
fn test_bad_block_type() {
  let mut w = BitWriter::new();
  w.put(1, 1);
  w.put(3, 2);
  assert_eq!(inflate(&w.finish()), Err(PngError::BadBlockType));
}

#[cfg(test)]
fn run_of_z_stream() -> Vec<u8> {
  let mut w = BitWriter::new();
  w.put(1, 1);
  w.put(1, 2);
  fixed_literal(&mut w, b'z');
  w.put_code(264 - 256, 7); // length 10
  w.put_code(0, 5); // distance 1
  w.put_code(0, 7); // end of block
  w.finish()
}

#[test]
fn test_distance_one_repeats_last_byte() {
  assert_eq!(inflate(&run_of_z_stream()).unwrap(), b"zzzzzzzzzzz");
}

#[test]
fn test_overlapping_back_ref() {
  let mut w = BitWriter::new();
  w.put(1, 1);
  w.put(1, 2);
  fixed_literal(&mut w, b'a');
  fixed_literal(&mut w, b'b');
  w.put_code(260 - 256, 7); // length 6
  w.put_code(1, 5); // distance 2
  fixed_literal(&mut w, 200);
  w.put_code(0, 7);
  assert_eq!(inflate(&w.finish()).unwrap(), [b'a', b'b', b'a', b'b', b'a', b'b', b'a', b'b', 200]);
}

#[test]
fn test_distance_past_start_of_output() {
  let mut w = BitWriter::new();
  w.put(1, 1);
  w.put(1, 2);
  fixed_literal(&mut w, b'a');
  w.put_code(257 - 256, 7); // length 3
  w.put_code(1, 5); // distance 2, but there's only 1 byte
  w.put_code(0, 7);
  let err = inflate(&w.finish()).unwrap_err();
  assert_eq!(err, PngError::DistanceTooFarBack);
  assert_eq!(err.message(), "distance longer than data");
}

#[test]
fn test_missing_end_of_block() {
  let mut w = BitWriter::new();
  w.put(1, 1);
  w.put(1, 2);
  fixed_literal(&mut w, b'a');
  let bytes = w.finish();
  assert_eq!(inflate(&bytes), Err(PngError::InsufficientData));
}

#[test]
fn test_stored_then_fixed_block() {
  let mut w = BitWriter::new();
  w.put(0, 1);
  w.put(0, 2);
  w.put(0, 5); // pad to the byte
  w.put(2, 16);
  w.put(!2 & 0xFFFF, 16);
  w.put(u32::from(b'h'), 8);
  w.put(u32::from(b'i'), 8);
  w.put(1, 1);
  w.put(1, 2);
  fixed_literal(&mut w, b'!');
  w.put_code(0, 7);
  assert_eq!(inflate(&w.finish()).unwrap(), b"hi!");
}

#[test]
fn test_output_limit() {
  let bytes = run_of_z_stream();
  let mut out = Vec::new();
  let mut inflater = Inflater::new(&bytes).with_output_limit(5);
  assert_eq!(inflater.inflate_into(&mut out), Err(PngError::TooMuchImageData));
  assert!(out.len() <= 5);
  let mut out = Vec::new();
  let mut inflater = Inflater::new(&bytes).with_output_limit(11);
  inflater.inflate_into(&mut out).unwrap();
  assert!(inflater.final_block_seen());
  assert_eq!(out.len(), 11);
}

#[test]
fn test_zlib_header_check() {
  assert!(check_zlib_header(0x78, 0x01).is_ok());
  assert!(check_zlib_header(0x78, 0x9C).is_ok());
  assert!(check_zlib_header(0x78, 0xDA).is_ok());
  // bad check bits
  assert_eq!(check_zlib_header(0x78, 0x9D), Err(PngError::BadZlibHeader));
  // preset dictionary
  assert_eq!(check_zlib_header(0x78, 0x20), Err(PngError::BadZlibHeader));
  // method 9
  assert_eq!(check_zlib_header(0x79, 0x18), Err(PngError::BadZlibHeader));
  // window over 32k
  assert_eq!(check_zlib_header(0x88, 0x1C), Err(PngError::BadZlibHeader));
}

#[test]
fn test_zlib_trailer() {
  let good = [0x78, 0x01, 0x01, 3, 0, 0xFC, 0xFF, b'a', b'b', b'c', 0x02, 0x4D, 0x01, 0x27];
  let mut out = Vec::new();
  zlib_decompress(&good, &mut out, ZlibOptions::default()).unwrap();
  assert_eq!(out, b"abc");

  let mut bad = good;
  bad[13] ^= 1;
  let mut out = Vec::new();
  assert_eq!(
    zlib_decompress(&bad, &mut out, ZlibOptions::default()),
    Err(PngError::BadAdlerChecksum)
  );
  let mut out = Vec::new();
  let unchecked = ZlibOptions { verify_adler32: false, ..ZlibOptions::default() };
  zlib_decompress(&bad, &mut out, unchecked).unwrap();
  assert_eq!(out, b"abc");

  let mut out = Vec::new();
  assert_eq!(
    zlib_decompress(&good[..10], &mut out, ZlibOptions::default()),
    Err(PngError::InsufficientData)
  );
  let mut out = Vec::new();
  assert_eq!(
    zlib_decompress(&good[..1], &mut out, ZlibOptions::default()),
    Err(PngError::InsufficientData)
  );
}

#[test]
fn test_zlib_appends_to_existing_output() {
  let good = [0x78, 0x01, 0x01, 3, 0, 0xFC, 0xFF, b'a', b'b', b'c', 0x02, 0x4D, 0x01, 0x27];
  let mut out = alloc::vec::Vec::from(&b"xyz"[..]);
  let options = ZlibOptions { output_limit: Some(3), ..ZlibOptions::default() };
  zlib_decompress(&good, &mut out, options).unwrap();
  assert_eq!(out, b"xyzabc");
}

#[test]
fn test_back_ref_cannot_reach_existing_output() {
  let mut w = BitWriter::new();
  w.put(1, 1);
  w.put(1, 2);
  w.put_code(257 - 256, 7); // length 3
  w.put_code(2, 5); // distance 3, nothing written yet
  w.put_code(0, 7);
  let deflate = w.finish();

  let mut out = alloc::vec::Vec::from(&b"xyz"[..]);
  assert_eq!(deflate_decompress(&deflate, &mut out), Err(PngError::DistanceTooFarBack));
  assert_eq!(inflate(&deflate), Err(PngError::DistanceTooFarBack));

  // references within this call's own output still work after a prefix.
  let mut out = alloc::vec::Vec::from(&b"xyz"[..]);
  deflate_decompress(&run_of_z_stream(), &mut out).unwrap();
  assert_eq!(out, b"xyzzzzzzzzzzzz");
}
