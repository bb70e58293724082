use super::*;

/// Pulls bits out of a byte slice, least significant bit first.
///
/// Bytes are shifted into a 32-bit accumulator whenever fewer than 16 bits
/// are buffered, a whole byte at a time.
#[derive(Clone)]
pub struct BitSource<'b> {
  bytes: &'b [u8],
  spare_bits: u32,
  spare_bit_count: u32,
}

impl core::fmt::Debug for BitSource<'_> {
  fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
    struct Spare(u32, u32);
    impl core::fmt::Debug for Spare {
      fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        if self.1 > 0 {
          write!(f, "{bits:0width$b}", bits = self.0, width = self.1 as usize)
        } else {
          f.write_str("-")
        }
      }
    }
    f.debug_struct("BitSource")
      .field("bytes_left", &self.bytes.len())
      .field("spare_bits", &Spare(self.spare_bits, self.spare_bit_count))
      .field("spare_bit_count", &self.spare_bit_count)
      .finish()
  }
}

impl<'b> BitSource<'b> {
  /// Makes a source over the bytes.
  #[inline]
  #[must_use]
  pub const fn new(bytes: &'b [u8]) -> Self {
    Self { bytes, spare_bits: 0, spare_bit_count: 0 }
  }

  /// Bits currently buffered.
  #[inline]
  #[must_use]
  pub const fn buffered_bit_count(&self) -> u32 {
    self.spare_bit_count
  }

  /// The buffered bits, lowest bit is the next one out.
  ///
  /// Bits past [`buffered_bit_count`](Self::buffered_bit_count) are zero.
  #[inline]
  #[must_use]
  pub const fn peek_bits(&self) -> u32 {
    self.spare_bits
  }

  /// Bytes that haven't been moved into the accumulator yet.
  #[inline]
  #[must_use]
  pub const fn unread_bytes(&self) -> &'b [u8] {
    self.bytes
  }

  fn refill(&mut self) {
    while self.spare_bit_count <= 24 {
      match self.bytes.split_first() {
        Some((byte, rest)) => {
          self.spare_bits |= u32::from(*byte) << self.spare_bit_count;
          self.spare_bit_count += 8;
          self.bytes = rest;
        }
        None => break,
      }
    }
  }

  /// Makes sure at least 16 bits are buffered, if the input has that many.
  ///
  /// Near the end of input this can leave fewer than 16, which isn't an error
  /// by itself.
  #[inline]
  pub fn fill_to_threshold(&mut self) {
    if self.spare_bit_count < 16 {
      self.refill();
    }
  }

  /// Gets the next `count` bits as an integer, first bit lowest.
  ///
  /// ## Failure
  /// * [`PngError::InsufficientData`] if the input runs out first.
  #[inline]
  pub fn consume(&mut self, count: u32) -> PngResult<u32> {
    debug_assert!(count <= 24);
    if self.spare_bit_count < count {
      self.refill();
      if self.spare_bit_count < count {
        return Err(PngError::InsufficientData);
      }
    }
    let out = self.spare_bits & ((1_u32 << count) - 1);
    self.drop_bits(count);
    Ok(out)
  }

  /// Throws away `count` bits that are already buffered.
  #[inline]
  pub(crate) fn drop_bits(&mut self, count: u32) {
    debug_assert!(count <= self.spare_bit_count);
    self.spare_bits = if count >= 32 { 0 } else { self.spare_bits >> count };
    self.spare_bit_count -= count;
  }

  /// Throws away bits up to the next byte boundary of the input.
  #[inline]
  pub fn align_to_byte(&mut self) {
    self.drop_bits(self.spare_bit_count % 8);
  }

  /// Appends `count` whole bytes to `out`.
  ///
  /// Buffered bytes go first, then bytes come straight from the input.
  ///
  /// ## Panics
  /// * If the buffered bit count isn't byte aligned, call
  ///   [`align_to_byte`](Self::align_to_byte) first.
  ///
  /// ## Failure
  /// * [`PngError::InsufficientData`] if there aren't `count` bytes left, in
  ///   which case nothing is appended.
  pub fn take_aligned_bytes(&mut self, count: usize, out: &mut Vec<u8>) -> PngResult<()> {
    assert_eq!(self.spare_bit_count % 8, 0, "taking bytes from an unaligned bit source");
    let buffered = (self.spare_bit_count / 8) as usize;
    if buffered.saturating_add(self.bytes.len()) < count {
      return Err(PngError::InsufficientData);
    }
    let mut left = count;
    while left > 0 && self.spare_bit_count > 0 {
      out.push(self.spare_bits as u8);
      self.drop_bits(8);
      left -= 1;
    }
    let (head, tail) = self.bytes.split_at(left);
    out.extend_from_slice(head);
    self.bytes = tail;
    Ok(())
  }
}

#[test]
fn test_consume_is_lsb_first() {
  let bytes = [0b1010_1101_u8, 0b0000_0001, 0xFF];
  let mut bs = BitSource::new(&bytes);
  assert_eq!(bs.consume(1).unwrap(), 1);
  assert_eq!(bs.consume(2).unwrap(), 0b10);
  assert_eq!(bs.consume(5).unwrap(), 0b10101);
  assert_eq!(bs.consume(9).unwrap(), 0b1_0000_0001);
  assert_eq!(bs.consume(0).unwrap(), 0);
  assert_eq!(bs.consume(7).unwrap(), 0b111_1111);
  assert_eq!(bs.consume(1), Err(PngError::InsufficientData));
}

#[test]
fn test_take_aligned_bytes() {
  let bytes = [0xAB_u8, 1, 2, 3, 4, 5, 6];
  let mut bs = BitSource::new(&bytes);
  assert_eq!(bs.consume(3).unwrap(), 0b011);
  bs.align_to_byte();
  let mut out = Vec::new();
  bs.take_aligned_bytes(5, &mut out).unwrap();
  assert_eq!(out, [1, 2, 3, 4, 5]);
  assert_eq!(bs.take_aligned_bytes(2, &mut out), Err(PngError::InsufficientData));
  assert_eq!(out.len(), 5);
  bs.take_aligned_bytes(1, &mut out).unwrap();
  assert_eq!(out, [1, 2, 3, 4, 5, 6]);
}

#[test]
#[should_panic]
fn test_take_aligned_bytes_requires_alignment() {
  let bytes = [0_u8; 4];
  let mut bs = BitSource::new(&bytes);
  bs.consume(3).unwrap();
  let mut out = Vec::new();
  let _ = bs.take_aligned_bytes(1, &mut out);
}
