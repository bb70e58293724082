#![forbid(unsafe_code)]

//! Reusable scratch memory for the decoder.
//!
//! A decode needs three short-lived buffers: the concatenated `IDAT` payload,
//! the inflated (still filtered) scanlines, and two rows for unfiltering. They
//! live in a [`Scratch`] that you can keep around and pass to every decode, so
//! that after the first few images there's no further allocation for them.
//!
//! ## Exhaustion Policy
//!
//! Scratch exhaustion is fatal. Growing a scratch buffer goes through the
//! infallible `Vec` growth path, so the global allocator's out-of-memory
//! handler ends the process. If you set a byte budget with
//! [`Scratch::with_limit`], going over that budget panics. Neither case is
//! reported as a [`PngError`](crate::PngError).
//!
//! The final [`Image`](crate::image::Image) is *not* scratch memory, and its
//! allocation failure is an ordinary recoverable error.

use alloc::vec::Vec;

/// Scratch buffers for decoding, see the [module docs](self).
#[derive(Debug, Clone, Default)]
pub struct Scratch {
  pub(crate) compressed: Vec<u8>,
  pub(crate) inflated: Vec<u8>,
  pub(crate) rows: Vec<u8>,
  limit: Option<usize>,
  claimed: usize,
}
impl Scratch {
  /// Scratch with no byte budget.
  #[inline]
  #[must_use]
  pub const fn new() -> Self {
    Self { compressed: Vec::new(), inflated: Vec::new(), rows: Vec::new(), limit: None, claimed: 0 }
  }

  /// Scratch that panics if a single decode claims more than `limit` bytes.
  #[inline]
  #[must_use]
  pub const fn with_limit(limit: usize) -> Self {
    Self {
      compressed: Vec::new(),
      inflated: Vec::new(),
      rows: Vec::new(),
      limit: Some(limit),
      claimed: 0,
    }
  }

  /// Bytes claimed since the last reset.
  #[inline]
  #[must_use]
  pub const fn claimed(&self) -> usize {
    self.claimed
  }

  /// Total bytes currently held, across all buffers.
  #[inline]
  #[must_use]
  pub fn capacity(&self) -> usize {
    self.compressed.capacity() + self.inflated.capacity() + self.rows.capacity()
  }

  /// Empties every buffer (keeping the memory) and zeroes the claim count.
  #[inline]
  pub fn reset(&mut self) {
    self.compressed.clear();
    self.inflated.clear();
    self.rows.clear();
    self.claimed = 0;
  }

  /// Gives the memory back to the allocator.
  #[inline]
  pub fn release(&mut self) {
    *self = match self.limit {
      Some(limit) => Self::with_limit(limit),
      None => Self::new(),
    };
  }

  /// Accounts for `bytes` more scratch use.
  ///
  /// ## Panics
  /// * If this goes over the byte budget.
  #[track_caller]
  pub(crate) fn claim(&mut self, bytes: usize) {
    let total = self.claimed.saturating_add(bytes);
    if let Some(limit) = self.limit {
      if total > limit {
        panic!("scratch memory exhausted: {total} bytes claimed with a limit of {limit}");
      }
    }
    self.claimed = total;
  }

  /// Appends `count` bytes from `source` to the compressed buffer.
  #[track_caller]
  pub(crate) fn push_compressed<S: crate::source::ByteSource>(
    &mut self, source: &mut S, count: usize,
  ) -> crate::PngResult<()> {
    self.claim(count);
    source.read_into_vec(count, &mut self.compressed)
  }

  /// Makes `rows` into `count` zeroed bytes.
  #[track_caller]
  pub(crate) fn zeroed_rows(&mut self, count: usize) -> &mut [u8] {
    self.claim(count);
    self.rows.clear();
    self.rows.resize(count, 0);
    &mut self.rows
  }
}

#[test]
fn test_scratch_reset_keeps_memory() {
  let mut s = Scratch::new();
  s.zeroed_rows(100);
  s.compressed.extend_from_slice(&[1, 2, 3]);
  assert_eq!(s.claimed(), 100);
  let cap = s.capacity();
  assert!(cap >= 103);
  s.reset();
  assert_eq!(s.claimed(), 0);
  assert_eq!(s.capacity(), cap);
  assert!(s.rows.is_empty() && s.compressed.is_empty());
  s.release();
  assert_eq!(s.capacity(), 0);
}

#[test]
#[should_panic(expected = "scratch memory exhausted")]
fn test_scratch_limit_is_fatal() {
  let mut s = Scratch::with_limit(64);
  s.zeroed_rows(32);
  s.zeroed_rows(33);
}
