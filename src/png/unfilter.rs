use super::*;

/// How a scanline was filtered, from the byte at the start of each line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterType {
  /// Bytes are stored as-is.
  None,
  /// Relative to the byte one pixel to the left.
  Sub,
  /// Relative to the byte above.
  Up,
  /// Relative to the average of left and above.
  Average,
  /// Relative to the [Paeth predictor](paeth_predict) of left, above, and
  /// upper left.
  Paeth,
  /// Average, on a line where "above" is all zero.
  ///
  /// Never stored in a PNG, this is what [`Average`](Self::Average) becomes
  /// on the first line.
  AverageFirst,
}
impl TryFrom<u8> for FilterType {
  type Error = PngError;
  #[inline]
  fn try_from(value: u8) -> Result<Self, Self::Error> {
    Ok(match value {
      0 => Self::None,
      1 => Self::Sub,
      2 => Self::Up,
      3 => Self::Average,
      4 => Self::Paeth,
      _ => return Err(PngError::IllegalFilterType),
    })
  }
}
impl FilterType {
  /// The equivalent filter when the previous line is all zero.
  ///
  /// With nothing above, `Up` adds zero and `Paeth` always picks the left
  /// byte.
  #[inline]
  #[must_use]
  pub const fn for_first_row(self) -> Self {
    match self {
      Self::Up => Self::None,
      Self::Average => Self::AverageFirst,
      Self::Paeth => Self::Sub,
      other => other,
    }
  }
}

/// The PNG Paeth predictor of `a` (left), `b` (above), and `c` (upper left).
///
/// Gives the same answer as the PNG standard's reference version, but without
/// any branching on the distances.
#[inline]
#[must_use]
pub const fn paeth_predict(a: u8, b: u8, c: u8) -> u8 {
  let a = a as i32;
  let b = b as i32;
  let c = c as i32;
  let thresh = c * 3 - (a + b);
  let lo = if a < b { a } else { b };
  let hi = if a < b { b } else { a };
  let t0 = if hi <= thresh { lo } else { c };
  let t1 = if thresh <= lo { hi } else { t0 };
  t1 as u8
}

/// Reverses one line's filter.
///
/// * `bpp` is the channel count of the stored data (always one byte per
///   channel here).
/// * `filtered` is the line without its filter byte.
/// * `prev` is the previous reconstructed line, which is ignored by the
///   first-row filter types.
///
/// All three slices must be the same length, which is at least `bpp`.
pub(crate) fn unfilter_row(
  filter: FilterType, bpp: usize, filtered: &[u8], prev: &[u8], cur: &mut [u8],
) {
  debug_assert!(filtered.len() == cur.len() && prev.len() == cur.len() && cur.len() >= bpp);
  match filter {
    FilterType::None => cur.copy_from_slice(filtered),
    FilterType::Sub => {
      cur[..bpp].copy_from_slice(&filtered[..bpp]);
      for i in bpp..cur.len() {
        cur[i] = filtered[i].wrapping_add(cur[i - bpp]);
      }
    }
    FilterType::Up => {
      for ((c, f), b) in cur.iter_mut().zip(filtered.iter().copied()).zip(prev.iter().copied()) {
        *c = f.wrapping_add(b);
      }
    }
    FilterType::Average => {
      for i in 0..bpp {
        cur[i] = filtered[i].wrapping_add(prev[i] / 2);
      }
      for i in bpp..cur.len() {
        let avg = (u16::from(cur[i - bpp]) + u16::from(prev[i])) / 2;
        cur[i] = filtered[i].wrapping_add(avg as u8);
      }
    }
    FilterType::AverageFirst => {
      cur[..bpp].copy_from_slice(&filtered[..bpp]);
      for i in bpp..cur.len() {
        cur[i] = filtered[i].wrapping_add(cur[i - bpp] / 2);
      }
    }
    FilterType::Paeth => {
      // with left and upper left both zero, the predictor is just "above".
      for i in 0..bpp {
        cur[i] = filtered[i].wrapping_add(prev[i]);
      }
      for i in bpp..cur.len() {
        cur[i] = filtered[i].wrapping_add(paeth_predict(cur[i - bpp], prev[i], prev[i - bpp]));
      }
    }
  }
}

/// Copies a reconstructed line into the output, adding an opaque alpha byte
/// to each pixel when `out_channels` is one more than `raw_channels`.
#[inline]
pub(crate) fn expand_row(raw: &[u8], raw_channels: usize, out_channels: usize, out: &mut [u8]) {
  if out_channels == raw_channels {
    out.copy_from_slice(raw);
  } else {
    debug_assert_eq!(out_channels, raw_channels + 1);
    for (src, dst) in raw.chunks_exact(raw_channels).zip(out.chunks_exact_mut(out_channels)) {
      dst[..raw_channels].copy_from_slice(src);
      dst[raw_channels] = u8::MAX;
    }
  }
}

/// Turns all the decompressed lines into final pixel rows.
///
/// * `filtered` holds `height` lines of `1 + row_bytes` each.
/// * `rows` is the scratch for the current and previous line, and must be
///   zeroed and exactly `2 * row_bytes` long.
/// * `out` gets `height` rows of `width * out_channels` bytes.
///
/// ## Failure
/// * [`PngError::IllegalFilterType`] for a filter byte over 4.
/// * [`PngError::NotEnoughImageData`] if `filtered` is short.
pub(crate) fn unfilter_image(
  info: &ImageInfo, filtered: &[u8], rows: &mut [u8], out_channels: u8, out: &mut [u8],
) -> PngResult<()> {
  let raw_channels = usize::from(info.raw_channel_count());
  let out_channels = usize::from(out_channels);
  let row_bytes = info.row_bytes();
  let height = info.height as usize;
  if filtered.len() < (row_bytes + 1).saturating_mul(height) {
    return Err(PngError::NotEnoughImageData);
  }
  let (mut prev, mut cur) = rows.split_at_mut(row_bytes);
  let out_stride = info.width as usize * out_channels;
  let lines = filtered.chunks_exact(row_bytes + 1).zip(out.chunks_exact_mut(out_stride));
  for (y, (line, out_row)) in lines.take(height).enumerate() {
    let (filter_byte, data) = match line.split_first() {
      Some(pair) => pair,
      None => return Err(PngError::NotEnoughImageData),
    };
    let mut filter = FilterType::try_from(*filter_byte)?;
    if y == 0 {
      filter = filter.for_first_row();
    }
    unfilter_row(filter, raw_channels, data, prev, cur);
    expand_row(cur, raw_channels, out_channels, out_row);
    core::mem::swap(&mut prev, &mut cur);
  }
  Ok(())
}

#[cfg(test)]
const fn reference_paeth(a: u8, b: u8, c: u8) -> u8 {
  let a_ = a as i32;
  let b_ = b as i32;
  let c_ = c as i32;
  let p: i32 = a_ + b_ - c_;
  let pa = (p - a_).abs();
  let pb = (p - b_).abs();
  let pc = (p - c_).abs();
  if pa <= pb && pa <= pc {
    a
  } else if pb <= pc {
    b
  } else {
    c
  }
}

/// Applies a filter the way an encoder would, `prev` being the line above.
#[cfg(test)]
fn filter_row(filter: u8, bpp: usize, row: &[u8], prev: &[u8]) -> Vec<u8> {
  let left = |i: usize| if i >= bpp { row[i - bpp] } else { 0 };
  let upper_left = |i: usize| if i >= bpp { prev[i - bpp] } else { 0 };
  (0..row.len())
    .map(|i| {
      let predicted = match filter {
        0 => 0,
        1 => left(i),
        2 => prev[i],
        3 => ((u16::from(left(i)) + u16::from(prev[i])) / 2) as u8,
        4 => reference_paeth(left(i), prev[i], upper_left(i)),
        _ => unreachable!(),
      };
      row[i].wrapping_sub(predicted)
    })
    .collect()
}

#[cfg(test)]
struct XorShift(u32);
#[cfg(test)]
impl XorShift {
  fn next_byte(&mut self) -> u8 {
    self.0 ^= self.0 << 13;
    self.0 ^= self.0 >> 17;
    self.0 ^= self.0 << 5;
    (self.0 >> 24) as u8
  }
  fn bytes(&mut self, n: usize) -> Vec<u8> {
    (0..n).map(|_| self.next_byte()).collect()
  }
}

#[test]
fn test_paeth_matches_reference() {
  for a in 0..=255 {
    for b in 0..=255 {
      for c in 0..=255 {
        let p = paeth_predict(a, b, c);
        assert_eq!(p, reference_paeth(a, b, c), "a={a}, b={b}, c={c}");
        assert!(p == a || p == b || p == c);
      }
    }
  }
}

#[test]
fn test_unfilter_inverts_filter() {
  let mut rng = XorShift(0x1234_5678);
  for bpp in 1..=4 {
    for width in [1, 2, 7, 33] {
      let len = bpp * width;
      for filter in 0..=4 {
        // a later row, with a real line above
        let prev = rng.bytes(len);
        let row = rng.bytes(len);
        let filtered = filter_row(filter, bpp, &row, &prev);
        let mut cur = alloc::vec![0; len];
        let ft = FilterType::try_from(filter).unwrap();
        unfilter_row(ft, bpp, &filtered, &prev, &mut cur);
        assert_eq!(cur, row, "filter {filter}, bpp {bpp}, width {width}");

        // the first row, where the line above is all zero and the filter is
        // remapped.
        let zeros = alloc::vec![0; len];
        let filtered = filter_row(filter, bpp, &row, &zeros);
        let garbage = rng.bytes(len);
        unfilter_row(ft.for_first_row(), bpp, &filtered, &garbage, &mut cur);
        assert_eq!(cur, row, "first row, filter {filter}, bpp {bpp}, width {width}");
      }
    }
  }
}

#[test]
fn test_unfilter_image_with_expansion() {
  // 2x2 grey, the second row "up" filtered.
  let info = ImageInfo {
    width: 2,
    height: 2,
    bit_depth: 8,
    color_type: PngColorType::Y,
    compression_method: 0,
    filter_method: 0,
    interlace_method: 0,
  };
  let filtered = [1, 10, 5, 2, 1, 1];
  let mut rows = [0_u8; 4];
  let mut out = [0_u8; 8];
  unfilter_image(&info, &filtered, &mut rows, 2, &mut out).unwrap();
  assert_eq!(out, [10, 255, 15, 255, 11, 255, 16, 255]);

  let mut rows = [0_u8; 4];
  let mut out = [0_u8; 4];
  unfilter_image(&info, &filtered, &mut rows, 1, &mut out).unwrap();
  assert_eq!(out, [10, 15, 11, 16]);

  let mut rows = [0_u8; 4];
  assert_eq!(
    unfilter_image(&info, &[5, 0, 0, 0, 0, 0], &mut rows, 1, &mut out),
    Err(PngError::IllegalFilterType)
  );
  assert_eq!(
    unfilter_image(&info, &filtered[..5], &mut rows, 1, &mut out),
    Err(PngError::NotEnoughImageData)
  );
}
