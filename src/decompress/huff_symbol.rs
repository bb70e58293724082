use super::*;

const LENGTH_BASE: [u16; 29] = [
  3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 15, 17, 19, 23, 27, 31, 35, 43, 51, 59, 67, 83, 99, 115, 131,
  163, 195, 227, 258,
];
const LENGTH_EXTRA: [u8; 29] =
  [0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 0];
const DIST_BASE: [u16; 30] = [
  1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025, 1537, 2049,
  3073, 4097, 6145, 8193, 12289, 16385, 24577,
];
const DIST_EXTRA: [u8; 30] =
  [0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13, 13];

/// One token of a Huffman-coded block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HuffSymbol {
  Literal(u8),
  EndOfBlock,
  BackRef { length: usize, distance: usize },
}

impl HuffSymbol {
  /// Reads a full token, including any extra bits and the distance code.
  #[inline]
  pub(crate) fn read(
    bits: &mut BitSource<'_>, lit_len: &HuffmanTable, dist: &HuffmanTable,
  ) -> PngResult<Self> {
    let symbol = lit_len.decode(bits)?;
    match symbol {
      0..=255 => Ok(HuffSymbol::Literal(symbol as u8)),
      256 => Ok(HuffSymbol::EndOfBlock),
      257..=285 => {
        let i = usize::from(symbol - 257);
        let length =
          usize::from(LENGTH_BASE[i]) + bits.consume(u32::from(LENGTH_EXTRA[i]))? as usize;
        let d = usize::from(dist.decode(bits)?);
        if d >= DIST_BASE.len() {
          return Err(PngError::BadHuffmanCode);
        }
        let distance = usize::from(DIST_BASE[d]) + bits.consume(u32::from(DIST_EXTRA[d]))? as usize;
        debug_assert!((3..=258).contains(&length));
        debug_assert!((1..=32_768).contains(&distance));
        Ok(HuffSymbol::BackRef { length, distance })
      }
      // 286 and 287 only exist to fill out the fixed code.
      _ => Err(PngError::BadHuffmanCode),
    }
  }
}

#[test]
fn test_length_and_distance_tables() {
  // each base picks up where the previous code's extra bits leave off.
  for i in 0..27 {
    assert_eq!(LENGTH_BASE[i] + (1 << LENGTH_EXTRA[i]), LENGTH_BASE[i + 1], "length code {i}");
  }
  for i in 0..29 {
    assert_eq!(DIST_BASE[i] + (1 << DIST_EXTRA[i]), DIST_BASE[i + 1], "distance code {i}");
  }
  assert_eq!(DIST_BASE[29] as u32 + (1 << DIST_EXTRA[29]) - 1, 32_768);
}

#[test]
fn test_read_back_ref_with_extra_bits() {
  let mut w = BitWriter::new();
  // length code 269 is 23 + 2 extra bits, distance code 9 is 25 + 3 extra bits.
  w.put_code(269 - 256, 7);
  w.put(0b11, 2);
  w.put_code(9, 5);
  w.put(0b101, 3);
  // 286 can be encoded in a fixed block but isn't a real symbol.
  w.put_code(0b1100_0110, 8);
  let bytes = w.finish();
  let mut bits = BitSource::new(&bytes);
  assert_eq!(
    HuffSymbol::read(&mut bits, &FIXED_LIT_LEN, &FIXED_DIST),
    Ok(HuffSymbol::BackRef { length: 26, distance: 30 })
  );
  assert_eq!(HuffSymbol::read(&mut bits, &FIXED_LIT_LEN, &FIXED_DIST), Err(PngError::BadHuffmanCode));
}
