use super::*;

/// Bits looked up directly by the fast table.
const FAST_BITS: u32 = 9;
const FAST_SIZE: usize = 1 << FAST_BITS;
const FAST_MASK: u32 = (FAST_SIZE as u32) - 1;

/// The biggest alphabet: literal/length codes of a fixed block.
pub const MAX_SYMBOLS: usize = 288;

/// A canonical Huffman decoding table.
///
/// Codes of 9 bits or fewer decode with one lookup. Longer codes (up to 15
/// bits) fall back to a search over the code length ranges.
#[derive(Clone, PartialEq, Eq)]
pub struct HuffmanTable {
  /// Indexed by the next 9 input bits: `length << 9 | symbol`, or 0.
  fast: [u16; FAST_SIZE],
  first_code: [u16; 16],
  first_symbol: [u16; 16],
  /// One past the last code of each length, shifted up to 16 bits.
  max_code: [u32; 17],
  lengths: [u8; MAX_SYMBOLS],
  symbols: [u16; MAX_SYMBOLS],
}

impl core::fmt::Debug for HuffmanTable {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    let mut counts = [0_u16; 16];
    for len in self.lengths.iter().copied() {
      counts[usize::from(len)] += 1;
    }
    f.debug_struct("HuffmanTable")
      .field("codes_per_length", &&counts[1..])
      .field("fast_entries", &self.fast.iter().filter(|e| **e != 0).count())
      .finish()
  }
}

impl HuffmanTable {
  /// Builds the table for a list of per-symbol code lengths.
  ///
  /// A length of 0 means the symbol isn't used, otherwise lengths go up to
  /// 15. The lengths only have to avoid over-subscribing the code space; an
  /// incomplete code is fine (DEFLATE allows a lone distance code, for
  /// example) and its unassigned bit patterns fail at decode time.
  ///
  /// ## Failure
  /// * [`PngError::InvalidHuffmanTree`] if there's more than [`MAX_SYMBOLS`]
  ///   lengths, a length over 15, or the lengths are over-subscribed.
  pub const fn try_build(code_lengths: &[u8]) -> PngResult<Self> {
    if code_lengths.len() > MAX_SYMBOLS {
      return Err(PngError::InvalidHuffmanTree);
    }
    let mut table = Self {
      fast: [0; FAST_SIZE],
      first_code: [0; 16],
      first_symbol: [0; 16],
      max_code: [0; 17],
      lengths: [0; MAX_SYMBOLS],
      symbols: [0; MAX_SYMBOLS],
    };

    // 1) Count the number of codes for each code length.
    let mut counts = [0_u32; 16];
    let mut i = 0;
    while i < code_lengths.len() {
      let len = code_lengths[i] as usize;
      if len > 15 {
        return Err(PngError::InvalidHuffmanTree);
      }
      counts[len] += 1;
      i += 1;
    }
    counts[0] = 0;
    let mut len = 1;
    while len < 16 {
      if counts[len] > (1 << len) {
        return Err(PngError::InvalidHuffmanTree);
      }
      len += 1;
    }

    // 2) Find the smallest code and the first symbol slot of each length.
    let mut next_code = [0_u32; 16];
    let mut code = 0_u32;
    let mut slot = 0_u32;
    let mut len = 1;
    while len < 16 {
      next_code[len] = code;
      table.first_code[len] = code as u16;
      table.first_symbol[len] = slot as u16;
      code += counts[len];
      if counts[len] != 0 && code - 1 >= (1 << len) {
        return Err(PngError::InvalidHuffmanTree);
      }
      table.max_code[len] = code << (16 - len);
      code <<= 1;
      slot += counts[len];
      len += 1;
    }
    table.max_code[16] = 1 << 16;

    // 3) Hand out codes in symbol order, filling the fast table as we go.
    let mut symbol = 0;
    while symbol < code_lengths.len() {
      let len = code_lengths[symbol] as usize;
      if len != 0 {
        let code = next_code[len];
        let slot = (code - table.first_code[len] as u32 + table.first_symbol[len] as u32) as usize;
        table.lengths[slot] = len as u8;
        table.symbols[slot] = symbol as u16;
        if len <= FAST_BITS as usize {
          // DEFLATE packs codes high bit first, but we pull bits low bit
          // first, so the fast table is indexed by the reversed code.
          let entry = ((len as u16) << 9) | symbol as u16;
          let mut j = ((code as u16).reverse_bits() >> (16 - len)) as usize;
          while j < FAST_SIZE {
            table.fast[j] = entry;
            j += 1 << len;
          }
        }
        next_code[len] += 1;
      }
      symbol += 1;
    }
    Ok(table)
  }

  /// Decodes one symbol from the bit source.
  ///
  /// ## Failure
  /// * [`PngError::BadHuffmanCode`] if the bits aren't a code in this table.
  /// * [`PngError::InsufficientData`] if the input ends mid-code.
  #[inline]
  pub fn decode(&self, bits: &mut BitSource<'_>) -> PngResult<u16> {
    bits.fill_to_threshold();
    let window = bits.peek_bits();
    let entry = self.fast[(window & FAST_MASK) as usize];
    if entry != 0 {
      let len = u32::from(entry >> 9);
      if len > bits.buffered_bit_count() {
        return Err(PngError::InsufficientData);
      }
      bits.drop_bits(len);
      Ok(entry & 0x1FF)
    } else {
      self.decode_slow(bits, window)
    }
  }

  #[cold]
  fn decode_slow(&self, bits: &mut BitSource<'_>, window: u32) -> PngResult<u16> {
    let k = u32::from((window as u16).reverse_bits());
    let mut len = FAST_BITS as usize + 1;
    while k >= self.max_code[len] {
      len += 1;
    }
    if len >= 16 {
      return Err(PngError::BadHuffmanCode);
    }
    let offset = match (k >> (16 - len)).checked_sub(u32::from(self.first_code[len])) {
      Some(offset) => offset,
      None => return Err(PngError::BadHuffmanCode),
    };
    let slot = (offset + u32::from(self.first_symbol[len])) as usize;
    if slot >= MAX_SYMBOLS || usize::from(self.lengths[slot]) != len {
      return Err(PngError::BadHuffmanCode);
    }
    if len as u32 > bits.buffered_bit_count() {
      return Err(PngError::InsufficientData);
    }
    bits.drop_bits(len as u32);
    Ok(self.symbols[slot])
  }
}

const fn fixed_lit_len_lengths() -> [u8; 288] {
  let mut out = [0; 288];
  let mut i = 0;
  while i < 288 {
    out[i] = match i {
      0..=143 => 8,
      144..=255 => 9,
      256..=279 => 7,
      _ => 8,
    };
    i += 1;
  }
  out
}

const FIXED_LIT_LEN_TABLE: HuffmanTable = match HuffmanTable::try_build(&fixed_lit_len_lengths()) {
  Ok(table) => table,
  Err(_) => panic!("the fixed literal/length code is malformed"),
};
const FIXED_DIST_TABLE: HuffmanTable = match HuffmanTable::try_build(&[5; 32]) {
  Ok(table) => table,
  Err(_) => panic!("the fixed distance code is malformed"),
};
const _: () = assert!(FIXED_LIT_LEN_TABLE.first_code[1] == 0 && FIXED_DIST_TABLE.first_code[1] == 0);

/// Literal/length table for fixed Huffman blocks.
pub(crate) static FIXED_LIT_LEN: HuffmanTable = FIXED_LIT_LEN_TABLE;
/// Distance table for fixed Huffman blocks.
pub(crate) static FIXED_DIST: HuffmanTable = FIXED_DIST_TABLE;

#[cfg(test)]
fn decode_all(table: &HuffmanTable, bytes: &[u8], count: usize) -> PngResult<Vec<u16>> {
  let mut bits = BitSource::new(bytes);
  (0..count).map(|_| table.decode(&mut bits)).collect()
}

#[test]
fn test_rfc1951_example_codes() {
  // ABCDEFGH with lengths (3, 3, 3, 3, 3, 2, 4, 4) gives
  // 010 011 100 101 110 00 1110 1111
  let table = HuffmanTable::try_build(&[3, 3, 3, 3, 3, 2, 4, 4]).unwrap();
  let mut w = BitWriter::new();
  for (code, len) in [(0b010, 3), (0b011, 3), (0b100, 3), (0b101, 3), (0b110, 3), (0b00, 2), (0b1110, 4), (0b1111, 4)] {
    w.put_code(code, len);
  }
  let bytes = w.finish();
  assert_eq!(decode_all(&table, &bytes, 8).unwrap(), [0, 1, 2, 3, 4, 5, 6, 7]);
}

#[test]
fn test_build_is_deterministic() {
  let lengths: Vec<u8> = (0..288).map(|i| [8, 9, 7, 8, 0, 10, 12][i % 7]).collect();
  // whatever the outcome, it's the same both times.
  let a = HuffmanTable::try_build(&lengths);
  let b = HuffmanTable::try_build(&lengths);
  assert_eq!(a, b);
  let c = HuffmanTable::try_build(&fixed_lit_len_lengths()).unwrap();
  assert!(c == FIXED_LIT_LEN);
}

#[test]
fn test_oversubscribed_lengths_fail() {
  assert_eq!(HuffmanTable::try_build(&[1, 1, 1]), Err(PngError::InvalidHuffmanTree));
  assert_eq!(HuffmanTable::try_build(&[2; 5]), Err(PngError::InvalidHuffmanTree));
  assert_eq!(HuffmanTable::try_build(&[3; 9]), Err(PngError::InvalidHuffmanTree));
  // each length fits on its own, but 1 + 2 + 2 + 2 runs out of codes.
  assert_eq!(HuffmanTable::try_build(&[1, 2, 2, 2]), Err(PngError::InvalidHuffmanTree));
  assert_eq!(HuffmanTable::try_build(&[16]), Err(PngError::InvalidHuffmanTree));
  assert_eq!(HuffmanTable::try_build(&[1; 289]), Err(PngError::InvalidHuffmanTree));
  // exactly full is fine.
  assert!(HuffmanTable::try_build(&[2; 4]).is_ok());
  assert!(HuffmanTable::try_build(&[1, 2, 3, 3]).is_ok());
}

#[test]
fn test_long_codes_use_slow_path() {
  // lengths 1 through 15, plus a second 15, make a complete code.
  let mut lengths: Vec<u8> = (1..=15).collect();
  lengths.push(15);
  let table = HuffmanTable::try_build(&lengths).unwrap();
  let mut w = BitWriter::new();
  let mut expected = Vec::new();
  for symbol in (0..16_u32).rev() {
    let (code, len) = if symbol == 15 { ((1 << 15) - 1, 15) } else { (((1 << symbol) - 1) << 1, symbol + 1) };
    w.put_code(code, len);
    expected.push(symbol as u16);
  }
  let bytes = w.finish();
  assert_eq!(decode_all(&table, &bytes, 16).unwrap(), expected);
}

#[test]
fn test_incomplete_code_rejects_unused_pattern() {
  let table = HuffmanTable::try_build(&[0, 1]).unwrap();
  assert_eq!(decode_all(&table, &[0b0000_0000], 1).unwrap(), [1]);
  assert_eq!(decode_all(&table, &[0b0000_0001], 1), Err(PngError::BadHuffmanCode));
  let empty = HuffmanTable::try_build(&[0; 30]).unwrap();
  assert_eq!(decode_all(&empty, &[0xFF, 0xFF], 1), Err(PngError::BadHuffmanCode));
}

#[test]
fn test_fixed_tables() {
  let mut w = BitWriter::new();
  w.put_code(0b0011_0000, 8); // 0
  w.put_code(0b1011_1111, 8); // 143
  w.put_code(0b1_1001_0000, 9); // 144
  w.put_code(0b1_1111_1111, 9); // 255
  w.put_code(0b000_0000, 7); // 256
  w.put_code(0b001_0111, 7); // 279
  w.put_code(0b1100_0000, 8); // 280
  w.put_code(0b1100_0111, 8); // 287
  let bytes = w.finish();
  assert_eq!(decode_all(&FIXED_LIT_LEN, &bytes, 8).unwrap(), [0, 143, 144, 255, 256, 279, 280, 287]);

  let mut w = BitWriter::new();
  for d in [0, 7, 29, 31] {
    w.put_code(d, 5);
  }
  let bytes = w.finish();
  assert_eq!(decode_all(&FIXED_DIST, &bytes, 4).unwrap(), [0, 7, 29, 31]);
}

#[test]
fn test_decode_past_end_of_input() {
  // 9-bit code but only 8 bits of input.
  let mut w = BitWriter::new();
  w.put_code(0b1100_1000, 8);
  let bytes = w.finish();
  assert_eq!(decode_all(&FIXED_LIT_LEN, &bytes, 1), Err(PngError::InsufficientData));
}
