use super::*;

/// The order that code length code lengths are stored in.
const CODE_LENGTH_ORDER: [usize; 19] =
  [16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15];

/// Most literal/length codes a dynamic block can declare.
const MAX_LIT_LEN_CODES: usize = 286;
/// Most distance codes a dynamic block can declare.
const MAX_DIST_CODES: usize = 30;

/// The 19 symbol alphabet that a dynamic block's code lengths are written in.
#[derive(Debug, Clone)]
pub(crate) struct CodeLengthAlphabet {
  table: HuffmanTable,
}
impl CodeLengthAlphabet {
  /// Reads `count` 3-bit lengths, in the de-zigzag order, and builds the table.
  fn read(count: usize, bits: &mut BitSource<'_>) -> PngResult<Self> {
    let mut lengths = [0_u8; 19];
    for i in CODE_LENGTH_ORDER.iter().copied().take(count) {
      lengths[i] = bits.consume(3)? as u8;
    }
    Ok(Self { table: HuffmanTable::try_build(&lengths)? })
  }

  /// Fills all of `lengths` using the run-length coded values.
  fn fill_a_tree(&self, lengths: &mut [u8], bits: &mut BitSource<'_>) -> PngResult<()> {
    let total = lengths.len();
    let mut acquired = 0_usize;
    while acquired < total {
      let (value, repeat) = match self.table.decode(bits)? {
        literal @ 0..=15 => (literal as u8, 1),
        16 => {
          // repeat previous 3-6 times
          if acquired == 0 {
            return Err(PngError::InvalidHuffmanTree);
          }
          (lengths[acquired - 1], 3 + bits.consume(2)? as usize)
        }
        // short zero run, 3-10
        17 => (0, 3 + bits.consume(3)? as usize),
        // long zero run, 11-138
        18 => (0, 11 + bits.consume(7)? as usize),
        _ => return Err(PngError::InvalidHuffmanTree),
      };
      if acquired + repeat > total {
        return Err(PngError::InvalidHuffmanTree);
      }
      lengths[acquired..acquired + repeat].fill(value);
      acquired += repeat;
    }
    Ok(())
  }
}

/// Reads a dynamic block header and builds its literal/length and distance
/// tables.
pub(crate) fn read_dynamic_tables(
  bits: &mut BitSource<'_>,
) -> PngResult<(HuffmanTable, HuffmanTable)> {
  let hlit = bits.consume(5)? as usize + 257;
  let hdist = bits.consume(5)? as usize + 1;
  let hclen = bits.consume(4)? as usize + 4;
  if hlit > MAX_LIT_LEN_CODES || hdist > MAX_DIST_CODES {
    return Err(PngError::InvalidHuffmanTree);
  }
  let alphabet = CodeLengthAlphabet::read(hclen, bits)?;
  let mut lengths = [0_u8; MAX_LIT_LEN_CODES + MAX_DIST_CODES];
  let lengths = &mut lengths[..hlit + hdist];
  alphabet.fill_a_tree(lengths, bits)?;
  if lengths[256] == 0 {
    // a block with no way to end
    return Err(PngError::InvalidHuffmanTree);
  }
  let (lit_len_lengths, dist_lengths) = lengths.split_at(hlit);
  Ok((HuffmanTable::try_build(lit_len_lengths)?, HuffmanTable::try_build(dist_lengths)?))
}

#[test]
fn test_run_past_declared_count_fails() {
  let mut w = BitWriter::new();
  w.put(0, 5); // 257 lit/len codes
  w.put(0, 5); // 1 distance code
  w.put(0, 4); // 4 code length codes: 16, 17, 18, 0
  for len in [0, 0, 1, 1] {
    w.put(len, 3);
  }
  // symbol 0 is code `0`, symbol 18 is code `1`.
  w.put_code(1, 1);
  w.put(127, 7); // 138 zeros
  w.put_code(1, 1);
  w.put(127, 7); // 138 more, but only 120 are left
  let bytes = w.finish();
  let mut bits = BitSource::new(&bytes);
  assert_eq!(read_dynamic_tables(&mut bits).unwrap_err(), PngError::InvalidHuffmanTree);
}

#[test]
fn test_repeat_previous_needs_a_previous() {
  let mut w = BitWriter::new();
  w.put(0, 5);
  w.put(0, 5);
  w.put(0, 4);
  // 16 is code `0`, 18 is code `1`
  for len in [1, 0, 1, 0] {
    w.put(len, 3);
  }
  w.put_code(0, 1);
  w.put(0, 2);
  let bytes = w.finish();
  let mut bits = BitSource::new(&bytes);
  assert_eq!(read_dynamic_tables(&mut bits).unwrap_err(), PngError::InvalidHuffmanTree);
}

#[test]
fn test_dynamic_header_builds_tables() {
  // 257 lit/len codes and 1 distance code, all lengths given as 9 and then
  // 16-repeats, with the distance length as a plain 1.
  let mut w = BitWriter::new();
  w.put(0, 5);
  w.put(0, 5);
  w.put(14, 4); // 18 code length codes, enough to reach symbol 1 and 9
  let mut cl = [0_u32; 19];
  cl[9] = 2;
  cl[16] = 2;
  cl[1] = 2;
  cl[0] = 2;
  for i in CODE_LENGTH_ORDER.iter().copied().take(18) {
    w.put(cl[i], 3);
  }
  // canonical codes: 0 => 00, 1 => 01, 9 => 10, 16 => 11
  let mut given = 0;
  w.put_code(0b10, 2);
  given += 1;
  while given < 257 {
    let repeat = (257 - given).min(6);
    if repeat < 3 {
      w.put_code(0b10, 2);
      given += 1;
    } else {
      w.put_code(0b11, 2);
      w.put(repeat as u32 - 3, 2);
      given += repeat;
    }
  }
  w.put_code(0b01, 2);
  let bytes = w.finish();
  let mut bits = BitSource::new(&bytes);
  let (lit_len, dist) = read_dynamic_tables(&mut bits).unwrap();
  assert_eq!(lit_len, HuffmanTable::try_build(&[9; 257]).unwrap());
  assert_eq!(dist, HuffmanTable::try_build(&[1]).unwrap());
}
