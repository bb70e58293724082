use super::*;

/// Most bytes a chunk is allowed to declare.
const MAX_CHUNK_LEN: u32 = (1 << 31) - 1;

/// Upper end of the up-front `IDAT` reservation when the input size isn't
/// known.
const UNKNOWN_INPUT_RESERVE: usize = 1 << 20;

/// Walks the chunks of a PNG stream, front to back.
pub(crate) struct ChunkReader<'s, S> {
  source: &'s mut S,
  verify_crc: bool,
}

impl<'s, S: ByteSource> ChunkReader<'s, S> {
  #[inline]
  pub(crate) fn new(source: &'s mut S, verify_crc: bool) -> Self {
    Self { source, verify_crc }
  }

  /// Reads the signature and the `IHDR` that must follow it.
  ///
  /// ## Failure
  /// * [`PngError::NotPng`] if the signature is wrong or missing.
  /// * [`PngError::IdatBeforeIHDR`] / [`PngError::FirstChunkNotIHDR`] if
  ///   something other than `IHDR` comes first.
  /// * Any of the [`ImageInfo::try_parse`] errors.
  pub(crate) fn read_header(&mut self) -> PngResult<ImageInfo> {
    let mut signature = [0_u8; 8];
    if self.source.read_exact(&mut signature).is_err() || signature != PNG_SIGNATURE {
      return Err(PngError::NotPng);
    }
    let (len, tag) = self.read_chunk_start()?;
    match tag {
      PngChunkTag::IHDR => (),
      PngChunkTag::IDAT => return Err(PngError::IdatBeforeIHDR),
      _ => return Err(PngError::FirstChunkNotIHDR),
    }
    if len != 13 {
      return Err(PngError::IllegalIHDRLength);
    }
    let mut data = [0_u8; 13];
    self.source.read_exact(&mut data)?;
    let mut crc = Crc32::new();
    crc.update(&tag.0);
    crc.update(&data);
    self.finish_chunk(tag, crc)?;
    ImageInfo::try_parse(&data)
  }

  /// Reads every chunk after the header, up to and including `IEND`.
  ///
  /// `IDAT` payloads are appended to the scratch compressed buffer, and every
  /// other chunk is skipped.
  ///
  /// ## Failure
  /// * [`PngError::DuplicateIHDR`] for a second `IHDR`.
  /// * [`PngError::IllegalIEND`] if `IEND` has data.
  /// * [`PngError::NoIdat`] if `IEND` shows up before any `IDAT`.
  /// * [`PngError::IllegalChunkLength`] for a length over 2^31-1.
  /// * [`PngError::ChunkCrcMismatch`] when checking CRCs.
  /// * [`PngError::UnexpectedEndOfInput`] if the stream ends first.
  pub(crate) fn read_image_data(
    &mut self, info: &ImageInfo, scratch: &mut Scratch,
  ) -> PngResult<()> {
    let cap = self.source.remaining_hint().unwrap_or(UNKNOWN_INPUT_RESERVE);
    scratch.compressed.reserve(info.compressed_size_estimate().min(cap));
    let mut idat_count = 0_usize;
    loop {
      let (len, tag) = self.read_chunk_start()?;
      let mut crc = Crc32::new();
      crc.update(&tag.0);
      match tag {
        PngChunkTag::IHDR => return Err(PngError::DuplicateIHDR),
        PngChunkTag::IDAT => {
          let start = scratch.compressed.len();
          scratch.push_compressed(&mut *self.source, len)?;
          crc.update(&scratch.compressed[start..]);
          idat_count += 1;
        }
        PngChunkTag::IEND => {
          if len != 0 {
            return Err(PngError::IllegalIEND);
          }
          if idat_count == 0 {
            return Err(PngError::NoIdat);
          }
          self.finish_chunk(tag, crc)?;
          log::debug!(
            "read {idat_count} IDAT chunk(s), {} compressed bytes",
            scratch.compressed.len()
          );
          return Ok(());
        }
        _ => {
          log::trace!("skipping {tag:?} chunk, {len} bytes");
          self.source.skip_with(len, |bytes| crc.update(bytes))?;
        }
      }
      self.finish_chunk(tag, crc)?;
    }
  }

  fn read_chunk_start(&mut self) -> PngResult<(usize, PngChunkTag)> {
    let mut start = [0_u8; 8];
    self.source.read_exact(&mut start)?;
    let (len, rest) = try_pull_u32_be(&start)?;
    let (tag, _) = try_pull_byte_array::<4>(rest)?;
    if len > MAX_CHUNK_LEN {
      return Err(PngError::IllegalChunkLength);
    }
    Ok((len as usize, PngChunkTag(tag)))
  }

  fn finish_chunk(&mut self, tag: PngChunkTag, crc: Crc32) -> PngResult<()> {
    let mut declared = [0_u8; 4];
    self.source.read_exact(&mut declared)?;
    let declared = u32::from_be_bytes(declared);
    if self.verify_crc && declared != crc.finish() {
      log::debug!(
        "{tag:?} chunk CRC mismatch: declared {declared:08X}, actual {:08X}",
        crc.finish()
      );
      return Err(PngError::ChunkCrcMismatch);
    }
    Ok(())
  }
}

#[cfg(test)]
fn chunk(tag: &[u8; 4], data: &[u8]) -> Vec<u8> {
  let mut out = Vec::new();
  out.extend_from_slice(&(data.len() as u32).to_be_bytes());
  out.extend_from_slice(tag);
  out.extend_from_slice(data);
  out.extend_from_slice(&png_crc(*tag, data).to_be_bytes());
  out
}

#[cfg(test)]
const TINY_IHDR: [u8; 13] = [0, 0, 0, 1, 0, 0, 0, 1, 8, 0, 0, 0, 0];

#[cfg(test)]
fn walk(bytes: &[u8], verify_crc: bool) -> PngResult<Scratch> {
  let mut source = SliceSource::new(bytes);
  let mut reader = ChunkReader::new(&mut source, verify_crc);
  let info = reader.read_header()?;
  let mut scratch = Scratch::new();
  reader.read_image_data(&info, &mut scratch)?;
  Ok(scratch)
}

#[test]
fn test_chunk_walk_concatenates_idat() {
  let mut png = Vec::from(PNG_SIGNATURE);
  png.extend(chunk(b"IHDR", &TINY_IHDR));
  png.extend(chunk(b"tEXt", b"Comment\0hello"));
  png.extend(chunk(b"IDAT", &[1, 2]));
  png.extend(chunk(b"IDAT", &[]));
  png.extend(chunk(b"IDAT", &[3]));
  png.extend(chunk(b"IEND", &[]));
  let scratch = walk(&png, true).unwrap();
  assert_eq!(scratch.compressed, [1, 2, 3]);
}

#[test]
fn test_chunk_order_errors() {
  fn cat(parts: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::from(PNG_SIGNATURE);
    for part in parts {
      out.extend_from_slice(part);
    }
    out
  }
  let ihdr = chunk(b"IHDR", &TINY_IHDR);
  let idat = chunk(b"IDAT", &[0]);
  let iend = chunk(b"IEND", &[]);

  assert_eq!(walk(&cat(&[idat.clone(), iend.clone()]), true).unwrap_err(), PngError::IdatBeforeIHDR);
  assert_eq!(
    walk(&cat(&[chunk(b"gAMA", &[0; 4]), ihdr.clone()]), true).unwrap_err(),
    PngError::FirstChunkNotIHDR
  );
  assert_eq!(
    walk(&cat(&[ihdr.clone(), ihdr.clone(), idat.clone(), iend.clone()]), true).unwrap_err(),
    PngError::DuplicateIHDR
  );
  assert_eq!(walk(&cat(&[ihdr.clone(), iend.clone()]), true).unwrap_err(), PngError::NoIdat);
  assert_eq!(
    walk(&cat(&[ihdr.clone(), idat.clone(), chunk(b"IEND", &[0])]), true).unwrap_err(),
    PngError::IllegalIEND
  );
  assert_eq!(
    walk(&cat(&[chunk(b"IHDR", &[0; 12]), idat.clone(), iend.clone()]), true).unwrap_err(),
    PngError::IllegalIHDRLength
  );
  assert_eq!(walk(&cat(&[ihdr.clone(), idat.clone()]), true).unwrap_err(), PngError::UnexpectedEndOfInput);
  assert_eq!(walk(b"GIF89a", true).unwrap_err(), PngError::NotPng);
  assert_eq!(walk(&[], true).unwrap_err(), PngError::NotPng);

  let mut huge = cat(&[ihdr.clone()]);
  huge.extend_from_slice(&[0x80, 0, 0, 0]);
  huge.extend_from_slice(b"IDAT");
  assert_eq!(walk(&huge, true).unwrap_err(), PngError::IllegalChunkLength);
}

#[test]
fn test_chunk_crc_check() {
  let mut png = Vec::from(PNG_SIGNATURE);
  png.extend(chunk(b"IHDR", &TINY_IHDR));
  let mut text = chunk(b"tEXt", b"a\0b");
  let last = text.len() - 1;
  text[last] ^= 0xFF;
  png.extend(text);
  png.extend(chunk(b"IDAT", &[9]));
  png.extend(chunk(b"IEND", &[]));
  assert_eq!(walk(&png, true).unwrap_err(), PngError::ChunkCrcMismatch);
  assert_eq!(walk(&png, false).unwrap().compressed, [9]);
}
