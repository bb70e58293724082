use pngcore::{
  png::*, source::ReadSource, Diagnostic, Image, PngError, PngErrorKind, Scratch, RGBA8,
};

use super::{rand_bytes, support::*};

fn decode(bytes: &[u8]) -> Result<Image, PngError> {
  decode_png(bytes, &mut Scratch::new(), None, &DecodeConfig::default())
}

fn decode_with(bytes: &[u8], config: DecodeConfig) -> Result<Image, PngError> {
  decode_png(bytes, &mut Scratch::new(), None, &config)
}

#[test]
fn test_tiny_rgba_fixture() {
  let img = decode(TINY_RGBA).unwrap();
  assert_eq!((img.width, img.height, img.channels), (2, 2, 4));
  assert!(!img.forced_transparency);
  assert_eq!(img.data, TINY_RGBA_PIXELS);
  assert_eq!(img.pixels::<RGBA8>().unwrap()[1], RGBA8 { r: 0, g: 0xFF, b: 0, a: 0x80 });

  let info = png_get_header(TINY_RGBA).unwrap();
  assert_eq!((info.width, info.height, info.bit_depth), (2, 2, 8));
  assert_eq!(info.color_type, PngColorType::RGBA);
}

#[test]
fn test_raw_chunk_iter_over_fixture() {
  let tags: Vec<PngChunkTag> = PngRawChunkIter::new(TINY_RGBA).map(|c| c.tag).collect();
  assert_eq!(tags, [PngChunkTag::IHDR, PngChunkTag::IDAT, PngChunkTag::IEND]);
  assert!(PngRawChunkIter::new(TINY_RGBA).all(|c| c.crc_ok()));
}

#[test]
fn test_every_color_type_filter_and_level() {
  for color_type in [0, 2, 4, 6] {
    let channels = channels_of(color_type);
    for (width, height) in [(1, 1), (5, 3), (17, 9), (64, 2)] {
      let pixels = pattern_pixels(width, height, channels, color_type);
      for filter in 0..=5 {
        let filtered = filter_image(&pixels, width, height, channels, filter);
        for level in [0, 1, 6, 10] {
          let png = png_from_filtered(width, height, color_type, &filtered, level);
          let img = decode(&png).unwrap_or_else(|e| {
            panic!("type {color_type}, {width}x{height}, filter {filter}, level {level}: {e:?}")
          });
          assert_eq!(usize::from(img.channels), channels);
          assert_eq!(
            img.data, pixels,
            "type {color_type}, {width}x{height}, filter {filter}, level {level}"
          );
        }
      }
    }
  }
}

#[test]
fn test_many_small_idat_chunks() {
  let pixels = pattern_pixels(40, 30, 3, 9);
  let filtered = filter_image(&pixels, 40, 30, 3, 5);
  let zlib = miniz_oxide::deflate::compress_to_vec_zlib(&filtered, 6);
  for idat_size in [1, 2, 7, 100] {
    let png = png_from_zlib(40, 30, 2, &zlib, idat_size);
    assert_eq!(decode(&png).unwrap().data, pixels, "idat size {idat_size}");
  }
}

#[test]
fn test_empty_idat_chunks_are_fine() {
  let filtered = filter_image(&[1, 2, 3], 1, 1, 3, 0);
  let zlib = miniz_oxide::deflate::compress_to_vec_zlib(&filtered, 6);
  let mut png = png_start(1, 1, 2);
  push_chunk(&mut png, *b"IDAT", &[]);
  push_chunk(&mut png, *b"IDAT", &zlib);
  push_chunk(&mut png, *b"IDAT", &[]);
  png.extend_from_slice(&IEND);
  assert_eq!(decode(&png).unwrap().data, [1, 2, 3]);
}

#[test]
fn test_rgb_as_rgba() {
  let pixels = pattern_pixels(3, 2, 3, 1);
  let png = png_from_filtered(3, 2, 2, &filter_image(&pixels, 3, 2, 3, 4), 6);
  let config = DecodeConfig { requested_channels: 4, ..Default::default() };
  let img = decode_with(&png, config).unwrap();
  assert_eq!(img.channels, 4);
  assert!(img.forced_transparency);
  for (rgba, rgb) in img.data.chunks_exact(4).zip(pixels.chunks_exact(3)) {
    assert_eq!(&rgba[..3], rgb);
    assert_eq!(rgba[3], 255);
  }

  // asking for what's already there changes nothing.
  let config = DecodeConfig { requested_channels: 3, ..Default::default() };
  let img = decode_with(&png, config).unwrap();
  assert!(!img.forced_transparency);
  assert_eq!(img.data, pixels);
}

#[test]
fn test_unsupported_channel_requests() {
  let grey = png_from_filtered(2, 2, 0, &filter_image(&[1, 2, 3, 4], 2, 2, 1, 0), 6);
  let rgba = TINY_RGBA;
  for (png, requested) in [(&grey[..], 2), (&grey[..], 3), (&grey[..], 4), (rgba, 3), (rgba, 7)] {
    let config = DecodeConfig { requested_channels: requested, ..Default::default() };
    let err = decode_with(png, config).unwrap_err();
    assert_eq!(err, PngError::UnsupportedChannelRequest);
    assert_eq!(err.kind(), PngErrorKind::Config);
  }
}

#[test]
fn test_flip_on_load() {
  let config = DecodeConfig { flip_vertical_on_load: true, ..Default::default() };
  let img = decode_with(TINY_RGBA, config).unwrap();
  assert_eq!(&img.data[..8], &TINY_RGBA_PIXELS[8..]);
  assert_eq!(&img.data[8..], &TINY_RGBA_PIXELS[..8]);
}

#[test]
fn test_not_png() {
  let mut diagnostic = Diagnostic::new();
  let err =
    decode_png(b"GIF89a..........", &mut Scratch::new(), Some(&mut diagnostic), &Default::default())
      .unwrap_err();
  assert_eq!(err, PngError::NotPng);
  assert_eq!(diagnostic.message(), Some("not a PNG file"));
  assert_eq!(decode(&[]), Err(PngError::NotPng));
  assert_eq!(decode(&PNG_SIGNATURE[..5]), Err(PngError::NotPng));
  assert!(!is_png_header_correct(b"GIF89a"));
  assert!(is_png_header_correct(TINY_RGBA));
}

#[test]
fn test_diagnostic_keeps_first_message() {
  let mut diagnostic = Diagnostic::new();
  let mut scratch = Scratch::new();
  let config = DecodeConfig::default();
  let _ = decode_png(b"nope", &mut scratch, Some(&mut diagnostic), &config);
  let _ = decode_png(&TINY_RGBA[..40], &mut scratch, Some(&mut diagnostic), &config);
  assert_eq!(diagnostic.message(), Some("not a PNG file"));
  diagnostic.clear();
  let _ = decode_png(&TINY_RGBA[..40], &mut scratch, Some(&mut diagnostic), &config);
  assert_eq!(diagnostic.message(), Some(PngError::UnexpectedEndOfInput.message()));
}

#[test]
fn test_unsupported_headers() {
  let cases: [(u8, u8, u8, PngError); 6] = [
    (8, 3, 0, PngError::UnsupportedPalette),
    (8, 6, 1, PngError::UnsupportedInterlace),
    (16, 6, 0, PngError::UnsupportedBitDepth),
    (4, 0, 0, PngError::UnsupportedBitDepth),
    (7, 0, 0, PngError::IllegalBitDepth),
    (8, 5, 0, PngError::IllegalColorType),
  ];
  for (bit_depth, color_type, interlace, expected) in cases {
    let mut png = Vec::from(PNG_SIGNATURE);
    push_chunk(&mut png, *b"IHDR", &ihdr_data(4, 4, bit_depth, color_type, interlace));
    png.extend_from_slice(&IEND);
    assert_eq!(decode(&png), Err(expected));
    assert_eq!(png_get_header(&png), Err(expected));
  }
}

#[test]
fn test_chunk_order_errors() {
  // no IDAT at all
  let mut png = png_start(1, 1, 0);
  png.extend_from_slice(&IEND);
  assert_eq!(decode(&png), Err(PngError::NoIdat));

  // IDAT first
  let mut png = Vec::from(PNG_SIGNATURE);
  push_chunk(&mut png, *b"IDAT", &[0x78, 0x01]);
  assert_eq!(decode(&png), Err(PngError::IdatBeforeIHDR));

  // something else first
  let mut png = Vec::from(PNG_SIGNATURE);
  push_chunk(&mut png, *b"tEXt", b"a\0b");
  assert_eq!(decode(&png), Err(PngError::FirstChunkNotIHDR));

  // two headers
  let mut png = png_start(1, 1, 0);
  push_chunk(&mut png, *b"IHDR", &ihdr_data(1, 1, 8, 0, 0));
  assert_eq!(decode(&png), Err(PngError::DuplicateIHDR));
}

#[test]
fn test_crc_mismatch() {
  let mut png = TINY_RGBA.to_vec();
  // signature, IHDR, then the IDAT header and payload come before its CRC.
  let idat_crc_at = 8 + 25 + 8 + 0x15;
  png[idat_crc_at] ^= 0x01;
  assert_eq!(decode(&png), Err(PngError::ChunkCrcMismatch));
  assert_eq!(decode(&png).unwrap_err().kind(), PngErrorKind::Container);

  let config = DecodeConfig { verify_crc: false, ..Default::default() };
  assert_eq!(decode_with(&png, config).unwrap().data, TINY_RGBA_PIXELS);
}

#[test]
fn test_adler_corruption() {
  let filtered = filter_image(&pattern_pixels(8, 8, 1, 3), 8, 8, 1, 1);
  let mut zlib = miniz_oxide::deflate::compress_to_vec_zlib(&filtered, 6);
  let last = zlib.len() - 1;
  zlib[last] ^= 0xFF;
  let png = png_from_zlib(8, 8, 0, &zlib, 8192);
  let err = decode(&png).unwrap_err();
  assert_eq!(err, PngError::BadAdlerChecksum);
  assert_eq!(err.kind(), PngErrorKind::Compressed);

  let config = DecodeConfig { verify_adler32: false, ..Default::default() };
  assert!(decode_with(&png, config).is_ok());
}

#[test]
fn test_image_data_size_mismatch() {
  let pixels = pattern_pixels(4, 4, 1, 0);
  let filtered = filter_image(&pixels, 4, 4, 1, 0);

  // the zlib data holds a row less than the header says.
  let short = png_from_filtered(4, 5, 0, &filtered, 6);
  assert_eq!(decode(&short), Err(PngError::NotEnoughImageData));

  // the zlib data holds more than the header says.
  let long = png_from_filtered(4, 3, 0, &filtered, 6);
  let err = decode(&long).unwrap_err();
  assert_eq!(err, PngError::TooMuchImageData);
  assert_eq!(err.kind(), PngErrorKind::Capacity);
}

#[test]
fn test_bad_filter_byte() {
  let mut filtered = filter_image(&[1, 2, 3, 4], 2, 2, 1, 0);
  filtered[3] = 5;
  let png = png_from_filtered(2, 2, 0, &filtered, 6);
  assert_eq!(decode(&png), Err(PngError::IllegalFilterType));
}

#[test]
fn test_truncation_is_an_error_not_a_panic() {
  for len in 0..TINY_RGBA.len() {
    assert!(decode(&TINY_RGBA[..len]).is_err(), "len {len}");
  }
}

#[test]
fn test_huge_dimensions() {
  let mut png = Vec::from(PNG_SIGNATURE);
  push_chunk(&mut png, *b"IHDR", &ihdr_data(65536, 65536, 8, 6, 0));
  push_chunk(&mut png, *b"IDAT", &[0x78, 0x01, 0x03, 0x00, 0, 0, 0, 1]);
  png.extend_from_slice(&IEND);
  let err = decode(&png).unwrap_err();
  assert_eq!(err, PngError::ImageTooLarge);
  assert_eq!(err.kind(), PngErrorKind::Capacity);
}

#[test]
fn test_zero_width() {
  let mut png = Vec::from(PNG_SIGNATURE);
  push_chunk(&mut png, *b"IHDR", &ihdr_data(0, 1, 8, 0, 0));
  assert_eq!(decode(&png), Err(PngError::IllegalDimensions));
}

#[test]
fn test_reader_matches_slice() {
  let pixels = pattern_pixels(33, 21, 4, 77);
  let png = png_from_filtered(33, 21, 6, &filter_image(&pixels, 33, 21, 4, 5), 6);
  let mut scratch = Scratch::new();
  let config = DecodeConfig::default();
  let from_slice = decode_png(&png, &mut scratch, None, &config).unwrap();
  let from_reader =
    decode_png_from_reader(std::io::Cursor::new(&png), &mut scratch, None, &config).unwrap();
  assert_eq!(from_slice, from_reader);

  let mut source = ReadSource::new(&png[..png.len() - 3]);
  assert_eq!(
    decode_png_from_source(&mut source, &mut scratch, None, &config),
    Err(PngError::UnexpectedEndOfInput)
  );
}

#[test]
fn test_scratch_reuse() {
  let mut scratch = Scratch::new();
  let config = DecodeConfig::default();
  let pixels = pattern_pixels(50, 50, 3, 5);
  let png = png_from_filtered(50, 50, 2, &filter_image(&pixels, 50, 50, 3, 4), 6);

  let first = decode_png(&png, &mut scratch, None, &config).unwrap();
  assert_eq!(scratch.claimed(), 0);
  let capacity = scratch.capacity();
  assert!(capacity > 0);

  let second = decode_png(&png, &mut scratch, None, &config).unwrap();
  assert_eq!(first, second);
  assert_eq!(scratch.capacity(), capacity);

  // a failed decode also leaves the scratch reset.
  assert!(decode_png(&png[..png.len() / 2], &mut scratch, None, &config).is_err());
  assert_eq!(scratch.claimed(), 0);

  // and the output doesn't borrow from the scratch at all.
  scratch.release();
  assert_eq!(scratch.capacity(), 0);
  assert_eq!(second.data, pixels);
}

#[test]
#[should_panic(expected = "scratch memory exhausted")]
fn test_scratch_limit_panics() {
  let pixels = pattern_pixels(64, 64, 4, 2);
  let png = png_from_filtered(64, 64, 6, &filter_image(&pixels, 64, 64, 4, 0), 6);
  let _ = decode_png(&png, &mut Scratch::with_limit(1024), None, &DecodeConfig::default());
}

#[test]
fn test_random_bytes_dont_panic() {
  for _ in 0..200 {
    let mut bytes = rand_bytes(300);
    let _ = decode(&bytes);
    // with a real header in front the decoder gets further.
    bytes.splice(0..0, TINY_RGBA[..33].iter().copied());
    let _ = decode(&bytes);
  }
}

#[test]
fn test_flipped_bits_dont_panic() {
  for i in 8..TINY_RGBA.len() {
    for bit in 0..8 {
      let mut png = TINY_RGBA.to_vec();
      png[i] ^= 1 << bit;
      let _ = decode_with(&png, DecodeConfig { verify_crc: false, ..Default::default() });
    }
  }
}

#[test]
fn test_no_panics_on_files() {
  for entry in walkdir::WalkDir::new("tests/").into_iter().filter_map(|e| e.ok()) {
    if entry.file_type().is_dir() {
      continue;
    }
    let path = entry.path();
    let bytes = match std::fs::read(path) {
      Ok(bytes) => bytes,
      Err(_) => continue,
    };
    let _ = decode(&bytes);
    let _ = png_get_header(&bytes);
    if path.extension().and_then(|s| s.to_str()) == Some("png") {
      println!("{}: {:?}", path.display(), png_get_header(&bytes));
    }
  }
}
