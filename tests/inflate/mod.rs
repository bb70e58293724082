use pngcore::{
  decompress::{adler32, deflate_decompress, zlib_decompress, Inflater, ZlibOptions},
  PngError,
};

use super::rand_bytes;

fn sample_inputs() -> Vec<Vec<u8>> {
  let text = b"It is a truth universally acknowledged, that a single man in possession \
    of a good fortune, must be in want of a wife. "
    .repeat(40);
  let mut ramp = Vec::new();
  for i in 0..70_000_u32 {
    ramp.push((i % 251) as u8 ^ (i >> 9) as u8);
  }
  vec![
    Vec::new(),
    vec![0x42],
    vec![0; 100_000],
    text,
    ramp,
    rand_bytes(1),
    rand_bytes(300),
    rand_bytes(70_000),
  ]
}

#[test]
fn test_zlib_matches_miniz() {
  for data in sample_inputs() {
    for level in [0, 1, 2, 6, 9, 10] {
      let zlib = miniz_oxide::deflate::compress_to_vec_zlib(&data, level);
      let mut out = Vec::new();
      zlib_decompress(&zlib, &mut out, ZlibOptions::default())
        .unwrap_or_else(|e| panic!("len {}, level {level}: {e:?}", data.len()));
      assert!(out == data, "len {}, level {level}", data.len());
    }
  }
}

#[test]
fn test_raw_deflate_matches_miniz() {
  for data in sample_inputs() {
    for level in [0, 1, 6, 10] {
      let deflate = miniz_oxide::deflate::compress_to_vec(&data, level);
      let mut out = Vec::new();
      deflate_decompress(&deflate, &mut out).unwrap();
      assert!(out == data, "len {}, level {level}", data.len());
    }
  }
}

#[test]
fn test_appends_to_existing_output() {
  let data = b"abcabcabcabcabcabcabcabc hello hello hello".to_vec();
  let zlib = miniz_oxide::deflate::compress_to_vec_zlib(&data, 6);
  let mut out = b"prefix:".to_vec();
  zlib_decompress(&zlib, &mut out, ZlibOptions::default()).unwrap();
  assert_eq!(&out[..7], b"prefix:");
  assert_eq!(&out[7..], &data[..]);
}

#[test]
fn test_output_limit() {
  let data = rand_bytes(5000);
  for level in [0, 6] {
    let zlib = miniz_oxide::deflate::compress_to_vec_zlib(&data, level);

    let exact = ZlibOptions { output_limit: Some(data.len()), ..Default::default() };
    let mut out = Vec::new();
    zlib_decompress(&zlib, &mut out, exact).unwrap();
    assert_eq!(out, data);

    let short = ZlibOptions { output_limit: Some(data.len() - 1), ..Default::default() };
    let mut out = Vec::new();
    assert_eq!(zlib_decompress(&zlib, &mut out, short), Err(PngError::TooMuchImageData));
    assert!(out.len() < data.len());
  }
}

#[test]
fn test_adler_trailer() {
  let data = b"Wikipedia".to_vec();
  assert_eq!(adler32(&data), 0x11E6_0398);
  let mut zlib = miniz_oxide::deflate::compress_to_vec_zlib(&data, 6);
  assert_eq!(&zlib[zlib.len() - 4..], &0x11E6_0398_u32.to_be_bytes());

  let last = zlib.len() - 1;
  zlib[last] ^= 0x10;
  let mut out = Vec::new();
  assert_eq!(
    zlib_decompress(&zlib, &mut out, ZlibOptions::default()),
    Err(PngError::BadAdlerChecksum)
  );
  let mut out = Vec::new();
  let unchecked = ZlibOptions { verify_adler32: false, ..Default::default() };
  zlib_decompress(&zlib, &mut out, unchecked).unwrap();
  assert_eq!(out, data);

  // with no checking, a missing trailer is fine too.
  let mut out = Vec::new();
  zlib_decompress(&zlib[..zlib.len() - 4], &mut out, unchecked).unwrap();
  assert_eq!(out, data);
}

#[test]
fn test_bad_headers() {
  let mut out = Vec::new();
  assert_eq!(zlib_decompress(&[], &mut out, ZlibOptions::default()), Err(PngError::InsufficientData));
  assert_eq!(
    zlib_decompress(&[0x78], &mut out, ZlibOptions::default()),
    Err(PngError::InsufficientData)
  );
  // bad check bits
  assert_eq!(
    zlib_decompress(&[0x78, 0x9D, 3, 0], &mut out, ZlibOptions::default()),
    Err(PngError::BadZlibHeader)
  );
  // preset dictionary
  assert_eq!(
    zlib_decompress(&[0x78, 0xBB, 3, 0], &mut out, ZlibOptions::default()),
    Err(PngError::BadZlibHeader)
  );
}

#[test]
fn test_inflater_blocks() {
  let data = rand_bytes(200_000);
  // level 0 makes stored blocks of at most 64k each.
  let deflate = miniz_oxide::deflate::compress_to_vec(&data, 0);
  let mut inflater = Inflater::new(&deflate);
  assert!(!inflater.final_block_seen());
  let mut out = Vec::new();
  inflater.inflate_into(&mut out).unwrap();
  assert!(inflater.final_block_seen());
  assert!(out == data);
}

#[test]
fn test_truncated_streams_are_errors() {
  let data = b"the quick brown fox jumps over the lazy dog, the quick brown fox".repeat(20);
  for level in [0, 1, 6] {
    let zlib = miniz_oxide::deflate::compress_to_vec_zlib(&data, level);
    for len in 0..zlib.len() {
      let mut out = Vec::new();
      assert!(
        zlib_decompress(&zlib[..len], &mut out, ZlibOptions::default()).is_err(),
        "level {level}, len {len}"
      );
    }
  }
}

#[test]
fn test_random_input_doesnt_panic() {
  for _ in 0..500 {
    let bytes = rand_bytes(200);
    let mut out = Vec::new();
    let _ = deflate_decompress(&bytes, &mut out);
    let mut out = Vec::new();
    let mut zlib = vec![0x78, 0x9C];
    zlib.extend_from_slice(&bytes);
    let _ = zlib_decompress(&zlib, &mut out, ZlibOptions::default());
  }
}

#[test]
fn test_corrupted_streams_dont_panic() {
  let data = b"abracadabra, abracadabra, abracadabra! ".repeat(50);
  let zlib = miniz_oxide::deflate::compress_to_vec_zlib(&data, 9);
  for i in 2..zlib.len() {
    for bit in 0..8 {
      let mut broken = zlib.clone();
      broken[i] ^= 1 << bit;
      let mut out = Vec::new();
      let _ = zlib_decompress(&broken, &mut out, ZlibOptions::default());
    }
  }
}
