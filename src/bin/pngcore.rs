//! Prints what's in some PNG files: the header, each chunk, and how the decode
//! went.

use pngcore::{
  png::{decode_png, png_get_header, DecodeConfig, PngRawChunkIter},
  Diagnostic, Scratch,
};

fn main() {
  let args: Vec<String> = std::env::args().skip(1).collect();
  if args.is_empty() {
    eprintln!("usage: pngcore <file.png>...");
    std::process::exit(2);
  }
  let mut scratch = Scratch::new();
  let mut failures = 0;
  for file_arg in args.iter() {
    let path = std::path::Path::new(file_arg);
    print!("Reading `{}`... ", path.display());
    let bytes = match std::fs::read(path) {
      Ok(bytes) => {
        println!("got {} bytes.", bytes.len());
        bytes
      }
      Err(e) => {
        println!("{e}");
        failures += 1;
        continue;
      }
    };
    match png_get_header(&bytes) {
      Ok(info) => println!("  header: {info:?}"),
      Err(e) => println!("  header: {e}"),
    }
    for (n, chunk) in PngRawChunkIter::new(&bytes).enumerate() {
      let crc = if chunk.crc_ok() { "ok" } else { "BAD" };
      println!("  {n}: {:?}, {} bytes, crc {crc}", chunk.tag, chunk.data.len());
    }
    let mut diagnostic = Diagnostic::new();
    match decode_png(&bytes, &mut scratch, Some(&mut diagnostic), &DecodeConfig::default()) {
      Ok(image) => println!(
        "  decoded: {}x{}, {} channel(s), {} bytes",
        image.width,
        image.height,
        image.channels,
        image.data.len()
      ),
      Err(e) => {
        failures += 1;
        println!("  decode failed: {} ({:?})", diagnostic.message().unwrap_or("?"), e.kind());
      }
    }
  }
  if failures > 0 {
    std::process::exit(1);
  }
}
