//! Neither function here throws on failure: an empty `Vec` signals "could not decompress", and
//! callers (the `container` module) fall back to treating the input as a literal raw block. This
//! mirrors a real-world quirk where a handful of PSARC chunks are stored uncompressed despite a
//! nonzero `z_len`.

use std::io::Read;

use flate2::read::{DeflateDecoder, GzDecoder, ZlibDecoder};

/// Tries three window-bit configurations in order: zlib header, raw deflate, then gzip
/// auto-detect. Returns the first one that reaches end-of-stream; on total failure returns an
/// empty `Vec`.
///
/// The decompressed output may come up shorter than `expected_size` if the stream legitimately
/// ends early; callers must cap the result to the entry's remaining byte budget themselves.
pub fn zlib_inflate(data: &[u8], expected_size: usize) -> Vec<u8> {
    if let Some(out) = try_zlib(data, expected_size) {
        return out;
    }
    if let Some(out) = try_deflate(data, expected_size) {
        return out;
    }
    if let Some(out) = try_gzip(data, expected_size) {
        return out;
    }
    Vec::new()
}

fn try_zlib(data: &[u8], expected_size: usize) -> Option<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::with_capacity(expected_size.min(1 << 20));
    decoder.read_to_end(&mut out).ok()?;
    Some(out)
}

fn try_deflate(data: &[u8], expected_size: usize) -> Option<Vec<u8>> {
    let mut decoder = DeflateDecoder::new(data);
    let mut out = Vec::with_capacity(expected_size.min(1 << 20));
    decoder.read_to_end(&mut out).ok()?;
    Some(out)
}

fn try_gzip(data: &[u8], expected_size: usize) -> Option<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::with_capacity(expected_size.min(1 << 20));
    decoder.read_to_end(&mut out).ok()?;
    Some(out)
}

/// Single-attempt LZMA-alone ("legacy", no .xz container) decode. Returns an empty `Vec` on
/// failure rather than propagating the error, for the same raw-fallback reason as `zlib_inflate`.
pub fn lzma_decompress(data: &[u8], expected_size: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(expected_size.min(1 << 20));
    let mut cursor = std::io::Cursor::new(data);
    match lzma_rs::lzma_decompress(&mut cursor, &mut out) {
        Ok(()) => out,
        Err(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn zlib_inflate_recovers_zlib_stream() {
        let mut enc = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        enc.write_all(b"hello world").unwrap();
        let compressed = enc.finish().unwrap();
        let out = zlib_inflate(&compressed, 11);
        assert_eq!(out, b"hello world");
    }

    #[test]
    fn zlib_inflate_recovers_raw_deflate_stream() {
        let mut enc = flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::default());
        enc.write_all(b"raw deflate payload").unwrap();
        let compressed = enc.finish().unwrap();
        let out = zlib_inflate(&compressed, 19);
        assert_eq!(out, b"raw deflate payload");
    }

    #[test]
    fn zlib_inflate_returns_empty_on_garbage() {
        let out = zlib_inflate(&[0xDE, 0xAD, 0xBE, 0xEF], 4);
        assert!(out.is_empty());
    }

    #[test]
    fn lzma_decompress_returns_empty_on_garbage() {
        let out = lzma_decompress(&[0, 1, 2, 3], 4);
        assert!(out.is_empty());
    }
}
