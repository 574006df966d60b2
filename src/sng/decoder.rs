//! Strips the SNG wrapper: a 24-byte little-endian header (magic, flags, IV) around an
//! AES-256-CTR ciphertext, optionally zlib-compressed once decrypted.

use byteorder::{ByteOrder, LittleEndian};

use crate::compression::zlib_inflate;
use crate::crypto::decrypt_sng;
use crate::error::{Error, Result};

const SNG_MAGIC: u32 = 0x0000_004A;
const WRAPPER_LEN: usize = 24;
const FLAG_ZLIB: u32 = 0x01;

/// Decrypts (and, if flagged, decompresses) a raw SNG asset's bytes into a plaintext buffer
/// ready for `parser::parse`.
pub fn unwrap_sng(data: &[u8]) -> Result<Vec<u8>> {
    if data.len() < WRAPPER_LEN {
        return Err(Error::ShortRead);
    }

    let magic = LittleEndian::read_u32(&data[0..4]);
    if magic != SNG_MAGIC {
        return Err(Error::CryptoFailure {
            stage: "sng wrapper magic check",
        });
    }
    let flags = LittleEndian::read_u32(&data[4..8]);
    let mut iv = [0u8; 16];
    iv.copy_from_slice(&data[8..24]);

    let plaintext = decrypt_sng(&data[WRAPPER_LEN..], &iv)?;

    if flags & FLAG_ZLIB != 0 {
        if plaintext.len() < 4 {
            return Err(Error::ShortRead);
        }
        let uncompressed_size = LittleEndian::read_u32(&plaintext[0..4]) as usize;
        let inflated = zlib_inflate(&plaintext[4..], uncompressed_size);
        if inflated.is_empty() && uncompressed_size != 0 {
            return Err(Error::DecompressionFailure);
        }
        Ok(inflated)
    } else {
        Ok(plaintext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SNG_KEY;
    use aes::cipher::{KeyIvInit, StreamCipher};
    use aes::Aes256;
    use std::io::Write;

    type SngCtr = ctr::Ctr128BE<Aes256>;

    fn wrap(plaintext: &[u8], iv: [u8; 16], flags: u32) -> Vec<u8> {
        let mut buf = plaintext.to_vec();
        let mut cipher = SngCtr::new_from_slices(&SNG_KEY, &iv).unwrap();
        cipher.apply_keystream(&mut buf);

        let mut out = Vec::with_capacity(WRAPPER_LEN + buf.len());
        out.extend_from_slice(&SNG_MAGIC.to_le_bytes());
        out.extend_from_slice(&flags.to_le_bytes());
        out.extend_from_slice(&iv);
        out.extend_from_slice(&buf);
        out
    }

    #[test]
    fn unwraps_uncompressed_payload() {
        let iv = [3u8; 16];
        let plaintext = b"plain sng bytes";
        let wrapped = wrap(plaintext, iv, 0);
        let out = unwrap_sng(&wrapped).unwrap();
        assert_eq!(out, plaintext);
    }

    #[test]
    fn unwraps_zlib_compressed_payload() {
        let iv = [9u8; 16];
        let raw = b"section data that gets zlib compressed inside the sng wrapper";
        let mut enc = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        enc.write_all(raw).unwrap();
        let compressed = enc.finish().unwrap();

        let mut inner = Vec::new();
        inner.extend_from_slice(&(raw.len() as u32).to_le_bytes());
        inner.extend_from_slice(&compressed);

        let wrapped = wrap(&inner, iv, 1);
        let out = unwrap_sng(&wrapped).unwrap();
        assert_eq!(out, raw);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut buf = vec![0u8; WRAPPER_LEN];
        buf[0] = 0xAA;
        let err = unwrap_sng(&buf).unwrap_err();
        assert!(matches!(err, Error::CryptoFailure { .. }));
    }

    #[test]
    fn rejects_short_input() {
        let err = unwrap_sng(&[0u8; 4]).unwrap_err();
        assert!(matches!(err, Error::ShortRead));
    }
}
