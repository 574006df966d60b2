//! Fixed embedded keys and the two cipher modes this format uses: AES-256-CFB128 for the PSARC
//! table of contents, and AES-256-CTR for the SNG payload.

use aes::cipher::{AsyncStreamCipher, KeyIvInit, StreamCipher};
use aes::Aes256;

use crate::error::{Error, Result};

pub const PSARC_KEY: [u8; 32] = [
    0xC5, 0x3D, 0xB2, 0x38, 0x70, 0xA1, 0xA2, 0xF7, 0x1C, 0xAE, 0x64, 0x06, 0x1F, 0xDD, 0x0E, 0x11,
    0x57, 0x30, 0x9D, 0xC8, 0x52, 0x04, 0xD4, 0xC5, 0xBF, 0xDF, 0x25, 0x09, 0x0D, 0xF2, 0x57, 0x2C,
];

/// The TOC is always decrypted with an all-zero IV.
pub const PSARC_IV: [u8; 16] = [0; 16];

pub const SNG_KEY: [u8; 32] = [
    0xCB, 0x64, 0x8D, 0xF3, 0xD1, 0x2A, 0x16, 0xBF, 0x71, 0x70, 0x14, 0x14, 0xE6, 0x96, 0x19, 0xEC,
    0x17, 0x1C, 0xCA, 0x5D, 0x2A, 0x14, 0x2E, 0x3E, 0x59, 0xDE, 0x7A, 0xDD, 0xA1, 0x8A, 0x3A, 0x30,
];

type CfbDec = cfb_mode::Decryptor<Aes256>;
type SngCtr = ctr::Ctr128BE<Aes256>;

/// Decrypts `data` (the PSARC TOC ciphertext) in place with AES-256-CFB128, no padding.
///
/// The input is zero-padded up to a 16-byte multiple before decryption and the output is
/// truncated back to the original length.
pub fn decrypt_toc(data: &[u8]) -> Result<Vec<u8>> {
    let original_len = data.len();
    let padded_len = (original_len + 15) / 16 * 16;
    let mut buf = vec![0u8; padded_len];
    buf[..original_len].copy_from_slice(data);

    let cipher = CfbDec::new_from_slices(&PSARC_KEY, &PSARC_IV)
        .map_err(|_| Error::CryptoFailure { stage: "psarc toc key/iv setup" })?;
    cipher.decrypt(&mut buf);
    buf.truncate(original_len);
    Ok(buf)
}

/// Decrypts an SNG payload in place with AES-256-CTR, using the IV carried in the SNG wrapper.
pub fn decrypt_sng(data: &[u8], iv: &[u8; 16]) -> Result<Vec<u8>> {
    let mut buf = data.to_vec();
    let mut cipher = SngCtr::new_from_slices(&SNG_KEY, iv)
        .map_err(|_| Error::CryptoFailure { stage: "sng key/iv setup" })?;
    cipher.apply_keystream(&mut buf);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toc_decrypt_roundtrips_with_cfb_encryptor() {
        type CfbEnc = cfb_mode::Encryptor<Aes256>;
        let plaintext = b"hello toc entries, not a multiple of 16 bytes!";
        let cipher = CfbEnc::new_from_slices(&PSARC_KEY, &PSARC_IV).unwrap();
        let mut padded = plaintext.to_vec();
        padded.resize((padded.len() + 15) / 16 * 16, 0);
        cipher.encrypt(&mut padded);
        padded.truncate(plaintext.len());

        let decrypted = decrypt_toc(&padded).unwrap();
        assert_eq!(&decrypted, plaintext);
    }

    #[test]
    fn sng_decrypt_roundtrips_with_ctr_encryptor() {
        let iv = [7u8; 16];
        let plaintext = b"sng payload bytes";
        let mut buf = plaintext.to_vec();
        let mut cipher = SngCtr::new_from_slices(&SNG_KEY, &iv).unwrap();
        cipher.apply_keystream(&mut buf);

        let decrypted = decrypt_sng(&buf, &iv).unwrap();
        assert_eq!(&decrypted, plaintext);
    }
}
