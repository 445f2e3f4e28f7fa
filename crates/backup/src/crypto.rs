use aes::Aes256;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use dbkit_core::error::{CryptoError, Result};
use rand::RngCore;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

const IV_LEN: usize = 16;

/// Encrypts `plaintext` with AES-256-CBC under a fresh random IV,
/// prepending the IV to the returned ciphertext (spec.md §4.C10).
#[must_use]
pub(crate) fn encrypt(key: &[u8; 32], plaintext: &[u8]) -> Vec<u8> {
    let mut iv = [0u8; IV_LEN];
    rand::thread_rng().fill_bytes(&mut iv);
    let ciphertext = Aes256CbcEnc::new(key.into(), &iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext);
    let mut out = Vec::with_capacity(IV_LEN + ciphertext.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&ciphertext);
    out
}

/// Reverses [`encrypt`]: splits the leading IV off `stored` and decrypts
/// the remainder.
pub(crate) fn decrypt(key: &[u8; 32], stored: &[u8]) -> Result<Vec<u8>> {
    if stored.len() < IV_LEN {
        return Err(CryptoError { message: "encrypted artifact shorter than an IV".to_string() }.into());
    }
    let (iv, ciphertext) = stored.split_at(IV_LEN);
    Aes256CbcDec::new(key.as_slice().into(), iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|e| CryptoError { message: format!("decryption failed: {e}") }.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_then_decrypt_recovers_plaintext() {
        let key = [3u8; 32];
        let ciphertext = encrypt(&key, b"secret rows");
        assert_eq!(decrypt(&key, &ciphertext).unwrap(), b"secret rows");
    }

    #[test]
    fn two_encryptions_of_the_same_plaintext_differ() {
        let key = [9u8; 32];
        assert_ne!(encrypt(&key, b"same input"), encrypt(&key, b"same input"));
    }
}
