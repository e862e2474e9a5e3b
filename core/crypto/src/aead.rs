//! Authenticated encryption using XChaCha20-Poly1305.
//!
//! XChaCha20-Poly1305 provides both confidentiality and authenticity. The
//! streaming layer picks every nonce itself; this module only seals and
//! opens single chunks.

use chacha20poly1305::{
    aead::{generic_array::GenericArray, Aead, KeyInit, Payload},
    XChaCha20Poly1305, XNonce,
};

use crate::keys::SecretKey;
use sealpipe_common::{Error, Result};

/// Nonce size for XChaCha20-Poly1305 (24 bytes).
pub const NONCE_SIZE: usize = 24;

/// Authentication tag size (16 bytes).
pub const TAG_SIZE: usize = 16;

/// Chunk cipher keyed once per stream.
pub struct ChunkCipher {
    cipher: XChaCha20Poly1305,
}

impl ChunkCipher {
    /// Create a cipher for `key`.
    pub fn new(key: &SecretKey) -> Self {
        Self {
            cipher: XChaCha20Poly1305::new(GenericArray::from_slice(key.as_bytes())),
        }
    }

    /// Encrypt and authenticate one chunk.
    ///
    /// # Postconditions
    /// - Returns ciphertext || tag, `plaintext.len() + TAG_SIZE` bytes
    /// - The tag covers the ciphertext, the nonce and `aad`
    ///
    /// # Security
    /// - Caller is responsible for nonce uniqueness under this key
    pub fn seal(&self, nonce: &[u8; NONCE_SIZE], aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
        self.cipher
            .encrypt(XNonce::from_slice(nonce), Payload { msg: plaintext, aad })
            .map_err(|_| Error::InvalidFormat("chunk could not be sealed".to_string()))
    }

    /// Verify and decrypt one chunk.
    ///
    /// No plaintext is returned unless the tag verifies.
    ///
    /// # Errors
    /// - Returns `Authentication { chunk }` if the tag does not verify
    ///   (wrong key, tampered data, wrong position or final flag)
    pub fn open(
        &self,
        nonce: &[u8; NONCE_SIZE],
        aad: &[u8],
        ciphertext: &[u8],
        chunk: u64,
    ) -> Result<Vec<u8>> {
        if ciphertext.len() < TAG_SIZE {
            return Err(Error::Authentication { chunk });
        }

        self.cipher
            .decrypt(XNonce::from_slice(nonce), Payload { msg: ciphertext, aad })
            .map_err(|_| Error::Authentication { chunk })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KEY_LENGTH;
    use sealpipe_common::ErrorKind;

    fn cipher(byte: u8) -> ChunkCipher {
        ChunkCipher::new(&SecretKey::from_bytes([byte; KEY_LENGTH]))
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let c = cipher(42);
        let nonce = [1u8; NONCE_SIZE];

        let sealed = c.seal(&nonce, b"aad", b"Hello, World!").unwrap();
        assert_eq!(sealed.len(), 13 + TAG_SIZE);

        let opened = c.open(&nonce, b"aad", &sealed, 0).unwrap();
        assert_eq!(opened, b"Hello, World!");
    }

    #[test]
    fn test_empty_plaintext() {
        let c = cipher(42);
        let nonce = [1u8; NONCE_SIZE];

        let sealed = c.seal(&nonce, b"", b"").unwrap();
        assert_eq!(sealed.len(), TAG_SIZE);
        assert!(c.open(&nonce, b"", &sealed, 0).unwrap().is_empty());
    }

    #[test]
    fn test_wrong_key_fails() {
        let nonce = [1u8; NONCE_SIZE];
        let sealed = cipher(1).seal(&nonce, b"", b"Secret data").unwrap();

        let err = cipher(2).open(&nonce, b"", &sealed, 7).unwrap_err();
        assert!(matches!(err, Error::Authentication { chunk: 7 }));
    }

    #[test]
    fn test_wrong_nonce_fails() {
        let c = cipher(42);
        let sealed = c.seal(&[1u8; NONCE_SIZE], b"", b"data").unwrap();

        assert!(c.open(&[2u8; NONCE_SIZE], b"", &sealed, 0).is_err());
    }

    #[test]
    fn test_wrong_aad_fails() {
        let c = cipher(42);
        let nonce = [1u8; NONCE_SIZE];
        let sealed = c.seal(&nonce, b"header-a", b"data").unwrap();

        assert!(c.open(&nonce, b"header-b", &sealed, 0).is_err());
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let c = cipher(42);
        let nonce = [1u8; NONCE_SIZE];
        let mut sealed = c.seal(&nonce, b"", b"Important data").unwrap();
        sealed[5] ^= 0xFF;

        let err = c.open(&nonce, b"", &sealed, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
    }

    #[test]
    fn test_short_ciphertext_fails() {
        let c = cipher(42);
        let err = c.open(&[0u8; NONCE_SIZE], b"", &[0u8; TAG_SIZE - 1], 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
    }
}
