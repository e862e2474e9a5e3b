//! Key types with secure memory handling.
//!
//! Key material zeroizes its memory on drop so it does not outlive the
//! operation that needed it.

use std::fmt;

use rand::{rngs::OsRng, RngCore};
use subtle::{Choice, ConstantTimeEq};
use zeroize::{Zeroize, ZeroizeOnDrop};

use sealpipe_common::{Error, Result};

/// Length of encryption keys in bytes (256-bit).
pub const KEY_LENGTH: usize = 32;

/// Symmetric key used to seal and open a stream.
///
/// Either decoded from a caller-supplied hex string or derived from a
/// password with [`crate::kdf::derive_key`].
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey {
    key: [u8; KEY_LENGTH],
}

impl SecretKey {
    /// Create a key from raw bytes.
    pub fn from_bytes(key: [u8; KEY_LENGTH]) -> Self {
        Self { key }
    }

    /// Create a key from a byte slice.
    ///
    /// # Errors
    /// - Returns `InvalidKey` if `bytes` is not exactly KEY_LENGTH long
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KEY_LENGTH {
            return Err(Error::InvalidKey(format!(
                "expected {} bytes, got {}",
                KEY_LENGTH,
                bytes.len()
            )));
        }
        let mut key = [0u8; KEY_LENGTH];
        key.copy_from_slice(bytes);
        Ok(Self { key })
    }

    /// Decode a key from its hexadecimal form.
    ///
    /// Surrounding whitespace is ignored so the output of `derive` can be
    /// pasted back in verbatim.
    ///
    /// # Errors
    /// - Returns `InvalidKey` if the string is not hex or does not decode
    ///   to exactly KEY_LENGTH bytes
    pub fn from_hex(encoded: &str) -> Result<Self> {
        let mut bytes = hex::decode(encoded.trim())
            .map_err(|e| Error::InvalidKey(format!("key is not a hex value: {}", e)))?;
        let key = Self::from_slice(&bytes);
        bytes.zeroize();
        key
    }

    /// Encode the key as lowercase hex.
    ///
    /// # Security
    /// The returned string holds the key in the clear. Callers should write
    /// it out and drop it.
    pub fn to_hex(&self) -> String {
        hex::encode(self.key)
    }

    /// Generate a random key.
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_LENGTH];
        OsRng.fill_bytes(&mut key);
        Self { key }
    }

    /// Get the key bytes.
    ///
    /// # Security
    /// The returned slice should be used immediately and not stored.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.key
    }
}

impl ConstantTimeEq for SecretKey {
    fn ct_eq(&self, other: &Self) -> Choice {
        self.key.ct_eq(&other.key)
    }
}

impl PartialEq for SecretKey {
    fn eq(&self, other: &Self) -> bool {
        self.ct_eq(other).into()
    }
}

impl Eq for SecretKey {}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey([REDACTED])")
    }
}
