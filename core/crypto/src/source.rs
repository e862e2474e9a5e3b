//! Where the key for an operation comes from.

use tracing::warn;

use crate::kdf::{derive_key, KdfParams};
use crate::keys::SecretKey;
use sealpipe_common::{Error, Result, SensitiveBytes};

/// Key source: a raw key, or a password to derive one from.
#[derive(Debug, Clone)]
pub enum KeySource {
    /// Caller-supplied 256-bit key.
    RawKey(SecretKey),
    /// Password and salt, stretched with `kdf` when sealing.
    Password {
        /// Password to stretch.
        password: SensitiveBytes,
        /// Caller-supplied salt; empty when none was given.
        salt: SensitiveBytes,
        /// Parameters recorded in the header of a new stream.
        kdf: KdfParams,
    },
}

impl KeySource {
    /// Build a key source from optional caller arguments.
    ///
    /// Exactly one of `password` and `key_hex` must be given. A missing
    /// salt is treated as empty.
    ///
    /// # Errors
    /// - `Usage` if both or neither of password and key are given, or a
    ///   salt accompanies a raw key
    /// - `InvalidKey` if `key_hex` is not 32 bytes of hex
    pub fn from_args(
        password: Option<SensitiveBytes>,
        salt: Option<SensitiveBytes>,
        key_hex: Option<&str>,
        kdf: KdfParams,
    ) -> Result<Self> {
        match (password, key_hex) {
            (Some(_), Some(_)) => Err(Error::Usage(
                "cannot use a password and a key together".to_string(),
            )),
            (None, None) => Err(Error::Usage(
                "missing key source: supply a password or a key".to_string(),
            )),
            (None, Some(encoded)) => {
                if salt.is_some() {
                    return Err(Error::Usage(
                        "a salt can only be used with a password".to_string(),
                    ));
                }
                Ok(KeySource::RawKey(SecretKey::from_hex(encoded)?))
            }
            (Some(password), None) => {
                let salt = salt.unwrap_or_else(|| SensitiveBytes::new(Vec::new()));
                if salt.is_empty() {
                    warn!("Deriving key with an empty salt");
                }
                Ok(KeySource::Password {
                    password,
                    salt,
                    kdf,
                })
            }
        }
    }

    /// KDF parameters to record in a new stream header.
    pub fn kdf(&self) -> Option<KdfParams> {
        match self {
            KeySource::RawKey(_) => None,
            KeySource::Password { kdf, .. } => Some(*kdf),
        }
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            KeySource::RawKey(_) => "key",
            KeySource::Password { .. } => "password",
        }
    }

    /// Produce the key, deriving it with this source's own KDF parameters.
    pub fn resolve(&self) -> Result<SecretKey> {
        match self {
            KeySource::RawKey(key) => Ok(key.clone()),
            KeySource::Password {
                password,
                salt,
                kdf,
            } => derive_key(password.as_bytes(), salt.as_bytes(), kdf),
        }
    }
}
