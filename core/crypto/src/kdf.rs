//! Password-based key derivation.
//!
//! Keys are stretched with a memory-hard function so that guessing
//! low-entropy passwords stays expensive. scrypt is the default; Argon2id
//! is available for callers that prefer it. The chosen parameters travel in
//! the stream header so a stream can always be reopened with the cost it
//! was sealed with.

use std::fmt;

use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroize;

use crate::keys::{SecretKey, KEY_LENGTH};
use sealpipe_common::{Error, Result};

/// scrypt CPU/memory cost used by streams sealed with the legacy profile.
pub const SCRYPT_COST_LEGACY: u32 = 16384;

/// scrypt CPU/memory cost used by the default profile.
pub const SCRYPT_COST: u32 = 32768;

/// scrypt block size.
pub const SCRYPT_BLOCK_SIZE: u32 = 8;

/// scrypt parallelism.
pub const SCRYPT_PARALLELISM: u32 = 1;

/// Most memory a stream header may make key derivation allocate (512 MiB).
pub const MAX_KDF_MEMORY: u64 = 512 * 1024 * 1024;

/// Parameters for password key derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "lowercase")]
pub enum KdfParams {
    /// scrypt with cost factor N, block size r and parallelism p.
    Scrypt {
        /// CPU/memory cost N; must be a power of two >= 2.
        cost: u32,
        /// Block size r.
        block_size: u32,
        /// Parallelism p.
        parallelism: u32,
    },
    /// Argon2id.
    Argon2id {
        /// Memory cost in KiB (e.g., 65536 = 64 MiB).
        memory_cost: u32,
        /// Number of iterations.
        time_cost: u32,
        /// Degree of parallelism.
        parallelism: u32,
    },
}

impl KdfParams {
    /// scrypt with N = 32768, r = 8, p = 1.
    pub fn scrypt() -> Self {
        Self::Scrypt {
            cost: SCRYPT_COST,
            block_size: SCRYPT_BLOCK_SIZE,
            parallelism: SCRYPT_PARALLELISM,
        }
    }

    /// scrypt with N = 16384, r = 8, p = 1.
    ///
    /// Matches streams and keys produced by earlier releases.
    pub fn scrypt_legacy() -> Self {
        Self::Scrypt {
            cost: SCRYPT_COST_LEGACY,
            block_size: SCRYPT_BLOCK_SIZE,
            parallelism: SCRYPT_PARALLELISM,
        }
    }

    /// Argon2id parameters suitable for interactive use.
    ///
    /// These parameters provide a balance between security and usability,
    /// targeting approximately 0.5-1 second of derivation time.
    pub fn interactive() -> Self {
        Self::Argon2id {
            memory_cost: 65536, // 64 MiB
            time_cost: 3,
            parallelism: 4,
        }
    }

    /// Argon2id parameters for sensitive data.
    ///
    /// Higher security parameters that may take several seconds.
    pub fn sensitive() -> Self {
        Self::Argon2id {
            memory_cost: 262144, // 256 MiB
            time_cost: 4,
            parallelism: 4,
        }
    }

    /// Moderate Argon2id parameters for constrained devices.
    pub fn moderate() -> Self {
        Self::Argon2id {
            memory_cost: 32768, // 32 MiB
            time_cost: 3,
            parallelism: 2,
        }
    }

    /// Bytes of working memory a derivation with these parameters needs.
    ///
    /// scrypt holds `128 * N * r` bytes per lane and runs lanes one after
    /// another; Argon2id holds `m` KiB.
    pub fn memory_bytes(&self) -> u64 {
        match *self {
            KdfParams::Scrypt {
                cost, block_size, ..
            } => 128 * u64::from(cost) * u64::from(block_size),
            KdfParams::Argon2id { memory_cost, .. } => 1024 * u64::from(memory_cost),
        }
    }

    /// Whether these parameters stay within what a stream header may ask
    /// for. Headers are unauthenticated until the key is derived, so this
    /// bounds the memory and time a forged header can make the decryptor
    /// spend.
    pub fn within_limits(&self) -> bool {
        if self.memory_bytes() > MAX_KDF_MEMORY {
            return false;
        }
        match *self {
            KdfParams::Scrypt { parallelism, .. } => parallelism <= 16,
            KdfParams::Argon2id {
                time_cost,
                parallelism,
                ..
            } => time_cost <= 64 && parallelism <= 64,
        }
    }

    /// Short algorithm name.
    pub fn algorithm(&self) -> &'static str {
        match self {
            KdfParams::Scrypt { .. } => "scrypt",
            KdfParams::Argon2id { .. } => "argon2id",
        }
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::scrypt()
    }
}

impl fmt::Display for KdfParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KdfParams::Scrypt {
                cost,
                block_size,
                parallelism,
            } => write!(f, "scrypt(N={}, r={}, p={})", cost, block_size, parallelism),
            KdfParams::Argon2id {
                memory_cost,
                time_cost,
                parallelism,
            } => write!(
                f,
                "argon2id(m={} KiB, t={}, p={})",
                memory_cost, time_cost, parallelism
            ),
        }
    }
}

/// Derive a key from a password and salt.
///
/// # Preconditions
/// - `params` must describe a valid configuration of its algorithm
///
/// # Postconditions
/// - Returns a KEY_LENGTH key
/// - The derived key is deterministic given the same inputs
///
/// # Errors
/// - Returns `KeyDerivation` if the parameters are invalid (scrypt cost not
///   a power of two >= 2, zero block size or parallelism, Argon2 salt
///   shorter than 8 bytes) or the primitive fails
///
/// # Security
/// - Empty passwords are accepted; policy is the caller's
/// - Password and salt are not stored or logged
pub fn derive_key(password: &[u8], salt: &[u8], params: &KdfParams) -> Result<SecretKey> {
    debug!(kdf = %params, "Deriving key");

    let mut key_bytes = [0u8; KEY_LENGTH];
    match *params {
        KdfParams::Scrypt {
            cost,
            block_size,
            parallelism,
        } => {
            let log_n = scrypt_log_n(cost)?;
            if block_size == 0 || parallelism == 0 {
                return Err(Error::KeyDerivation(
                    "scrypt block size and parallelism must be positive".to_string(),
                ));
            }
            let scrypt_params = scrypt::Params::new(log_n, block_size, parallelism, KEY_LENGTH)
                .map_err(|e| Error::KeyDerivation(format!("Invalid scrypt parameters: {}", e)))?;
            scrypt::scrypt(password, salt, &scrypt_params, &mut key_bytes)
                .map_err(|e| Error::KeyDerivation(format!("Key derivation failed: {}", e)))?;
        }
        KdfParams::Argon2id {
            memory_cost,
            time_cost,
            parallelism,
        } => {
            let argon2_params = Params::new(memory_cost, time_cost, parallelism, Some(KEY_LENGTH))
                .map_err(|e| Error::KeyDerivation(format!("Invalid KDF parameters: {}", e)))?;

            let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);
            argon2
                .hash_password_into(password, salt, &mut key_bytes)
                .map_err(|e| Error::KeyDerivation(format!("Key derivation failed: {}", e)))?;
        }
    }

    let key = SecretKey::from_bytes(key_bytes);
    key_bytes.zeroize();
    Ok(key)
}

/// Convert an scrypt cost factor N into log2(N).
fn scrypt_log_n(cost: u32) -> Result<u8> {
    if cost < 2 || !cost.is_power_of_two() {
        return Err(Error::KeyDerivation(format!(
            "scrypt cost must be a power of two >= 2, got {}",
            cost
        )));
    }
    Ok(cost.trailing_zeros() as u8)
}
