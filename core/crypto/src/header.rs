//! Stream header.
//!
//! Every sealed stream starts with a fixed-size header:
//!
//! ```text
//! magic "SPIP" (4) | version (1) | kdf tag (1) | kdf params 3 x u32 BE (12)
//!   | chunk size u32 BE (4) | nonce prefix (15)
//! ```
//!
//! The header records how the key was obtained (raw, or which password KDF
//! with which cost) but never the salt. Its bytes are bound to every chunk
//! as associated data, so editing any header field breaks authentication.

use std::io::Read;

use rand::{rngs::OsRng, RngCore};
use serde::{Serialize, Serializer};

use crate::aead::NONCE_SIZE;
use crate::kdf::KdfParams;
use crate::stream::read_full;
use sealpipe_common::{Error, Result};

/// Magic bytes identifying a sealed stream.
pub const MAGIC: [u8; 4] = *b"SPIP";

/// Current stream format version.
pub const FORMAT_VERSION: u8 = 1;

/// Length of the per-stream random nonce prefix.
pub const NONCE_PREFIX_SIZE: usize = 15;

/// Encoded header size in bytes.
pub const HEADER_SIZE: usize = 4 + 1 + 1 + 12 + 4 + NONCE_PREFIX_SIZE;

/// Largest chunk size a stream may declare (16 MiB).
pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;

const KDF_TAG_RAW: u8 = 0;
const KDF_TAG_SCRYPT: u8 = 1;
const KDF_TAG_ARGON2ID: u8 = 2;

/// Parsed stream header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamHeader {
    /// Format version.
    pub version: u8,
    /// Password KDF the key came from, or `None` for a raw key.
    pub kdf: Option<KdfParams>,
    /// Plaintext bytes per non-final chunk.
    pub chunk_size: u32,
    /// Random prefix shared by every chunk nonce of this stream.
    #[serde(serialize_with = "serialize_hex")]
    pub nonce_prefix: [u8; NONCE_PREFIX_SIZE],
}

/// Check that `chunk_size` can be recorded in a header.
///
/// # Errors
/// - Returns `Usage` if `chunk_size` is zero or above MAX_CHUNK_SIZE
pub fn check_chunk_size(chunk_size: usize) -> Result<()> {
    if chunk_size == 0 || chunk_size > MAX_CHUNK_SIZE {
        return Err(Error::Usage(format!(
            "chunk size must be between 1 and {} bytes, got {}",
            MAX_CHUNK_SIZE, chunk_size
        )));
    }
    Ok(())
}

impl StreamHeader {
    /// Create a header for a new stream with a fresh random nonce prefix.
    ///
    /// # Errors
    /// - Returns `Usage` if `chunk_size` is zero or above MAX_CHUNK_SIZE
    pub fn new(kdf: Option<KdfParams>, chunk_size: usize) -> Result<Self> {
        check_chunk_size(chunk_size)?;

        let mut nonce_prefix = [0u8; NONCE_PREFIX_SIZE];
        OsRng.fill_bytes(&mut nonce_prefix);

        Ok(Self {
            version: FORMAT_VERSION,
            kdf,
            chunk_size: chunk_size as u32,
            nonce_prefix,
        })
    }

    /// Plaintext bytes per non-final chunk.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size as usize
    }

    /// Nonce for chunk `index`.
    ///
    /// Layout: nonce prefix (15) || index u64 BE (8) || final flag (1).
    pub fn nonce(&self, index: u64, last: bool) -> [u8; NONCE_SIZE] {
        let mut nonce = [0u8; NONCE_SIZE];
        nonce[..NONCE_PREFIX_SIZE].copy_from_slice(&self.nonce_prefix);
        nonce[NONCE_PREFIX_SIZE..NONCE_SIZE - 1].copy_from_slice(&index.to_be_bytes());
        nonce[NONCE_SIZE - 1] = last as u8;
        nonce
    }

    /// Encode the header.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let (tag, params) = match self.kdf {
            None => (KDF_TAG_RAW, [0u32; 3]),
            Some(KdfParams::Scrypt {
                cost,
                block_size,
                parallelism,
            }) => (KDF_TAG_SCRYPT, [cost, block_size, parallelism]),
            Some(KdfParams::Argon2id {
                memory_cost,
                time_cost,
                parallelism,
            }) => (KDF_TAG_ARGON2ID, [memory_cost, time_cost, parallelism]),
        };

        let mut out = [0u8; HEADER_SIZE];
        out[..4].copy_from_slice(&MAGIC);
        out[4] = self.version;
        out[5] = tag;
        for (i, value) in params.iter().enumerate() {
            out[6 + i * 4..10 + i * 4].copy_from_slice(&value.to_be_bytes());
        }
        out[18..22].copy_from_slice(&self.chunk_size.to_be_bytes());
        out[22..].copy_from_slice(&self.nonce_prefix);
        out
    }

    /// Decode a header.
    ///
    /// # Errors
    /// - Returns `InvalidFormat` for a wrong magic, unsupported version,
    ///   unknown KDF tag or out-of-range chunk size
    pub fn from_bytes(bytes: &[u8; HEADER_SIZE]) -> Result<Self> {
        if bytes[..4] != MAGIC {
            return Err(Error::InvalidFormat("input is not a sealed stream".to_string()));
        }

        let version = bytes[4];
        if version != FORMAT_VERSION {
            return Err(Error::InvalidFormat(format!(
                "unsupported stream version: {}",
                version
            )));
        }

        let param = |i: usize| {
            let offset = 6 + i * 4;
            u32::from_be_bytes([
                bytes[offset],
                bytes[offset + 1],
                bytes[offset + 2],
                bytes[offset + 3],
            ])
        };
        let kdf = match bytes[5] {
            KDF_TAG_RAW => None,
            KDF_TAG_SCRYPT => Some(KdfParams::Scrypt {
                cost: param(0),
                block_size: param(1),
                parallelism: param(2),
            }),
            KDF_TAG_ARGON2ID => Some(KdfParams::Argon2id {
                memory_cost: param(0),
                time_cost: param(1),
                parallelism: param(2),
            }),
            other => {
                return Err(Error::InvalidFormat(format!(
                    "unknown key derivation tag: {}",
                    other
                )))
            }
        };

        let chunk_size = u32::from_be_bytes([bytes[18], bytes[19], bytes[20], bytes[21]]);
        if chunk_size == 0 || chunk_size as usize > MAX_CHUNK_SIZE {
            return Err(Error::InvalidFormat(format!(
                "chunk size out of range: {}",
                chunk_size
            )));
        }

        let mut nonce_prefix = [0u8; NONCE_PREFIX_SIZE];
        nonce_prefix.copy_from_slice(&bytes[22..]);

        Ok(Self {
            version,
            kdf,
            chunk_size,
            nonce_prefix,
        })
    }

    /// Read and decode a header from the start of a stream.
    ///
    /// # Errors
    /// - Returns `TruncatedStream` if the input ends before a full header
    /// - Returns `InvalidFormat` if the header does not decode
    /// - I/O errors from the reader
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut bytes = [0u8; HEADER_SIZE];
        let n = read_full(reader, &mut bytes)?;
        if n < HEADER_SIZE {
            return Err(Error::TruncatedStream(format!(
                "stream header is {} bytes, expected {}",
                n, HEADER_SIZE
            )));
        }
        Self::from_bytes(&bytes)
    }
}

fn serialize_hex<S: Serializer>(
    bytes: &[u8; NONCE_PREFIX_SIZE],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}
