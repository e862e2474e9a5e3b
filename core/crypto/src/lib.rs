//! Cryptographic core for SealPipe.
//!
//! This module provides:
//! - Password key derivation using scrypt (or Argon2id)
//! - Chunked, authenticated stream encryption using XChaCha20-Poly1305
//! - Key types with automatic zeroization
//! - Validated operations tying a key source to a stream transform
//!
//! # Security Guarantees
//! - Key material is zeroized on drop
//! - No plaintext, password, salt or key material is ever logged
//! - Plaintext of a chunk is released only after the chunk authenticated
//! - Reordered, duplicated, dropped or truncated chunks are detected

pub mod aead;
pub mod header;
pub mod kdf;
pub mod keys;
pub mod operation;
pub mod source;
pub mod stream;

pub use header::StreamHeader;
pub use kdf::{derive_key, KdfParams};
pub use keys::{SecretKey, KEY_LENGTH};
pub use operation::{inspect_header, Operation, Outcome, StreamOptions};
pub use source::KeySource;
pub use stream::{decrypt_bytes, encrypt_bytes, DecryptingStream, EncryptingStream, DEFAULT_CHUNK_SIZE};
