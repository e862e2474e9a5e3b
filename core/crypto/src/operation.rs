//! Top-level operations: seal, open, or export a derived key.

use std::io::{self, Read, Write};

use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::header::{check_chunk_size, StreamHeader};
use crate::kdf::{derive_key, KdfParams};
use crate::keys::SecretKey;
use crate::source::KeySource;
use crate::stream::{DecryptingStream, EncryptingStream, DEFAULT_CHUNK_SIZE};
use sealpipe_common::{Error, Result, SensitiveBytes};

/// A validated request. Built once from caller arguments; the framing
/// engine never sees conflicting key sources.
#[derive(Debug)]
pub enum Operation {
    /// Seal the input stream.
    Encrypt(KeySource),
    /// Open a sealed input stream.
    Decrypt(KeySource),
    /// Write the derived key as hex without touching any stream.
    DeriveOnly {
        /// Password to stretch.
        password: SensitiveBytes,
        /// Salt; may be empty.
        salt: SensitiveBytes,
        /// Derivation algorithm and cost.
        kdf: KdfParams,
    },
}

/// Tunables for sealing.
#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// Plaintext bytes per chunk.
    pub chunk_size: usize,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// What an operation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A stream was sealed.
    Encrypted {
        /// Plaintext bytes read.
        bytes: u64,
    },
    /// A stream was opened.
    Decrypted {
        /// Plaintext bytes written.
        bytes: u64,
    },
    /// A key was derived and written as hex.
    Derived,
}

impl Operation {
    /// Run with default options.
    pub fn run<R: Read, W: Write>(self, reader: R, writer: W) -> Result<Outcome> {
        self.run_with(&StreamOptions::default(), reader, writer)
    }

    /// Run the operation from `reader` to `writer`.
    pub fn run_with<R: Read, W: Write>(
        self,
        options: &StreamOptions,
        reader: R,
        writer: W,
    ) -> Result<Outcome> {
        self.run_into(options, reader, || Ok(writer))
    }

    /// Run the operation, opening the output only once the key is known.
    ///
    /// `open_writer` is called after the key was derived (and, when
    /// decrypting, after the stream header was read and checked). A key
    /// derivation or usage error therefore never creates or truncates the
    /// output. For decryption with a password, the KDF parameters recorded
    /// in the stream header take precedence over the ones in the key
    /// source.
    ///
    /// # Errors
    /// - Everything the key derivation and framing layers report
    /// - `Usage` when a password is given for a stream sealed with a raw key
    /// - `InvalidFormat` when the header asks for more than
    ///   [`KdfParams::within_limits`] allows
    /// - `Io` from `open_writer`
    pub fn run_into<R, W, F>(
        self,
        options: &StreamOptions,
        mut reader: R,
        open_writer: F,
    ) -> Result<Outcome>
    where
        R: Read,
        W: Write,
        F: FnOnce() -> io::Result<W>,
    {
        match self {
            Operation::Encrypt(source) => {
                debug!(key_source = source.kind(), "Encrypting stream");
                check_chunk_size(options.chunk_size)?;
                let key = source.resolve()?;
                let mut stream = EncryptingStream::new(&key).with_chunk_size(options.chunk_size);
                if let Some(kdf) = source.kdf() {
                    stream = stream.with_kdf(kdf);
                }
                let bytes = stream.encrypt_stream(reader, open_writer()?)?;
                info!(bytes, "Encryption complete");
                Ok(Outcome::Encrypted { bytes })
            }
            Operation::Decrypt(source) => {
                debug!(key_source = source.kind(), "Decrypting stream");
                let header = StreamHeader::read_from(&mut reader)?;
                let key = key_for_header(&source, &header)?;
                let bytes =
                    DecryptingStream::new(&key).decrypt_body(&header, reader, open_writer()?)?;
                info!(bytes, "Decryption complete");
                Ok(Outcome::Decrypted { bytes })
            }
            Operation::DeriveOnly {
                password,
                salt,
                kdf,
            } => {
                let key = derive_key(password.as_bytes(), salt.as_bytes(), &kdf)?;
                let line = Zeroizing::new(format!("{}\n", key.to_hex()));
                let mut writer = open_writer()?;
                writer.write_all(line.as_bytes())?;
                writer.flush()?;
                Ok(Outcome::Derived)
            }
        }
    }
}

/// Resolve the decryption key for a stream with the given header.
fn key_for_header(source: &KeySource, header: &StreamHeader) -> Result<SecretKey> {
    match (source, header.kdf) {
        (KeySource::RawKey(key), _) => Ok(key.clone()),
        (KeySource::Password { .. }, None) => Err(Error::Usage(
            "stream was sealed with a raw key; a password cannot open it".to_string(),
        )),
        (KeySource::Password { password, salt, .. }, Some(params)) => {
            if !params.within_limits() {
                return Err(Error::InvalidFormat(format!(
                    "stream asks for excessive key derivation cost: {}",
                    params
                )));
            }
            debug!(kdf = %params, "Using key derivation parameters from stream header");
            derive_key(password.as_bytes(), salt.as_bytes(), &params)
        }
    }
}

/// Parse the header of a sealed stream without a key.
pub fn inspect_header<R: Read>(mut reader: R) -> Result<StreamHeader> {
    StreamHeader::read_from(&mut reader)
}
