//! Streaming encryption for inputs of any length.
//!
//! The input is cut into fixed-size chunks and each chunk is sealed on its
//! own, so memory use is bounded by the chunk size no matter how long the
//! stream is. After the [`StreamHeader`], every chunk is written as a frame:
//!
//! ```text
//! flag (1) | plaintext length u32 BE (4) | ciphertext || tag (length + 16)
//! ```
//!
//! The flag is `0x00` while more chunks follow and `0x01` on the final
//! chunk. Chunk `i` is sealed under the nonce `prefix || i || flag` with the
//! header bytes as associated data, so a chunk only verifies at its own
//! position, with its own final flag, in its own stream. A stream that ends
//! before a final chunk was read has been truncated.

use std::io::{self, Read, Write};

use tracing::debug;
use zeroize::Zeroizing;

use crate::aead::{ChunkCipher, TAG_SIZE};
use crate::header::StreamHeader;
use crate::kdf::KdfParams;
use crate::keys::SecretKey;
use sealpipe_common::{Error, Result};

/// Default chunk size for streaming encryption (64 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Frame header size: flag (1) + plaintext length (4).
pub const FRAME_HEADER_SIZE: usize = 5;

const FLAG_MORE: u8 = 0x00;
const FLAG_FINAL: u8 = 0x01;

/// Encrypting stream that processes data in chunks.
pub struct EncryptingStream<'a> {
    key: &'a SecretKey,
    kdf: Option<KdfParams>,
    chunk_size: usize,
}

impl<'a> EncryptingStream<'a> {
    /// Create a new encrypting stream for a raw key.
    pub fn new(key: &'a SecretKey) -> Self {
        Self {
            key,
            kdf: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Record that `key` was derived from a password with `kdf`.
    ///
    /// The parameters are written to the header so the stream can be
    /// reopened from the password alone (plus the caller's salt).
    pub fn with_kdf(mut self, kdf: KdfParams) -> Self {
        self.kdf = Some(kdf);
        self
    }

    /// Set custom chunk size.
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Encrypt data from reader and write to writer.
    ///
    /// # Postconditions
    /// - Output is the header followed by one frame per chunk
    /// - Exactly one frame, the last, carries the final flag; empty input
    ///   produces a single empty final frame
    /// - Frames are written as soon as they are sealed
    ///
    /// # Errors
    /// - `Usage` if the chunk size is out of range
    /// - I/O errors from reader/writer; output written so far is left as is
    pub fn encrypt_stream<R: Read, W: Write>(&self, mut reader: R, mut writer: W) -> Result<u64> {
        let header = StreamHeader::new(self.kdf, self.chunk_size)?;
        let aad = header.to_bytes();
        writer.write_all(&aad)?;

        let cipher = ChunkCipher::new(self.key);
        let mut current = Zeroizing::new(vec![0u8; self.chunk_size]);
        let mut next = Zeroizing::new(vec![0u8; self.chunk_size]);
        let mut current_len = read_full(&mut reader, &mut current)?;
        let mut index = 0u64;
        let mut total_bytes = 0u64;

        loop {
            // Look one chunk ahead: the current chunk is final unless more
            // input follows it.
            let next_len = if current_len == self.chunk_size {
                read_full(&mut reader, &mut next)?
            } else {
                0
            };
            let last = next_len == 0;

            let sealed = cipher.seal(&header.nonce(index, last), &aad, &current[..current_len])?;
            write_frame(&mut writer, last, current_len, &sealed)?;
            total_bytes += current_len as u64;

            if last {
                break;
            }
            std::mem::swap(&mut current, &mut next);
            current_len = next_len;
            index = next_index(index)?;
        }

        writer.flush()?;
        debug!(chunks = index + 1, bytes = total_bytes, "Stream sealed");
        Ok(total_bytes)
    }
}

/// Decrypting stream that processes encrypted chunks.
pub struct DecryptingStream<'a> {
    key: &'a SecretKey,
}

impl<'a> DecryptingStream<'a> {
    /// Create a new decrypting stream.
    pub fn new(key: &'a SecretKey) -> Self {
        Self { key }
    }

    /// Decrypt data from reader and write to writer.
    ///
    /// The header's KDF descriptor is not consulted: the key is used as
    /// given.
    ///
    /// # Postconditions
    /// - Each chunk's plaintext is written only after its tag verified
    /// - On error, plaintext of earlier verified chunks stays written
    ///
    /// # Errors
    /// - `Authentication` for a chunk that does not verify (wrong key,
    ///   tampering, reordering)
    /// - `TruncatedStream` if input ends before the final chunk
    /// - `InvalidFormat` for malformed headers or frames, or data after
    ///   the final chunk
    /// - I/O errors
    pub fn decrypt_stream<R: Read, W: Write>(&self, mut reader: R, writer: W) -> Result<u64> {
        let header = StreamHeader::read_from(&mut reader)?;
        decrypt_frames(self.key, &header, reader, writer)
    }

    /// Decrypt the frames that follow an already parsed `header`.
    ///
    /// `reader` must be positioned just past the header bytes. Errors are
    /// the same as for [`decrypt_stream`](Self::decrypt_stream).
    pub fn decrypt_body<R: Read, W: Write>(
        &self,
        header: &StreamHeader,
        reader: R,
        writer: W,
    ) -> Result<u64> {
        decrypt_frames(self.key, header, reader, writer)
    }

    /// Decrypt a stream whose key depends on its header.
    ///
    /// `resolve_key` is called once with the parsed header, before any
    /// frame is read. This lets password-based callers re-derive the key
    /// with the KDF parameters the stream was sealed with.
    pub fn decrypt_stream_with<R, W, F>(mut reader: R, writer: W, resolve_key: F) -> Result<u64>
    where
        R: Read,
        W: Write,
        F: FnOnce(&StreamHeader) -> Result<SecretKey>,
    {
        let header = StreamHeader::read_from(&mut reader)?;
        let key = resolve_key(&header)?;
        decrypt_frames(&key, &header, reader, writer)
    }
}

fn decrypt_frames<R: Read, W: Write>(
    key: &SecretKey,
    header: &StreamHeader,
    mut reader: R,
    mut writer: W,
) -> Result<u64> {
    let aad = header.to_bytes();
    let cipher = ChunkCipher::new(key);
    let chunk_size = header.chunk_size();
    let mut body = vec![0u8; chunk_size + TAG_SIZE];
    let mut index = 0u64;
    let mut total_bytes = 0u64;

    loop {
        let mut frame_header = [0u8; FRAME_HEADER_SIZE];
        match read_full(&mut reader, &mut frame_header)? {
            0 => {
                return Err(Error::TruncatedStream(format!(
                    "stream ended after {} chunks without a final chunk",
                    index
                )))
            }
            FRAME_HEADER_SIZE => {}
            _ => {
                return Err(Error::TruncatedStream(format!(
                    "stream ended inside the frame header of chunk {}",
                    index
                )))
            }
        }

        let last = match frame_header[0] {
            FLAG_MORE => false,
            FLAG_FINAL => true,
            other => {
                return Err(Error::InvalidFormat(format!(
                    "unknown flag {:#04x} on chunk {}",
                    other, index
                )))
            }
        };
        let len = u32::from_be_bytes([
            frame_header[1],
            frame_header[2],
            frame_header[3],
            frame_header[4],
        ]) as usize;
        if len > chunk_size || (!last && len != chunk_size) {
            return Err(Error::InvalidFormat(format!(
                "chunk {} declares {} bytes with chunk size {}",
                index, len, chunk_size
            )));
        }

        let body_len = len + TAG_SIZE;
        if read_full(&mut reader, &mut body[..body_len])? < body_len {
            return Err(Error::TruncatedStream(format!(
                "stream ended inside chunk {}",
                index
            )));
        }

        let plaintext = Zeroizing::new(cipher.open(
            &header.nonce(index, last),
            &aad,
            &body[..body_len],
            index,
        )?);

        if last {
            let mut extra = [0u8; 1];
            if read_full(&mut reader, &mut extra)? != 0 {
                return Err(Error::InvalidFormat(
                    "unexpected data after the final chunk".to_string(),
                ));
            }
        }

        writer.write_all(&plaintext)?;
        total_bytes += len as u64;

        if last {
            break;
        }
        index = next_index(index)?;
    }

    writer.flush()?;
    debug!(chunks = index + 1, bytes = total_bytes, "Stream opened");
    Ok(total_bytes)
}

fn write_frame<W: Write>(writer: &mut W, last: bool, len: usize, sealed: &[u8]) -> Result<()> {
    let mut frame_header = [0u8; FRAME_HEADER_SIZE];
    frame_header[0] = if last { FLAG_FINAL } else { FLAG_MORE };
    frame_header[1..].copy_from_slice(&(len as u32).to_be_bytes());
    writer.write_all(&frame_header)?;
    writer.write_all(sealed)?;
    Ok(())
}

fn next_index(index: u64) -> Result<u64> {
    index
        .checked_add(1)
        .ok_or_else(|| Error::InvalidFormat("stream exceeds the maximum chunk count".to_string()))
}

/// Read until `buf` is full or the reader is exhausted.
///
/// Short reads from pipes are accumulated, so chunk boundaries never depend
/// on how the input happens to arrive. Returns the number of bytes read;
/// less than `buf.len()` only at end of input.
pub(crate) fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Encrypt a complete byte slice using streaming encryption.
///
/// This is a convenience function for when the complete data is available.
pub fn encrypt_bytes(key: &SecretKey, data: &[u8]) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    EncryptingStream::new(key).encrypt_stream(data, &mut output)?;
    Ok(output)
}

/// Decrypt a complete byte slice that was encrypted with streaming encryption.
pub fn decrypt_bytes(key: &SecretKey, data: &[u8]) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    DecryptingStream::new(key).decrypt_stream(data, &mut output)?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::HEADER_SIZE;
    use crate::keys::KEY_LENGTH;
    use proptest::prelude::*;
    use sealpipe_common::ErrorKind;

    const SMALL_CHUNK: usize = 16;
    const SMALL_FRAME: usize = FRAME_HEADER_SIZE + SMALL_CHUNK + TAG_SIZE;

    fn key(byte: u8) -> SecretKey {
        SecretKey::from_bytes([byte; KEY_LENGTH])
    }

    fn seal_small(key: &SecretKey, plaintext: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        EncryptingStream::new(key)
            .with_chunk_size(SMALL_CHUNK)
            .encrypt_stream(plaintext, &mut out)
            .unwrap();
        out
    }

    /// Byte range of frame `i` in a stream sealed with SMALL_CHUNK.
    fn frame(i: usize) -> std::ops::Range<usize> {
        let start = HEADER_SIZE + i * SMALL_FRAME;
        start..start + SMALL_FRAME
    }

    /// Reader that hands out at most `step` bytes per call.
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_stream_encrypt_decrypt_roundtrip() {
        let key = key(42);
        let plaintext = b"Hello, streaming encryption!";

        let encrypted = encrypt_bytes(&key, plaintext).unwrap();
        let decrypted = decrypt_bytes(&key, &encrypted).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_stream_multiple_chunks() {
        let key = key(42);
        // Create data that spans multiple chunks
        let plaintext = vec![0xAB; DEFAULT_CHUNK_SIZE * 3 + 1000];

        let encrypted = encrypt_bytes(&key, &plaintext).unwrap();
        let decrypted = decrypt_bytes(&key, &encrypted).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_stream_empty_data() {
        let key = key(42);

        let encrypted = encrypt_bytes(&key, b"").unwrap();
        assert_eq!(encrypted.len(), HEADER_SIZE + FRAME_HEADER_SIZE + TAG_SIZE);
        assert_eq!(encrypted[HEADER_SIZE], FLAG_FINAL);

        let decrypted = decrypt_bytes(&key, &encrypted).unwrap();
        assert!(decrypted.is_empty());
    }

    #[test]
    fn test_stream_exact_chunk_multiple() {
        let key = key(42);
        let plaintext = vec![7u8; SMALL_CHUNK * 2];

        let encrypted = seal_small(&key, &plaintext);
        // Exactly two frames, the second one final; no trailing empty frame.
        assert_eq!(encrypted.len(), HEADER_SIZE + 2 * SMALL_FRAME);
        assert_eq!(encrypted[frame(0).start], FLAG_MORE);
        assert_eq!(encrypted[frame(1).start], FLAG_FINAL);

        assert_eq!(decrypt_bytes(&key, &encrypted).unwrap(), plaintext);
    }

    #[test]
    fn test_stream_custom_chunk_size() {
        let key = key(42);
        let plaintext = b"Custom chunk size test data that is longer than the chunk";

        let encrypted = seal_small(&key, plaintext);
        let decrypted = decrypt_bytes(&key, &encrypted).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_stream_zero_chunk_size_rejected() {
        let key = key(42);
        let err = EncryptingStream::new(&key)
            .with_chunk_size(0)
            .encrypt_stream(&b"data"[..], Vec::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn test_stream_partial_reads() {
        let key = key(9);
        let plaintext: Vec<u8> = (0..200u8).collect();

        let mut encrypted = Vec::new();
        EncryptingStream::new(&key)
            .with_chunk_size(SMALL_CHUNK)
            .encrypt_stream(Trickle { data: &plaintext, step: 3 }, &mut encrypted)
            .unwrap();
        // Chunk boundaries do not depend on how the input arrived.
        assert_eq!(encrypted.len(), seal_small(&key, &plaintext).len());

        let mut decrypted = Vec::new();
        DecryptingStream::new(&key)
            .decrypt_stream(Trickle { data: &encrypted, step: 5 }, &mut decrypted)
            .unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_stream_same_input_differs_per_stream() {
        let key = key(42);
        let ct1 = encrypt_bytes(&key, b"same").unwrap();
        let ct2 = encrypt_bytes(&key, b"same").unwrap();
        assert_ne!(ct1, ct2);
    }

    #[test]
    fn test_stream_wrong_key_fails() {
        let plaintext = b"Secret streaming data";

        let encrypted = encrypt_bytes(&key(1), plaintext).unwrap();
        let mut output = Vec::new();
        let err = DecryptingStream::new(&key(2))
            .decrypt_stream(&encrypted[..], &mut output)
            .unwrap_err();

        assert!(matches!(err, Error::Authentication { chunk: 0 }));
        assert!(output.is_empty());
    }

    #[test]
    fn test_stream_every_bit_flip_in_body_detected() {
        let key = key(3);
        let plaintext = vec![0x5A; SMALL_CHUNK * 2 + 4];
        let encrypted = seal_small(&key, &plaintext);

        for i in HEADER_SIZE..encrypted.len() {
            let offset = (i - HEADER_SIZE) % SMALL_FRAME;
            if offset < FRAME_HEADER_SIZE {
                continue;
            }
            let chunk = ((i - HEADER_SIZE) / SMALL_FRAME) as u64;
            for bit in 0..8 {
                let mut tampered = encrypted.clone();
                tampered[i] ^= 1 << bit;

                let mut output = Vec::new();
                let err = DecryptingStream::new(&key)
                    .decrypt_stream(&tampered[..], &mut output)
                    .unwrap_err();
                match err {
                    Error::Authentication { chunk: failed } => assert_eq!(failed, chunk),
                    other => panic!("byte {} bit {}: unexpected {:?}", i, bit, other),
                }
                // Only chunks before the tampered one were released.
                assert_eq!(output, &plaintext[..chunk as usize * SMALL_CHUNK]);
            }
        }
    }

    #[test]
    fn test_stream_header_tamper_detected() {
        let key = key(3);
        let mut encrypted = seal_small(&key, b"header is bound to every chunk");
        // Flip a bit of the nonce prefix.
        encrypted[HEADER_SIZE - 1] ^= 0x01;

        let err = decrypt_bytes(&key, &encrypted).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
    }

    #[test]
    fn test_stream_final_flag_tamper_detected() {
        let key = key(3);
        let plaintext = vec![1u8; SMALL_CHUNK * 3];
        let mut encrypted = seal_small(&key, &plaintext);
        // Mark the first chunk as final and cut the rest.
        encrypted[frame(0).start] = FLAG_FINAL;
        encrypted.truncate(frame(0).end);

        let err = decrypt_bytes(&key, &encrypted).unwrap_err();
        assert!(matches!(err, Error::Authentication { chunk: 0 }));
    }

    #[test]
    fn test_stream_every_truncation_detected() {
        let key = key(5);
        let plaintext = vec![0xC3; SMALL_CHUNK * 3 + 5];
        let encrypted = seal_small(&key, &plaintext);

        for cut in 0..encrypted.len() {
            let err = decrypt_bytes(&key, &encrypted[..cut]).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::TruncatedStream, "cut at {}", cut);
        }
    }

    #[test]
    fn test_stream_dropping_final_chunk_detected() {
        let key = key(5);
        let plaintext = vec![0xC3; SMALL_CHUNK * 3];
        let encrypted = seal_small(&key, &plaintext);

        let mut output = Vec::new();
        let err = DecryptingStream::new(&key)
            .decrypt_stream(&encrypted[..frame(2).start], &mut output)
            .unwrap_err();

        assert!(matches!(err, Error::TruncatedStream(_)));
        assert_eq!(output, &plaintext[..SMALL_CHUNK * 2]);
    }

    #[test]
    fn test_stream_reorder_detected() {
        let key = key(8);
        let plaintext: Vec<u8> = (0..(SMALL_CHUNK * 3) as u8).collect();
        let encrypted = seal_small(&key, &plaintext);

        let mut swapped = encrypted[..HEADER_SIZE].to_vec();
        swapped.extend_from_slice(&encrypted[frame(1)]);
        swapped.extend_from_slice(&encrypted[frame(0)]);
        swapped.extend_from_slice(&encrypted[frame(2)]);

        let err = decrypt_bytes(&key, &swapped).unwrap_err();
        assert!(matches!(err, Error::Authentication { chunk: 0 }));
    }

    #[test]
    fn test_stream_duplicate_chunk_detected() {
        let key = key(8);
        let plaintext = vec![0u8; SMALL_CHUNK * 2];
        let encrypted = seal_small(&key, &plaintext);

        let mut duplicated = encrypted[..frame(1).start].to_vec();
        duplicated.extend_from_slice(&encrypted[frame(0)]);
        duplicated.extend_from_slice(&encrypted[frame(1)]);

        let err = decrypt_bytes(&key, &duplicated).unwrap_err();
        assert!(matches!(err, Error::Authentication { chunk: 1 }));
    }

    #[test]
    fn test_stream_chunk_from_other_stream_rejected() {
        let key = key(8);
        let a = seal_small(&key, &[1u8; SMALL_CHUNK * 2]);
        let b = seal_small(&key, &[1u8; SMALL_CHUNK * 2]);

        let mut spliced = a[..frame(1).start].to_vec();
        spliced.extend_from_slice(&b[frame(1)]);

        let err = decrypt_bytes(&key, &spliced).unwrap_err();
        assert!(matches!(err, Error::Authentication { chunk: 1 }));
    }

    #[test]
    fn test_stream_trailing_data_rejected() {
        let key = key(8);
        let mut encrypted = seal_small(&key, b"payload");
        encrypted.push(0);

        let mut output = Vec::new();
        let err = DecryptingStream::new(&key)
            .decrypt_stream(&encrypted[..], &mut output)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFormat);
        assert!(output.is_empty());
    }

    #[test]
    fn test_stream_bad_frame_fields_rejected() {
        let key = key(8);
        let encrypted = seal_small(&key, &[2u8; SMALL_CHUNK + 1]);

        let mut bad_flag = encrypted.clone();
        bad_flag[frame(0).start] = 0x7F;
        assert_eq!(
            decrypt_bytes(&key, &bad_flag).unwrap_err().kind(),
            ErrorKind::InvalidFormat
        );

        let mut short_middle = encrypted.clone();
        short_middle[frame(0).start + 4] = (SMALL_CHUNK - 1) as u8;
        assert_eq!(
            decrypt_bytes(&key, &short_middle).unwrap_err().kind(),
            ErrorKind::InvalidFormat
        );

        let mut oversized = encrypted;
        oversized[frame(0).start + 1] = 0xFF;
        assert_eq!(
            decrypt_bytes(&key, &oversized).unwrap_err().kind(),
            ErrorKind::InvalidFormat
        );
    }

    #[test]
    fn test_stream_not_a_sealed_stream() {
        let err = decrypt_bytes(&key(1), &[0u8; 128]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFormat);
    }

    #[test]
    fn test_stream_write_error_propagates() {
        let err = EncryptingStream::new(&key(1))
            .encrypt_stream(&b"data"[..], FailingWriter)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_stream_header_records_kdf() {
        let key = key(42);
        let mut encrypted = Vec::new();
        EncryptingStream::new(&key)
            .with_kdf(KdfParams::scrypt_legacy())
            .encrypt_stream(&b"Test"[..], &mut encrypted)
            .unwrap();

        let header = StreamHeader::read_from(&mut &encrypted[..]).unwrap();
        assert_eq!(header.kdf, Some(KdfParams::scrypt_legacy()));
        assert_eq!(header.chunk_size(), DEFAULT_CHUNK_SIZE);

        // A raw key still opens a password-sealed stream.
        assert_eq!(decrypt_bytes(&key, &encrypted).unwrap(), b"Test");
    }

    #[test]
    fn test_decrypt_stream_with_sees_header() {
        let key = key(42);
        let mut encrypted = Vec::new();
        EncryptingStream::new(&key)
            .with_kdf(KdfParams::moderate())
            .with_chunk_size(SMALL_CHUNK)
            .encrypt_stream(&b"resolved from header"[..], &mut encrypted)
            .unwrap();

        let mut output = Vec::new();
        DecryptingStream::decrypt_stream_with(&encrypted[..], &mut output, |header| {
            assert_eq!(header.kdf, Some(KdfParams::moderate()));
            assert_eq!(header.chunk_size(), SMALL_CHUNK);
            Ok(SecretKey::from_bytes([42; KEY_LENGTH]))
        })
        .unwrap();
        assert_eq!(output, b"resolved from header");
    }

    #[test]
    fn test_decrypt_body_after_parsed_header() {
        let key = key(5);
        let encrypted = seal_small(&key, b"body only");

        let mut reader = &encrypted[..];
        let header = StreamHeader::read_from(&mut reader).unwrap();
        assert_eq!(reader.len(), encrypted.len() - HEADER_SIZE);

        let mut output = Vec::new();
        let bytes = DecryptingStream::new(&key)
            .decrypt_body(&header, reader, &mut output)
            .unwrap();
        assert_eq!(bytes, 9);
        assert_eq!(output, b"body only");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_roundtrip(
            plaintext in proptest::collection::vec(any::<u8>(), 0..512),
            chunk_size in 1usize..64,
        ) {
            let key = key(17);
            let mut encrypted = Vec::new();
            EncryptingStream::new(&key)
                .with_chunk_size(chunk_size)
                .encrypt_stream(&plaintext[..], &mut encrypted)
                .unwrap();

            let chunks = if plaintext.is_empty() { 1 } else { plaintext.len().div_ceil(chunk_size) };
            prop_assert_eq!(
                encrypted.len(),
                HEADER_SIZE + chunks * (FRAME_HEADER_SIZE + TAG_SIZE) + plaintext.len()
            );
            prop_assert_eq!(decrypt_bytes(&key, &encrypted).unwrap(), plaintext);
        }
    }
}
