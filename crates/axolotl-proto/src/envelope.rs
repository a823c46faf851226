//! Message envelope codec.
//!
//! An [`Envelope`] is the unit one party hands to the other:
//!
//! ```text
//! u8      header_nonce_len
//! u8      message_nonce_len
//! u32     header_ciphertext_len
//! u32     message_ciphertext_len
//! [u8]    header_nonce
//! [u8]    message_nonce
//! [u8]    header_ciphertext
//! [u8]    message_ciphertext
//! ```
//!
//! Lengths are big-endian. Declared lengths are checked against fixed caps
//! before any body bytes are allocated, so a hostile prefix cannot make a
//! reader buffer more than one maximum-size message.

use std::io::Read;

use bytes::{Buf, BufMut, Bytes};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::errors::{ProtocolError, Result};

/// One encrypted message on the wire.
///
/// # Invariants
///
/// - Size Limits: every field fits its cap ([`Envelope::MAX_NONCE_LEN`],
///   [`Envelope::MAX_HEADER_CIPHERTEXT_LEN`],
///   [`Envelope::MAX_MESSAGE_CIPHERTEXT_LEN`]). Enforced by
///   [`Envelope::encode`] and [`Envelope::decode`].
/// - Determinism: the encoding of an envelope is unique, and
///   `decode(encode(e)) == e`.
///
/// # Security
///
/// Structural validity only. The header ciphertext is authenticated by the
/// header key and the message ciphertext by the message key with the header
/// ciphertext as associated data; both checks happen in the ratchet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Envelope {
    /// Nonce used to seal the header
    pub header_nonce: Bytes,
    /// Nonce used to seal the body
    pub message_nonce: Bytes,
    /// Sealed [`MessageHeader`](crate::MessageHeader)
    pub header_ciphertext: Bytes,
    /// Sealed application plaintext
    pub message_ciphertext: Bytes,
}

impl Envelope {
    /// Size of the length prefix (two u8 + two u32).
    pub const PREFIX_SIZE: usize = 10;

    /// Largest nonce expressible in the u8 length field.
    pub const MAX_NONCE_LEN: usize = u8::MAX as usize;

    /// Maximum header ciphertext size (1 KiB).
    pub const MAX_HEADER_CIPHERTEXT_LEN: usize = 1024;

    /// Maximum message ciphertext size (16 MiB).
    pub const MAX_MESSAGE_CIPHERTEXT_LEN: usize = 16 * 1024 * 1024;

    /// Assemble an envelope from its four fields.
    #[must_use]
    pub fn new(
        header_nonce: impl Into<Bytes>,
        message_nonce: impl Into<Bytes>,
        header_ciphertext: impl Into<Bytes>,
        message_ciphertext: impl Into<Bytes>,
    ) -> Self {
        Self {
            header_nonce: header_nonce.into(),
            message_nonce: message_nonce.into(),
            header_ciphertext: header_ciphertext.into(),
            message_ciphertext: message_ciphertext.into(),
        }
    }

    /// Exact number of bytes [`Envelope::encode`] writes.
    pub fn encoded_len(&self) -> usize {
        Prefix::of(self).total_len()
    }

    /// Encode into `dst`.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::FieldTooLarge` if any field exceeds its cap. Nothing
    ///   is written in that case.
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        let prefix = Prefix::of(self);
        prefix.check_caps()?;

        dst.put_u8(prefix.header_nonce_len as u8);
        dst.put_u8(prefix.message_nonce_len as u8);
        dst.put_u32(prefix.header_ciphertext_len as u32);
        dst.put_u32(prefix.message_ciphertext_len as u32);
        dst.put_slice(&self.header_nonce);
        dst.put_slice(&self.message_nonce);
        dst.put_slice(&self.header_ciphertext);
        dst.put_slice(&self.message_ciphertext);

        Ok(())
    }

    /// Encode into a fresh buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut wire = Vec::with_capacity(self.encoded_len());
        self.encode(&mut wire)?;
        Ok(wire)
    }

    /// Decode from wire bytes.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::EnvelopeTooShort` if fewer than
    ///   [`Envelope::PREFIX_SIZE`] bytes are given
    /// - `ProtocolError::FieldTooLarge` if a declared length exceeds its cap
    /// - `ProtocolError::EnvelopeTruncated` if fewer bytes follow than the
    ///   prefix declares
    ///
    /// Trailing bytes after the declared fields are ignored.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::PREFIX_SIZE {
            return Err(ProtocolError::EnvelopeTooShort {
                expected: Self::PREFIX_SIZE,
                actual: bytes.len(),
            });
        }

        let prefix = Prefix::parse(&bytes[..Self::PREFIX_SIZE])?;
        let total = prefix.total_len();

        let Some(body) = bytes.get(Self::PREFIX_SIZE..total) else {
            return Err(ProtocolError::EnvelopeTruncated { expected: total, actual: bytes.len() });
        };

        Ok(prefix.split(Bytes::copy_from_slice(body)))
    }

    /// Decode one envelope from a blocking reader.
    ///
    /// Consumes exactly the envelope's bytes, so consecutive envelopes can be
    /// read from the same stream.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::EnvelopeTruncated` if the reader hits end of input
    ///   before the envelope is complete (including inside the prefix)
    /// - `ProtocolError::FieldTooLarge` if a declared length exceeds its cap
    /// - `ProtocolError::Io` for any other reader failure
    pub fn read_from(reader: &mut impl Read) -> Result<Self> {
        let mut head = Vec::with_capacity(Self::PREFIX_SIZE);
        Read::take(reader.by_ref(), Self::PREFIX_SIZE as u64).read_to_end(&mut head)?;
        let prefix = Prefix::parse_streamed(&head)?;

        let mut body = Vec::new();
        Read::take(reader.by_ref(), prefix.body_len() as u64).read_to_end(&mut body)?;
        prefix.finish_streamed(body)
    }

    /// Decode one envelope from an async reader.
    ///
    /// Same contract as [`Envelope::read_from`].
    pub async fn read_from_async<R>(reader: &mut R) -> Result<Self>
    where
        R: AsyncRead + Unpin,
    {
        let mut head = Vec::with_capacity(Self::PREFIX_SIZE);
        AsyncReadExt::take(&mut *reader, Self::PREFIX_SIZE as u64)
            .read_to_end(&mut head)
            .await?;
        let prefix = Prefix::parse_streamed(&head)?;

        let mut body = Vec::new();
        AsyncReadExt::take(&mut *reader, prefix.body_len() as u64)
            .read_to_end(&mut body)
            .await?;
        prefix.finish_streamed(body)
    }
}

/// Decoded length prefix.
#[derive(Debug, Clone, Copy)]
struct Prefix {
    header_nonce_len: usize,
    message_nonce_len: usize,
    header_ciphertext_len: usize,
    message_ciphertext_len: usize,
}

impl Prefix {
    fn of(envelope: &Envelope) -> Self {
        Self {
            header_nonce_len: envelope.header_nonce.len(),
            message_nonce_len: envelope.message_nonce.len(),
            header_ciphertext_len: envelope.header_ciphertext.len(),
            message_ciphertext_len: envelope.message_ciphertext.len(),
        }
    }

    /// Parse exactly [`Envelope::PREFIX_SIZE`] bytes.
    fn parse(mut src: &[u8]) -> Result<Self> {
        debug_assert_eq!(src.len(), Envelope::PREFIX_SIZE);

        let prefix = Self {
            header_nonce_len: usize::from(src.get_u8()),
            message_nonce_len: usize::from(src.get_u8()),
            header_ciphertext_len: src.get_u32() as usize,
            message_ciphertext_len: src.get_u32() as usize,
        };
        prefix.check_caps()?;

        Ok(prefix)
    }

    /// Like [`Prefix::parse`], but a short read is end of stream.
    fn parse_streamed(head: &[u8]) -> Result<Self> {
        if head.len() < Envelope::PREFIX_SIZE {
            return Err(ProtocolError::EnvelopeTruncated {
                expected: Envelope::PREFIX_SIZE,
                actual: head.len(),
            });
        }
        Self::parse(head)
    }

    fn finish_streamed(self, body: Vec<u8>) -> Result<Envelope> {
        if body.len() < self.body_len() {
            return Err(ProtocolError::EnvelopeTruncated {
                expected: self.total_len(),
                actual: Envelope::PREFIX_SIZE + body.len(),
            });
        }
        Ok(self.split(Bytes::from(body)))
    }

    fn check_caps(&self) -> Result<()> {
        let limits = [
            ("header nonce", self.header_nonce_len, Envelope::MAX_NONCE_LEN),
            ("message nonce", self.message_nonce_len, Envelope::MAX_NONCE_LEN),
            ("header ciphertext", self.header_ciphertext_len, Envelope::MAX_HEADER_CIPHERTEXT_LEN),
            (
                "message ciphertext",
                self.message_ciphertext_len,
                Envelope::MAX_MESSAGE_CIPHERTEXT_LEN,
            ),
        ];

        for (field, size, max) in limits {
            if size > max {
                return Err(ProtocolError::FieldTooLarge { field, size, max });
            }
        }
        Ok(())
    }

    fn body_len(&self) -> usize {
        self.header_nonce_len
            + self.message_nonce_len
            + self.header_ciphertext_len
            + self.message_ciphertext_len
    }

    fn total_len(&self) -> usize {
        Envelope::PREFIX_SIZE + self.body_len()
    }

    /// Split a body of at least `body_len()` bytes into the four fields.
    fn split(self, mut body: Bytes) -> Envelope {
        debug_assert!(body.len() >= self.body_len());

        let header_nonce = body.split_to(self.header_nonce_len);
        let message_nonce = body.split_to(self.message_nonce_len);
        let header_ciphertext = body.split_to(self.header_ciphertext_len);
        let message_ciphertext = body.split_to(self.message_ciphertext_len);

        Envelope { header_nonce, message_nonce, header_ciphertext, message_ciphertext }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    fn sample() -> Envelope {
        Envelope::new(vec![1u8; 12], vec![2u8; 12], vec![3u8; 60], b"body".to_vec())
    }

    #[test]
    fn encoded_len_matches_output() {
        let envelope = sample();
        let wire = envelope.to_bytes().unwrap();

        assert_eq!(wire.len(), envelope.encoded_len());
        assert_eq!(wire.len(), 10 + 12 + 12 + 60 + 4);
    }

    #[test]
    fn decode_round_trip() {
        let envelope = sample();
        let wire = envelope.to_bytes().unwrap();

        assert_eq!(Envelope::decode(&wire).unwrap(), envelope);
    }

    #[test]
    fn empty_fields_are_valid() {
        let wire = Envelope::default().to_bytes().unwrap();

        assert_eq!(wire, [0u8; 10]);
        assert_eq!(Envelope::decode(&wire).unwrap(), Envelope::default());
    }

    #[test]
    fn reject_short_prefix() {
        let result = Envelope::decode(&[0u8; 9]);
        assert_eq!(result, Err(ProtocolError::EnvelopeTooShort { expected: 10, actual: 9 }));
    }

    #[test]
    fn reject_truncated_body() {
        let wire = sample().to_bytes().unwrap();
        let result = Envelope::decode(&wire[..wire.len() - 1]);

        assert_eq!(
            result,
            Err(ProtocolError::EnvelopeTruncated { expected: wire.len(), actual: wire.len() - 1 })
        );
    }

    #[test]
    fn reject_oversized_declaration_before_reading_body() {
        let mut wire = vec![12, 12];
        wire.extend_from_slice(&2048u32.to_be_bytes());
        wire.extend_from_slice(&0u32.to_be_bytes());

        let result = Envelope::decode(&wire);
        assert_eq!(
            result,
            Err(ProtocolError::FieldTooLarge { field: "header ciphertext", size: 2048, max: 1024 })
        );
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let envelope = sample();
        let mut wire = envelope.to_bytes().unwrap();
        wire.extend_from_slice(b"trailing");

        assert_eq!(Envelope::decode(&wire).unwrap(), envelope);
    }

    #[test]
    fn encode_rejects_oversized_nonce() {
        let envelope = Envelope::new(vec![0u8; 256], Bytes::new(), Bytes::new(), Bytes::new());
        let mut wire = Vec::new();

        let result = envelope.encode(&mut wire);
        assert!(matches!(result, Err(ProtocolError::FieldTooLarge { field: "header nonce", .. })));
        assert!(wire.is_empty());
    }

    #[test]
    fn streaming_reads_consecutive_envelopes() {
        let first = sample();
        let second = Envelope::new(vec![9u8; 24], vec![8u8; 24], vec![7u8; 40], Bytes::new());

        let mut stream = first.to_bytes().unwrap();
        stream.extend(second.to_bytes().unwrap());
        let mut reader = stream.as_slice();

        assert_eq!(Envelope::read_from(&mut reader).unwrap(), first);
        assert_eq!(Envelope::read_from(&mut reader).unwrap(), second);
        assert!(reader.is_empty());
    }

    #[test]
    fn streaming_eof_inside_prefix_is_truncation() {
        let mut reader: &[u8] = &[0, 0, 0];

        let result = Envelope::read_from(&mut reader);
        assert_eq!(result, Err(ProtocolError::EnvelopeTruncated { expected: 10, actual: 3 }));
    }

    #[test]
    fn streaming_eof_inside_body_is_truncation() {
        let wire = sample().to_bytes().unwrap();
        let mut reader = &wire[..50];

        let result = Envelope::read_from(&mut reader);
        assert_eq!(
            result,
            Err(ProtocolError::EnvelopeTruncated { expected: wire.len(), actual: 50 })
        );
    }

    struct BrokenReader;

    impl Read for BrokenReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "peer went away"))
        }
    }

    #[test]
    fn reader_failure_is_io_error() {
        let result = Envelope::read_from(&mut BrokenReader);
        assert!(matches!(result, Err(ProtocolError::Io { .. })));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn async_reader_matches_sync_decode() {
        let envelope = sample();
        let wire = envelope.to_bytes().unwrap();
        let mut reader = wire.as_slice();

        let decoded = Envelope::read_from_async(&mut reader).await.unwrap();
        assert_eq!(decoded, envelope);
    }
}
