//! Header plaintext sealed inside every envelope.

use bytes::{Buf, BufMut, Bytes};

use crate::errors::{ProtocolError, Result};

/// Decrypted message header.
///
/// Layout: `message_number (u32 BE) || previous_chain_length (u32 BE) ||
/// dh_public_key`. The public key runs to the end of the plaintext; its
/// encoding depends on the session's curve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    /// Position of this message in the sender's current chain
    pub message_number: u32,
    /// Number of messages the sender sent in its previous chain
    pub previous_chain_length: u32,
    /// Sender's current ratchet public key
    pub dh_public_key: Bytes,
}

impl MessageHeader {
    /// Size of the two counters preceding the public key.
    pub const FIXED_SIZE: usize = 8;

    /// Exact number of bytes [`MessageHeader::encode`] writes.
    pub fn encoded_len(&self) -> usize {
        Self::FIXED_SIZE + self.dh_public_key.len()
    }

    /// Encode into `dst`.
    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_u32(self.message_number);
        dst.put_u32(self.previous_chain_length);
        dst.put_slice(&self.dh_public_key);
    }

    /// Encode into a fresh buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.encode(&mut out);
        out
    }

    /// Decode a header plaintext.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::HeaderTooShort` if fewer than 8 bytes are given
    /// - `ProtocolError::EmptyPublicKey` if nothing follows the counters
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::FIXED_SIZE {
            return Err(ProtocolError::HeaderTooShort {
                expected: Self::FIXED_SIZE,
                actual: bytes.len(),
            });
        }

        let mut src = bytes;
        let message_number = src.get_u32();
        let previous_chain_length = src.get_u32();

        if src.is_empty() {
            return Err(ProtocolError::EmptyPublicKey);
        }

        Ok(Self { message_number, previous_chain_length, dh_public_key: Bytes::copy_from_slice(src) })
    }
}
