//! Error types for wire decoding.
//!
//! Every variant describes attacker-controlled input that failed structural
//! validation. None of them say anything about authenticity; that is decided
//! later by the AEAD layer.

use std::io;

use thiserror::Error;

/// Result alias for codec operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Structural decoding and encoding failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Input ended before the fixed-size length prefix
    #[error("envelope too short: expected at least {expected} bytes, got {actual}")]
    EnvelopeTooShort {
        /// Prefix size
        expected: usize,
        /// Bytes available
        actual: usize,
    },

    /// Input ended before the lengths declared in the prefix
    #[error("envelope truncated: expected {expected} bytes, got {actual}")]
    EnvelopeTruncated {
        /// Total declared envelope length
        expected: usize,
        /// Bytes available
        actual: usize,
    },

    /// A declared or supplied field length exceeds its cap
    #[error("{field} too large: {size} bytes (max {max})")]
    FieldTooLarge {
        /// Which field was oversized
        field: &'static str,
        /// Declared or actual size
        size: usize,
        /// Maximum allowed size
        max: usize,
    },

    /// Decrypted header plaintext is shorter than its two counters
    #[error("header too short: expected at least {expected} bytes, got {actual}")]
    HeaderTooShort {
        /// Fixed counter size
        expected: usize,
        /// Plaintext length
        actual: usize,
    },

    /// Decrypted header carries no DH public key
    #[error("header carries an empty public key")]
    EmptyPublicKey,

    /// Underlying reader failed for a reason other than end of input
    #[error("i/o error: {reason}")]
    Io {
        /// Reader error message
        reason: String,
    },
}

impl From<io::Error> for ProtocolError {
    fn from(err: io::Error) -> Self {
        Self::Io { reason: err.to_string() }
    }
}
