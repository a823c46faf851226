//! Error types for ratchet operations

use axolotl_crypto::CryptoError;
use axolotl_proto::ProtocolError;
use thiserror::Error;

/// Result alias for ratchet operations.
pub type Result<T> = std::result::Result<T, RatchetError>;

/// Errors from encrypting, decrypting or restoring a session.
///
/// Every failing operation leaves the session exactly as it was before the
/// call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RatchetError {
    /// Envelope or header plaintext failed structural validation
    #[error("malformed message: {0}")]
    Malformed(#[from] ProtocolError),

    /// No key in the session opens this message, or it was already consumed
    #[error("message cannot be decrypted")]
    Undecryptable,

    /// Message is further ahead of its chain than the skip bound allows
    #[error("skip limit exceeded: {requested} skipped keys requested, max {max}")]
    SkipLimitExceeded {
        /// Keys that would have to be derived and cached
        requested: u32,
        /// Configured bound
        max: u32,
    },

    /// A message counter reached `u32::MAX`
    #[error("message counter overflow")]
    CounterOverflow,

    /// Session has no sending chain established
    #[error("no sending chain established")]
    NoSendingChain,

    /// Plaintext would exceed the envelope's message ciphertext cap
    #[error("plaintext too large: {size} bytes (max {max})")]
    PlaintextTooLarge {
        /// Plaintext length
        size: usize,
        /// Largest accepted plaintext
        max: usize,
    },

    /// Primitive failure
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Persisted session ended early
    #[error("persisted state truncated")]
    StateTruncated,

    /// Persisted session failed validation
    #[error("invalid persisted state: {reason}")]
    InvalidState {
        /// What failed validation
        reason: String,
    },
}

impl RatchetError {
    /// Returns true if this error is fatal (unrecoverable)
    ///
    /// Fatal errors mean the session itself is unusable or corrupt. Non-fatal
    /// errors reject one message or one call; the session keeps working.
    pub fn is_fatal(&self) -> bool {
        match self {
            // Session cannot continue
            Self::CounterOverflow => true,
            Self::NoSendingChain => true,
            Self::StateTruncated => true,
            Self::InvalidState { .. } => true,
            Self::Crypto(err) => !err.is_input_rejection(),

            // One message rejected
            Self::Malformed(_) => false,
            Self::Undecryptable => false,
            Self::SkipLimitExceeded { .. } => false,
            Self::PlaintextTooLarge { .. } => false,
        }
    }

    pub(crate) fn invalid_state(reason: impl Into<String>) -> Self {
        Self::InvalidState { reason: reason.into() }
    }
}
