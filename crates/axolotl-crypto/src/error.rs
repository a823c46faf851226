//! Error types for primitive operations

use thiserror::Error;

/// Errors from the primitive layer (curves, AEADs, KDFs, MACs, randomness).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Algorithm identifier is unknown or not provided by this build
    #[error("unsupported {kind} algorithm id {id}")]
    UnsupportedAlgorithm {
        /// Algorithm family ("curve", "cipher", "kdf", "mac")
        kind: &'static str,
        /// Raw identifier that failed to resolve
        id: u8,
    },

    /// Key material is shorter than the algorithm requires
    #[error("invalid key length: expected at least {expected}, got {actual}")]
    InvalidKeyLength {
        /// Minimum key length
        expected: usize,
        /// Actual key length
        actual: usize,
    },

    /// Nonce length does not match the cipher's nonce size
    #[error("invalid nonce length: expected {expected}, got {actual}")]
    InvalidNonceLength {
        /// Cipher nonce size
        expected: usize,
        /// Provided nonce length
        actual: usize,
    },

    /// AEAD tag verification failed
    #[error("authentication failed")]
    AuthenticationFailed,

    /// AEAD refused to seal (plaintext exceeds the cipher's limit)
    #[error("encryption failed")]
    EncryptionFailed,

    /// Peer public key is not a valid point (or is low order)
    #[error("invalid peer public key")]
    InvalidPeerKey,

    /// Private key bytes could not be turned into a scalar
    #[error("key generation failed")]
    KeyGenerationFailed,

    /// Randomness source could not produce bytes
    #[error("randomness unavailable: {reason}")]
    RandomnessUnavailable {
        /// Error reported by the source
        reason: String,
    },

    /// KDF output stream ran past the algorithm's output limit
    #[error("kdf exhausted: requested {requested} bytes, {available} available")]
    KdfExhausted {
        /// Total bytes requested from the stream
        requested: usize,
        /// Maximum bytes the KDF can produce
        available: usize,
    },
}

impl CryptoError {
    /// Returns true if the error indicates attacker-controlled input was
    /// rejected, as opposed to a local misconfiguration or environment fault.
    pub fn is_input_rejection(&self) -> bool {
        matches!(self, Self::AuthenticationFailed | Self::InvalidPeerKey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_failure_is_input_rejection() {
        assert!(CryptoError::AuthenticationFailed.is_input_rejection());
        assert!(CryptoError::InvalidPeerKey.is_input_rejection());
    }

    #[test]
    fn misconfiguration_is_not_input_rejection() {
        assert!(!CryptoError::UnsupportedAlgorithm { kind: "curve", id: 0 }.is_input_rejection());
        assert!(!CryptoError::InvalidKeyLength { expected: 32, actual: 16 }.is_input_rejection());
        assert!(!CryptoError::KdfExhausted { requested: 9000, available: 8160 }.is_input_rejection());
    }

    #[test]
    fn error_display() {
        let err = CryptoError::UnsupportedAlgorithm { kind: "cipher", id: 1 };
        assert_eq!(err.to_string(), "unsupported cipher algorithm id 1");
    }
}
