//! Randomness capability.
//!
//! Protocol code never reaches for a global RNG. Every operation that needs
//! fresh bytes takes a [`RandomSource`], so tests can run against a seeded
//! generator and production code against the OS.

use rand::{CryptoRng, RngCore};

use crate::CryptoError;

/// Source of cryptographically secure random bytes.
///
/// # Invariants
///
/// - Implementations MUST use cryptographically secure entropy in production
/// - Given the same seed, a deterministic implementation produces the same
///   sequence of bytes
pub trait RandomSource {
    /// Fills `buffer` entirely, or fails without a partial guarantee.
    fn fill_random(&mut self, buffer: &mut [u8]) -> Result<(), CryptoError>;
}

impl<R: RngCore + CryptoRng> RandomSource for R {
    fn fill_random(&mut self, buffer: &mut [u8]) -> Result<(), CryptoError> {
        self.try_fill_bytes(buffer)
            .map_err(|err| CryptoError::RandomnessUnavailable { reason: err.to_string() })
    }
}
