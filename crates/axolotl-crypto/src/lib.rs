//! Axolotl Cryptographic Primitives
//!
//! Pluggable primitive layer for the Axolotl ratchet. Curves, AEAD ciphers,
//! KDFs and MACs are selected per session by small integer identifiers and
//! resolved once into capability trait objects. Callers provide randomness
//! through [`RandomSource`] for deterministic testing.
//!
//! # Key Hierarchy
//!
//! ```text
//! Master Secret
//!        │
//!        ▼
//! KDF stream → Root Key, Header Keys, first Chain Key
//!        │
//!        ▼
//! DH step: MAC(Root Key)(DH output) → KDF → new Root, Next Header, Chain
//!        │
//!        ▼
//! Chain step: MAC(Chain Key)(0x00) → Message Key
//!             MAC(Chain Key)(0x01) → next Chain Key
//!        │
//!        ▼
//! AEAD Encryption → Header ciphertext + Body ciphertext
//! ```
//!
//! # Security
//!
//! Key Hygiene:
//! - [`Key`] and [`DhKeyPair`] zeroize secret bytes on drop
//! - Superseded keys are wiped explicitly by the ratchet
//! - Debug output never contains secret bytes
//!
//! Input Rejection:
//! - AEAD failures surface as [`CryptoError::AuthenticationFailed`]
//! - Invalid or low-order peer keys surface as [`CryptoError::InvalidPeerKey`]

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod error;
mod key;
mod random;
pub mod registry;

pub use error::CryptoError;
pub use key::{DhKeyPair, KEY_LEN, Key};
pub use random::RandomSource;
pub use registry::{
    AeadAlgorithm, CipherId, CipherSuite, CurveAlgorithm, CurveId, KdfAlgorithm, KdfId, KdfStream,
    MacAlgorithm, MacId, Primitives,
};
