//! Axolotl Ratchet Core
//!
//! Session state machine for the Axolotl (double ratchet) protocol. Two
//! parties that share a master secret exchange an unbounded stream of
//! encrypted messages that may arrive late, out of order, or not at all,
//! while key material rotates continuously.
//!
//! # Architecture
//!
//! ```text
//! encrypt(plaintext) ──► [DH step if due] ──► chain step ──► seal header + body ──► Envelope
//!
//! Envelope ──► skipped keys? ──► current chain? ──► next chain (DH step) ──► plaintext
//! ```
//!
//! - [`RatchetState`]: the session; construction, encrypt, decrypt,
//!   persistence
//! - [`SkippedKeys`]: bounded cache of keys for messages not yet received
//! - [`RatchetConfig`]: limits on skipping and caching
//!
//! # Security
//!
//! Forward Secrecy:
//! - Chain keys are replaced on every message; message keys are used once
//! - The own DH private key is wiped as soon as the peer's new key is seen
//!
//! Break-in Recovery:
//! - Every round trip mixes a fresh DH output into the root key
//!
//! Atomicity:
//! - A failed encrypt or decrypt leaves the session unchanged, so
//!   adversarial input cannot desynchronize it

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod chain;
mod config;
mod decrypt;
mod encrypt;
mod error;
mod persistence;
mod skipped;
mod state;

pub use axolotl_crypto::{CipherSuite, DhKeyPair, RandomSource};
pub use axolotl_proto::Envelope;
pub use config::RatchetConfig;
pub use error::{RatchetError, Result};
pub use skipped::SkippedKeys;
pub use state::RatchetState;
