//! Axolotl Wire Protocol
//!
//! Byte-exact codecs for what travels between two ratchet sessions:
//!
//! - [`Envelope`]: length-prefixed container for the two nonces and the two
//!   AEAD ciphertexts of one message
//! - [`MessageHeader`]: the plaintext sealed inside the header ciphertext
//!
//! All integers are big-endian. Decoding validates structure only; nothing
//! here is authenticated until the ratchet opens the ciphertexts.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod envelope;
pub mod errors;
pub mod header;

pub use envelope::Envelope;
pub use errors::{ProtocolError, Result};
pub use header::MessageHeader;
