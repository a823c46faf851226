//! Key material with explicit wiping
//!
//! # Security Properties
//!
//! - Wipe on Drop: every [`Key`] and the private half of every [`DhKeyPair`]
//!   is zeroized when dropped
//! - Explicit Wipe: superseded keys can be zeroized in place before the owner
//!   goes away
//! - Constant-Time Comparison: equality never short-circuits on secret bytes
//! - Redacted Debug: secret bytes never reach logs through `{:?}`

use std::fmt;

use subtle::ConstantTimeEq;
use zeroize::{Zeroize, Zeroizing};

use crate::CryptoError;

/// Length of every ratchet key (root, header, chain, message keys).
pub const KEY_LEN: usize = 32;

/// A 32-byte secret key.
///
/// An all-zero key means "not established yet". No cipher operation is ever
/// attempted with such a key.
#[derive(Clone)]
pub struct Key([u8; KEY_LEN]);

impl Key {
    /// The unset (all-zero) key.
    pub const fn zero() -> Self {
        Self([0u8; KEY_LEN])
    }

    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Build a key from the leading [`KEY_LEN`] bytes of `bytes`.
    ///
    /// MAC digests longer than 32 bytes are truncated this way.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let Some(prefix) = bytes.get(..KEY_LEN) else {
            return Err(CryptoError::InvalidKeyLength { expected: KEY_LEN, actual: bytes.len() });
        };

        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(prefix);
        Ok(Self(key))
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// True if every byte is zero (unset or wiped).
    pub fn is_zero(&self) -> bool {
        self.0.ct_eq(&[0u8; KEY_LEN]).into()
    }

    /// Overwrite the key with zeros.
    pub fn wipe(&mut self) {
        self.0.zeroize();
    }
}

impl Default for Key {
    fn default() -> Self {
        Self::zero()
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for Key {}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() { f.write_str("Key(unset)") } else { f.write_str("Key(..)") }
    }
}

impl Drop for Key {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// An own Diffie-Hellman key pair.
///
/// The private key is stored in the curve's canonical scalar encoding, the
/// public key in its canonical point encoding (SEC1 for the NIST curves, raw
/// 32 bytes for X25519).
#[derive(Clone)]
pub struct DhKeyPair {
    private_key: Zeroizing<Vec<u8>>,
    public_key: Vec<u8>,
}

impl DhKeyPair {
    /// Assemble a key pair from its encoded halves.
    pub fn from_parts(private_key: Vec<u8>, public_key: Vec<u8>) -> Self {
        Self { private_key: Zeroizing::new(private_key), public_key }
    }

    /// A key pair with no material. Counts as wiped.
    pub fn empty() -> Self {
        Self::from_parts(Vec::new(), Vec::new())
    }

    /// Encoded private key.
    pub fn private_key(&self) -> &[u8] {
        &self.private_key
    }

    /// Encoded public key.
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// True if the private half is empty or all zero.
    pub fn is_wiped(&self) -> bool {
        self.private_key.iter().fold(0u8, |acc, byte| acc | byte) == 0
    }

    /// Zero the private half in place. The public half is kept, it is not
    /// secret and the peer may still reference it.
    pub fn wipe_private(&mut self) {
        self.private_key.as_mut_slice().zeroize();
    }
}

impl fmt::Debug for DhKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DhKeyPair")
            .field("private_key", &if self.is_wiped() { "wiped" } else { "<redacted>" })
            .field("public_key_len", &self.public_key.len())
            .finish()
    }
}
