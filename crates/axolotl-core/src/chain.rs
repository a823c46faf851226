//! Symmetric chain ratchet for per-message key derivation
//!
//! # Security Properties
//!
//! - Forward Secrecy: the chain key is replaced on every step and the old
//!   one is zeroized on drop
//! - Key Uniqueness: each message number yields a distinct message key
//! - Determinism: same chain key and MAC always produce the same sequence
//!
//! Chains operate on copies of the session's keys. The session adopts the
//! advanced chain only after the message it was advanced for authenticates.

use axolotl_crypto::{Key, MacAlgorithm};

use crate::error::{RatchetError, Result};

/// MAC input deriving a message key from a chain key.
const MESSAGE_KEY_BYTE: u8 = 0x00;

/// MAC input deriving the next chain key.
const CHAIN_KEY_BYTE: u8 = 0x01;

/// A message key and the chain position it was derived at.
pub(crate) struct MessageKey {
    key: Key,
    number: u32,
}

impl MessageKey {
    pub(crate) fn key(&self) -> &Key {
        &self.key
    }

    pub(crate) fn number(&self) -> u32 {
        self.number
    }

    pub(crate) fn into_key(self) -> Key {
        self.key
    }
}

/// One sending or receiving chain.
pub(crate) struct ChainRatchet {
    chain_key: Key,
    number: u32,
    mac: &'static dyn MacAlgorithm,
}

impl ChainRatchet {
    /// Start from `chain_key`, positioned at message `number`.
    pub(crate) fn new(chain_key: Key, number: u32, mac: &'static dyn MacAlgorithm) -> Self {
        Self { chain_key, number, mac }
    }

    /// Message number the next [`ChainRatchet::advance`] yields.
    #[cfg(test)]
    pub(crate) fn number(&self) -> u32 {
        self.number
    }

    /// Derive the message key for the current position and step the chain.
    pub(crate) fn advance(&mut self) -> Result<MessageKey> {
        if self.number == u32::MAX {
            return Err(RatchetError::CounterOverflow);
        }

        let key = self.derive(MESSAGE_KEY_BYTE)?;
        self.chain_key = self.derive(CHAIN_KEY_BYTE)?;

        let number = self.number;
        self.number += 1;

        Ok(MessageKey { key, number })
    }

    /// Derive keys for every position in `[number, target)`.
    ///
    /// Afterwards the chain sits at `target`. A target at or behind the
    /// current position yields nothing.
    pub(crate) fn skip_until(&mut self, target: u32, max_skip: u32) -> Result<Vec<MessageKey>> {
        if target <= self.number {
            return Ok(Vec::new());
        }

        let requested = target - self.number;
        if requested > max_skip {
            return Err(RatchetError::SkipLimitExceeded { requested, max: max_skip });
        }

        let mut keys = Vec::with_capacity(requested as usize);
        while self.number < target {
            keys.push(self.advance()?);
        }
        Ok(keys)
    }

    /// Skip to `target` and derive its key.
    ///
    /// Returns the keys for the skipped positions and the key for `target`.
    pub(crate) fn advance_to(
        &mut self,
        target: u32,
        max_skip: u32,
    ) -> Result<(Vec<MessageKey>, MessageKey)> {
        if target < self.number {
            return Err(RatchetError::Undecryptable);
        }

        let skipped = self.skip_until(target, max_skip)?;
        let key = self.advance()?;

        debug_assert_eq!(key.number(), target);
        Ok((skipped, key))
    }

    /// Chain key and position to write back into the session.
    pub(crate) fn into_parts(self) -> (Key, u32) {
        (self.chain_key, self.number)
    }

    fn derive(&self, domain: u8) -> Result<Key> {
        let digest = self.mac.finalize(self.chain_key.as_bytes(), &[domain])?;
        Ok(Key::from_slice(&digest)?)
    }
}

#[cfg(test)]
mod tests {
    use axolotl_crypto::MacId;

    use super::*;

    fn mac() -> &'static dyn MacAlgorithm {
        MacId::HmacSha256.algorithm()
    }

    fn test_key() -> Key {
        let mut seed = [0u8; 32];
        for (i, byte) in seed.iter_mut().enumerate() {
            *byte = i as u8;
        }
        Key::from_bytes(seed)
    }

    #[test]
    fn advance_increments_number() {
        let mut chain = ChainRatchet::new(test_key(), 0, mac());

        let key0 = chain.advance().unwrap();
        assert_eq!(key0.number(), 0);
        assert_eq!(chain.number(), 1);

        let key1 = chain.advance().unwrap();
        assert_eq!(key1.number(), 1);
        assert_eq!(chain.number(), 2);
    }

    #[test]
    fn message_key_is_mac_of_zero_byte() {
        let mut chain = ChainRatchet::new(test_key(), 0, mac());
        let key = chain.advance().unwrap();

        let expected = mac().finalize(test_key().as_bytes(), &[0x00]).unwrap();
        assert_eq!(key.key().as_bytes().as_slice(), &expected[..32]);

        let (next_chain_key, _) = chain.into_parts();
        let expected = mac().finalize(test_key().as_bytes(), &[0x01]).unwrap();
        assert_eq!(next_chain_key.as_bytes().as_slice(), &expected[..32]);
    }

    #[test]
    fn advance_produces_unique_keys() {
        let mut chain = ChainRatchet::new(test_key(), 0, mac());

        let key0 = chain.advance().unwrap();
        let key1 = chain.advance().unwrap();
        let key2 = chain.advance().unwrap();

        assert_ne!(key0.key(), key1.key(), "keys must be unique");
        assert_ne!(key1.key(), key2.key(), "keys must be unique");
        assert_ne!(key0.key(), key2.key(), "keys must be unique");
    }

    #[test]
    fn advance_to_matches_sequential_advance() {
        let mut sequential = ChainRatchet::new(test_key(), 0, mac());
        let mut jumped = ChainRatchet::new(test_key(), 0, mac());

        let mut expected = Vec::new();
        for _ in 0..=5 {
            expected.push(sequential.advance().unwrap());
        }

        let (skipped, key) = jumped.advance_to(5, 1000).unwrap();

        assert_eq!(skipped.len(), 5);
        for (skipped, expected) in skipped.iter().zip(&expected) {
            assert_eq!(skipped.number(), expected.number());
            assert_eq!(skipped.key(), expected.key());
        }
        assert_eq!(key.key(), expected[5].key());
        assert_eq!(jumped.number(), 6);
    }

    #[test]
    fn advance_to_behind_is_rejected() {
        let mut chain = ChainRatchet::new(test_key(), 3, mac());
        assert!(matches!(chain.advance_to(2, 1000), Err(RatchetError::Undecryptable)));
        assert_eq!(chain.number(), 3);
    }

    #[test]
    fn skip_limit_is_enforced() {
        let mut chain = ChainRatchet::new(test_key(), 0, mac());

        assert!(chain.skip_until(10, 10).is_ok());
        assert_eq!(chain.number(), 10);

        let result = chain.skip_until(21, 10);
        assert!(matches!(result, Err(RatchetError::SkipLimitExceeded { requested: 11, max: 10 })));
        assert_eq!(chain.number(), 10);
    }

    #[test]
    fn overflow_is_detected() {
        let mut chain = ChainRatchet::new(test_key(), u32::MAX, mac());
        assert!(matches!(chain.advance(), Err(RatchetError::CounterOverflow)));
    }

    #[test]
    fn ratchet_is_deterministic() {
        let mut chain1 = ChainRatchet::new(test_key(), 0, mac());
        let mut chain2 = ChainRatchet::new(test_key(), 0, mac());

        for _ in 0..10 {
            let key1 = chain1.advance().unwrap();
            let key2 = chain2.advance().unwrap();
            assert_eq!(key1.key(), key2.key(), "same chain key must produce same keys");
        }
    }
}
