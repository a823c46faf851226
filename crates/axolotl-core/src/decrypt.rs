//! Decryption engine.
//!
//! An incoming message is tried against, in order:
//!
//! 1. Cached skipped keys: one header trial per distinct cached header key,
//!    then an O(1) lookup by message number
//! 2. The current receiving chain (`header_key_recv`)
//! 3. A new receiving chain (`next_header_key_recv`), which costs a DH
//!    ratchet step
//!
//! All derivation happens on copies. Nothing is written back until the body
//! authenticates.

use std::io::Read;

use axolotl_crypto::{CryptoError, Key};
use axolotl_proto::{Envelope, MessageHeader};
use tracing::{debug, trace};

use crate::{
    chain::{ChainRatchet, MessageKey},
    error::{RatchetError, Result},
    state::RatchetState,
};

impl RatchetState {
    /// Decrypt wire bytes produced by the peer's [`encrypt`](Self::encrypt).
    ///
    /// # Errors
    ///
    /// - `Malformed` if the bytes are not a valid envelope
    /// - `Undecryptable` if no key opens the message, it was already
    ///   consumed, or the body fails authentication
    /// - `SkipLimitExceeded` if the message is too far ahead of its chain
    /// - `Crypto` for primitive failures (e.g. an invalid peer key)
    pub fn decrypt(&mut self, bytes: &[u8]) -> Result<Vec<u8>> {
        let envelope = Envelope::decode(bytes)?;
        self.decrypt_envelope(&envelope)
    }

    /// Read one envelope from `reader` and decrypt it.
    pub fn decrypt_from_reader(&mut self, reader: &mut impl Read) -> Result<Vec<u8>> {
        let envelope = Envelope::read_from(reader)?;
        self.decrypt_envelope(&envelope)
    }

    /// Decrypt an already-decoded envelope.
    pub fn decrypt_envelope(&mut self, envelope: &Envelope) -> Result<Vec<u8>> {
        let nonce_len = self.primitives.cipher.nonce_len();
        if envelope.header_nonce.len() != nonce_len || envelope.message_nonce.len() != nonce_len {
            trace!(nonce_len, "nonce length does not match suite");
            return Err(RatchetError::Undecryptable);
        }

        if let Some(plaintext) = self.try_skipped_keys(envelope)? {
            trace!("decrypted with skipped message key");
            return Ok(plaintext);
        }

        if let Some(plaintext) = self.try_current_chain(envelope)? {
            trace!(receive_count = self.msg_num_recv, "decrypted on current receiving chain");
            return Ok(plaintext);
        }

        let plaintext = self.try_next_chain(envelope)?;
        trace!(receive_count = self.msg_num_recv, "decrypted on new receiving chain");
        Ok(plaintext)
    }

    fn try_skipped_keys(&mut self, envelope: &Envelope) -> Result<Option<Vec<u8>>> {
        let mut found = None;

        for header_key in self.skipped.header_keys() {
            let Some(header) = self.open_header(header_key, envelope)? else {
                continue;
            };
            let Some(message_key) = self.skipped.lookup(header_key, header.message_number) else {
                continue;
            };

            let plaintext = self.open_body(message_key, envelope)?;
            found = Some((header_key.clone(), header.message_number, plaintext));
            break;
        }

        let Some((header_key, number, plaintext)) = found else {
            return Ok(None);
        };

        self.skipped.take(&header_key, number);
        Ok(Some(plaintext))
    }

    fn try_current_chain(&mut self, envelope: &Envelope) -> Result<Option<Vec<u8>>> {
        let Some(header) = self.open_header(&self.header_key_recv, envelope)? else {
            return Ok(None);
        };

        let mut chain =
            ChainRatchet::new(self.chain_key_recv.clone(), self.msg_num_recv, self.primitives.mac);
        let (skipped, message_key) =
            chain.advance_to(header.message_number, self.config.max_skip)?;

        let plaintext = self.open_body(message_key.key(), envelope)?;

        let header_key = self.header_key_recv.clone();
        self.stash_skipped(&header_key, skipped);

        let (chain_key, number) = chain.into_parts();
        self.chain_key_recv = chain_key;
        self.msg_num_recv = number;

        Ok(Some(plaintext))
    }

    fn try_next_chain(&mut self, envelope: &Envelope) -> Result<Vec<u8>> {
        if self.ratchet_due || self.dh_keypair.is_wiped() {
            return Err(RatchetError::Undecryptable);
        }

        let Some(header) = self.open_header(&self.next_header_key_recv, envelope)? else {
            return Err(RatchetError::Undecryptable);
        };

        let max_skip = self.config.max_skip;
        let mac = self.primitives.mac;

        // Keys left behind on the chain being replaced.
        let old_skipped = if self.header_key_recv.is_zero() || self.chain_key_recv.is_zero() {
            Vec::new()
        } else {
            let mut old = ChainRatchet::new(self.chain_key_recv.clone(), self.msg_num_recv, mac);
            old.skip_until(header.previous_chain_length, max_skip)?
        };

        let dh_output = self
            .primitives
            .curve
            .shared_secret(self.dh_keypair.private_key(), &header.dh_public_key)?;
        let (root_key, next_header_key_recv, chain_key_recv) = self.root_step(&dh_output)?;

        let mut chain = ChainRatchet::new(chain_key_recv, 0, mac);
        let (new_skipped, message_key) = chain.advance_to(header.message_number, max_skip)?;

        let plaintext = self.open_body(message_key.key(), envelope)?;

        debug!(
            previous_chain_length = header.previous_chain_length,
            message_number = header.message_number,
            "receiving DH ratchet step"
        );

        let header_key_recv = std::mem::replace(&mut self.next_header_key_recv, next_header_key_recv);
        let old_header_key = std::mem::replace(&mut self.header_key_recv, header_key_recv);
        self.stash_skipped(&old_header_key, old_skipped);
        let current_header_key = self.header_key_recv.clone();
        self.stash_skipped(&current_header_key, new_skipped);

        let (chain_key, number) = chain.into_parts();
        self.root_key = root_key;
        self.chain_key_recv = chain_key;
        self.msg_num_recv = number;
        self.peer_public_key = header.dh_public_key.to_vec();
        self.dh_keypair.wipe_private();
        self.ratchet_due = true;

        Ok(plaintext)
    }

    /// Trial-open the header. `None` if `header_key` is unset or does not
    /// authenticate it.
    fn open_header(&self, header_key: &Key, envelope: &Envelope) -> Result<Option<MessageHeader>> {
        if header_key.is_zero() {
            return Ok(None);
        }

        match self.primitives.cipher.open(
            header_key.as_bytes(),
            &envelope.header_nonce,
            &envelope.header_ciphertext,
            &[],
        ) {
            Ok(plaintext) => Ok(Some(MessageHeader::decode(&plaintext)?)),
            Err(CryptoError::AuthenticationFailed) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Open the body, bound to the header ciphertext.
    fn open_body(&self, message_key: &Key, envelope: &Envelope) -> Result<Vec<u8>> {
        self.primitives
            .cipher
            .open(
                message_key.as_bytes(),
                &envelope.message_nonce,
                &envelope.message_ciphertext,
                &envelope.header_ciphertext,
            )
            .map_err(|err| match err {
                CryptoError::AuthenticationFailed => RatchetError::Undecryptable,
                other => RatchetError::Crypto(other),
            })
    }

    fn stash_skipped(&mut self, header_key: &Key, keys: Vec<MessageKey>) {
        if keys.is_empty() {
            return;
        }

        debug!(count = keys.len(), "caching skipped message keys");
        for key in keys {
            let number = key.number();
            self.skipped.insert(header_key, number, key.into_key());
        }
    }
}
