//! Encryption engine.
//!
//! Sealing works on staged copies of the sending keys. The session adopts
//! them only once both the header and the body have been sealed, so a failed
//! call (randomness, cipher, counter overflow) changes nothing.

use axolotl_crypto::{CryptoError, DhKeyPair, KEY_LEN, Key, RandomSource};
use axolotl_proto::{Envelope, MessageHeader};
use bytes::Bytes;
use tracing::debug;
use zeroize::Zeroizing;

use crate::{
    chain::ChainRatchet,
    error::{RatchetError, Result},
    state::RatchetState,
};

/// A sending DH ratchet step that has been computed but not adopted.
struct SendStep {
    keypair: DhKeyPair,
    root_key: Key,
    header_key_send: Key,
    next_header_key_send: Key,
    chain_key_send: Key,
    header_nonce_seed: Key,
    prev_msg_num_send: u32,
}

/// Everything one encryption changes.
struct PendingSend {
    step: Option<SendStep>,
    chain_key_send: Key,
    msg_num_send: u32,
}

impl RatchetState {
    /// Encrypt `plaintext` into wire bytes.
    ///
    /// Randomness for the body nonce (and for a DH step, if one is due) comes
    /// from `rng`.
    ///
    /// # Errors
    ///
    /// - `NoSendingChain` if the session has no sending keys
    /// - `CounterOverflow` if the sending chain is exhausted
    /// - `PlaintextTooLarge` if the body would exceed the envelope cap
    /// - `Crypto` for randomness or cipher failures
    pub fn encrypt(&mut self, plaintext: &[u8], rng: &mut dyn RandomSource) -> Result<Vec<u8>> {
        let (envelope, pending) = self.seal(plaintext, rng)?;
        let wire = envelope.to_bytes()?;

        self.commit_send(pending);
        Ok(wire)
    }

    /// Encrypt `plaintext` into an [`Envelope`].
    ///
    /// Same contract as [`encrypt`](Self::encrypt).
    pub fn encrypt_envelope(
        &mut self,
        plaintext: &[u8],
        rng: &mut dyn RandomSource,
    ) -> Result<Envelope> {
        let (envelope, pending) = self.seal(plaintext, rng)?;

        self.commit_send(pending);
        Ok(envelope)
    }

    fn seal(
        &self,
        plaintext: &[u8],
        rng: &mut dyn RandomSource,
    ) -> Result<(Envelope, PendingSend)> {
        let step = if self.ratchet_due { Some(self.prepare_send_step(rng)?) } else { None };

        let (header_key, chain_key, nonce_seed, public_key, previous, number) = match &step {
            Some(step) => (
                &step.header_key_send,
                &step.chain_key_send,
                &step.header_nonce_seed,
                step.keypair.public_key(),
                step.prev_msg_num_send,
                0,
            ),
            None => (
                &self.header_key_send,
                &self.chain_key_send,
                &self.header_nonce_seed,
                self.dh_keypair.public_key(),
                self.prev_msg_num_send,
                self.msg_num_send,
            ),
        };

        if header_key.is_zero() || chain_key.is_zero() || public_key.is_empty() {
            return Err(RatchetError::NoSendingChain);
        }

        let mut chain = ChainRatchet::new(chain_key.clone(), number, self.primitives.mac);
        let message_key = chain.advance()?;

        let header = MessageHeader {
            message_number: number,
            previous_chain_length: previous,
            dh_public_key: Bytes::copy_from_slice(public_key),
        };

        let cipher = self.primitives.cipher;
        let header_nonce = self.header_nonce(nonce_seed, number)?;
        let mut message_nonce = vec![0u8; cipher.nonce_len()];
        rng.fill_random(&mut message_nonce)?;

        let header_ciphertext =
            cipher.seal(header_key.as_bytes(), &header_nonce, &header.to_bytes(), &[])?;
        let message_ciphertext = cipher.seal(
            message_key.key().as_bytes(),
            &message_nonce,
            plaintext,
            &header_ciphertext,
        )?;

        if message_ciphertext.len() > Envelope::MAX_MESSAGE_CIPHERTEXT_LEN {
            let overhead = message_ciphertext.len() - plaintext.len();
            return Err(RatchetError::PlaintextTooLarge {
                size: plaintext.len(),
                max: Envelope::MAX_MESSAGE_CIPHERTEXT_LEN - overhead,
            });
        }

        let envelope =
            Envelope::new(header_nonce, message_nonce, header_ciphertext, message_ciphertext);
        let (chain_key_send, msg_num_send) = chain.into_parts();

        Ok((envelope, PendingSend { step, chain_key_send, msg_num_send }))
    }

    /// Fresh key pair, DH against the peer, new root/header/chain keys and a
    /// new header nonce seed.
    fn prepare_send_step(&self, rng: &mut dyn RandomSource) -> Result<SendStep> {
        if self.peer_public_key.is_empty() {
            return Err(RatchetError::NoSendingChain);
        }

        let curve = self.primitives.curve;
        let keypair = curve.generate_keypair(rng)?;
        let dh_output = curve.shared_secret(keypair.private_key(), &self.peer_public_key)?;
        let (root_key, next_header_key_send, chain_key_send) = self.root_step(&dh_output)?;

        let mut seed = Zeroizing::new([0u8; KEY_LEN]);
        rng.fill_random(seed.as_mut_slice())?;

        Ok(SendStep {
            keypair,
            root_key,
            header_key_send: self.next_header_key_send.clone(),
            next_header_key_send,
            chain_key_send,
            header_nonce_seed: Key::from_bytes(*seed),
            prev_msg_num_send: self.msg_num_send,
        })
    }

    /// Header nonce: leading `nonce_len` bytes of `MAC(seed)(number BE)`.
    fn header_nonce(&self, seed: &Key, number: u32) -> Result<Vec<u8>> {
        let nonce_len = self.primitives.cipher.nonce_len();
        let digest = self.primitives.mac.finalize(seed.as_bytes(), &number.to_be_bytes())?;

        let Some(nonce) = digest.get(..nonce_len) else {
            return Err(RatchetError::Crypto(CryptoError::InvalidNonceLength {
                expected: nonce_len,
                actual: digest.len(),
            }));
        };
        Ok(nonce.to_vec())
    }

    fn commit_send(&mut self, pending: PendingSend) {
        if let Some(step) = pending.step {
            debug!(
                previous_chain_length = step.prev_msg_num_send,
                "sending DH ratchet step"
            );

            self.dh_keypair = step.keypair;
            self.root_key = step.root_key;
            self.header_key_send = step.header_key_send;
            self.next_header_key_send = step.next_header_key_send;
            self.header_nonce_seed = step.header_nonce_seed;
            self.prev_msg_num_send = step.prev_msg_num_send;
            self.ratchet_due = false;
        }

        self.chain_key_send = pending.chain_key_send;
        self.msg_num_send = pending.msg_num_send;
    }
}
