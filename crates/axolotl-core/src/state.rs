//! Ratchet session state and construction.

use std::fmt;

use axolotl_crypto::{CipherSuite, CryptoError, DhKeyPair, KEY_LEN, Key, Primitives};

use crate::{
    config::RatchetConfig,
    error::{RatchetError, Result},
    skipped::SkippedKeys,
};

/// One side of an Axolotl session.
///
/// Holds every key the session needs: the root key driving the DH ratchet,
/// the sending and receiving chain keys driving the symmetric ratchets, and
/// the current and next header keys for each direction.
///
/// # Invariants
///
/// - Chain keys only move forward through the chain step
/// - Message counters only increase within a chain and reset on a DH step
/// - A receiving DH step wipes the own private key before returning
/// - A failed [`encrypt`](Self::encrypt) or [`decrypt`](Self::decrypt)
///   leaves the state exactly as it was
///
/// # Security
///
/// Every key is zeroized on drop. `Debug` output shows counters and flags
/// only.
pub struct RatchetState {
    pub(crate) suite: CipherSuite,
    pub(crate) primitives: Primitives,
    pub(crate) sender_side: bool,

    pub(crate) root_key: Key,
    pub(crate) header_key_send: Key,
    pub(crate) header_key_recv: Key,
    pub(crate) next_header_key_send: Key,
    pub(crate) next_header_key_recv: Key,
    pub(crate) chain_key_send: Key,
    pub(crate) chain_key_recv: Key,
    pub(crate) header_nonce_seed: Key,

    pub(crate) dh_keypair: DhKeyPair,
    pub(crate) peer_public_key: Vec<u8>,

    pub(crate) msg_num_send: u32,
    pub(crate) msg_num_recv: u32,
    pub(crate) prev_msg_num_send: u32,
    pub(crate) ratchet_due: bool,

    pub(crate) skipped: SkippedKeys,
    pub(crate) config: RatchetConfig,
}

impl RatchetState {
    /// Start a session as the side that sends first.
    ///
    /// The first [`encrypt`](Self::encrypt) performs a DH ratchet step
    /// against `peer_public_key`, which is the receiver's initial ratchet key.
    ///
    /// # Errors
    ///
    /// - `Crypto(InvalidKeyLength)` if `master_secret` is shorter than 32
    ///   bytes
    /// - `Crypto(InvalidPeerKey)` if `peer_public_key` is not a valid point
    pub fn new_sender(
        suite: CipherSuite,
        master_secret: &[u8],
        peer_public_key: &[u8],
    ) -> Result<Self> {
        let primitives = suite.primitives();
        check_master_secret(master_secret)?;
        primitives.curve.validate_public_key(peer_public_key)?;

        let mut kdf = primitives.kdf.derive(master_secret, &[], &[]);
        let root_key = kdf.next_key()?;
        let header_key_recv = kdf.next_key()?;
        let next_header_key_send = kdf.next_key()?;
        let next_header_key_recv = kdf.next_key()?;
        let chain_key_recv = kdf.next_key()?;

        Ok(Self {
            suite,
            primitives,
            sender_side: true,
            root_key,
            header_key_send: Key::zero(),
            header_key_recv,
            next_header_key_send,
            next_header_key_recv,
            chain_key_send: Key::zero(),
            chain_key_recv,
            header_nonce_seed: Key::zero(),
            dh_keypair: DhKeyPair::empty(),
            peer_public_key: peer_public_key.to_vec(),
            msg_num_send: 0,
            msg_num_recv: 0,
            prev_msg_num_send: 0,
            ratchet_due: true,
            skipped: SkippedKeys::new(RatchetConfig::DEFAULT_MAX_SKIPPED_KEYS),
            config: RatchetConfig::default(),
        })
    }

    /// Start a session as the side that receives first.
    ///
    /// `own_keypair` is the ratchet key pair whose public half the sender was
    /// given. The receiver can send immediately; its first messages travel on
    /// the chain derived from the master secret.
    ///
    /// # Errors
    ///
    /// - `Crypto(InvalidKeyLength)` if `master_secret` is shorter than 32
    ///   bytes
    /// - `Crypto(InvalidPeerKey)` if the public half is not a valid point
    pub fn new_receiver(
        suite: CipherSuite,
        master_secret: &[u8],
        own_keypair: DhKeyPair,
    ) -> Result<Self> {
        let primitives = suite.primitives();
        check_master_secret(master_secret)?;
        primitives.curve.validate_public_key(own_keypair.public_key())?;

        let mut kdf = primitives.kdf.derive(master_secret, &[], &[]);
        let root_key = kdf.next_key()?;
        let header_key_send = kdf.next_key()?;
        let next_header_key_recv = kdf.next_key()?;
        let next_header_key_send = kdf.next_key()?;
        let chain_key_send = kdf.next_key()?;
        let header_nonce_seed = kdf.next_key()?;

        Ok(Self {
            suite,
            primitives,
            sender_side: false,
            root_key,
            header_key_send,
            header_key_recv: Key::zero(),
            next_header_key_send,
            next_header_key_recv,
            chain_key_send,
            chain_key_recv: Key::zero(),
            header_nonce_seed,
            dh_keypair: own_keypair,
            peer_public_key: Vec::new(),
            msg_num_send: 0,
            msg_num_recv: 0,
            prev_msg_num_send: 0,
            ratchet_due: false,
            skipped: SkippedKeys::new(RatchetConfig::DEFAULT_MAX_SKIPPED_KEYS),
            config: RatchetConfig::default(),
        })
    }

    /// Replace the session limits. Shrinking the cache bound evicts the
    /// oldest skipped keys immediately.
    #[must_use]
    pub fn with_config(mut self, config: RatchetConfig) -> Self {
        self.skipped.set_limit(config.max_skipped_keys);
        self.config = config;
        self
    }

    /// Algorithms this session was created with.
    pub fn suite(&self) -> CipherSuite {
        self.suite
    }

    /// Current limits.
    pub fn config(&self) -> RatchetConfig {
        self.config
    }

    /// True if this side was created with [`RatchetState::new_sender`].
    pub fn is_sender(&self) -> bool {
        self.sender_side
    }

    /// True if the next [`encrypt`](Self::encrypt) starts a new sending chain.
    pub fn ratchet_due(&self) -> bool {
        self.ratchet_due
    }

    /// Number of the next message this side sends.
    pub fn send_count(&self) -> u32 {
        self.msg_num_send
    }

    /// Number of the next message expected on the current receiving chain.
    pub fn receive_count(&self) -> u32 {
        self.msg_num_recv
    }

    /// Length of this side's previous sending chain.
    pub fn previous_send_count(&self) -> u32 {
        self.prev_msg_num_send
    }

    /// Own current ratchet public key (empty before the sender's first step).
    pub fn own_public_key(&self) -> &[u8] {
        self.dh_keypair.public_key()
    }

    /// True once the own private ratchet key has been consumed.
    pub fn own_private_key_wiped(&self) -> bool {
        self.dh_keypair.is_wiped()
    }

    /// Peer's current ratchet public key (empty until learned).
    pub fn peer_public_key(&self) -> &[u8] {
        &self.peer_public_key
    }

    /// Cached keys of skipped messages.
    pub fn skipped_keys(&self) -> &SkippedKeys {
        &self.skipped
    }

    /// Root KDF step: `KDF(MAC(root_key)(dh))` read as (root, next header,
    /// chain).
    pub(crate) fn root_step(&self, dh_output: &[u8]) -> Result<(Key, Key, Key)> {
        let input = self.primitives.mac.finalize(self.root_key.as_bytes(), dh_output)?;
        let mut kdf = self.primitives.kdf.derive(&input, &[], &[]);

        let root_key = kdf.next_key()?;
        let next_header_key = kdf.next_key()?;
        let chain_key = kdf.next_key()?;

        Ok((root_key, next_header_key, chain_key))
    }
}

fn check_master_secret(master_secret: &[u8]) -> Result<()> {
    if master_secret.len() < KEY_LEN {
        return Err(RatchetError::Crypto(CryptoError::InvalidKeyLength {
            expected: KEY_LEN,
            actual: master_secret.len(),
        }));
    }
    Ok(())
}

impl fmt::Debug for RatchetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RatchetState")
            .field("suite", &self.suite)
            .field("sender_side", &self.sender_side)
            .field("ratchet_due", &self.ratchet_due)
            .field("msg_num_send", &self.msg_num_send)
            .field("msg_num_recv", &self.msg_num_recv)
            .field("prev_msg_num_send", &self.prev_msg_num_send)
            .field("skipped", &self.skipped)
            .finish_non_exhaustive()
    }
}
