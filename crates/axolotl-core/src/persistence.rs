//! Persisted session format.
//!
//! ```text
//! u32   magic 0x41584C53 ("AXLS")
//! u8    format version (1)
//! u8×4  curve, cipher, kdf, mac ids
//! u8×2  sender_side, ratchet_due (0 or 1)
//! u32×3 msg_num_send, msg_num_recv, prev_msg_num_send
//! u32×2 max_skip, max_skipped_keys
//! 32×8  root, header send/recv, next header send/recv, chain send/recv,
//!       header nonce seed
//! u32 len || bytes   own private key, own public key, peer public key
//! u32 count, then count × (32-byte header key || u32 number || 32-byte key)
//! ```
//!
//! All integers are big-endian. The encoding of a restored session is
//! byte-identical to the bytes it was restored from, and the restored session
//! keeps the saved [`RatchetConfig`].
//!
//! The magic and version bytes are an addition in front of the session
//! layout; a loader rejects foreign or future files on them before reading
//! any key.
//!
//! # Security
//!
//! The output contains every secret of the session. [`RatchetState::to_bytes`]
//! returns it in a buffer that is zeroized on drop; storing it safely is the
//! caller's job.

use std::io::{self, Read, Write};

use axolotl_crypto::{CipherSuite, DhKeyPair, KEY_LEN, Key};
use axolotl_proto::ProtocolError;
use bytes::BufMut;
use zeroize::Zeroizing;

use crate::{
    config::RatchetConfig,
    error::{RatchetError, Result},
    skipped::SkippedKeys,
    state::RatchetState,
};

/// "AXLS" in ASCII.
const MAGIC: u32 = 0x4158_4C53;

const VERSION: u8 = 1;

/// Cap on each length-prefixed key field.
const MAX_FIELD_LEN: usize = 256;

/// Bytes before the three variable-length fields.
const FIXED_LEN: usize = 4 + 1 + 4 + 2 + 3 * 4 + 2 * 4 + 8 * KEY_LEN;

/// Header key, message number, message key.
const ENTRY_LEN: usize = KEY_LEN + 4 + KEY_LEN;

impl RatchetState {
    /// Serialize the whole session.
    pub fn to_bytes(&self) -> Zeroizing<Vec<u8>> {
        // Exact capacity: the buffer never reallocates and leaves no stale copy.
        let mut out = Zeroizing::new(Vec::with_capacity(self.encoded_len()));
        self.encode(&mut *out);

        debug_assert_eq!(out.len(), self.encoded_len());
        out
    }

    /// Serialize the whole session into `writer`.
    pub fn write_to(&self, writer: &mut impl Write) -> Result<()> {
        writer.write_all(&self.to_bytes()).map_err(ProtocolError::from)?;
        Ok(())
    }

    /// Restore a session from [`RatchetState::to_bytes`] output, including
    /// its limits and every cached skipped key.
    ///
    /// # Errors
    ///
    /// - `StateTruncated` if the input ends early
    /// - `InvalidState` for a bad magic, version, flag or oversized field,
    ///   more cached keys than the saved cache bound, or trailing bytes
    /// - `Crypto(UnsupportedAlgorithm)` for an unknown algorithm id
    /// - `Crypto(InvalidPeerKey)` if a stored public key is not a valid point
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut remaining = bytes;
        let state = Self::decode(&mut remaining)?;

        if !remaining.is_empty() {
            return Err(RatchetError::invalid_state(format!(
                "{} trailing bytes",
                remaining.len()
            )));
        }
        Ok(state)
    }

    /// Restore a session from a reader, consuming exactly its bytes.
    pub fn read_from(reader: &mut impl Read) -> Result<Self> {
        Self::decode(reader)
    }

    fn encoded_len(&self) -> usize {
        FIXED_LEN
            + 3 * 4
            + self.dh_keypair.private_key().len()
            + self.dh_keypair.public_key().len()
            + self.peer_public_key.len()
            + 4
            + self.skipped.len() * ENTRY_LEN
    }

    fn encode(&self, dst: &mut impl BufMut) {
        dst.put_u32(MAGIC);
        dst.put_u8(VERSION);
        dst.put_slice(&self.suite.ids());
        dst.put_u8(u8::from(self.sender_side));
        dst.put_u8(u8::from(self.ratchet_due));

        dst.put_u32(self.msg_num_send);
        dst.put_u32(self.msg_num_recv);
        dst.put_u32(self.prev_msg_num_send);

        dst.put_u32(self.config.max_skip);
        dst.put_u32(u32::try_from(self.config.max_skipped_keys).unwrap_or(u32::MAX));

        for key in [
            &self.root_key,
            &self.header_key_send,
            &self.header_key_recv,
            &self.next_header_key_send,
            &self.next_header_key_recv,
            &self.chain_key_send,
            &self.chain_key_recv,
            &self.header_nonce_seed,
        ] {
            dst.put_slice(key.as_bytes());
        }

        for field in [
            self.dh_keypair.private_key(),
            self.dh_keypair.public_key(),
            self.peer_public_key.as_slice(),
        ] {
            dst.put_u32(field.len() as u32);
            dst.put_slice(field);
        }

        dst.put_u32(self.skipped.len() as u32);
        for (header_key, number, message_key) in self.skipped.iter() {
            dst.put_slice(header_key.as_bytes());
            dst.put_u32(number);
            dst.put_slice(message_key.as_bytes());
        }
    }

    fn decode(reader: &mut impl Read) -> Result<Self> {
        let mut src = StateReader { inner: reader };

        let magic = src.u32()?;
        if magic != MAGIC {
            return Err(RatchetError::invalid_state(format!("bad magic {magic:#010x}")));
        }
        let version = src.u8()?;
        if version != VERSION {
            return Err(RatchetError::invalid_state(format!("unsupported version {version}")));
        }

        let [curve, cipher, kdf, mac] = [src.u8()?, src.u8()?, src.u8()?, src.u8()?];
        let suite = CipherSuite::from_ids(curve, cipher, kdf, mac)?;
        let primitives = suite.primitives();

        let sender_side = src.flag("sender_side")?;
        let ratchet_due = src.flag("ratchet_due")?;

        let msg_num_send = src.u32()?;
        let msg_num_recv = src.u32()?;
        let prev_msg_num_send = src.u32()?;

        let config =
            RatchetConfig { max_skip: src.u32()?, max_skipped_keys: src.u32()? as usize };

        let root_key = src.key()?;
        let header_key_send = src.key()?;
        let header_key_recv = src.key()?;
        let next_header_key_send = src.key()?;
        let next_header_key_recv = src.key()?;
        let chain_key_send = src.key()?;
        let chain_key_recv = src.key()?;
        let header_nonce_seed = src.key()?;

        let mut private_key = src.field("private key")?;
        let public_key = src.field("public key")?;
        let peer_public_key = src.field("peer public key")?;

        if !public_key.is_empty() {
            primitives.curve.validate_public_key(&public_key)?;
        }
        if !peer_public_key.is_empty() {
            primitives.curve.validate_public_key(&peer_public_key)?;
        }

        // Entries are read one at a time, so a forged count runs into
        // StateTruncated rather than a large allocation.
        let count = src.u32()? as usize;
        if count > config.max_skipped_keys {
            return Err(RatchetError::invalid_state(format!(
                "{count} skipped keys exceeds cache bound {}",
                config.max_skipped_keys
            )));
        }

        let mut skipped = SkippedKeys::new(config.max_skipped_keys);
        for _ in 0..count {
            let header_key = src.key()?;
            let number = src.u32()?;
            let message_key = src.key()?;
            skipped.insert(&header_key, number, message_key);
        }

        Ok(Self {
            suite,
            primitives,
            sender_side,
            root_key,
            header_key_send,
            header_key_recv,
            next_header_key_send,
            next_header_key_recv,
            chain_key_send,
            chain_key_recv,
            header_nonce_seed,
            dh_keypair: DhKeyPair::from_parts(
                std::mem::take(&mut *private_key),
                public_key.to_vec(),
            ),
            peer_public_key: peer_public_key.to_vec(),
            msg_num_send,
            msg_num_recv,
            prev_msg_num_send,
            ratchet_due,
            skipped,
            config,
        })
    }
}

/// Big-endian reads that report end of input as [`RatchetError::StateTruncated`].
struct StateReader<'a, R> {
    inner: &'a mut R,
}

impl<R: Read> StateReader<'_, R> {
    fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        self.inner.read_exact(buf).map_err(|err| match err.kind() {
            io::ErrorKind::UnexpectedEof => RatchetError::StateTruncated,
            _ => RatchetError::Malformed(ProtocolError::from(err)),
        })
    }

    fn u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.fill(&mut buf)?;
        Ok(buf[0])
    }

    fn u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.fill(&mut buf)?;
        Ok(u32::from_be_bytes(buf))
    }

    fn flag(&mut self, name: &str) -> Result<bool> {
        match self.u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(RatchetError::invalid_state(format!("{name} flag is {other}"))),
        }
    }

    fn key(&mut self) -> Result<Key> {
        let mut buf = Zeroizing::new([0u8; KEY_LEN]);
        self.fill(buf.as_mut_slice())?;
        Ok(Key::from_bytes(*buf))
    }

    fn field(&mut self, name: &str) -> Result<Zeroizing<Vec<u8>>> {
        let len = self.u32()? as usize;
        if len > MAX_FIELD_LEN {
            return Err(RatchetError::invalid_state(format!(
                "{name} is {len} bytes (max {MAX_FIELD_LEN})"
            )));
        }

        let mut buf = Zeroizing::new(vec![0u8; len]);
        self.fill(&mut buf)?;
        Ok(buf)
    }
}
