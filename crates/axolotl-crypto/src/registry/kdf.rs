//! HKDF-based key derivation streams.
//!
//! A [`KdfStream`] hands out HKDF-Expand output strictly in order, the way the
//! ratchet consumes it: root key first, then header keys, then chain keys.
//! HKDF can emit at most `255 * HashLen` bytes; asking for more is a
//! [`CryptoError::KdfExhausted`] error rather than an abort.

use hkdf::Hkdf;
use sha2::{Digest, Sha256, Sha384, Sha512};
use sha3::{Sha3_256, Sha3_384, Sha3_512};
use zeroize::{Zeroize, Zeroizing};

use super::KdfAlgorithm;
use crate::{CryptoError, KEY_LEN, Key};

/// HKDF-Expand from a pseudorandom key into `okm`.
type ExpandFn = fn(prk: &[u8], info: &[u8], okm: &mut [u8]) -> Result<(), CryptoError>;

/// In-order KDF output.
///
/// # Invariants
///
/// - Bytes are returned exactly once, in stream order
/// - `position() <= limit()` at all times
pub struct KdfStream {
    prk: Zeroizing<Vec<u8>>,
    info: Vec<u8>,
    offset: usize,
    limit: usize,
    expand: ExpandFn,
}

impl KdfStream {
    fn new(prk: Vec<u8>, info: &[u8], limit: usize, expand: ExpandFn) -> Self {
        Self { prk: Zeroizing::new(prk), info: info.to_vec(), offset: 0, limit, expand }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.offset
    }

    /// Total bytes this stream can produce.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Fill `out` with the next `out.len()` bytes of the stream.
    pub fn fill(&mut self, out: &mut [u8]) -> Result<(), CryptoError> {
        let requested = self.offset.saturating_add(out.len());
        if requested > self.limit {
            return Err(CryptoError::KdfExhausted { requested, available: self.limit });
        }

        // HKDF-Expand is not seekable; recompute the prefix and keep the tail.
        let mut okm = Zeroizing::new(vec![0u8; requested]);
        (self.expand)(&self.prk, &self.info, &mut okm)?;
        out.copy_from_slice(&okm[self.offset..]);
        self.offset = requested;

        Ok(())
    }

    /// Read the next [`KEY_LEN`] bytes as a key.
    pub fn next_key(&mut self) -> Result<Key, CryptoError> {
        let mut bytes = Zeroizing::new([0u8; KEY_LEN]);
        self.fill(bytes.as_mut_slice())?;
        Ok(Key::from_bytes(*bytes))
    }
}

macro_rules! hkdf_algorithm {
    ($(#[$doc:meta])* $name:ident, $hash:ty, $label:literal) => {
        $(#[$doc])*
        pub struct $name;

        impl KdfAlgorithm for $name {
            fn name(&self) -> &'static str {
                $label
            }

            fn derive(&self, secret: &[u8], salt: &[u8], info: &[u8]) -> KdfStream {
                let salt = if salt.is_empty() { None } else { Some(salt) };
                let (mut prk, _) = Hkdf::<$hash>::extract(salt, secret);
                let limit = 255 * <$hash as Digest>::output_size();

                let stream = KdfStream::new(prk.to_vec(), info, limit, |prk, info, okm| {
                    let hkdf = Hkdf::<$hash>::from_prk(prk).map_err(|_| {
                        CryptoError::InvalidKeyLength {
                            expected: <$hash as Digest>::output_size(),
                            actual: prk.len(),
                        }
                    })?;
                    hkdf.expand(info, okm).map_err(|_| CryptoError::KdfExhausted {
                        requested: okm.len(),
                        available: 255 * <$hash as Digest>::output_size(),
                    })
                });
                prk.as_mut_slice().zeroize();

                stream
            }
        }
    };
}

hkdf_algorithm!(
    /// HKDF with SHA-256.
    HkdfSha256, Sha256, "HKDF-SHA-256"
);
hkdf_algorithm!(
    /// HKDF with SHA-384.
    HkdfSha384, Sha384, "HKDF-SHA-384"
);
hkdf_algorithm!(
    /// HKDF with SHA-512.
    HkdfSha512, Sha512, "HKDF-SHA-512"
);
hkdf_algorithm!(
    /// HKDF with SHA3-256.
    HkdfSha3_256, Sha3_256, "HKDF-SHA3-256"
);
hkdf_algorithm!(
    /// HKDF with SHA3-384.
    HkdfSha3_384, Sha3_384, "HKDF-SHA3-384"
);
hkdf_algorithm!(
    /// HKDF with SHA3-512.
    HkdfSha3_512, Sha3_512, "HKDF-SHA3-512"
);
