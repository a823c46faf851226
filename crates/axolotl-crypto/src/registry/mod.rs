//! Primitive registry
//!
//! Maps the small integer identifiers that appear in persisted sessions to
//! concrete primitive implementations. Resolution happens once, when a
//! session is constructed or restored; the ratchet only ever talks to the
//! capability traits defined here.
//!
//! Identifiers are part of the persisted format and MUST NOT be renumbered.
//! Unknown or unsupported identifiers fail with
//! [`CryptoError::UnsupportedAlgorithm`].

pub mod aead;
pub mod curve;
pub mod kdf;
pub mod mac;

use std::fmt;

use zeroize::Zeroizing;

pub use self::kdf::KdfStream;
use crate::{CryptoError, DhKeyPair, RandomSource};

/// Authenticated encryption with associated data.
pub trait AeadAlgorithm: Send + Sync {
    /// Human-readable algorithm name.
    fn name(&self) -> &'static str;

    /// Bytes of key material consumed. Longer keys are truncated.
    fn key_len(&self) -> usize;

    /// Exact nonce length.
    fn nonce_len(&self) -> usize;

    /// Encrypt and authenticate `plaintext`, binding `aad`.
    fn seal(
        &self,
        key: &[u8],
        nonce: &[u8],
        plaintext: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>, CryptoError>;

    /// Verify and decrypt `ciphertext`.
    ///
    /// Any mismatch (wrong key, nonce, tag or aad) is
    /// [`CryptoError::AuthenticationFailed`].
    fn open(
        &self,
        key: &[u8],
        nonce: &[u8],
        ciphertext: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>, CryptoError>;
}

/// Keyed one-shot MAC.
pub trait MacAlgorithm: Send + Sync {
    /// Human-readable algorithm name.
    fn name(&self) -> &'static str;

    /// Digest length in bytes.
    fn output_len(&self) -> usize;

    /// MAC `message` under `key` in one shot.
    fn finalize(&self, key: &[u8], message: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError>;
}

/// Key derivation function producing an in-order byte stream.
pub trait KdfAlgorithm: Send + Sync {
    /// Human-readable algorithm name.
    fn name(&self) -> &'static str;

    /// Start a fresh output stream. Restartable only by calling again.
    fn derive(&self, secret: &[u8], salt: &[u8], info: &[u8]) -> KdfStream;
}

/// Diffie-Hellman key agreement over one curve.
pub trait CurveAlgorithm: Send + Sync {
    /// Human-readable curve name.
    fn name(&self) -> &'static str;

    /// Generate a fresh key pair from `rng`.
    fn generate_keypair(&self, rng: &mut dyn RandomSource) -> Result<DhKeyPair, CryptoError>;

    /// Compute the shared secret between our private key and a peer public
    /// key.
    fn shared_secret(
        &self,
        private_key: &[u8],
        peer_public_key: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError>;

    /// Check that `public_key` decodes to a usable point.
    fn validate_public_key(&self, public_key: &[u8]) -> Result<(), CryptoError>;
}

/// Elliptic curve selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CurveId {
    /// NIST P-256
    P256 = 1,
    /// NIST P-384
    P384 = 2,
    /// NIST P-521
    P521 = 3,
    /// Curve25519 (X25519)
    X25519 = 4,
}

impl CurveId {
    /// Wire identifier.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Parse a wire identifier. Id 0 (P-224) is recognised but unsupported.
    pub fn from_u8(id: u8) -> Result<Self, CryptoError> {
        match id {
            1 => Ok(Self::P256),
            2 => Ok(Self::P384),
            3 => Ok(Self::P521),
            4 => Ok(Self::X25519),
            _ => Err(CryptoError::UnsupportedAlgorithm { kind: "curve", id }),
        }
    }

    /// Resolve to the curve capability.
    pub fn algorithm(self) -> &'static dyn CurveAlgorithm {
        match self {
            Self::P256 => &curve::P256,
            Self::P384 => &curve::P384,
            Self::P521 => &curve::P521,
            Self::X25519 => &curve::X25519,
        }
    }
}

/// AEAD cipher selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CipherId {
    /// AES-128 in Galois/Counter Mode
    Aes128Gcm = 0,
    /// AES-256 in Galois/Counter Mode
    Aes256Gcm = 2,
    /// `ChaCha20-Poly1305` (RFC 8439)
    ChaCha20Poly1305 = 3,
    /// `XChaCha20-Poly1305` (extended 24-byte nonce)
    XChaCha20Poly1305 = 4,
}

impl CipherId {
    /// Wire identifier.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Parse a wire identifier. Id 1 (AES-192-GCM) is recognised but
    /// unsupported.
    pub fn from_u8(id: u8) -> Result<Self, CryptoError> {
        match id {
            0 => Ok(Self::Aes128Gcm),
            2 => Ok(Self::Aes256Gcm),
            3 => Ok(Self::ChaCha20Poly1305),
            4 => Ok(Self::XChaCha20Poly1305),
            _ => Err(CryptoError::UnsupportedAlgorithm { kind: "cipher", id }),
        }
    }

    /// Resolve to the AEAD capability.
    pub fn algorithm(self) -> &'static dyn AeadAlgorithm {
        match self {
            Self::Aes128Gcm => &aead::AES_128_GCM,
            Self::Aes256Gcm => &aead::AES_256_GCM,
            Self::ChaCha20Poly1305 => &aead::CHACHA20_POLY1305,
            Self::XChaCha20Poly1305 => &aead::XCHACHA20_POLY1305,
        }
    }
}

/// KDF selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum KdfId {
    /// HKDF with SHA-256
    HkdfSha256 = 0,
    /// HKDF with SHA-384
    HkdfSha384 = 1,
    /// HKDF with SHA-512
    HkdfSha512 = 2,
    /// HKDF with SHA3-256
    HkdfSha3_256 = 3,
    /// HKDF with SHA3-384
    HkdfSha3_384 = 4,
    /// HKDF with SHA3-512
    HkdfSha3_512 = 5,
}

impl KdfId {
    /// Wire identifier.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Parse a wire identifier.
    pub fn from_u8(id: u8) -> Result<Self, CryptoError> {
        match id {
            0 => Ok(Self::HkdfSha256),
            1 => Ok(Self::HkdfSha384),
            2 => Ok(Self::HkdfSha512),
            3 => Ok(Self::HkdfSha3_256),
            4 => Ok(Self::HkdfSha3_384),
            5 => Ok(Self::HkdfSha3_512),
            _ => Err(CryptoError::UnsupportedAlgorithm { kind: "kdf", id }),
        }
    }

    /// Resolve to the KDF capability.
    pub fn algorithm(self) -> &'static dyn KdfAlgorithm {
        match self {
            Self::HkdfSha256 => &kdf::HkdfSha256,
            Self::HkdfSha384 => &kdf::HkdfSha384,
            Self::HkdfSha512 => &kdf::HkdfSha512,
            Self::HkdfSha3_256 => &kdf::HkdfSha3_256,
            Self::HkdfSha3_384 => &kdf::HkdfSha3_384,
            Self::HkdfSha3_512 => &kdf::HkdfSha3_512,
        }
    }
}

/// MAC selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MacId {
    /// HMAC with SHA-256
    HmacSha256 = 0,
    /// HMAC with SHA-384
    HmacSha384 = 1,
    /// HMAC with SHA-512
    HmacSha512 = 2,
    /// HMAC with SHA3-256
    HmacSha3_256 = 3,
    /// HMAC with SHA3-384
    HmacSha3_384 = 4,
    /// HMAC with SHA3-512
    HmacSha3_512 = 5,
}

impl MacId {
    /// Wire identifier.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Parse a wire identifier.
    pub fn from_u8(id: u8) -> Result<Self, CryptoError> {
        match id {
            0 => Ok(Self::HmacSha256),
            1 => Ok(Self::HmacSha384),
            2 => Ok(Self::HmacSha512),
            3 => Ok(Self::HmacSha3_256),
            4 => Ok(Self::HmacSha3_384),
            5 => Ok(Self::HmacSha3_512),
            _ => Err(CryptoError::UnsupportedAlgorithm { kind: "mac", id }),
        }
    }

    /// Resolve to the MAC capability.
    pub fn algorithm(self) -> &'static dyn MacAlgorithm {
        match self {
            Self::HmacSha256 => &mac::HmacSha256,
            Self::HmacSha384 => &mac::HmacSha384,
            Self::HmacSha512 => &mac::HmacSha512,
            Self::HmacSha3_256 => &mac::HmacSha3_256,
            Self::HmacSha3_384 => &mac::HmacSha3_384,
            Self::HmacSha3_512 => &mac::HmacSha3_512,
        }
    }
}

/// The four algorithm choices fixed for a session's lifetime.
///
/// Both ends of a session MUST agree on the suite out of band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CipherSuite {
    /// Diffie-Hellman curve
    pub curve: CurveId,
    /// AEAD for headers and bodies
    pub cipher: CipherId,
    /// KDF for root and initial key derivation
    pub kdf: KdfId,
    /// MAC for chain steps and nonce derivation
    pub mac: MacId,
}

impl CipherSuite {
    /// X25519, `ChaCha20-Poly1305`, HKDF-SHA-256, HMAC-SHA-256.
    pub const RECOMMENDED: Self = Self {
        curve: CurveId::X25519,
        cipher: CipherId::ChaCha20Poly1305,
        kdf: KdfId::HkdfSha256,
        mac: MacId::HmacSha256,
    };

    /// P-521, AES-256-GCM, HKDF-SHA-512, HMAC-SHA-512.
    pub const MAX_SECURITY: Self = Self {
        curve: CurveId::P521,
        cipher: CipherId::Aes256Gcm,
        kdf: KdfId::HkdfSha512,
        mac: MacId::HmacSha512,
    };

    /// Build a suite from raw wire identifiers.
    pub fn from_ids(curve: u8, cipher: u8, kdf: u8, mac: u8) -> Result<Self, CryptoError> {
        Ok(Self {
            curve: CurveId::from_u8(curve)?,
            cipher: CipherId::from_u8(cipher)?,
            kdf: KdfId::from_u8(kdf)?,
            mac: MacId::from_u8(mac)?,
        })
    }

    /// Raw wire identifiers in persisted order: curve, cipher, kdf, mac.
    pub fn ids(self) -> [u8; 4] {
        [self.curve.to_u8(), self.cipher.to_u8(), self.kdf.to_u8(), self.mac.to_u8()]
    }

    /// Resolve every identifier to its capability.
    pub fn primitives(self) -> Primitives {
        Primitives {
            curve: self.curve.algorithm(),
            cipher: self.cipher.algorithm(),
            kdf: self.kdf.algorithm(),
            mac: self.mac.algorithm(),
        }
    }
}

impl Default for CipherSuite {
    fn default() -> Self {
        Self::RECOMMENDED
    }
}

/// Resolved primitive capabilities for one suite.
#[derive(Clone, Copy)]
pub struct Primitives {
    /// Diffie-Hellman curve
    pub curve: &'static dyn CurveAlgorithm,
    /// AEAD cipher
    pub cipher: &'static dyn AeadAlgorithm,
    /// Key derivation function
    pub kdf: &'static dyn KdfAlgorithm,
    /// Message authentication code
    pub mac: &'static dyn MacAlgorithm,
}

impl fmt::Debug for Primitives {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Primitives")
            .field("curve", &self.curve.name())
            .field("cipher", &self.cipher.name())
            .field("kdf", &self.kdf.name())
            .field("mac", &self.mac.name())
            .finish()
    }
}
