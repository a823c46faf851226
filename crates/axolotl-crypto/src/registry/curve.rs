//! Diffie-Hellman curves.
//!
//! Private keys are generated from caller-supplied randomness so the whole
//! ratchet stays deterministic under a seeded [`RandomSource`].

use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

use super::CurveAlgorithm;
use crate::{CryptoError, DhKeyPair, RandomSource};

/// Rejection-sampling attempts before giving up on a NIST scalar.
///
/// A uniformly random candidate is out of range with probability below
/// 2^-32 for every supported curve, so exhausting this bound means the
/// randomness source is broken.
const KEYGEN_ATTEMPTS: usize = 8;

/// X25519 key agreement (RFC 7748).
pub struct X25519;

impl X25519 {
    const KEY_SIZE: usize = 32;

    fn parse_public(public_key: &[u8]) -> Result<PublicKey, CryptoError> {
        let Ok(bytes) = <[u8; Self::KEY_SIZE]>::try_from(public_key) else {
            return Err(CryptoError::InvalidPeerKey);
        };
        if bytes == [0u8; Self::KEY_SIZE] {
            return Err(CryptoError::InvalidPeerKey);
        }
        Ok(PublicKey::from(bytes))
    }
}

impl CurveAlgorithm for X25519 {
    fn name(&self) -> &'static str {
        "X25519"
    }

    fn generate_keypair(&self, rng: &mut dyn RandomSource) -> Result<DhKeyPair, CryptoError> {
        let mut bytes = Zeroizing::new([0u8; Self::KEY_SIZE]);
        rng.fill_random(bytes.as_mut_slice())?;

        let secret = StaticSecret::from(*bytes);
        let public = PublicKey::from(&secret);

        Ok(DhKeyPair::from_parts(secret.to_bytes().to_vec(), public.as_bytes().to_vec()))
    }

    fn shared_secret(
        &self,
        private_key: &[u8],
        peer_public_key: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        if private_key.len() != Self::KEY_SIZE {
            return Err(CryptoError::InvalidKeyLength {
                expected: Self::KEY_SIZE,
                actual: private_key.len(),
            });
        }
        let peer = Self::parse_public(peer_public_key)?;

        let mut scalar = Zeroizing::new([0u8; Self::KEY_SIZE]);
        scalar.copy_from_slice(private_key);
        let secret = StaticSecret::from(*scalar);

        let shared = secret.diffie_hellman(&peer);
        if !shared.was_contributory() {
            return Err(CryptoError::InvalidPeerKey);
        }

        Ok(Zeroizing::new(shared.as_bytes().to_vec()))
    }

    fn validate_public_key(&self, public_key: &[u8]) -> Result<(), CryptoError> {
        Self::parse_public(public_key).map(|_| ())
    }
}

macro_rules! nist_curve {
    ($(#[$doc:meta])* $name:ident, $krate:ident, $label:literal, $top_byte_mask:expr) => {
        $(#[$doc])*
        pub struct $name;

        impl CurveAlgorithm for $name {
            fn name(&self) -> &'static str {
                $label
            }

            fn generate_keypair(
                &self,
                rng: &mut dyn RandomSource,
            ) -> Result<DhKeyPair, CryptoError> {
                use $krate::elliptic_curve::sec1::ToEncodedPoint as _;

                let scalar_len = $krate::FieldBytes::default().len();
                let mut candidate = Zeroizing::new(vec![0u8; scalar_len]);

                for _ in 0..KEYGEN_ATTEMPTS {
                    rng.fill_random(candidate.as_mut_slice())?;
                    if let Some(top) = candidate.first_mut() {
                        *top &= $top_byte_mask;
                    }

                    if let Ok(secret) = $krate::SecretKey::from_slice(&candidate) {
                        let public = secret.public_key().to_encoded_point(false);
                        return Ok(DhKeyPair::from_parts(
                            secret.to_bytes().to_vec(),
                            public.as_bytes().to_vec(),
                        ));
                    }
                }

                Err(CryptoError::KeyGenerationFailed)
            }

            fn shared_secret(
                &self,
                private_key: &[u8],
                peer_public_key: &[u8],
            ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
                let secret = $krate::SecretKey::from_slice(private_key)
                    .map_err(|_| CryptoError::KeyGenerationFailed)?;
                let peer = $krate::PublicKey::from_sec1_bytes(peer_public_key)
                    .map_err(|_| CryptoError::InvalidPeerKey)?;

                let shared =
                    $krate::ecdh::diffie_hellman(secret.to_nonzero_scalar(), peer.as_affine());

                Ok(Zeroizing::new(shared.raw_secret_bytes().to_vec()))
            }

            fn validate_public_key(&self, public_key: &[u8]) -> Result<(), CryptoError> {
                $krate::PublicKey::from_sec1_bytes(public_key)
                    .map(|_| ())
                    .map_err(|_| CryptoError::InvalidPeerKey)
            }
        }
    };
}

nist_curve!(
    /// NIST P-256 ECDH.
    P256, p256, "P-256", 0xFF
);
nist_curve!(
    /// NIST P-384 ECDH.
    P384, p384, "P-384", 0xFF
);
nist_curve!(
    /// NIST P-521 ECDH. The 66-byte scalar encoding carries 7 unused high
    /// bits, which are cleared before range checking.
    P521, p521, "P-521", 0x01
);
