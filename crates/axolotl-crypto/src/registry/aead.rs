//! AEAD ciphers backed by the `RustCrypto` `aead` family.

use std::marker::PhantomData;

use aes_gcm::{Aes128Gcm, Aes256Gcm};
use chacha20poly1305::{
    ChaCha20Poly1305, XChaCha20Poly1305,
    aead::{
        Aead, AeadCore, KeyInit, KeySizeUser, Payload,
        generic_array::{GenericArray, typenum::Unsigned},
    },
};

use super::AeadAlgorithm;
use crate::CryptoError;

/// AES-128-GCM.
pub static AES_128_GCM: RustCryptoAead<Aes128Gcm> = RustCryptoAead::new("AES-128-GCM");

/// AES-256-GCM.
pub static AES_256_GCM: RustCryptoAead<Aes256Gcm> = RustCryptoAead::new("AES-256-GCM");

/// `ChaCha20-Poly1305`.
pub static CHACHA20_POLY1305: RustCryptoAead<ChaCha20Poly1305> =
    RustCryptoAead::new("ChaCha20-Poly1305");

/// `XChaCha20-Poly1305`.
pub static XCHACHA20_POLY1305: RustCryptoAead<XChaCha20Poly1305> =
    RustCryptoAead::new("XChaCha20-Poly1305");

/// Adapter from a `RustCrypto` AEAD type to [`AeadAlgorithm`].
///
/// Stateless: a cipher instance is keyed per call, so the same static can
/// serve every session.
pub struct RustCryptoAead<C> {
    name: &'static str,
    _cipher: PhantomData<fn() -> C>,
}

impl<C> RustCryptoAead<C> {
    const fn new(name: &'static str) -> Self {
        Self { name, _cipher: PhantomData }
    }
}

impl<C> RustCryptoAead<C>
where
    C: KeyInit + Aead,
{
    fn keyed(&self, key: &[u8]) -> Result<C, CryptoError> {
        let expected = <C as KeySizeUser>::KeySize::USIZE;
        let Some(key) = key.get(..expected) else {
            return Err(CryptoError::InvalidKeyLength { expected, actual: key.len() });
        };

        C::new_from_slice(key)
            .map_err(|_| CryptoError::InvalidKeyLength { expected, actual: key.len() })
    }
}

impl<C> AeadAlgorithm for RustCryptoAead<C>
where
    C: KeyInit + Aead,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn key_len(&self) -> usize {
        <C as KeySizeUser>::KeySize::USIZE
    }

    fn nonce_len(&self) -> usize {
        <C as AeadCore>::NonceSize::USIZE
    }

    fn seal(
        &self,
        key: &[u8],
        nonce: &[u8],
        plaintext: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        if nonce.len() != self.nonce_len() {
            return Err(CryptoError::InvalidNonceLength {
                expected: self.nonce_len(),
                actual: nonce.len(),
            });
        }

        let cipher = self.keyed(key)?;
        cipher
            .encrypt(GenericArray::from_slice(nonce), Payload { msg: plaintext, aad })
            .map_err(|_| CryptoError::EncryptionFailed)
    }

    fn open(
        &self,
        key: &[u8],
        nonce: &[u8],
        ciphertext: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        // Nonce comes off the wire; a bad length is just another forgery.
        if nonce.len() != self.nonce_len() {
            return Err(CryptoError::AuthenticationFailed);
        }

        let cipher = self.keyed(key)?;
        cipher
            .decrypt(GenericArray::from_slice(nonce), Payload { msg: ciphertext, aad })
            .map_err(|_| CryptoError::AuthenticationFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 32] = [0x42; 32];
    const TAG_SIZE: usize = 16;

    fn all() -> [&'static dyn AeadAlgorithm; 4] {
        [&AES_128_GCM, &AES_256_GCM, &CHACHA20_POLY1305, &XCHACHA20_POLY1305]
    }

    #[test]
    fn seal_open_roundtrip() {
        for aead in all() {
            let nonce = vec![7u8; aead.nonce_len()];
            let sealed = aead.seal(&KEY, &nonce, b"hello", b"aad").unwrap();
            let opened = aead.open(&KEY, &nonce, &sealed, b"aad").unwrap();

            assert_eq!(opened, b"hello", "{}", aead.name());
            assert_eq!(sealed.len(), 5 + TAG_SIZE);
        }
    }

    #[test]
    fn nonce_sizes() {
        assert_eq!(AES_128_GCM.nonce_len(), 12);
        assert_eq!(AES_256_GCM.nonce_len(), 12);
        assert_eq!(CHACHA20_POLY1305.nonce_len(), 12);
        assert_eq!(XCHACHA20_POLY1305.nonce_len(), 24);
    }

    #[test]
    fn key_sizes() {
        assert_eq!(AES_128_GCM.key_len(), 16);
        assert_eq!(AES_256_GCM.key_len(), 32);
        assert_eq!(CHACHA20_POLY1305.key_len(), 32);
    }

    #[test]
    fn short_key_is_rejected() {
        let nonce = [0u8; 12];
        let result = AES_256_GCM.seal(&[1u8; 16], &nonce, b"x", b"");

        assert_eq!(result, Err(CryptoError::InvalidKeyLength { expected: 32, actual: 16 }));
    }

    #[test]
    fn aes128_uses_key_prefix() {
        let nonce = [0u8; 12];
        let mut long_key = [0u8; 32];
        long_key[..16].copy_from_slice(&[9u8; 16]);
        long_key[16..].copy_from_slice(&[1u8; 16]);

        let sealed = AES_128_GCM.seal(&long_key, &nonce, b"prefix", b"").unwrap();
        let opened = AES_128_GCM.open(&[9u8; 16], &nonce, &sealed, b"").unwrap();

        assert_eq!(opened, b"prefix");
    }

    #[test]
    fn wrong_aad_fails() {
        let nonce = [0u8; 12];
        let sealed = CHACHA20_POLY1305.seal(&KEY, &nonce, b"body", b"header").unwrap();

        let result = CHACHA20_POLY1305.open(&KEY, &nonce, &sealed, b"other");
        assert_eq!(result, Err(CryptoError::AuthenticationFailed));
    }

    #[test]
    fn bad_nonce_length_on_open_is_auth_failure() {
        let sealed = CHACHA20_POLY1305.seal(&KEY, &[0u8; 12], b"body", b"").unwrap();

        let result = CHACHA20_POLY1305.open(&KEY, &[0u8; 11], &sealed, b"");
        assert_eq!(result, Err(CryptoError::AuthenticationFailed));
    }

    #[test]
    fn bad_nonce_length_on_seal_is_reported() {
        let result = XCHACHA20_POLY1305.seal(&KEY, &[0u8; 12], b"body", b"");
        assert_eq!(result, Err(CryptoError::InvalidNonceLength { expected: 24, actual: 12 }));
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let nonce = [3u8; 12];
        let mut sealed = AES_256_GCM.seal(&KEY, &nonce, b"original", b"").unwrap();
        sealed[0] ^= 0x01;

        assert_eq!(AES_256_GCM.open(&KEY, &nonce, &sealed, b""), Err(CryptoError::AuthenticationFailed));
    }
}
