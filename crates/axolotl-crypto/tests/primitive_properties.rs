//! Property-based tests for the primitive registry
//!
//! 1. **AEAD round-trip**: open(seal(m)) == m for every cipher
//! 2. **AEAD integrity**: any single-bit change is an authentication failure
//! 3. **Agreement**: both sides of every curve derive the same secret
//! 4. **Stream order**: KDF output does not depend on how it is chunked

use axolotl_crypto::{CipherId, CryptoError, CurveId, KdfId};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

const CIPHERS: [CipherId; 4] = [
    CipherId::Aes128Gcm,
    CipherId::Aes256Gcm,
    CipherId::ChaCha20Poly1305,
    CipherId::XChaCha20Poly1305,
];

const CURVES: [CurveId; 4] = [CurveId::P256, CurveId::P384, CurveId::P521, CurveId::X25519];

fn cipher() -> impl Strategy<Value = CipherId> {
    prop::sample::select(CIPHERS.to_vec())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_aead_roundtrip(
        cipher in cipher(),
        key in prop::array::uniform32(any::<u8>()),
        nonce_byte in any::<u8>(),
        plaintext in prop::collection::vec(any::<u8>(), 0..512),
        aad in prop::collection::vec(any::<u8>(), 0..64),
    ) {
        let aead = cipher.algorithm();
        let nonce = vec![nonce_byte; aead.nonce_len()];

        let sealed = aead.seal(&key, &nonce, &plaintext, &aad).unwrap();
        prop_assert_eq!(sealed.len(), plaintext.len() + 16);
        prop_assert_eq!(aead.open(&key, &nonce, &sealed, &aad).unwrap(), plaintext);
    }

    #[test]
    fn prop_aead_rejects_bit_flips(
        cipher in cipher(),
        key in prop::array::uniform32(any::<u8>()),
        plaintext in prop::collection::vec(any::<u8>(), 1..128),
        flip in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let aead = cipher.algorithm();
        let nonce = vec![0u8; aead.nonce_len()];

        let mut sealed = aead.seal(&key, &nonce, &plaintext, b"aad").unwrap();
        let index = flip.index(sealed.len());
        sealed[index] ^= 1 << bit;

        prop_assert_eq!(
            aead.open(&key, &nonce, &sealed, b"aad"),
            Err(CryptoError::AuthenticationFailed)
        );
    }

    #[test]
    fn prop_kdf_stream_is_chunk_independent(
        kdf in prop::sample::select(vec![
            KdfId::HkdfSha256,
            KdfId::HkdfSha384,
            KdfId::HkdfSha512,
            KdfId::HkdfSha3_256,
            KdfId::HkdfSha3_384,
            KdfId::HkdfSha3_512,
        ]),
        secret in prop::collection::vec(any::<u8>(), 32..64),
        split in 1usize..160,
    ) {
        let algorithm = kdf.algorithm();

        let mut whole = [0u8; 160];
        algorithm.derive(&secret, &[], &[]).fill(&mut whole).unwrap();

        let mut chunked = [0u8; 160];
        let (head, tail) = chunked.split_at_mut(split);
        let mut stream = algorithm.derive(&secret, &[], &[]);
        stream.fill(head).unwrap();
        stream.fill(tail).unwrap();

        prop_assert_eq!(whole, chunked);
        prop_assert_eq!(stream.position(), 160);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(10))]

    #[test]
    fn prop_dh_agreement(seed in any::<u64>()) {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);

        for curve in CURVES {
            let algorithm = curve.algorithm();
            let alice = algorithm.generate_keypair(&mut rng).unwrap();
            let bob = algorithm.generate_keypair(&mut rng).unwrap();

            let ab = algorithm.shared_secret(alice.private_key(), bob.public_key()).unwrap();
            let ba = algorithm.shared_secret(bob.private_key(), alice.public_key()).unwrap();
            prop_assert_eq!(ab.as_slice(), ba.as_slice(), "{:?}", curve);
        }
    }
}
