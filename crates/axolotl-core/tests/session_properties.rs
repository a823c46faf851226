//! Property-based tests for ratchet sessions
//!
//! These tests verify the session invariants under arbitrary traffic:
//!
//! 1. **Round-trip**: every delivered message decrypts to its plaintext
//! 2. **Order independence**: any delivery order within a chain succeeds
//! 3. **Single use**: a message decrypts at most once
//! 4. **Persistence**: a restored session behaves exactly like the original

use axolotl_core::{CipherSuite, RatchetError, RatchetState};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

fn session(seed: u64) -> (RatchetState, RatchetState, ChaCha20Rng) {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let suite = CipherSuite::RECOMMENDED;
    let bob_keys = suite.primitives().curve.generate_keypair(&mut rng).unwrap();

    let alice = RatchetState::new_sender(suite, &[9u8; 32], bob_keys.public_key()).unwrap();
    let bob = RatchetState::new_receiver(suite, &[9u8; 32], bob_keys).unwrap();
    (alice, bob, rng)
}

/// A batch of plaintexts and a delivery order over them.
fn shuffled_batch() -> impl Strategy<Value = (Vec<Vec<u8>>, Vec<usize>)> {
    (1usize..8).prop_flat_map(|len| {
        (
            prop::collection::vec(prop::collection::vec(any::<u8>(), 0..200), len),
            Just((0..len).collect::<Vec<_>>()).prop_shuffle(),
        )
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_any_delivery_order_decrypts(
        (plaintexts, order) in shuffled_batch(),
        seed in any::<u64>(),
    ) {
        let (mut alice, mut bob, mut rng) = session(seed);

        let wires: Vec<Vec<u8>> = plaintexts
            .iter()
            .map(|plaintext| alice.encrypt(plaintext, &mut rng).unwrap())
            .collect();

        for index in order {
            let decrypted = bob.decrypt(&wires[index]).unwrap();
            prop_assert_eq!(&decrypted, &plaintexts[index]);
        }
        prop_assert!(bob.skipped_keys().is_empty());

        for wire in &wires {
            prop_assert_eq!(bob.decrypt(wire), Err(RatchetError::Undecryptable));
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    #[test]
    fn prop_alternating_turns_round_trip(
        turns in prop::collection::vec((any::<bool>(), prop::collection::vec(any::<u8>(), 0..64)), 1..30),
        seed in any::<u64>(),
    ) {
        let (mut alice, mut bob, mut rng) = session(seed);

        for (from_alice, plaintext) in turns {
            let (sender, receiver) = if from_alice {
                (&mut alice, &mut bob)
            } else {
                (&mut bob, &mut alice)
            };

            let wire = sender.encrypt(&plaintext, &mut rng).unwrap();
            prop_assert_eq!(receiver.decrypt(&wire).unwrap(), plaintext);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    #[test]
    fn prop_restore_preserves_behaviour(
        sent in 1usize..6,
        delivered in prop::collection::vec(any::<bool>(), 6),
        seed in any::<u64>(),
    ) {
        let (mut alice, mut bob, mut rng) = session(seed);

        let wires: Vec<Vec<u8>> =
            (0..sent).map(|i| alice.encrypt(&[i as u8; 4], &mut rng).unwrap()).collect();
        for (wire, deliver) in wires.iter().zip(&delivered) {
            if *deliver {
                bob.decrypt(wire).unwrap();
            }
        }

        let bytes = bob.to_bytes();
        let mut restored = RatchetState::from_bytes(&bytes).unwrap();
        let restored_bytes = restored.to_bytes();
        prop_assert_eq!(restored_bytes.as_slice(), bytes.as_slice());

        for wire in &wires {
            prop_assert_eq!(restored.decrypt(wire), bob.decrypt(wire));
        }
        let restored_bytes = restored.to_bytes();
        let original_bytes = bob.to_bytes();
        prop_assert_eq!(restored_bytes.as_slice(), original_bytes.as_slice());
    }
}
