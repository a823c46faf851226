//! Fuzz target for a two-party ratchet session
//!
//! # Strategy
//!
//! - Either side encrypts at any point
//! - Messages are delivered late, reordered, replayed, dropped or corrupted
//! - Sessions are persisted and restored mid-conversation
//!
//! # Invariants
//!
//! - Decrypt never panics and never yields a plaintext that was not sent
//! - A message decrypts at most once
//! - A failed decrypt leaves the session unchanged
//! - A restored session serializes to the bytes it was restored from

#![no_main]

use arbitrary::Arbitrary;
use axolotl_core::{CipherSuite, RatchetConfig, RatchetState};
use libfuzzer_sys::fuzz_target;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

#[derive(Debug, Arbitrary)]
struct Scenario {
    seed: u64,
    operations: Vec<Operation>,
}

#[derive(Debug, Arbitrary)]
enum Operation {
    /// Encrypt from Alice (true) or Bob (false)
    Send { from_alice: bool, message: Vec<u8> },
    /// Deliver an in-flight message by index
    Deliver { index: u8 },
    /// Deliver a copy with one byte flipped
    Corrupt { index: u8, offset: u16, mask: u8 },
    /// Persist and restore one side
    Restore { alice: bool },
}

struct InFlight {
    to_alice: bool,
    wire: Vec<u8>,
    plaintext: Vec<u8>,
    delivered: bool,
}

fn snapshot(state: &RatchetState) -> Vec<u8> {
    state.to_bytes().to_vec()
}

fuzz_target!(|scenario: Scenario| {
    let mut rng = ChaCha20Rng::seed_from_u64(scenario.seed);
    let suite = CipherSuite::RECOMMENDED;
    let bob_keys = suite.primitives().curve.generate_keypair(&mut rng).expect("keygen");

    let config = RatchetConfig { max_skip: 64, max_skipped_keys: 64 };
    let mut alice = RatchetState::new_sender(suite, &[1u8; 32], bob_keys.public_key())
        .expect("sender")
        .with_config(config);
    let mut bob = RatchetState::new_receiver(suite, &[1u8; 32], bob_keys)
        .expect("receiver")
        .with_config(config);

    let mut network: Vec<InFlight> = Vec::new();

    for operation in scenario.operations.into_iter().take(64) {
        match operation {
            Operation::Send { from_alice, message } => {
                let sender = if from_alice { &mut alice } else { &mut bob };
                let wire = sender.encrypt(&message, &mut rng).expect("encrypt");
                network.push(InFlight { to_alice: !from_alice, wire, plaintext: message, delivered: false });
            },
            Operation::Deliver { index } => {
                let Some(flight) = network.get_mut(index as usize) else { continue };
                let receiver = if flight.to_alice { &mut alice } else { &mut bob };
                let before = snapshot(receiver);

                match receiver.decrypt(&flight.wire) {
                    Ok(plaintext) => {
                        assert!(!flight.delivered, "message decrypted twice");
                        assert_eq!(plaintext, flight.plaintext);
                        flight.delivered = true;
                    },
                    Err(err) => {
                        assert!(!err.is_fatal(), "fatal error on delivery: {err}");
                        assert_eq!(snapshot(receiver), before, "failed decrypt mutated state");
                    },
                }
            },
            Operation::Corrupt { index, offset, mask } => {
                let Some(flight) = network.get(index as usize) else { continue };
                if mask == 0 || flight.wire.is_empty() {
                    continue;
                }

                let mut wire = flight.wire.clone();
                let at = offset as usize % wire.len();
                wire[at] ^= mask;

                let receiver = if flight.to_alice { &mut alice } else { &mut bob };
                let before = snapshot(receiver);
                assert!(receiver.decrypt(&wire).is_err(), "corrupted message accepted");
                assert_eq!(snapshot(receiver), before, "failed decrypt mutated state");
            },
            Operation::Restore { alice: restore_alice } => {
                let side = if restore_alice { &mut alice } else { &mut bob };
                let bytes = side.to_bytes();
                let restored = RatchetState::from_bytes(&bytes).expect("restore");
                assert_eq!(restored.config(), config);
                assert_eq!(snapshot(&restored), bytes.to_vec());
                *side = restored;
            },
        }
    }
});
