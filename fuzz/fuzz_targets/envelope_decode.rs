//! Fuzz target for Envelope::decode
//!
//! This fuzzer tests envelope decoding with arbitrary byte sequences to find:
//! - Parser crashes or panics
//! - Integer overflows in length calculations
//! - Buffer over-reads
//! - Disagreement between slice and streaming decoders
//!
//! The fuzzer should NEVER panic. All invalid inputs should return an error.

#![no_main]

use axolotl_proto::{Envelope, MessageHeader};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let decoded = Envelope::decode(data);
    let streamed = Envelope::read_from(&mut &data[..]);

    match (&decoded, &streamed) {
        (Ok(a), Ok(b)) => {
            assert_eq!(a, b, "slice and stream decoders disagree");

            let encoded = a.to_bytes().expect("decoded envelope must re-encode");
            assert_eq!(&data[..encoded.len()], encoded.as_slice());
        },
        (Err(_), Err(_)) => {},
        _ => panic!("decoders disagree on validity: {decoded:?} vs {streamed:?}"),
    }

    let _ = MessageHeader::decode(data);
});
