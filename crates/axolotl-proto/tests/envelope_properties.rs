//! Property-based tests for envelope encoding/decoding
//!
//! These tests verify that the envelope codec is correct for ALL valid inputs,
//! not just specific examples, and that no byte sequence makes the decoder
//! panic.

use axolotl_proto::{Envelope, MessageHeader, ProtocolError};
use bytes::Bytes;
use proptest::prelude::*;

/// Strategy for generating envelopes within realistic field sizes
fn arbitrary_envelope() -> impl Strategy<Value = Envelope> {
    (
        prop::collection::vec(any::<u8>(), 0..=24),  // header nonce
        prop::collection::vec(any::<u8>(), 0..=24),  // message nonce
        prop::collection::vec(any::<u8>(), 0..256),  // header ciphertext
        prop::collection::vec(any::<u8>(), 0..2048), // message ciphertext
    )
        .prop_map(|(hn, mn, hc, mc)| Envelope::new(hn, mn, hc, mc))
}

proptest! {
    #[test]
    fn envelope_round_trip(envelope in arbitrary_envelope()) {
        let wire = envelope.to_bytes().expect("should encode");
        prop_assert_eq!(wire.len(), envelope.encoded_len());

        let parsed = Envelope::decode(&wire).expect("should decode");
        prop_assert_eq!(parsed, envelope);
    }

    #[test]
    fn streaming_matches_slice_decode(envelope in arbitrary_envelope()) {
        let wire = envelope.to_bytes().expect("should encode");
        let mut reader = wire.as_slice();

        let streamed = Envelope::read_from(&mut reader).expect("should decode");
        prop_assert_eq!(streamed, Envelope::decode(&wire).expect("should decode"));
    }

    #[test]
    fn every_strict_prefix_is_rejected(envelope in arbitrary_envelope(), cut in any::<prop::sample::Index>()) {
        let wire = envelope.to_bytes().expect("should encode");
        let len = cut.index(wire.len());

        let result = Envelope::decode(&wire[..len]);
        let is_short = matches!(
            result,
            Err(ProtocolError::EnvelopeTooShort { .. } | ProtocolError::EnvelopeTruncated { .. })
        );
        prop_assert!(is_short);
    }

    #[test]
    fn arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = Envelope::decode(&bytes);
        let _ = Envelope::read_from(&mut bytes.as_slice());
        let _ = MessageHeader::decode(&bytes);
    }

    #[test]
    fn header_round_trip(
        message_number in any::<u32>(),
        previous_chain_length in any::<u32>(),
        key in prop::collection::vec(any::<u8>(), 1..134),
    ) {
        let header = MessageHeader {
            message_number,
            previous_chain_length,
            dh_public_key: Bytes::from(key),
        };

        prop_assert_eq!(MessageHeader::decode(&header.to_bytes()).expect("should decode"), header);
    }
}

#[test]
fn wire_layout_is_stable() {
    let envelope = Envelope::new(vec![1u8, 2], vec![3u8], vec![4u8, 5, 6], vec![7u8]);
    let wire = envelope.to_bytes().expect("should encode");

    insta::assert_snapshot!(hex::encode(&wire), @"0201000000030000000101020304050607");
}

#[test]
fn message_ciphertext_cap_is_enforced() {
    let mut wire = vec![0u8, 0];
    wire.extend_from_slice(&0u32.to_be_bytes());
    wire.extend_from_slice(&(16 * 1024 * 1024 + 1u32).to_be_bytes());

    let result = Envelope::decode(&wire);
    assert_eq!(
        result,
        Err(ProtocolError::FieldTooLarge {
            field: "message ciphertext",
            size: Envelope::MAX_MESSAGE_CIPHERTEXT_LEN + 1,
            max: Envelope::MAX_MESSAGE_CIPHERTEXT_LEN,
        })
    );

    let streamed = Envelope::read_from(&mut wire.as_slice());
    assert!(matches!(streamed, Err(ProtocolError::FieldTooLarge { .. })));
}

#[tokio::test(flavor = "current_thread")]
async fn async_reader_reads_consecutive_envelopes() {
    let first = Envelope::new(vec![1u8; 12], vec![2u8; 12], vec![3u8; 56], b"hello".to_vec());
    let second = Envelope::new(vec![4u8; 12], vec![5u8; 12], vec![6u8; 56], Bytes::new());

    let mut stream = first.to_bytes().expect("should encode");
    stream.extend(second.to_bytes().expect("should encode"));
    let mut reader = stream.as_slice();

    assert_eq!(Envelope::read_from_async(&mut reader).await.expect("first"), first);
    assert_eq!(Envelope::read_from_async(&mut reader).await.expect("second"), second);
    assert!(matches!(
        Envelope::read_from_async(&mut reader).await,
        Err(ProtocolError::EnvelopeTruncated { expected: 10, actual: 0 })
    ));
}
