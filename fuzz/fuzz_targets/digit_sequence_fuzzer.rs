//! Fuzz target for [`SequenceDecoder`]
//!
//! Prevent desynchronisation on a byte stream with no length prefix
//!
//! # Strategy
//!
//! - Raw bytes: any stream, terminators anywhere
//! - Mixed with valid messages: garbage interleaved with encoded passwords
//!
//! # Invariants
//!
//! - NEVER panic on any input
//! - Exactly one result per terminator, none otherwise
//! - After any result the decoder is empty
//! - A decoded password re-encodes to exactly the bytes of its message
//! - A valid message following garbage and a terminator decodes intact

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use portcullis_proto::{Password, SequenceDecoder, TERMINATOR, encode_digit_sequence};

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    garbage: Vec<u8>,
    trailing: [u8; 5],
}

fuzz_target!(|input: FuzzInput| {
    let mut decoder = SequenceDecoder::new();
    let mut message = Vec::new();

    for &byte in &input.garbage {
        message.push(byte);
        let result = decoder.push(byte);

        if byte != TERMINATOR {
            assert!(matches!(result, Ok(None)), "result before terminator");
            continue;
        }

        assert_eq!(decoder.consumed(), 0);
        match result {
            Ok(Some(password)) => {
                assert_eq!(encode_digit_sequence(&password).as_ref(), message.as_slice());
            },
            Ok(None) => panic!("terminator produced no result"),
            Err(_) => {},
        }
        message.clear();
    }

    // Close whatever the garbage left open, then send a real message.
    let _ = decoder.push(TERMINATOR);
    let expected = Password::new(input.trailing.map(|v| v % 10));
    if let Some(expected) = expected {
        let mut decoded = None;
        for &byte in encode_digit_sequence(&expected).iter() {
            decoded = decoder.push(byte).expect("valid message");
        }
        assert_eq!(decoded, Some(expected));
    }
});
