// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Fuzz target for varint (LEB128) encoding/decoding.
//!
//! Every key length and count in a popularity file is a varint. Garbage must
//! decode to Err, not a panic, and valid values must roundtrip.

#![no_main]

use libfuzzer_sys::fuzz_target;
use typeahead::popular::format::{decode_varint, encode_varint, MAX_VARINT_BYTES};

fuzz_target!(|data: &[u8]| {
    if let Ok((value, consumed)) = decode_varint(data) {
        assert!(consumed >= 1 && consumed <= MAX_VARINT_BYTES);

        let mut reencoded = Vec::new();
        encode_varint(value, &mut reencoded);
        let (redecoded, reconsumed) =
            decode_varint(&reencoded).expect("re-encoding of a valid value should decode");

        assert_eq!(value, redecoded);
        assert_eq!(reconsumed, reencoded.len());
        // Canonical encoding is never longer than what we were given.
        assert!(reencoded.len() <= consumed);
    }
});
