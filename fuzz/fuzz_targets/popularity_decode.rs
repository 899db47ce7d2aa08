// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Fuzz target for the popularity file decoder.
//!
//! Popularity files survive crashes, disk errors and older builds. Whatever
//! bytes are on disk, decoding returns a table or `Corrupt`, and a table
//! that decodes survives a re-encode unchanged.

#![no_main]

use libfuzzer_sys::fuzz_target;
use typeahead::popular::{decode_store, encode_store};

fuzz_target!(|data: &[u8]| {
    let Ok(decoded) = decode_store(data) else {
        return;
    };

    assert!(decoded.entries.len() as u32 <= decoded.header.capacity);
    for pair in decoded.entries.windows(2) {
        assert!(pair[0].0 < pair[1].0, "keys must be strictly increasing");
    }

    let entries: Vec<(&str, u64)> = decoded
        .entries
        .iter()
        .map(|(k, v)| (k.as_str(), *v))
        .collect();
    let reencoded = encode_store(decoded.header.capacity, &entries);
    let again = decode_store(&reencoded).expect("re-encoded table should decode");
    assert_eq!(again.entries, decoded.entries);
    assert_eq!(again.header.capacity, decoded.header.capacity);
});
