// SPDX-License-Identifier: PMPL-1.0-or-later
// Fuzz target for query key normalization

#![no_main]

use libfuzzer_sys::fuzz_target;
use querywatch_advisor::{extract_entity_name, normalize};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let key = normalize(s);

        // Keys are fixed points and carry no digits
        assert_eq!(normalize(&key), key);
        assert!(!key.bytes().any(|b| b.is_ascii_digit()));

        // Entity extraction accepts anything
        let _ = extract_entity_name(s);
    }
});
