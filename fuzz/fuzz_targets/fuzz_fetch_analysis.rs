// SPDX-License-Identifier: PMPL-1.0-or-later
// Fuzz target for fetch plan analysis

#![no_main]

use libfuzzer_sys::fuzz_target;
use querywatch_advisor::{analyze_fetch, build_fetch_query, FetchAssociation};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let report = analyze_fetch(s);
        assert!(report.estimated_query_count >= report.optimal_query_count);

        // A generated query with at least one association is never flagged
        if s.len() < 128 {
            let query = build_fetch_query("Entity", &[FetchAssociation::left(s)]);
            assert!(!analyze_fetch(&query).has_n_plus_one_risk);
        }
    }
});
