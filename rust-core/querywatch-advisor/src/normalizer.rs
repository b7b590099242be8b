// SPDX-License-Identifier: PMPL-1.0-or-later
//! Query key normalization.
//!
//! Repeated executions of "the same" query differ only in their literals, so
//! statistics are grouped by a canonical key in which every run of digits
//! becomes `?` and every single-quoted literal becomes `'?'`.

use std::sync::OnceLock;

use regex::Regex;

/// Placeholder substituted for numeric constants.
pub const NUMBER_PLACEHOLDER: &str = "?";

/// Placeholder substituted for quoted string literals.
pub const LITERAL_PLACEHOLDER: &str = "'?'";

/// Entity name reported when none can be extracted.
pub const UNKNOWN_ENTITY: &str = "unknown";

static DIGIT_RUN: OnceLock<Regex> = OnceLock::new();
static QUOTED_LITERAL: OnceLock<Regex> = OnceLock::new();

fn digit_run() -> &'static Regex {
    DIGIT_RUN.get_or_init(|| Regex::new(r"[0-9]+").expect("digit pattern is valid"))
}

fn quoted_literal() -> &'static Regex {
    QUOTED_LITERAL.get_or_init(|| Regex::new(r"'[^']*'").expect("literal pattern is valid"))
}

/// Map raw query text to its canonical comparison key.
///
/// Digits are replaced before literals, then surrounding whitespace is
/// trimmed. The result contains no ASCII digits, and applying `normalize`
/// again returns it unchanged.
///
/// ```
/// use querywatch_advisor::normalizer::normalize;
///
/// assert_eq!(
///     normalize("  SELECT * FROM users WHERE id = 42 AND name = 'bob' "),
///     "SELECT * FROM users WHERE id = ? AND name = '?'"
/// );
/// ```
pub fn normalize(query: &str) -> String {
    let without_numbers = digit_run().replace_all(query, NUMBER_PLACEHOLDER);
    let without_literals = quoted_literal().replace_all(&without_numbers, LITERAL_PLACEHOLDER);
    without_literals.trim().to_string()
}

/// Best-effort table/entity name: the first token after `FROM`, lower-cased.
///
/// Returns [`UNKNOWN_ENTITY`] when the text has no `FROM` clause or nothing
/// follows it.
pub fn extract_entity_name(query: &str) -> String {
    let upper = query.to_uppercase();
    upper
        .find("FROM")
        .and_then(|pos| upper[pos + "FROM".len()..].split_whitespace().next())
        .map(str::to_lowercase)
        .unwrap_or_else(|| UNKNOWN_ENTITY.to_string())
}
