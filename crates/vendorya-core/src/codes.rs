//! # Code Sequencing
//!
//! Product codes and variant SKUs are `<prefix><NNN>`: a two-digit
//! supplier prefix followed by a zero-padded running number.
//!
//! ```text
//!   prefix "13", highest existing code "13007"  →  "13008"
//!   prefix "13", no existing code               →  "13001"
//!   prefix "13", highest is "13-OLD"            →  "13001"  (suffix unparseable)
//!   prefix "13", highest is "13999"             →  "131000" (padding is a minimum)
//! ```
//!
//! The scan-then-increment is not race-free on its own. A concurrent
//! creator may compute the same code; the (store, code) unique index makes
//! the loser fail instead of duplicating.

use crate::FALLBACK_CODE_PREFIX;

/// Picks the prefix: product supplier, else store default supplier, else `00`.
pub fn resolve_prefix<'a>(supplier_prefix: Option<&'a str>, default_prefix: Option<&'a str>) -> &'a str {
    supplier_prefix
        .or(default_prefix)
        .unwrap_or(FALLBACK_CODE_PREFIX)
}

/// Next code after `highest`, the greatest existing code sharing `prefix`.
pub fn next_sequential_code(prefix: &str, highest: Option<&str>) -> String {
    let next = highest
        .and_then(|code| code.strip_prefix(prefix))
        .and_then(|suffix| suffix.parse::<u64>().ok())
        .map(|n| n + 1)
        .unwrap_or(1);

    format!("{}{:03}", prefix, next)
}
