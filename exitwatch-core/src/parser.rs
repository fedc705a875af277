//! Exit address directory parser
//!
//! The Tor Project publishes exit relays as blocks of the form:
//!
//! ```text
//! ExitNode 0011BD2485AD45D984EC4159C88FC066E5E3300E
//! Published 2023-01-01 01:43:00
//! LastStatus 2023-01-01 02:00:00
//! ExitAddress 89.234.157.254 2023-01-01 02:03:04
//! ```
//!
//! Only the `ExitAddress` lines matter here.

use regex::Regex;
use std::sync::LazyLock;

/// Marker token identifying lines that carry an exit address
pub const EXIT_ADDRESS_MARKER: &str = "ExitAddress";

static EXIT_ADDRESS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"ExitAddress\s+(\S+)").unwrap()
});

/// Extract the lowercased exit addresses from raw directory text, in source order.
///
/// Duplicates are kept. Lines mentioning the marker without a following token
/// are skipped.
pub fn parse_exit_addresses(raw: &str) -> Vec<String> {
    raw.lines()
        .filter(|line| line.contains(EXIT_ADDRESS_MARKER))
        .filter_map(|line| EXIT_ADDRESS_REGEX.captures(line))
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Parse raw directory text into the persisted list format: one address per
/// line, no trailing newline. Returns an empty string when nothing matched.
pub fn parse_exit_list(raw: &str) -> String {
    parse_exit_addresses(raw).join("\n")
}
