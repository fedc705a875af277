//! Membership tests against a newline-delimited exit list

use serde::{Deserialize, Serialize};

/// How an address is matched against the list text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Substring probe for `addr\n`, `\naddr` or a whole-list match.
    ///
    /// Fast, but matches when the address is a line prefix or suffix of a
    /// longer entry: `1.2.3.4` is found in `"9.9.9.9\n1.2.3.45"`.
    #[default]
    Substring,
    /// Split into lines and compare each one exactly
    ExactLine,
}

impl MatchStrategy {
    /// Test whether `address` is listed. Both sides are expected to be lowercase.
    pub fn contains(self, list: &str, address: &str) -> bool {
        match self {
            MatchStrategy::Substring => {
                list.contains(&format!("{address}\n"))
                    || list.contains(&format!("\n{address}"))
                    || list == address
            }
            MatchStrategy::ExactLine => list.lines().any(|line| line == address),
        }
    }
}
