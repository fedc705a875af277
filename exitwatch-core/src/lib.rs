//! ExitWatch Core - exit list model shared by the fetcher and the detector
//!
//! This crate provides the pure, IO-free pieces:
//! - IP literal validation and normalization
//! - Client address resolution from request headers
//! - Parsing of the Tor Project exit address directory
//! - Membership tests against a newline-delimited exit list

pub mod address;
pub mod membership;
pub mod parser;

pub use address::*;
pub use membership::*;
pub use parser::*;

/// Bulk exit address directory published by the Tor Project
pub const DEFAULT_SOURCE_URL: &str = "https://check.torproject.org/exit-addresses";

/// Default session namespace for cached lookup results
pub const DEFAULT_SESSION_NAMESPACE: &str = "TorDetector";

/// Separator between levels of a session cache key path
pub const KEY_PATH_SEPARATOR: char = '@';
