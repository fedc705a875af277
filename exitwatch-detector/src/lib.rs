//! ExitWatch Detector
//!
//! Answers "is this address a Tor exit?" against a locally persisted copy of
//! the exit address list:
//! - **Store**: persists the parsed list and optionally keeps it in memory
//! - **Session cache**: remembers per-session lookup results under a key path
//! - **Detector**: validates input, consults the caches and tests membership
//!
//! The list is refreshed explicitly with [`TorDetector::update_list`].

pub mod config;
pub mod detector;
pub mod error;
pub mod session;
pub mod store;

pub use config::*;
pub use detector::*;
pub use error::*;
pub use session::*;
pub use store::*;
