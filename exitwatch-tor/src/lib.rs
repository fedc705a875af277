//! ExitWatch Tor Layer
//!
//! Retrieves the exit address directory published by the Tor Project:
//! - HTTP client with explicit timeout, redirects and optional proxy
//! - `ExitListSource` seam so the detector can be fed from elsewhere

pub mod fetch;

pub use fetch::*;
