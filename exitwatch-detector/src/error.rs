//! Detector error taxonomy

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use exitwatch_core::AddressError;
use exitwatch_tor::FetchError;

/// Errors from detector operations
#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("Invalid IP address: {0:?}")]
    InvalidAddress(String),

    #[error("No list path has been set")]
    NotConfigured,

    #[error("Failed to fetch exit list: {0}")]
    Fetch(#[from] FetchError),

    #[error("Unable to save the list to {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unable to read the list from {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("The list at {} is empty", .0.display())]
    EmptyList(PathBuf),

    #[error("Invalid session cache name: {0:?}")]
    InvalidCacheName(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<AddressError> for DetectorError {
    fn from(err: AddressError) -> Self {
        match err {
            AddressError::Invalid(address) => DetectorError::InvalidAddress(address),
        }
    }
}
