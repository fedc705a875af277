//! Detector configuration
//!
//! Loadable from TOML; every field has a default so a file only needs the
//! options it changes:
//!
//! ```toml
//! list_path = "/var/lib/exitwatch/nodes.txt"
//! list_cache = true
//! session_cache_name = "app@tor"
//! ```

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use exitwatch_core::{MatchStrategy, DEFAULT_SESSION_NAMESPACE, DEFAULT_SOURCE_URL};
use exitwatch_tor::FetchConfig;

use crate::DetectorError;

/// Detector configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Where the parsed list is persisted; required before update or lookup
    pub list_path: Option<PathBuf>,
    /// Keep the list content in memory between lookups
    pub list_cache: bool,
    /// Remember lookup results in the session store
    pub session_cache: bool,
    /// `@`-delimited key path for session results
    pub session_cache_name: String,
    /// Exit address directory URL
    pub source_url: String,
    /// Download timeout in seconds
    pub timeout_secs: u64,
    /// User agent override for the download
    pub user_agent: Option<String>,
    /// Proxy for the download
    pub proxy: Option<String>,
    /// How addresses are matched against the list
    pub match_strategy: MatchStrategy,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            list_path: None,
            list_cache: false,
            session_cache: true,
            session_cache_name: DEFAULT_SESSION_NAMESPACE.to_string(),
            source_url: DEFAULT_SOURCE_URL.to_string(),
            timeout_secs: 30,
            user_agent: None,
            proxy: None,
            match_strategy: MatchStrategy::default(),
        }
    }
}

impl DetectorConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, DetectorError> {
        toml::from_str(content).map_err(|e| DetectorError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, DetectorError> {
        let content = fs::read_to_string(path)
            .map_err(|e| DetectorError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    pub fn with_list_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.list_path = Some(path.into());
        self
    }

    pub fn with_list_cache(mut self, enabled: bool) -> Self {
        self.list_cache = enabled;
        self
    }

    pub fn with_session_cache(mut self, enabled: bool) -> Self {
        self.session_cache = enabled;
        self
    }

    pub fn with_session_cache_name(mut self, name: &str) -> Self {
        self.session_cache_name = name.to_string();
        self
    }

    pub fn with_match_strategy(mut self, strategy: MatchStrategy) -> Self {
        self.match_strategy = strategy;
        self
    }

    /// Fetcher settings derived from this configuration
    pub fn fetch_config(&self) -> FetchConfig {
        let mut fetch = FetchConfig::default()
            .with_source_url(&self.source_url)
            .with_timeout(self.timeout_secs);
        if let Some(user_agent) = &self.user_agent {
            fetch.user_agent = user_agent.clone();
        }
        if let Some(proxy) = &self.proxy {
            fetch = fetch.with_proxy(proxy);
        }
        fetch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DetectorConfig::default();
        assert!(config.list_path.is_none());
        assert!(!config.list_cache);
        assert!(config.session_cache);
        assert_eq!(config.session_cache_name, "TorDetector");
        assert_eq!(config.match_strategy, MatchStrategy::Substring);
    }

    #[test]
    fn test_partial_toml() {
        let config = DetectorConfig::from_toml_str(
            r#"
            list_path = "/tmp/nodes.txt"
            list_cache = true
            match_strategy = "exact_line"
            "#,
        )
        .unwrap();

        assert_eq!(config.list_path, Some(PathBuf::from("/tmp/nodes.txt")));
        assert!(config.list_cache);
        assert!(config.session_cache);
        assert_eq!(config.match_strategy, MatchStrategy::ExactLine);
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_bad_toml() {
        let err = DetectorConfig::from_toml_str("list_cache = \"yes\"").unwrap_err();
        assert!(matches!(err, DetectorError::Config(_)));
    }

    #[test]
    fn test_fetch_config() {
        let mut config = DetectorConfig::default();
        config.source_url = "http://mirror.example/exits".to_string();
        config.timeout_secs = 7;
        config.user_agent = Some("probe/1".to_string());

        let fetch = config.fetch_config();
        assert_eq!(fetch.source_url, "http://mirror.example/exits");
        assert_eq!(fetch.timeout_secs, 7);
        assert_eq!(fetch.user_agent, "probe/1");
        assert!(fetch.proxy.is_none());
    }
}
