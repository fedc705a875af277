//! Tor exit detector service
//!
//! Ties the list store, the session result cache and the exit list source
//! together. One instance is meant to be owned by one request-handling
//! context; nothing here is shared or locked.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use exitwatch_core::{normalize_address, parse_exit_list, MatchStrategy};
use exitwatch_tor::{ExitListSource, HttpExitListSource};

use crate::{CacheKeyPath, DetectorConfig, DetectorError, ListStore, SessionCache, SessionStore};

/// Checks addresses against the Tor exit list
pub struct TorDetector {
    store: ListStore,
    session: SessionCache,
    source: Arc<dyn ExitListSource>,
    match_strategy: MatchStrategy,
}

impl TorDetector {
    /// Create a detector that downloads the list over HTTP
    pub fn new(config: DetectorConfig) -> Result<Self, DetectorError> {
        let source = HttpExitListSource::new(config.fetch_config())?;
        Self::with_source(config, Arc::new(source))
    }

    /// Create a detector fed by a custom list source
    pub fn with_source(
        config: DetectorConfig,
        source: Arc<dyn ExitListSource>,
    ) -> Result<Self, DetectorError> {
        let key_path = CacheKeyPath::parse(&config.session_cache_name)?;
        Ok(Self {
            store: ListStore::new(config.list_path, config.list_cache),
            session: SessionCache::new(key_path, config.session_cache),
            source,
            match_strategy: config.match_strategy,
        })
    }

    /// Bind lookups to a session. Without this the session cache stays off.
    pub fn with_session(mut self, store: Arc<dyn SessionStore>, session_id: &str) -> Self {
        self.session.attach(store, session_id);
        self
    }

    /// Check whether an address is a known Tor exit.
    ///
    /// A result cached in the session is returned without touching the list.
    pub fn is_tor(&mut self, address: &str) -> Result<bool, DetectorError> {
        let address = normalize_address(address)?;

        let session_active = self.session.activate();
        if session_active {
            if let Some(hit) = self.session.get(&address) {
                debug!("Session cache hit for {}", address);
                return Ok(hit);
            }
        }

        let list = self.store.read()?;
        let result = self.match_strategy.contains(&list, &address);

        if session_active {
            self.session.record(&address, result);
        }
        Ok(result)
    }

    /// Download, parse and persist a fresh exit list.
    ///
    /// Returns the number of addresses written. The in-memory list copy is
    /// dropped, so the next lookup reads the new file.
    pub async fn update_list(&mut self) -> Result<usize, DetectorError> {
        let path = self.store.path().ok_or(DetectorError::NotConfigured)?.to_path_buf();

        info!("Updating exit list from {}", self.source.describe());
        let raw = self.source.fetch().await?;

        let list = parse_exit_list(&raw);
        let count = list.lines().count();

        self.store.write(&list)?;
        info!("Saved {} exit addresses to {}", count, path.display());
        Ok(count)
    }

    pub fn list_path(&self) -> Option<&Path> {
        self.store.path()
    }

    /// Change where the list lives. Drops the in-memory list copy when the
    /// path differs; an empty path unsets it.
    pub fn set_list_path(&mut self, path: impl Into<PathBuf>) {
        self.store.set_path(Some(path.into()));
    }

    pub fn list_cache_enabled(&self) -> bool {
        self.store.is_cache_enabled()
    }

    pub fn set_list_cache(&mut self, enabled: bool) {
        self.store.set_cache_enabled(enabled);
    }

    pub fn invalidate_list_cache(&mut self) {
        self.store.invalidate();
    }

    /// Read the list into memory now instead of on the next lookup
    pub fn load_list_cache(&mut self) -> Result<bool, DetectorError> {
        self.store.load()
    }

    pub fn session_cache_enabled(&self) -> bool {
        self.session.is_enabled()
    }

    pub fn set_session_cache(&mut self, enabled: bool) {
        self.session.set_enabled(enabled);
    }

    pub fn session_cache_name(&self) -> String {
        self.session.key_path().to_string()
    }

    /// Point session results at another `@`-delimited key path
    pub fn set_session_cache_name(&mut self, name: &str) -> Result<(), DetectorError> {
        self.session.set_key_path(CacheKeyPath::parse(name)?);
        Ok(())
    }

    pub fn invalidate_session_cache(&mut self) {
        self.session.invalidate();
    }

    pub fn match_strategy(&self) -> MatchStrategy {
        self.match_strategy
    }
}
