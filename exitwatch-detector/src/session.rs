//! Session-scoped lookup result cache
//!
//! Results are kept per session id under a hierarchical key path such as
//! `app@tor`, so several consumers can share one session store without
//! stepping on each other. Clearing a path also clears everything below it.

use dashmap::DashMap;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use exitwatch_core::KEY_PATH_SEPARATOR;

use crate::DetectorError;

/// `@`-delimited namespace for cached results (`"foo@bar"` = `foo` → `bar`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKeyPath {
    segments: Vec<String>,
}

impl CacheKeyPath {
    pub fn parse(name: &str) -> Result<Self, DetectorError> {
        let segments: Vec<String> = name.split(KEY_PATH_SEPARATOR).map(str::to_string).collect();
        if name.is_empty() || segments.iter().any(String::is_empty) {
            return Err(DetectorError::InvalidCacheName(name.to_string()));
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Whether `self` equals `prefix` or lives underneath it
    pub fn starts_with(&self, prefix: &CacheKeyPath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }
}

impl FromStr for CacheKeyPath {
    type Err = DetectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for CacheKeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sep = KEY_PATH_SEPARATOR.to_string();
        f.write_str(&self.segments.join(sep.as_str()))
    }
}

/// Errors from session storage
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Session storage is disabled")]
    Disabled,

    #[error("Failed to start session: {0}")]
    Start(String),
}

/// Session-scoped key-value storage for lookup results
pub trait SessionStore: Send + Sync {
    /// Make the session usable, creating it if needed
    fn start(&self, session_id: &str) -> Result<(), SessionError>;

    /// Cached result for an address under a key path
    fn get(&self, session_id: &str, path: &CacheKeyPath, address: &str) -> Option<bool>;

    /// Remember a result for an address under a key path
    fn set(&self, session_id: &str, path: &CacheKeyPath, address: &str, is_tor: bool);

    /// Remove every result stored under a key path, including child paths
    fn clear(&self, session_id: &str, path: &CacheKeyPath);
}

type SessionResults = HashMap<CacheKeyPath, HashMap<String, bool>>;

/// In-process session store: session id → key path → address → result
#[derive(Debug)]
pub struct MemorySessionStore {
    sessions: DashMap<String, SessionResults>,
    enabled: bool,
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            enabled: true,
        }
    }

    /// A store whose sessions can never be started
    pub fn disabled() -> Self {
        Self {
            sessions: DashMap::new(),
            enabled: false,
        }
    }

    /// Fresh random session identifier
    pub fn new_session_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Number of results stored exactly at `path` for a session
    pub fn len(&self, session_id: &str, path: &CacheKeyPath) -> usize {
        self.sessions
            .get(session_id)
            .and_then(|session| session.get(path).map(HashMap::len))
            .unwrap_or(0)
    }

    /// Drop a whole session
    pub fn end(&self, session_id: &str) {
        self.sessions.remove(session_id);
    }
}

impl SessionStore for MemorySessionStore {
    fn start(&self, session_id: &str) -> Result<(), SessionError> {
        if !self.enabled {
            return Err(SessionError::Disabled);
        }
        self.sessions.entry(session_id.to_string()).or_default();
        Ok(())
    }

    fn get(&self, session_id: &str, path: &CacheKeyPath, address: &str) -> Option<bool> {
        let session = self.sessions.get(session_id)?;
        session.get(path).and_then(|results| results.get(address)).copied()
    }

    fn set(&self, session_id: &str, path: &CacheKeyPath, address: &str, is_tor: bool) {
        self.sessions
            .entry(session_id.to_string())
            .or_default()
            .entry(path.clone())
            .or_default()
            .insert(address.to_string(), is_tor);
    }

    fn clear(&self, session_id: &str, path: &CacheKeyPath) {
        if let Some(mut session) = self.sessions.get_mut(session_id) {
            session.retain(|key, _| !key.starts_with(path));
        }
    }
}

/// Lookup result cache bound to one session of a [`SessionStore`]
///
/// Without a store, or when the store refuses to start, the cache turns
/// itself off and every lookup is recomputed.
pub struct SessionCache {
    store: Option<Arc<dyn SessionStore>>,
    session_id: String,
    key_path: CacheKeyPath,
    enabled: bool,
}

impl SessionCache {
    pub fn new(key_path: CacheKeyPath, enabled: bool) -> Self {
        Self {
            store: None,
            session_id: String::new(),
            key_path,
            enabled,
        }
    }

    /// Attach session storage. If the cache is enabled the session is
    /// started right away.
    pub fn attach(&mut self, store: Arc<dyn SessionStore>, session_id: &str) {
        self.store = Some(store);
        self.session_id = session_id.to_string();
        if self.enabled {
            self.start();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enabling starts the session (and may fall back to disabled);
    /// disabling clears the results under the current key path.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled {
            self.enabled = true;
            self.start();
            return;
        }
        if let Some(store) = self.start() {
            store.clear(&self.session_id, &self.key_path);
        }
        self.enabled = false;
    }

    pub fn key_path(&self) -> &CacheKeyPath {
        &self.key_path
    }

    /// Redirect later reads and writes; existing results stay where they are
    pub fn set_key_path(&mut self, key_path: CacheKeyPath) {
        self.key_path = key_path;
    }

    /// Clear results under the current key path, leaving the cache enabled
    pub fn invalidate(&mut self) {
        if let Some(store) = self.start() {
            store.clear(&self.session_id, &self.key_path);
        }
    }

    /// Start the session for a lookup. Returns `false` when results should
    /// be neither read nor written.
    pub fn activate(&mut self) -> bool {
        self.enabled && self.start().is_some()
    }

    /// Previously recorded result for a normalized address
    pub fn get(&self, address: &str) -> Option<bool> {
        let store = self.store.as_ref()?;
        store.get(&self.session_id, &self.key_path, address)
    }

    /// Record a result for a normalized address
    pub fn record(&self, address: &str, is_tor: bool) {
        if let Some(store) = &self.store {
            store.set(&self.session_id, &self.key_path, address, is_tor);
        }
    }

    fn start(&mut self) -> Option<Arc<dyn SessionStore>> {
        let Some(store) = self.store.clone() else {
            if self.enabled {
                debug!("No session store attached, session cache disabled");
            }
            self.enabled = false;
            return None;
        };
        match store.start(&self.session_id) {
            Ok(()) => Some(store),
            Err(e) => {
                debug!("Session cache disabled: {}", e);
                self.enabled = false;
                None
            }
        }
    }
}
