//! Persisted exit list with an optional in-memory copy

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::DetectorError;

/// The exit list on disk, plus the in-memory copy when list caching is on
#[derive(Debug, Default)]
pub struct ListStore {
    path: Option<PathBuf>,
    cache_enabled: bool,
    cached: Option<String>,
}

impl ListStore {
    pub fn new(path: Option<PathBuf>, cache_enabled: bool) -> Self {
        let mut store = Self {
            path: None,
            cache_enabled,
            cached: None,
        };
        store.set_path(path);
        store
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Point the store at another file. An empty path unsets it.
    ///
    /// Any in-memory copy of the previous file is dropped.
    pub fn set_path(&mut self, path: Option<PathBuf>) {
        let path = path.filter(|p| !p.as_os_str().is_empty());
        if self.path != path {
            self.cached = None;
            self.path = path;
        }
    }

    pub fn is_cache_enabled(&self) -> bool {
        self.cache_enabled
    }

    /// Turning the cache off discards the in-memory copy
    pub fn set_cache_enabled(&mut self, enabled: bool) {
        self.cache_enabled = enabled;
        if !enabled {
            self.cached = None;
        }
    }

    /// Whether an in-memory copy is currently held
    pub fn is_cached(&self) -> bool {
        self.cached.is_some()
    }

    /// Drop the in-memory copy; the next read goes to disk
    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    /// Eagerly (re)load the file into memory. Returns `false` when list
    /// caching is off and nothing was loaded.
    pub fn load(&mut self) -> Result<bool, DetectorError> {
        if !self.cache_enabled {
            return Ok(false);
        }
        self.cached = Some(self.read_file()?);
        Ok(true)
    }

    /// Current list content, served from memory when possible
    pub fn read(&mut self) -> Result<Cow<'_, str>, DetectorError> {
        if !self.cache_enabled {
            return self.read_file().map(Cow::Owned);
        }

        let list = match self.cached.take() {
            Some(list) => list,
            None => self.read_file()?,
        };
        Ok(Cow::Borrowed(self.cached.insert(list).as_str()))
    }

    /// Replace the persisted list.
    ///
    /// Content goes to a sibling temp file first and is renamed over the
    /// target, so a failed write leaves the previous list in place. The
    /// in-memory copy is dropped on success.
    pub fn write(&mut self, list: &str) -> Result<(), DetectorError> {
        let path = self.require_path()?.to_path_buf();
        let tmp = temp_path(&path);

        let written = fs::write(&tmp, list).and_then(|()| fs::rename(&tmp, &path));
        if let Err(source) = written {
            let _ = fs::remove_file(&tmp);
            return Err(DetectorError::Write { path, source });
        }

        debug!("Wrote {} bytes of exit list to {}", list.len(), path.display());
        self.invalidate();
        Ok(())
    }

    fn require_path(&self) -> Result<&Path, DetectorError> {
        self.path().ok_or(DetectorError::NotConfigured)
    }

    fn read_file(&self) -> Result<String, DetectorError> {
        let path = self.require_path()?;
        let data = fs::read_to_string(path).map_err(|source| DetectorError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if data.is_empty() {
            return Err(DetectorError::EmptyList(path.to_path_buf()));
        }
        debug!("Read exit list from {}", path.display());
        Ok(data)
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn list_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_read_requires_path() {
        let mut store = ListStore::default();
        assert!(matches!(store.read(), Err(DetectorError::NotConfigured)));
        assert!(matches!(store.write("1.1.1.1"), Err(DetectorError::NotConfigured)));
    }

    #[test]
    fn test_empty_path_means_unset() {
        let store = ListStore::new(Some(PathBuf::new()), false);
        assert!(store.path().is_none());
    }

    #[test]
    fn test_read_missing_file() {
        let dir = TempDir::new().unwrap();
        let mut store = ListStore::new(Some(dir.path().join("missing.txt")), false);
        assert!(matches!(store.read(), Err(DetectorError::Read { .. })));
    }

    #[test]
    fn test_read_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = list_file(&dir, "nodes.txt", "");
        let mut store = ListStore::new(Some(path), true);
        assert!(matches!(store.read(), Err(DetectorError::EmptyList(_))));
        assert!(!store.is_cached());
    }

    #[test]
    fn test_uncached_reads_hit_disk() {
        let dir = TempDir::new().unwrap();
        let path = list_file(&dir, "nodes.txt", "1.1.1.1");
        let mut store = ListStore::new(Some(path.clone()), false);

        assert_eq!(store.read().unwrap(), "1.1.1.1");
        fs::write(&path, "2.2.2.2").unwrap();
        assert_eq!(store.read().unwrap(), "2.2.2.2");
        assert!(!store.is_cached());
    }

    #[test]
    fn test_cached_reads_skip_disk() {
        let dir = TempDir::new().unwrap();
        let path = list_file(&dir, "nodes.txt", "1.1.1.1");
        let mut store = ListStore::new(Some(path.clone()), true);

        assert_eq!(store.read().unwrap(), "1.1.1.1");
        fs::remove_file(&path).unwrap();
        assert_eq!(store.read().unwrap(), "1.1.1.1");

        store.invalidate();
        assert!(matches!(store.read(), Err(DetectorError::Read { .. })));
    }

    #[test]
    fn test_changing_path_drops_cache() {
        let dir = TempDir::new().unwrap();
        let first = list_file(&dir, "a.txt", "1.1.1.1");
        let second = list_file(&dir, "b.txt", "2.2.2.2");
        let mut store = ListStore::new(Some(first.clone()), true);

        assert_eq!(store.read().unwrap(), "1.1.1.1");
        store.set_path(Some(first));
        assert!(store.is_cached(), "same path keeps the cache");

        store.set_path(Some(second));
        assert!(!store.is_cached());
        assert_eq!(store.read().unwrap(), "2.2.2.2");
    }

    #[test]
    fn test_disabling_cache_discards_copy() {
        let dir = TempDir::new().unwrap();
        let path = list_file(&dir, "nodes.txt", "1.1.1.1");
        let mut store = ListStore::new(Some(path), true);

        store.read().unwrap();
        store.set_cache_enabled(false);
        assert!(!store.is_cached());
    }

    #[test]
    fn test_load() {
        let dir = TempDir::new().unwrap();
        let path = list_file(&dir, "nodes.txt", "1.1.1.1");

        let mut store = ListStore::new(Some(path.clone()), false);
        assert!(!store.load().unwrap());

        store.set_cache_enabled(true);
        assert!(store.load().unwrap());
        assert!(store.is_cached());

        fs::write(&path, "3.3.3.3").unwrap();
        assert!(store.load().unwrap());
        assert_eq!(store.read().unwrap(), "3.3.3.3");
    }

    #[test]
    fn test_write_overwrites_and_invalidates() {
        let dir = TempDir::new().unwrap();
        let path = list_file(&dir, "nodes.txt", "1.1.1.1");
        let mut store = ListStore::new(Some(path.clone()), true);

        store.read().unwrap();
        store.write("4.4.4.4\n5.5.5.5").unwrap();

        assert!(!store.is_cached());
        assert_eq!(fs::read_to_string(&path).unwrap(), "4.4.4.4\n5.5.5.5");
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn test_write_into_missing_dir_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("no-such-dir").join("nodes.txt");
        let mut store = ListStore::new(Some(path), false);

        assert!(matches!(store.write("1.1.1.1"), Err(DetectorError::Write { .. })));
    }
}
