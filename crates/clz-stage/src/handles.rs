//! Small files passed between stages.

use std::path::{Path, PathBuf};

use clz_catalog::CorrelationCache;
use clz_core::{read_json, write_json, ClzError};
use serde::{Deserialize, Serialize};

/// Points at a cache directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheHandle {
    /// Cache root.
    pub path: PathBuf,
}

impl CacheHandle {
    /// Handle for the cache at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Writes the handle as JSON.
    pub fn write(&self, file: &Path) -> Result<(), ClzError> {
        write_json(file, self)
    }

    /// Reads a handle written by [`CacheHandle::write`].
    pub fn read(file: &Path) -> Result<Self, ClzError> {
        read_json(file)
    }

    /// Opens the referenced cache.
    pub fn open(&self) -> Result<CorrelationCache, ClzError> {
        CorrelationCache::open(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn handle_points_at_cache() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("cache");
        CorrelationCache::create(&root, false).unwrap();
        let file = dir.path().join("cache.json");
        CacheHandle::new(&root).write(&file).unwrap();
        let handle = CacheHandle::read(&file).unwrap();
        assert_eq!(handle.path, root);
        assert!(handle.open().is_ok());
    }
}
