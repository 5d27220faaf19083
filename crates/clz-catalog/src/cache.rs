//! A cache root pairing a data catalog with an optional random catalog.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use clz_core::{ClzError, CoordSky, ErrorInfo};

use crate::patched::PatchedCatalog;

/// Marker file identifying a directory as a cache root.
pub const CACHE_MARKER: &str = ".clustz_cache";
/// Subdirectory of the data catalog.
pub const DATA_SLOT: &str = "data";
/// Subdirectory of the random catalog.
pub const RAND_SLOT: &str = "rand";

/// Two patched catalogs sharing one root directory and one set of patches.
///
/// Each slot borrows the patch centers of the other through a provider that
/// reads the sibling's manifest, so whichever slot is populated second is
/// split with the centers of the first.
#[derive(Debug)]
pub struct CorrelationCache {
    path: PathBuf,
    data: PatchedCatalog,
    rand: PatchedCatalog,
}

impl CorrelationCache {
    fn with_slots(path: PathBuf) -> Self {
        let data_dir = path.join(DATA_SLOT);
        let rand_dir = path.join(RAND_SLOT);
        let mut data = PatchedCatalog::new(&data_dir);
        let mut rand = PatchedCatalog::new(&rand_dir);
        data.link_centers_to(&rand_dir);
        rand.link_centers_to(&data_dir);
        Self { path, data, rand }
    }

    /// True if `path` is a directory carrying the cache marker.
    pub fn is_valid(path: &Path) -> bool {
        path.join(CACHE_MARKER).is_file()
    }

    /// Opens an existing cache root.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ClzError> {
        let path = crate::normalise_path(path.as_ref());
        if !Self::is_valid(&path) {
            return Err(ClzError::NotFound(
                ErrorInfo::new("cache-missing", "not a cache directory").with_path(&path),
            ));
        }
        log::debug!("opened cache at {}", path.display());
        Ok(Self::with_slots(path))
    }

    /// Creates an empty cache root.
    ///
    /// An existing path is replaced only if `overwrite` is set and the path is
    /// itself a cache root; any other directory is left untouched.
    pub fn create(path: impl AsRef<Path>, overwrite: bool) -> Result<Self, ClzError> {
        let path = crate::normalise_path(path.as_ref());
        if path.exists() {
            if !overwrite || !Self::is_valid(&path) {
                let mut info = ErrorInfo::new("cache-exists", "cache directory already exists")
                    .with_path(&path);
                if overwrite {
                    info = info.with_hint("refusing to overwrite a directory that is not a cache");
                }
                return Err(ClzError::AlreadyExists(info));
            }
            log::info!("overwriting cache at {}", path.display());
            Self::with_slots(path.clone()).drop()?;
        }
        fs::create_dir_all(&path).map_err(|err| ClzError::from_io("cache-mkdir", &path, err))?;
        let marker = path.join(CACHE_MARKER);
        fs::write(&marker, b"").map_err(|err| ClzError::from_io("cache-marker", &marker, err))?;
        log::info!("created cache at {}", path.display());
        Ok(Self::with_slots(path))
    }

    /// Creates a cache and populates it with `populate`.
    ///
    /// If `populate` fails, or panics, the new directory is removed again.
    pub fn create_with<F>(path: impl AsRef<Path>, overwrite: bool, populate: F) -> Result<Self, ClzError>
    where
        F: FnOnce(&mut Self) -> Result<(), ClzError>,
    {
        let mut cache = Self::create(path, overwrite)?;
        let mut guard = RemoveOnDrop {
            path: cache.path.clone(),
            armed: true,
        };
        populate(&mut cache)?;
        guard.armed = false;
        Ok(cache)
    }

    /// Root directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The data slot.
    pub fn data(&self) -> &PatchedCatalog {
        &self.data
    }

    /// The data slot, for populating.
    pub fn data_mut(&mut self) -> &mut PatchedCatalog {
        &mut self.data
    }

    /// The random slot.
    pub fn rand(&self) -> &PatchedCatalog {
        &self.rand
    }

    /// The random slot, for populating.
    pub fn rand_mut(&mut self) -> &mut PatchedCatalog {
        &mut self.rand
    }

    /// Patch centers of the randoms if present, otherwise of the data.
    pub fn patch_centers(&self) -> Result<CoordSky, ClzError> {
        if self.rand.exists() {
            return self.rand.patch_centers();
        }
        if self.data.exists() {
            return self.data.patch_centers();
        }
        Err(ClzError::NotFound(
            ErrorInfo::new("cache-empty", "cache has no populated catalogs").with_path(&self.path),
        ))
    }

    /// Number of patches shared by the populated catalogs.
    pub fn n_patches(&self) -> Result<usize, ClzError> {
        self.patch_centers().map(|centers| centers.len())
    }

    /// Confirms that both populated slots share identical centers.
    pub fn check_consistency(&self) -> Result<(), ClzError> {
        if !(self.data.exists() && self.rand.exists()) {
            return Ok(());
        }
        let data = self.data.patch_centers()?;
        let rand = self.rand.patch_centers()?;
        if data != rand {
            return Err(ClzError::Integrity(
                ErrorInfo::new("patch-mismatch", "data and randoms use different patch centers")
                    .with_path(&self.path)
                    .with_context("data_patches", data.len().to_string())
                    .with_context("rand_patches", rand.len().to_string()),
            ));
        }
        Ok(())
    }

    /// Removes both catalogs but keeps the cache root.
    pub fn reset(&mut self) -> Result<(), ClzError> {
        self.data.drop_catalog()?;
        self.rand.drop_catalog()?;
        Ok(())
    }

    /// Removes the catalogs, the marker and the root directory.
    ///
    /// Nothing is deleted if the root holds entries this cache did not
    /// create. Dropping a cache whose root is already gone succeeds.
    pub fn drop(mut self) -> Result<(), ClzError> {
        if !self.path.exists() {
            return Ok(());
        }
        let unknown = self.unaccounted_entries()?;
        if !unknown.is_empty() {
            return Err(ClzError::Integrity(
                ErrorInfo::new("cache-contents", "unaccounted cache directory contents")
                    .with_path(&self.path)
                    .with_context("entries", unknown.into_iter().collect::<Vec<_>>().join(",")),
            ));
        }
        self.reset()?;
        let marker = self.path.join(CACHE_MARKER);
        match fs::remove_file(&marker) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(ClzError::from_io("cache-marker", &marker, err)),
        }
        fs::remove_dir(&self.path).map_err(|err| ClzError::from_io("cache-remove", &self.path, err))?;
        log::info!("dropped cache at {}", self.path.display());
        Ok(())
    }

    fn unaccounted_entries(&self) -> Result<BTreeSet<String>, ClzError> {
        let entries =
            fs::read_dir(&self.path).map_err(|err| ClzError::from_io("cache-list", &self.path, err))?;
        let mut unknown = BTreeSet::new();
        for entry in entries {
            let entry = entry.map_err(|err| ClzError::from_io("cache-list", &self.path, err))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if ![DATA_SLOT, RAND_SLOT, CACHE_MARKER].contains(&name.as_str()) {
                unknown.insert(name);
            }
        }
        Ok(unknown)
    }
}

struct RemoveOnDrop {
    path: PathBuf,
    armed: bool,
}

impl Drop for RemoveOnDrop {
    fn drop(&mut self) {
        if self.armed {
            log::warn!("removing partially created cache at {}", self.path.display());
            let _ = fs::remove_dir_all(&self.path);
        }
    }
}
