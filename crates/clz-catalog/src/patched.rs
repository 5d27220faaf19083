//! A single catalog split into patches and cached in its own directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use clz_core::{ClzError, CoordSky, ErrorInfo};

use crate::patches::{assign_patches, PatchMethod, PatchSpec};
use crate::store::{read_manifest, Catalog, MANIFEST_FILE};
use crate::table::{ColumnSpec, DataSource};

/// Supplies patch centers of a sibling catalog, or `NotFound` if it has none.
pub type CenterProvider = Box<dyn Fn() -> Result<CoordSky, ClzError> + Send + Sync>;

/// On-disk patched catalog with a lazily loaded in-memory copy.
pub struct PatchedCatalog {
    path: PathBuf,
    catalog: OnceLock<Arc<Catalog>>,
    center_provider: Option<CenterProvider>,
}

impl std::fmt::Debug for PatchedCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatchedCatalog")
            .field("path", &self.path)
            .field("loaded", &self.catalog.get().is_some())
            .field("center_provider", &self.center_provider.is_some())
            .finish()
    }
}

impl PatchedCatalog {
    /// Refers to the catalog directory at `path`; performs no IO.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: crate::normalise_path(&path.into()),
            catalog: OnceLock::new(),
            center_provider: None,
        }
    }

    /// Directory backing this catalog.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Registers (or clears) the function used to borrow a sibling's centers.
    pub fn set_center_provider(&mut self, provider: Option<CenterProvider>) {
        self.center_provider = provider;
    }

    /// Links this catalog to another directory whose centers take precedence.
    pub fn link_centers_to(&mut self, sibling: impl Into<PathBuf>) {
        let sibling = sibling.into();
        self.center_provider = Some(Box::new(move || {
            read_manifest(&sibling).map(|manifest| manifest.centers)
        }));
    }

    /// Asks the registered provider for centers; `None` if it has none.
    pub fn provided_centers(&self) -> Result<Option<CoordSky>, ClzError> {
        let Some(provider) = &self.center_provider else {
            return Ok(None);
        };
        match provider() {
            Ok(centers) => Ok(Some(centers)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// True if the directory holds a complete catalog.
    pub fn exists(&self) -> bool {
        self.path.join(MANIFEST_FILE).is_file()
    }

    /// Loads the catalog, caching it for later calls.
    pub fn get(&self) -> Result<Arc<Catalog>, ClzError> {
        if let Some(catalog) = self.catalog.get() {
            return Ok(Arc::clone(catalog));
        }
        if !self.exists() {
            return Err(ClzError::NotFound(
                ErrorInfo::new("catalog-missing", "catalog has not been created")
                    .with_path(&self.path),
            ));
        }
        let catalog = Arc::new(Catalog::read(&self.path)?);
        log::debug!(
            "loaded {} objects in {} patches from {}",
            catalog.len(),
            catalog.n_patches(),
            self.path.display()
        );
        Ok(Arc::clone(self.catalog.get_or_init(|| catalog)))
    }

    /// Patch centers, read from the manifest without loading the objects.
    pub fn patch_centers(&self) -> Result<CoordSky, ClzError> {
        if let Some(catalog) = self.catalog.get() {
            return Ok(catalog.centers().clone());
        }
        read_manifest(&self.path).map(|manifest| manifest.centers)
    }

    /// Splits `source` into patches and writes it to the catalog directory.
    ///
    /// Explicit centers in `patches` are used as given. Otherwise centers
    /// from the registered provider replace any column or count request, so
    /// a catalog linked to a populated sibling always shares its patches.
    /// A directory without a manifest is left over from an interrupted write
    /// and is replaced even without `overwrite`.
    pub fn set(
        &mut self,
        source: DataSource<'_>,
        columns: &ColumnSpec,
        patches: &PatchSpec,
        overwrite: bool,
    ) -> Result<Arc<Catalog>, ClzError> {
        let method = self.resolve_method(patches)?;

        if self.exists() && !overwrite {
            return Err(ClzError::AlreadyExists(
                ErrorInfo::new("catalog-exists", "catalog directory already exists")
                    .with_path(&self.path)
                    .with_hint("pass overwrite to replace it"),
            ));
        }
        if self.path.exists() {
            if !self.exists() {
                log::warn!("removing incomplete catalog at {}", self.path.display());
            }
            self.drop_catalog()?;
        }

        let table = source.load()?;
        let records = columns.extract(&table)?;
        let assignment = assign_patches(&method, &table, &records.coords.to_unit_vectors())?;
        let catalog = Catalog::build(&records, assignment);

        fs::create_dir_all(&self.path)
            .map_err(|err| ClzError::from_io("catalog-mkdir", &self.path, err))?;
        if let Err(err) = catalog.write(&self.path) {
            let _ = fs::remove_dir_all(&self.path);
            return Err(err);
        }
        log::info!(
            "cached {} objects in {} patches at {}",
            catalog.len(),
            catalog.n_patches(),
            self.path.display()
        );

        let catalog = Arc::new(catalog);
        self.catalog = OnceLock::new();
        let _ = self.catalog.set(Arc::clone(&catalog));
        Ok(catalog)
    }

    fn resolve_method(&self, patches: &PatchSpec) -> Result<PatchMethod, ClzError> {
        let provided = self.provided_centers()?;
        match (&patches.centers, provided) {
            (Some(direct), Some(sibling)) => {
                if *direct != sibling {
                    log::warn!(
                        "explicit patch centers for {} differ from the linked catalog",
                        self.path.display()
                    );
                }
                patches.resolve()
            }
            (None, Some(sibling)) => {
                log::debug!("using {} patch centers from linked catalog", sibling.len());
                Ok(PatchMethod::Centers(sibling))
            }
            (_, None) => patches.resolve(),
        }
    }

    /// Removes the directory and forgets the loaded catalog; no-op if absent.
    pub fn drop_catalog(&mut self) -> Result<(), ClzError> {
        self.catalog = OnceLock::new();
        if self.path.exists() {
            fs::remove_dir_all(&self.path)
                .map_err(|err| ClzError::from_io("catalog-remove", &self.path, err))?;
        }
        Ok(())
    }

    /// True if the in-memory copy is loaded.
    pub fn is_loaded(&self) -> bool {
        self.catalog.get().is_some()
    }
}
