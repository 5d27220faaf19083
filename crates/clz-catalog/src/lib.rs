#![deny(missing_docs)]
#![doc = "Patch-consistent catalog cache: tables, patch assignment, on-disk patch format and cache roots."]

pub mod cache;
pub mod patched;
pub mod patches;
pub mod paths;
pub mod store;
pub mod table;

pub use cache::{CorrelationCache, CACHE_MARKER, DATA_SLOT, RAND_SLOT};
pub use patched::{CenterProvider, PatchedCatalog};
pub use patches::{
    assign_patches, kmeans, patch_centers_from_file, write_patch_centers, PatchAssignment,
    PatchMethod, PatchSpec,
};
pub use paths::normalise_path;
pub use store::{read_manifest, Catalog, CatalogManifest, Patch, CATALOG_SCHEMA, MANIFEST_FILE};
pub use table::{ColumnSpec, DataSource, Records, Table};
