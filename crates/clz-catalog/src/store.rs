//! Native on-disk format of a patched catalog.
//!
//! A catalog directory contains `manifest.json` and one bincode encoded
//! `patch_NNNN.bin` per patch. The manifest is written last, so a directory
//! without it is never treated as a complete catalog.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use clz_core::{angular_distance, ClzError, CoordSky, ErrorInfo, SchemaVersion, UnitVector};
use serde::{Deserialize, Serialize};

use crate::patches::PatchAssignment;
use crate::table::Records;

/// File name of the catalog manifest.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Current schema of the catalog directory layout.
pub const CATALOG_SCHEMA: SchemaVersion = SchemaVersion::new(1, 0, 0);

/// Objects belonging to a single spatial patch.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Patch {
    /// Right ascension in radians.
    pub ra: Vec<f64>,
    /// Declination in radians.
    pub dec: Vec<f64>,
    /// Optional redshifts.
    pub redshifts: Option<Vec<f64>>,
    /// Optional weights.
    pub weights: Option<Vec<f64>>,
}

impl Patch {
    /// Number of objects in the patch.
    pub fn len(&self) -> usize {
        self.ra.len()
    }

    /// True if the patch holds no objects.
    pub fn is_empty(&self) -> bool {
        self.ra.is_empty()
    }

    /// Weight of object `idx`, 1 when the catalog is unweighted.
    pub fn weight(&self, idx: usize) -> f64 {
        self.weights.as_ref().map_or(1.0, |weights| weights[idx])
    }

    /// Sum of all object weights.
    pub fn total_weight(&self) -> f64 {
        match &self.weights {
            Some(weights) => weights.iter().sum(),
            None => self.len() as f64,
        }
    }

    /// Cartesian unit vectors of all objects.
    pub fn unit_vectors(&self) -> Vec<UnitVector> {
        self.ra
            .iter()
            .zip(&self.dec)
            .map(|(&ra, &dec)| clz_core::radec_to_vector(ra, dec))
            .collect()
    }
}

/// Summary written next to the patch files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogManifest {
    /// Layout version.
    pub schema_version: SchemaVersion,
    /// Patch center coordinates.
    pub centers: CoordSky,
    /// Largest angular distance of a member from its center, per patch.
    pub radii: Vec<f64>,
    /// Number of objects per patch.
    pub sizes: Vec<usize>,
    /// Whether redshifts are stored.
    pub has_redshifts: bool,
    /// Whether weights are stored.
    pub has_weights: bool,
}

impl CatalogManifest {
    /// Number of patches.
    pub fn n_patches(&self) -> usize {
        self.centers.len()
    }
}

/// A catalog split into spatial patches.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    manifest: CatalogManifest,
    patches: Vec<Patch>,
}

impl Catalog {
    /// Splits `records` into the patches described by `assignment`.
    pub fn build(records: &Records, assignment: PatchAssignment) -> Self {
        let n_patches = assignment.n_patches();
        let mut patches: Vec<Patch> = (0..n_patches)
            .map(|_| Patch {
                redshifts: records.redshifts.as_ref().map(|_| Vec::new()),
                weights: records.weights.as_ref().map(|_| Vec::new()),
                ..Patch::default()
            })
            .collect();
        for (row, &label) in assignment.labels.iter().enumerate() {
            let patch = &mut patches[label];
            patch.ra.push(records.coords.ra[row]);
            patch.dec.push(records.coords.dec[row]);
            if let (Some(target), Some(source)) = (patch.redshifts.as_mut(), &records.redshifts) {
                target.push(source[row]);
            }
            if let (Some(target), Some(source)) = (patch.weights.as_mut(), &records.weights) {
                target.push(source[row]);
            }
        }

        let center_vectors = assignment.centers.to_unit_vectors();
        let radii = patches
            .iter()
            .zip(&center_vectors)
            .map(|(patch, center)| {
                patch
                    .unit_vectors()
                    .iter()
                    .map(|position| angular_distance(position, center))
                    .fold(0.0, f64::max)
            })
            .collect();
        let manifest = CatalogManifest {
            schema_version: CATALOG_SCHEMA,
            centers: assignment.centers,
            radii,
            sizes: patches.iter().map(Patch::len).collect(),
            has_redshifts: records.redshifts.is_some(),
            has_weights: records.weights.is_some(),
        };
        Self { manifest, patches }
    }

    /// The manifest describing this catalog.
    pub fn manifest(&self) -> &CatalogManifest {
        &self.manifest
    }

    /// Patch center coordinates.
    pub fn centers(&self) -> &CoordSky {
        &self.manifest.centers
    }

    /// Patch radii in radians.
    pub fn radii(&self) -> &[f64] {
        &self.manifest.radii
    }

    /// Number of patches.
    pub fn n_patches(&self) -> usize {
        self.patches.len()
    }

    /// All patches in index order.
    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }

    /// Total number of objects.
    pub fn len(&self) -> usize {
        self.patches.iter().map(Patch::len).sum()
    }

    /// True if no objects are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether redshifts are available.
    pub fn has_redshifts(&self) -> bool {
        self.manifest.has_redshifts
    }

    /// Whether weights are available.
    pub fn has_weights(&self) -> bool {
        self.manifest.has_weights
    }

    /// Writes patches and manifest into `dir`, which must already exist.
    pub fn write(&self, dir: &Path) -> Result<(), ClzError> {
        for (idx, patch) in self.patches.iter().enumerate() {
            let path = patch_path(dir, idx);
            let file =
                File::create(&path).map_err(|err| ClzError::from_io("patch-create", &path, err))?;
            let mut writer = BufWriter::new(file);
            bincode::serialize_into(&mut writer, patch).map_err(|err| {
                ClzError::Serde(ErrorInfo::new("patch-serialize", err.to_string()).with_path(&path))
            })?;
            writer
                .flush()
                .map_err(|err| ClzError::from_io("patch-write", &path, err))?;
        }
        let path = dir.join(MANIFEST_FILE);
        let json = serde_json::to_vec_pretty(&self.manifest).map_err(|err| {
            ClzError::Serde(ErrorInfo::new("manifest-serialize", err.to_string()).with_path(&path))
        })?;
        fs::write(&path, json).map_err(|err| ClzError::from_io("manifest-write", &path, err))
    }

    /// Loads a catalog previously written with [`Catalog::write`].
    pub fn read(dir: &Path) -> Result<Self, ClzError> {
        let manifest = read_manifest(dir)?;
        let n_patches = manifest.n_patches();
        if manifest.sizes.len() != n_patches || manifest.radii.len() != n_patches {
            return Err(ClzError::Integrity(
                ErrorInfo::new("manifest-shape", "manifest lists do not match the patch count")
                    .with_path(&dir.join(MANIFEST_FILE))
                    .with_context("centers", n_patches.to_string())
                    .with_context("sizes", manifest.sizes.len().to_string())
                    .with_context("radii", manifest.radii.len().to_string()),
            ));
        }
        let mut patches = Vec::with_capacity(manifest.n_patches());
        for (idx, &expected) in manifest.sizes.iter().enumerate() {
            let path = patch_path(dir, idx);
            let file =
                File::open(&path).map_err(|err| ClzError::from_io("patch-open", &path, err))?;
            let patch: Patch = bincode::deserialize_from(BufReader::new(file)).map_err(|err| {
                ClzError::Serde(ErrorInfo::new("patch-deserialize", err.to_string()).with_path(&path))
            })?;
            if patch.len() != expected {
                return Err(ClzError::Integrity(
                    ErrorInfo::new("patch-size", "patch size differs from manifest")
                        .with_path(&path)
                        .with_context("expected", expected.to_string())
                        .with_context("found", patch.len().to_string()),
                ));
            }
            patches.push(patch);
        }
        Ok(Self { manifest, patches })
    }
}

/// Reads only the manifest of a catalog directory.
pub fn read_manifest(dir: &Path) -> Result<CatalogManifest, ClzError> {
    let path = dir.join(MANIFEST_FILE);
    let bytes = fs::read(&path).map_err(|err| ClzError::from_io("manifest-read", &path, err))?;
    let manifest: CatalogManifest = serde_json::from_slice(&bytes).map_err(|err| {
        ClzError::Serde(ErrorInfo::new("manifest-parse", err.to_string()).with_path(&path))
    })?;
    if !CATALOG_SCHEMA.is_compatible(&manifest.schema_version) {
        return Err(ClzError::Serde(
            ErrorInfo::new("manifest-schema", "unsupported catalog schema")
                .with_path(&path)
                .with_context("found", manifest.schema_version.to_string())
                .with_context("supported", CATALOG_SCHEMA.to_string()),
        ));
    }
    Ok(manifest)
}

fn patch_path(dir: &Path, idx: usize) -> PathBuf {
    dir.join(format!("patch_{idx:04}.bin"))
}

