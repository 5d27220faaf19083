//! Patch creation methods and their precedence.

use std::fs;
use std::path::Path;

use clz_core::{ClzError, CoordSky, ErrorInfo, RngHandle, UnitVector, DEFAULT_SEED};
use rand::seq::index::sample;

use crate::table::Table;

/// Maximum number of k-means refinement passes.
const KMEANS_MAX_ITERATIONS: usize = 100;

/// Optional patch creation parameters as they arrive from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchSpec {
    /// Explicit patch centers.
    pub centers: Option<CoordSky>,
    /// Name of a column holding patch indices starting from 0.
    pub column: Option<String>,
    /// Number of patches to generate with k-means.
    pub count: Option<usize>,
    /// Seed for the k-means initialisation.
    pub seed: u64,
}

impl Default for PatchSpec {
    fn default() -> Self {
        Self {
            centers: None,
            column: None,
            count: None,
            seed: DEFAULT_SEED,
        }
    }
}

impl PatchSpec {
    /// Patches defined by explicit centers.
    pub fn from_centers(centers: CoordSky) -> Self {
        Self {
            centers: Some(centers),
            ..Self::default()
        }
    }

    /// Patches defined by an index column.
    pub fn from_column(column: impl Into<String>) -> Self {
        Self {
            column: Some(column.into()),
            ..Self::default()
        }
    }

    /// Patches generated by k-means.
    pub fn from_count(count: usize) -> Self {
        Self {
            count: Some(count),
            ..Self::default()
        }
    }

    /// Picks the method with the strongest consistency guarantee.
    ///
    /// Centers are exact, an index column is exact but only consistent if the
    /// caller encodes the same patches elsewhere, and a count is approximate.
    pub fn resolve(&self) -> Result<PatchMethod, ClzError> {
        if let Some(centers) = &self.centers {
            return Ok(PatchMethod::Centers(centers.clone()));
        }
        if let Some(column) = &self.column {
            return Ok(PatchMethod::Column(column.clone()));
        }
        if let Some(count) = self.count {
            return Ok(PatchMethod::Count {
                count,
                seed: self.seed,
            });
        }
        Err(ClzError::Config(
            ErrorInfo::new("no-patch-method", "no patch creation method specified")
                .with_hint("set patch centers, a patch index column or a patch count"),
        ))
    }
}

/// A resolved patch creation method.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchMethod {
    /// Assign objects to the nearest of these centers.
    Centers(CoordSky),
    /// Read patch indices from a column.
    Column(String),
    /// Cluster positions into this many patches.
    Count {
        /// Number of patches.
        count: usize,
        /// Seed for the initial centroids.
        seed: u64,
    },
}

/// Patch labels for every row plus the centers they refer to.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchAssignment {
    /// Patch center coordinates.
    pub centers: CoordSky,
    /// Patch index per row.
    pub labels: Vec<usize>,
}

impl PatchAssignment {
    /// Number of patches.
    pub fn n_patches(&self) -> usize {
        self.centers.len()
    }
}

/// Assigns every position to a patch with the given method.
pub fn assign_patches(
    method: &PatchMethod,
    table: &Table,
    positions: &[UnitVector],
) -> Result<PatchAssignment, ClzError> {
    match method {
        PatchMethod::Centers(centers) => {
            if centers.is_empty() {
                return Err(ClzError::config(
                    "empty-centers",
                    "patch centers must contain at least one position",
                ));
            }
            let center_vectors = centers.to_unit_vectors();
            let labels = positions
                .iter()
                .map(|position| nearest_center(position, &center_vectors))
                .collect();
            Ok(PatchAssignment {
                centers: centers.clone(),
                labels,
            })
        }
        PatchMethod::Column(name) => {
            let labels = labels_from_column(name, table.column(name)?)?;
            let centers = centers_from_labels(name, positions, &labels)?;
            Ok(PatchAssignment { centers, labels })
        }
        PatchMethod::Count { count, seed } => kmeans(positions, *count, *seed),
    }
}

fn labels_from_column(name: &str, values: &[f64]) -> Result<Vec<usize>, ClzError> {
    values
        .iter()
        .enumerate()
        .map(|(row, &value)| {
            if value < 0.0 || value.fract() != 0.0 || !value.is_finite() {
                Err(ClzError::Config(
                    ErrorInfo::new("patch-index", "patch indices must be integers >= 0")
                        .with_context("column", name)
                        .with_context("row", row.to_string())
                        .with_context("value", value.to_string()),
                ))
            } else {
                Ok(value as usize)
            }
        })
        .collect()
}

fn centers_from_labels(
    name: &str,
    positions: &[UnitVector],
    labels: &[usize],
) -> Result<CoordSky, ClzError> {
    let n_patches = labels.iter().max().map_or(0, |max| max + 1);
    let mut sums = vec![UnitVector::zeros(); n_patches];
    let mut counts = vec![0usize; n_patches];
    for (position, &label) in positions.iter().zip(labels) {
        sums[label] += position;
        counts[label] += 1;
    }
    if let Some(empty) = counts.iter().position(|&count| count == 0) {
        return Err(ClzError::Config(
            ErrorInfo::new("empty-patch", "patch index column skips a patch")
                .with_context("column", name)
                .with_context("patch", empty.to_string()),
        ));
    }
    Ok(CoordSky::from_unit_vectors(&sums))
}

fn nearest_center(position: &UnitVector, centers: &[UnitVector]) -> usize {
    let mut best = 0usize;
    let mut best_dot = f64::NEG_INFINITY;
    for (idx, center) in centers.iter().enumerate() {
        let dot = position.dot(center);
        if dot > best_dot {
            best = idx;
            best_dot = dot;
        }
    }
    best
}

/// Seeded spherical k-means on unit vectors.
pub fn kmeans(
    positions: &[UnitVector],
    count: usize,
    seed: u64,
) -> Result<PatchAssignment, ClzError> {
    if count == 0 || count > positions.len() {
        return Err(ClzError::Config(
            ErrorInfo::new("patch-count", "patch count must be between 1 and the number of rows")
                .with_context("count", count.to_string())
                .with_context("rows", positions.len().to_string()),
        ));
    }
    let mut rng = RngHandle::from_seed(seed);
    let mut centroids: Vec<UnitVector> = sample(rng.inner_mut(), positions.len(), count)
        .into_iter()
        .map(|idx| positions[idx])
        .collect();
    let mut labels = vec![usize::MAX; positions.len()];

    for _ in 0..KMEANS_MAX_ITERATIONS {
        let changed = assign_clusters(positions, &centroids, &mut labels);
        recompute_centroids(positions, &labels, &mut centroids);
        if !changed {
            break;
        }
    }
    // final pass so labels agree with the centers that get stored
    assign_clusters(positions, &centroids, &mut labels);
    log::debug!("k-means created {count} patches from {} objects", positions.len());

    Ok(PatchAssignment {
        centers: CoordSky::from_unit_vectors(&centroids),
        labels,
    })
}

fn assign_clusters(positions: &[UnitVector], centroids: &[UnitVector], labels: &mut [usize]) -> bool {
    let mut changed = false;
    for (idx, position) in positions.iter().enumerate() {
        let best = nearest_center(position, centroids);
        if labels[idx] != best {
            labels[idx] = best;
            changed = true;
        }
    }
    changed
}

fn recompute_centroids(positions: &[UnitVector], labels: &[usize], centroids: &mut [UnitVector]) {
    let mut sums = vec![UnitVector::zeros(); centroids.len()];
    let mut counts = vec![0usize; centroids.len()];
    for (position, &label) in positions.iter().zip(labels) {
        sums[label] += position;
        counts[label] += 1;
    }
    for (cluster, sum) in sums.into_iter().enumerate() {
        if counts[cluster] > 0 && sum.norm() > 0.0 {
            centroids[cluster] = sum.normalize();
        } else {
            // re-seed an empty cluster with the worst fitted object
            centroids[cluster] = farthest_member(positions, labels, centroids);
        }
    }
}

fn farthest_member(positions: &[UnitVector], labels: &[usize], centroids: &[UnitVector]) -> UnitVector {
    let mut worst = positions[0];
    let mut worst_dot = f64::INFINITY;
    for (position, &label) in positions.iter().zip(labels) {
        let dot = position.dot(&centroids[label]);
        if dot < worst_dot {
            worst_dot = dot;
            worst = *position;
        }
    }
    worst
}

/// Reads patch centers from a two column text file (RA and Dec in radians).
pub fn patch_centers_from_file(path: &Path) -> Result<CoordSky, ClzError> {
    let text =
        fs::read_to_string(path).map_err(|err| ClzError::from_io("centers-read", path, err))?;
    let mut ra = Vec::new();
    let mut dec = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let line = line.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 2 {
            return Err(ClzError::Config(
                ErrorInfo::new(
                    "centers-format",
                    "invalid patch center file, expected two columns (RA, Dec in radians)",
                )
                .with_path(path)
                .with_context("line", (line_no + 1).to_string())
                .with_context("columns", fields.len().to_string()),
            ));
        }
        let parse = |field: &str| {
            field.parse::<f64>().map_err(|_| {
                ClzError::Config(
                    ErrorInfo::new("centers-format", format!("invalid patch center value '{field}'"))
                        .with_path(path)
                        .with_context("line", (line_no + 1).to_string()),
                )
            })
        };
        ra.push(parse(fields[0])?);
        dec.push(parse(fields[1])?);
    }
    CoordSky::new(ra, dec)
}

/// Writes patch centers in the format read by [`patch_centers_from_file`].
pub fn write_patch_centers(path: &Path, centers: &CoordSky) -> Result<(), ClzError> {
    let mut text = String::from("# ra dec (radians)\n");
    for (ra, dec) in centers.ra.iter().zip(&centers.dec) {
        text.push_str(&format!("{ra:?} {dec:?}\n"));
    }
    fs::write(path, text).map_err(|err| ClzError::from_io("centers-write", path, err))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_positions() -> Vec<UnitVector> {
        let mut positions = Vec::new();
        for i in 0..20 {
            for j in 0..20 {
                let ra = (i as f64 * 0.5).to_radians();
                let dec = (j as f64 * 0.5 - 5.0).to_radians();
                positions.push(clz_core::radec_to_vector(ra, dec));
            }
        }
        positions
    }

    #[test]
    fn precedence_prefers_centers_then_column_then_count() {
        let centers = CoordSky::new(vec![1.0], vec![0.5]).unwrap();
        let mut spec = PatchSpec {
            centers: Some(centers.clone()),
            column: Some("patch".to_string()),
            count: Some(4),
            seed: 1,
        };
        assert_eq!(spec.resolve().unwrap(), PatchMethod::Centers(centers));
        spec.centers = None;
        assert_eq!(spec.resolve().unwrap(), PatchMethod::Column("patch".to_string()));
        spec.column = None;
        assert_eq!(spec.resolve().unwrap(), PatchMethod::Count { count: 4, seed: 1 });
        spec.count = None;
        let err = spec.resolve().unwrap_err();
        assert!(err.info().message.contains("no patch creation method"));
    }

    #[test]
    fn kmeans_is_deterministic_per_seed() {
        let positions = grid_positions();
        let first = kmeans(&positions, 4, 7).unwrap();
        let second = kmeans(&positions, 4, 7).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.n_patches(), 4);
        for patch in 0..4 {
            assert!(first.labels.contains(&patch));
        }
    }

    #[test]
    fn kmeans_rejects_too_many_patches() {
        let positions = grid_positions();
        assert!(kmeans(&positions, positions.len() + 1, 0).is_err());
        assert!(kmeans(&positions, 0, 0).is_err());
    }

    #[test]
    fn centers_file_rejects_three_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("centers.txt");
        fs::write(&path, "1.0 2.0 3.0\n").unwrap();
        let err = patch_centers_from_file(&path).unwrap_err();
        assert!(err.info().message.starts_with("invalid"));
    }

    #[test]
    fn centers_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("centers.txt");
        let centers = CoordSky::new(vec![1.0, 1.5, 2.0], vec![-1.0, 0.0, 1.0]).unwrap();
        write_patch_centers(&path, &centers).unwrap();
        assert_eq!(patch_centers_from_file(&path).unwrap(), centers);
    }
}
