//! Patch-resolved pair counts and the brute force counting kernel.
//!
//! Counts are stored per redshift bin and per ordered patch pair so that
//! jackknife samples can be formed by leaving out one patch at a time.

use clz_catalog::Catalog;
use clz_core::{angular_distance, ClzError, ErrorInfo, UnitVector};
use rayon::prelude::*;
use rayon::ThreadPool;
use serde::{Deserialize, Serialize};

use crate::binning::Binning;
use crate::config::{Configuration, ScalesConfig};

/// Weighted pair counts with the normalisation needed to compare them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairCounts {
    n_bins: usize,
    n_patches: usize,
    auto: bool,
    crosspatch: bool,
    /// `[bin][i][j]` weighted pair counts.
    counts: Vec<f64>,
    /// `[bin][i]` summed weights of the first sample.
    totals1: Vec<f64>,
    /// `[bin][j]` summed weights of the second sample.
    totals2: Vec<f64>,
    /// `[bin][i]` summed squared weights, excluded self pairs of an auto count.
    self_pairs: Vec<f64>,
}

impl PairCounts {
    /// Number of redshift bins.
    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    /// Number of patches.
    pub fn n_patches(&self) -> usize {
        self.n_patches
    }

    /// True if both samples were the same catalog.
    pub fn is_auto(&self) -> bool {
        self.auto
    }

    /// Weighted count between patch `i` of the first and `j` of the second sample.
    pub fn count(&self, bin: usize, i: usize, j: usize) -> f64 {
        self.counts[(bin * self.n_patches + i) * self.n_patches + j]
    }

    /// Counts summed over all patch pairs, per bin.
    pub fn total_counts(&self) -> Vec<f64> {
        (0..self.n_bins)
            .map(|bin| self.count_without(bin, None, self.crosspatch))
            .collect()
    }

    fn count_without(&self, bin: usize, excluded: Option<usize>, crosspatch: bool) -> f64 {
        let mut sum = 0.0;
        for i in (0..self.n_patches).filter(|&i| Some(i) != excluded) {
            for j in (0..self.n_patches).filter(|&j| Some(j) != excluded) {
                if crosspatch || i == j {
                    sum += self.count(bin, i, j);
                }
            }
        }
        sum
    }

    fn total_without(&self, bin: usize, excluded: Option<usize>, crosspatch: bool) -> f64 {
        let row = bin * self.n_patches;
        let kept = (0..self.n_patches).filter(|&i| Some(i) != excluded);
        let mut total = if crosspatch {
            let first: f64 = kept.clone().map(|i| self.totals1[row + i]).sum();
            let second: f64 = kept.clone().map(|i| self.totals2[row + i]).sum();
            first * second
        } else {
            kept.clone()
                .map(|i| self.totals1[row + i] * self.totals2[row + i])
                .sum()
        };
        if self.auto {
            total -= kept.map(|i| self.self_pairs[row + i]).sum::<f64>();
        }
        total
    }

    /// Count divided by the number of possible pairs, per bin.
    pub fn normalised(&self) -> Vec<f64> {
        self.normalised_with(self.crosspatch)
    }

    /// Like [`PairCounts::normalised`]; `crosspatch = false` keeps only pairs
    /// within the same patch.
    pub fn normalised_with(&self, crosspatch: bool) -> Vec<f64> {
        let crosspatch = crosspatch && self.crosspatch;
        (0..self.n_bins)
            .map(|bin| {
                self.count_without(bin, None, crosspatch) / self.total_without(bin, None, crosspatch)
            })
            .collect()
    }

    /// Normalised counts with one patch left out, indexed `[patch][bin]`.
    pub fn jackknife(&self) -> Vec<Vec<f64>> {
        self.jackknife_with(self.crosspatch)
    }

    /// Like [`PairCounts::jackknife`] with the patch pair selection of
    /// [`PairCounts::normalised_with`].
    pub fn jackknife_with(&self, crosspatch: bool) -> Vec<Vec<f64>> {
        let crosspatch = crosspatch && self.crosspatch;
        (0..self.n_patches)
            .map(|patch| {
                (0..self.n_bins)
                    .map(|bin| {
                        self.count_without(bin, Some(patch), crosspatch)
                            / self.total_without(bin, Some(patch), crosspatch)
                    })
                    .collect()
            })
            .collect()
    }
}

/// Objects of one patch reduced to what the kernel needs.
#[derive(Debug, Clone, Default)]
pub(crate) struct PatchPoints {
    vectors: Vec<UnitVector>,
    weights: Vec<f64>,
}

impl PatchPoints {
    fn push(&mut self, vector: UnitVector, weight: f64) {
        self.vectors.push(vector);
        self.weights.push(weight);
    }

    fn total_weight(&self) -> f64 {
        self.weights.iter().sum()
    }

    fn squared_weight(&self) -> f64 {
        self.weights.iter().map(|w| w * w).sum()
    }
}

/// A catalog prepared for counting, optionally split by redshift.
pub(crate) struct SampleView {
    /// `[bin][patch]` when binned, a single `[patch]` row otherwise.
    rows: Vec<Vec<PatchPoints>>,
    binned: bool,
    centers: Vec<UnitVector>,
    radii: Vec<f64>,
}

impl SampleView {
    /// Splits every patch into redshift bins; objects outside the range are dropped.
    pub(crate) fn binned(catalog: &Catalog, binning: &Binning) -> Result<Self, ClzError> {
        if !catalog.has_redshifts() {
            return Err(ClzError::Config(
                ErrorInfo::new("missing-redshifts", "catalog has no redshifts to bin")
                    .with_hint("set the redshift column when creating the cache"),
            ));
        }
        let mut rows = vec![vec![PatchPoints::default(); catalog.n_patches()]; binning.n_bins()];
        for (patch_idx, patch) in catalog.patches().iter().enumerate() {
            let Some(redshifts) = &patch.redshifts else {
                continue;
            };
            for (idx, vector) in patch.unit_vectors().into_iter().enumerate() {
                if let Some(bin) = binning.find(redshifts[idx]) {
                    rows[bin][patch_idx].push(vector, patch.weight(idx));
                }
            }
        }
        Ok(Self::with_rows(catalog, rows, true))
    }

    /// Uses every object in every bin.
    pub(crate) fn unbinned(catalog: &Catalog) -> Self {
        let row = catalog
            .patches()
            .iter()
            .map(|patch| PatchPoints {
                vectors: patch.unit_vectors(),
                weights: (0..patch.len()).map(|idx| patch.weight(idx)).collect(),
            })
            .collect();
        Self::with_rows(catalog, vec![row], false)
    }

    fn with_rows(catalog: &Catalog, rows: Vec<Vec<PatchPoints>>, binned: bool) -> Self {
        Self {
            rows,
            binned,
            centers: catalog.centers().to_unit_vectors(),
            radii: catalog.radii().to_vec(),
        }
    }

    pub(crate) fn n_patches(&self) -> usize {
        self.centers.len()
    }

    fn patches(&self, bin: usize) -> &[PatchPoints] {
        if self.binned {
            &self.rows[bin]
        } else {
            &self.rows[0]
        }
    }
}

/// Angular limits of one redshift bin.
#[derive(Debug, Clone, Copy)]
struct BinScale {
    /// Angular diameter distance at the bin center in kpc.
    distance: f64,
    theta_min: f64,
    theta_max: f64,
}

/// Counts pairs between two prepared samples in every redshift bin.
///
/// With `auto` set the samples are the same catalog and an object is never
/// paired with itself; every other pair is counted in both orders.
pub(crate) fn count_pairs(
    first: &SampleView,
    second: &SampleView,
    auto: bool,
    binning: &Binning,
    config: &Configuration,
    pool: &ThreadPool,
) -> PairCounts {
    let n_bins = binning.n_bins();
    let n_patches = first.n_patches();
    let crosspatch = config.backend.crosspatch;
    let scales: Vec<BinScale> = binning
        .centers()
        .into_iter()
        .map(|z| {
            let distance = config.cosmology.angular_diameter_distance(z) * 1e3;
            BinScale {
                distance,
                theta_min: config.scales.rmin / distance,
                theta_max: config.scales.rmax / distance,
            }
        })
        .collect();

    let mut jobs = Vec::new();
    let mut pruned = 0usize;
    for (bin, scale) in scales.iter().enumerate() {
        for i in 0..n_patches {
            for j in 0..n_patches {
                if !crosspatch && i != j {
                    continue;
                }
                let separation = angular_distance(&first.centers[i], &second.centers[j]);
                if separation > scale.theta_max + first.radii[i] + second.radii[j] {
                    pruned += 1;
                    continue;
                }
                jobs.push((bin, i, j));
            }
        }
    }
    log::debug!("counting {} patch pairs, {pruned} pruned", jobs.len());

    let counted: Vec<((usize, usize, usize), f64)> = pool.install(|| {
        jobs.par_iter()
            .map(|&(bin, i, j)| {
                let a = &first.patches(bin)[i];
                let b = &second.patches(bin)[j];
                let same = auto && i == j;
                ((bin, i, j), count_patch_pair(a, b, same, &scales[bin], &config.scales))
            })
            .collect()
    });

    let mut counts = vec![0.0; n_bins * n_patches * n_patches];
    for ((bin, i, j), value) in counted {
        counts[(bin * n_patches + i) * n_patches + j] = value;
    }
    let mut totals1 = Vec::with_capacity(n_bins * n_patches);
    let mut totals2 = Vec::with_capacity(n_bins * n_patches);
    let mut self_pairs = Vec::with_capacity(n_bins * n_patches);
    for bin in 0..n_bins {
        for (a, b) in first.patches(bin).iter().zip(second.patches(bin)) {
            totals1.push(a.total_weight());
            totals2.push(b.total_weight());
            self_pairs.push(if auto { a.squared_weight() } else { 0.0 });
        }
    }
    PairCounts {
        n_bins,
        n_patches,
        auto,
        crosspatch,
        counts,
        totals1,
        totals2,
        self_pairs,
    }
}

fn count_patch_pair(
    a: &PatchPoints,
    b: &PatchPoints,
    same: bool,
    scale: &BinScale,
    scales: &ScalesConfig,
) -> f64 {
    let cos_min = scale.theta_max.min(std::f64::consts::PI).cos();
    let cos_max = scale.theta_min.cos();
    let mut sum = 0.0;
    for (ia, (va, wa)) in a.vectors.iter().zip(&a.weights).enumerate() {
        for (ib, (vb, wb)) in b.vectors.iter().zip(&b.weights).enumerate() {
            if same && ia == ib {
                continue;
            }
            let dot = va.dot(vb);
            if dot < cos_min || dot > cos_max {
                continue;
            }
            let r = angular_distance(va, vb) * scale.distance;
            if r < scales.rmin || r > scales.rmax {
                continue;
            }
            sum += wa * wb * scales.pair_weight(r);
        }
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(auto: bool, crosspatch: bool) -> PairCounts {
        // two bins, two patches
        PairCounts {
            n_bins: 2,
            n_patches: 2,
            auto,
            crosspatch,
            counts: vec![1.0, 2.0, 3.0, 4.0, 0.0, 0.0, 0.0, 0.0],
            totals1: vec![2.0, 3.0, 0.0, 0.0],
            totals2: vec![4.0, 5.0, 0.0, 0.0],
            self_pairs: vec![1.0, 1.0, 0.0, 0.0],
        }
    }

    #[test]
    fn cross_normalisation_uses_all_patch_pairs() {
        let counts = counts(false, true);
        assert_eq!(counts.total_counts()[0], 10.0);
        assert!((counts.normalised()[0] - 10.0 / 45.0).abs() < 1e-12);
        let jackknife = counts.jackknife();
        assert!((jackknife[0][0] - 4.0 / 15.0).abs() < 1e-12);
        assert!((jackknife[1][0] - 1.0 / 8.0).abs() < 1e-12);
        assert!(counts.normalised()[1].is_nan());
    }

    #[test]
    fn auto_normalisation_removes_self_pairs() {
        let counts = counts(true, true);
        assert!((counts.normalised()[0] - 10.0 / 43.0).abs() < 1e-12);
    }

    #[test]
    fn without_crosspatch_only_matching_patches_normalise() {
        let counts = counts(false, true);
        assert!((counts.normalised_with(false)[0] - 5.0 / 23.0).abs() < 1e-12);
        let counted_within = counts_within();
        assert!((counted_within.normalised_with(true)[0] - 5.0 / 23.0).abs() < 1e-12);
    }

    fn counts_within() -> PairCounts {
        let mut counts = counts(false, false);
        counts.counts = vec![1.0, 0.0, 0.0, 4.0, 0.0, 0.0, 0.0, 0.0];
        counts
    }
}
