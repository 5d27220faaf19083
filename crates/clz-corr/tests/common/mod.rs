#![allow(dead_code)]

use std::path::Path;

use clz_catalog::{ColumnSpec, CorrelationCache, DataSource, PatchSpec, Table};
use clz_corr::{BackendConfig, BinningConfig, Configuration, Cosmology, ScalesConfig};
use clz_core::CoordSky;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub fn uniform_table(rows: usize, seed: u64) -> Table {
    let mut rng = StdRng::seed_from_u64(seed);
    let ra: Vec<f64> = (0..rows).map(|_| rng.gen_range(0.0..4.0)).collect();
    let dec: Vec<f64> = (0..rows).map(|_| rng.gen_range(-2.0..2.0)).collect();
    let z: Vec<f64> = (0..rows).map(|_| rng.gen_range(0.1..0.9)).collect();
    Table::from_columns([("ra", ra), ("dec", dec), ("z", z)]).unwrap()
}

pub fn columns() -> ColumnSpec {
    ColumnSpec::default().with_redshift("z")
}

/// Stores data and optional randoms; randoms define the patches.
pub fn build_cache(
    root: &Path,
    data: &Table,
    rand: Option<&Table>,
    patches: &PatchSpec,
) -> CorrelationCache {
    CorrelationCache::create_with(root, false, |cache| {
        if let Some(rand) = rand {
            cache
                .rand_mut()
                .set(DataSource::Table(rand), &columns(), patches, false)?;
        }
        cache
            .data_mut()
            .set(DataSource::Table(data), &columns(), patches, false)?;
        Ok(())
    })
    .unwrap()
}

pub fn config(zbin_num: usize) -> Configuration {
    let mut binning = BinningConfig::new(0.1, 0.9);
    binning.zbin_num = zbin_num;
    Configuration::create(
        ScalesConfig::new(500.0, 5000.0),
        binning,
        BackendConfig::default(),
        Cosmology::default(),
    )
    .unwrap()
}

pub fn three_centers() -> CoordSky {
    CoordSky::from_degrees(&[0.7, 2.0, 3.3], &[0.0, 0.0, 0.0]).unwrap()
}
