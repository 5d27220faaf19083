#![allow(dead_code)]

use std::path::Path;

use clz_catalog::Table;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub fn uniform_table(rows: usize, seed: u64) -> Table {
    let mut rng = StdRng::seed_from_u64(seed);
    let ra: Vec<f64> = (0..rows).map(|_| rng.gen_range(20.0..24.0)).collect();
    let dec: Vec<f64> = (0..rows).map(|_| rng.gen_range(-2.0..2.0)).collect();
    let z: Vec<f64> = (0..rows).map(|_| rng.gen_range(0.2..0.8)).collect();
    Table::from_columns([("ra", ra), ("dec", dec), ("z", z)]).unwrap()
}

/// Writes reference and unknown samples with their randoms as CSV files.
pub fn write_inputs(dir: &Path, rows: usize) {
    uniform_table(rows, 11).write_csv(&dir.join("ref.csv")).unwrap();
    uniform_table(2 * rows, 12).write_csv(&dir.join("ref_rand.csv")).unwrap();
    uniform_table(rows, 13).write_csv(&dir.join("unk.csv")).unwrap();
}

pub const PIPELINE: &str = r#"
stages:
  - name: cache_ref
    stage: cache_create
    config:
      path: caches/ref
      redshift_name: z
      n_patches: 3
    inputs:
      data: ref.csv
      rand: ref_rand.csv
    outputs:
      cache: handles/ref.json
  - name: cache_unk
    stage: cache_create
    config:
      path: caches/unk
      redshift_name: z
    inputs:
      data: unk.csv
      patch_source: handles/ref.json
    outputs:
      cache: handles/unk.json
  - name: auto_ref
    stage: auto_correlate
    config:
      rmin: 500
      rmax: 3000
      zmin: 0.2
      zmax: 0.8
      zbin_num: 4
      thread_num: 2
    inputs:
      sample: handles/ref.json
    outputs:
      auto_corr: results/auto_ref.bin
  - name: cross
    stage: cross_correlate
    config:
      rmin: 500
      rmax: 3000
      zmin: 0.2
      zmax: 0.8
      zbin_num: 4
      thread_num: 2
    inputs:
      reference: handles/ref.json
      unknown: handles/unk.json
    outputs:
      cross_corr: results/cross.bin
  - name: summarize
    stage: summarize
    config:
      verbose: debug
    inputs:
      cross_corr: results/cross.bin
      auto_corr_ref: results/auto_ref.bin
    outputs:
      output: results/nz.csv
      estimate: results/nz.bin
  - name: drop_unk
    stage: cache_drop
    inputs:
      cache: handles/unk.json
"#;
