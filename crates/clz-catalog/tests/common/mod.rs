#![allow(dead_code)]

use clz_catalog::Table;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Uniform positions on a small sky patch with redshifts and a patch column.
pub fn uniform_table(rows: usize, seed: u64) -> Table {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut ra = Vec::with_capacity(rows);
    let mut dec = Vec::with_capacity(rows);
    let mut z = Vec::with_capacity(rows);
    let mut patch = Vec::with_capacity(rows);
    for _ in 0..rows {
        let ra_deg: f64 = rng.gen_range(0.0..12.0);
        ra.push(ra_deg);
        dec.push(rng.gen_range(-5.0..5.0));
        z.push(rng.gen_range(0.1..1.0));
        patch.push((ra_deg / 4.0).floor().min(2.0));
    }
    Table::from_columns([("ra", ra), ("dec", dec), ("z", z), ("patch", patch)]).unwrap()
}
