use clz_catalog::{ColumnSpec, CorrelationCache, DataSource, PatchSpec, Table};
use clz_corr::{
    autocorrelate, crosscorrelate, BackendConfig, BinningConfig, Configuration, Cosmology,
    ScalesConfig,
};
use clz_est::{estimate, ClipNegative, EstimatorChoice, RedshiftData, ResamplingConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::tempdir;

const N: usize = 400;
const ZBIN_NUM: usize = 5;

fn uniform(rows: usize, seed: u64) -> Table {
    let mut rng = StdRng::seed_from_u64(seed);
    let ra: Vec<f64> = (0..rows).map(|_| rng.gen_range(10.0..14.0)).collect();
    let dec: Vec<f64> = (0..rows).map(|_| rng.gen_range(-2.0..2.0)).collect();
    let z: Vec<f64> = (0..rows).map(|_| rng.gen_range(0.2..0.8)).collect();
    Table::from_columns([("ra", ra), ("dec", dec), ("z", z)]).unwrap()
}

fn config() -> Configuration {
    let mut binning = BinningConfig::new(0.2, 0.8);
    binning.zbin_num = ZBIN_NUM;
    Configuration::create(
        ScalesConfig::new(500.0, 3000.0),
        binning,
        BackendConfig::default(),
        Cosmology::default(),
    )
    .unwrap()
}

#[test]
fn uniform_samples_give_a_non_negative_estimate() {
    let dir = tempdir().unwrap();
    let columns = ColumnSpec::default().with_redshift("z");
    let data = uniform(N, 1);
    let rand = uniform(2 * N, 2);

    let reference = CorrelationCache::create_with(dir.path().join("ref"), false, |cache| {
        cache
            .rand_mut()
            .set(DataSource::Table(&rand), &columns, &PatchSpec::from_count(3), false)?;
        cache
            .data_mut()
            .set(DataSource::Table(&data), &columns, &PatchSpec::default(), false)?;
        Ok(())
    })
    .unwrap();
    assert_eq!(reference.n_patches().unwrap(), 3);

    let centers = reference.patch_centers().unwrap();
    let unknown = CorrelationCache::create_with(dir.path().join("unk"), false, |cache| {
        cache
            .data_mut()
            .set(DataSource::Table(&data), &columns, &PatchSpec::from_centers(centers), false)?;
        Ok(())
    })
    .unwrap();

    let config = config();
    let auto = autocorrelate(&reference, &config).unwrap();
    let cross = crosscorrelate(&reference, &unknown, &config).unwrap();

    let (data, estimate) = estimate(
        &cross,
        Some(&auto),
        None,
        &EstimatorChoice::default(),
        &ResamplingConfig::default(),
        &ClipNegative,
    )
    .unwrap();
    assert_eq!(estimate.edges.len(), ZBIN_NUM + 1);
    assert_eq!(estimate.variants.len(), 3);
    assert!(estimate.primary.iter().all(|&value| value >= 0.0));
    assert!(estimate.variants.iter().flatten().all(|&value| value >= 0.0));

    let density = estimate.to_density();
    for idx in 0..density.len() {
        let integral = density.integral(idx);
        assert!(integral == 0.0 || (integral - 1.0).abs() < 1e-9);
    }

    let path = dir.path().join("nz.bin");
    data.to_file(&path).unwrap();
    let restored = RedshiftData::from_file(&path).unwrap();
    assert_eq!(restored.binning, data.binning);
    assert_eq!(restored.samples.len(), data.samples.len());
}
