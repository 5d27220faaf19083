mod common;

use clz_catalog::{PatchSpec, Table};
use clz_corr::{autocorrelate, crosscorrelate, BinningConfig, CorrFunc, Estimator};
use clz_core::ClzError;
use tempfile::tempdir;

use common::{build_cache, config, three_centers, uniform_table};

#[test]
fn autocorrelation_requires_randoms() {
    let dir = tempdir().unwrap();
    let data = uniform_table(100, 1);
    let cache = build_cache(&dir.path().join("c"), &data, None, &PatchSpec::from_count(3));
    let err = autocorrelate(&cache, &config(4)).unwrap_err();
    assert!(matches!(err, ClzError::Config(_)));
    assert_eq!(err.info().message, "no randoms provided");
}

#[test]
fn crosscorrelation_requires_some_randoms() {
    let dir = tempdir().unwrap();
    let data = uniform_table(100, 2);
    let patches = PatchSpec::from_centers(three_centers());
    let reference = build_cache(&dir.path().join("ref"), &data, None, &patches);
    let unknown = build_cache(&dir.path().join("unk"), &data, None, &patches);
    let err = crosscorrelate(&reference, &unknown, &config(4)).unwrap_err();
    assert_eq!(err.info().message, "no randoms provided");
}

#[test]
fn autocorrelation_counts_all_three_terms() {
    let dir = tempdir().unwrap();
    let data = uniform_table(200, 3);
    let rand = uniform_table(400, 4);
    let cache = build_cache(&dir.path().join("c"), &data, Some(&rand), &PatchSpec::from_count(3));
    let corr = autocorrelate(&cache, &config(4)).unwrap();

    assert_eq!(corr.n_bins(), 4);
    assert_eq!(corr.n_patches(), 3);
    assert!(corr.dr.is_some() && corr.rr.is_some() && corr.rd.is_none());
    assert!(corr.dd.is_auto());
    assert!(corr.rr.as_ref().unwrap().total_counts().iter().all(|&count| count > 0.0));
    assert_eq!(corr.default_estimator(), Estimator::LandySzalay);

    let sampled = corr.sample(None).unwrap();
    assert_eq!(sampled.data.len(), 4);
    assert_eq!(sampled.samples.len(), 3);
    assert!(sampled.data.iter().all(|value| value.is_finite()));
}

#[test]
fn crosscorrelation_with_reference_randoms_has_no_rr() {
    let dir = tempdir().unwrap();
    let reference_data = uniform_table(200, 5);
    let reference_rand = uniform_table(400, 6);
    let unknown_data = uniform_table(200, 7);
    let patches = PatchSpec::from_centers(three_centers());
    let reference = build_cache(&dir.path().join("ref"), &reference_data, Some(&reference_rand), &patches);
    let unknown = build_cache(&dir.path().join("unk"), &unknown_data, None, &patches);

    let corr = crosscorrelate(&reference, &unknown, &config(3)).unwrap();
    assert!(corr.rr.is_none());
    assert!(corr.rd.is_some());
    assert!(corr.dr.is_none());
    assert_eq!(corr.default_estimator(), Estimator::DavisPeebles);
    assert!(corr.sample(None).is_ok());
    let err = corr.sample(Some(Estimator::LandySzalay)).unwrap_err();
    assert_eq!(err.info().code, "estimator");
}

#[test]
fn crosscorrelation_rejects_mismatched_patches() {
    let dir = tempdir().unwrap();
    let data = uniform_table(150, 8);
    let rand = uniform_table(300, 9);
    let reference = build_cache(&dir.path().join("ref"), &data, Some(&rand), &PatchSpec::from_count(3));
    let unknown = build_cache(&dir.path().join("unk"), &data, Some(&rand), &PatchSpec::from_count(2));
    let err = crosscorrelate(&reference, &unknown, &config(3)).unwrap_err();
    assert_eq!(err.info().code, "patch-mismatch");
}

#[test]
fn thread_count_does_not_change_counts() {
    let dir = tempdir().unwrap();
    let data = uniform_table(150, 10);
    let rand = uniform_table(300, 11);
    let cache = build_cache(&dir.path().join("c"), &data, Some(&rand), &PatchSpec::from_count(3));
    let mut single = config(3);
    single.backend.thread_num = Some(1);
    let mut multi = config(3);
    multi.backend.thread_num = Some(4);
    assert_eq!(autocorrelate(&cache, &single).unwrap(), autocorrelate(&cache, &multi).unwrap());
}

#[test]
fn without_crosspatch_only_matching_patches_are_counted() {
    let dir = tempdir().unwrap();
    let data = uniform_table(150, 12);
    let rand = uniform_table(300, 13);
    let cache = build_cache(&dir.path().join("c"), &data, Some(&rand), &PatchSpec::from_count(3));
    let mut config = config(2);
    config.backend.crosspatch = false;
    let corr = autocorrelate(&cache, &config).unwrap();
    for bin in 0..2 {
        for i in 0..3 {
            for j in (0..3).filter(|&j| j != i) {
                assert_eq!(corr.dd.count(bin, i, j), 0.0);
            }
        }
    }
}

#[test]
fn single_pair_is_counted_in_both_orders() {
    let dir = tempdir().unwrap();
    // two objects 0.1 deg apart at z = 0.5, plus randoms far away in redshift
    let data = Table::from_columns([
        ("ra", vec![1.0, 1.1]),
        ("dec", vec![0.0, 0.0]),
        ("z", vec![0.5, 0.5]),
    ])
    .unwrap();
    let rand = Table::from_columns([
        ("ra", vec![1.0, 1.1]),
        ("dec", vec![0.0, 0.0]),
        ("z", vec![0.45, 0.55]),
    ])
    .unwrap();
    let cache = build_cache(&dir.path().join("c"), &data, Some(&rand), &PatchSpec::from_count(1));
    let mut config = config(1);
    config.binning = BinningConfig::new(0.4, 0.6);
    let corr = autocorrelate(&cache, &config).unwrap();
    // the separation is about 2.3 Mpc at z = 0.5, inside 0.5 - 5 Mpc
    assert_eq!(corr.dd.count(0, 0, 0), 2.0);
    assert_eq!(corr.rr.as_ref().unwrap().count(0, 0, 0), 2.0);
    assert_eq!(corr.dr.as_ref().unwrap().count(0, 0, 0), 2.0);
}

#[test]
fn corrfunc_file_restores_exactly() {
    let dir = tempdir().unwrap();
    let data = uniform_table(120, 14);
    let rand = uniform_table(240, 15);
    let cache = build_cache(&dir.path().join("c"), &data, Some(&rand), &PatchSpec::from_count(2));
    let corr = autocorrelate(&cache, &config(3)).unwrap();
    let path = dir.path().join("out").join("w_ss.corr");
    corr.to_file(&path).unwrap();
    assert_eq!(CorrFunc::from_file(&path).unwrap(), corr);

    let prefix = dir.path().join("w_ss");
    corr.sample(None).unwrap().to_files(&prefix).unwrap();
    let dat = std::fs::read_to_string(dir.path().join("w_ss.dat")).unwrap();
    assert_eq!(dat.lines().count(), 4);
    assert!(dir.path().join("w_ss.smp").is_file());
    let cov = std::fs::read_to_string(dir.path().join("w_ss.cov")).unwrap();
    assert_eq!(cov.lines().count(), 3);
}
