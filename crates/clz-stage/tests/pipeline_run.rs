mod common;

use clz_catalog::CorrelationCache;
use clz_est::{DensityEnsemble, RedshiftData};
use clz_stage::{CacheHandle, Pipeline, StageKind};
use tempfile::tempdir;

#[test]
fn pipeline_runs_every_stage_in_order() {
    let dir = tempdir().unwrap();
    common::write_inputs(dir.path(), 400);
    let file = dir.path().join("pipeline.yaml");
    std::fs::write(&file, common::PIPELINE).unwrap();

    let pipeline = Pipeline::load(&file).unwrap();
    assert_eq!(pipeline.stages().len(), 6);
    assert_eq!(pipeline.stages()[4].kind(), StageKind::Summarize);

    let report = pipeline.run(None).unwrap();
    let names: Vec<&str> = report.stages.iter().map(|stage| stage.name.as_str()).collect();
    assert_eq!(names, ["cache_ref", "cache_unk", "auto_ref", "cross", "summarize", "drop_unk"]);
    let summary = &report.stages[4];
    assert_eq!(summary.outputs.len(), 2);
    assert!(summary.outputs.values().all(|digest| digest.len() == 64));

    let reference = CacheHandle::read(&dir.path().join("handles/ref.json")).unwrap().open().unwrap();
    assert_eq!(reference.n_patches().unwrap(), 3);
    assert!(!dir.path().join("caches/unk").exists());

    let density = DensityEnsemble::read_csv(&dir.path().join("results/nz.csv")).unwrap();
    assert_eq!(density.edges().len(), 5);
    assert_eq!(density.len(), 3);
    assert!(density.pdfs().iter().flatten().all(|&value| value >= 0.0));

    let data = RedshiftData::from_file(&dir.path().join("results/nz.bin")).unwrap();
    assert_eq!(data.n_bins(), 4);
}

#[test]
fn unknown_cache_shares_reference_patches() {
    let dir = tempdir().unwrap();
    common::write_inputs(dir.path(), 200);
    let file = dir.path().join("pipeline.yaml");
    let text = common::PIPELINE.split("  - name: auto_ref").next().unwrap();
    std::fs::write(&file, text).unwrap();

    Pipeline::load(&file).unwrap().run(None).unwrap();
    let reference = CorrelationCache::open(dir.path().join("caches/ref")).unwrap();
    let unknown = CorrelationCache::open(dir.path().join("caches/unk")).unwrap();
    assert_eq!(reference.patch_centers().unwrap(), unknown.patch_centers().unwrap());
}
