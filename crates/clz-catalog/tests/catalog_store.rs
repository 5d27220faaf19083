mod common;

use std::fs;

use clz_catalog::{Catalog, ColumnSpec, DataSource, PatchSpec, PatchedCatalog, MANIFEST_FILE};
use clz_core::ClzError;
use tempfile::tempdir;

use common::uniform_table;

fn columns() -> ColumnSpec {
    ColumnSpec::default().with_redshift("z")
}

#[cfg(target_os = "linux")]
#[test]
fn write_reports_full_device() {
    if !std::path::Path::new("/dev/full").exists() {
        return;
    }
    let dir = tempdir().unwrap();
    let table = uniform_table(20, 40);
    let mut catalog = PatchedCatalog::new(dir.path().join("catalog"));
    let built = catalog
        .set(DataSource::Table(&table), &columns(), &PatchSpec::from_count(2), false)
        .unwrap();

    let target = dir.path().join("full");
    fs::create_dir(&target).unwrap();
    std::os::unix::fs::symlink("/dev/full", target.join("patch_0000.bin")).unwrap();

    assert!(built.write(&target).is_err());
    assert!(!target.join(MANIFEST_FILE).exists());
}

#[test]
fn read_rejects_short_manifest_lists() {
    let dir = tempdir().unwrap();
    let table = uniform_table(200, 41);
    let root = dir.path().join("catalog");
    let mut catalog = PatchedCatalog::new(&root);
    catalog
        .set(DataSource::Table(&table), &columns(), &PatchSpec::from_count(3), false)
        .unwrap();

    let manifest_path = root.join(MANIFEST_FILE);
    let mut manifest: serde_json::Value =
        serde_json::from_slice(&fs::read(&manifest_path).unwrap()).unwrap();
    manifest["sizes"].as_array_mut().unwrap().pop();
    fs::write(&manifest_path, serde_json::to_vec(&manifest).unwrap()).unwrap();

    let err = Catalog::read(&root).unwrap_err();
    assert!(matches!(err, ClzError::Integrity(_)));
    assert_eq!(err.info().code, "manifest-shape");
}

#[test]
fn set_replaces_directory_without_manifest() {
    let dir = tempdir().unwrap();
    let table = uniform_table(150, 42);
    let root = dir.path().join("catalog");
    fs::create_dir(&root).unwrap();
    fs::write(root.join("patch_0000.bin"), b"partial").unwrap();

    let mut catalog = PatchedCatalog::new(&root);
    assert!(!catalog.exists());
    let built = catalog
        .set(DataSource::Table(&table), &columns(), &PatchSpec::from_count(2), false)
        .unwrap();
    assert!(catalog.exists());
    assert_eq!(built.n_patches(), 2);
    assert_eq!(Catalog::read(&root).unwrap(), *built);
}
