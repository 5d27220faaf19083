use std::io;
use std::path::Path;

use clz_core::errors::{ClzError, ErrorInfo};

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("path", "/tmp/cache")
        .with_hint("check the pipeline configuration")
}

#[test]
fn config_error_surface() {
    let err = ClzError::Config(sample_info("no-patch-method", "no patch creation method specified"));
    assert_eq!(err.info().code, "no-patch-method");
    assert!(err.to_string().contains("no patch creation method specified"));
    assert!(err.to_string().contains("hint"));
}

#[test]
fn io_kinds_map_to_families() {
    let path = Path::new("/tmp/missing");
    let missing = ClzError::from_io("open", path, io::Error::from(io::ErrorKind::NotFound));
    assert!(missing.is_not_found());
    assert_eq!(missing.info().context["path"], "/tmp/missing");

    let exists = ClzError::from_io("mkdir", path, io::Error::from(io::ErrorKind::AlreadyExists));
    assert!(matches!(exists, ClzError::AlreadyExists(_)));

    let other = ClzError::from_io("write", path, io::Error::from(io::ErrorKind::PermissionDenied));
    assert!(matches!(other, ClzError::Io(_)));
}

#[test]
fn errors_round_trip_json() {
    let err = ClzError::Integrity(sample_info("drop-leftovers", "unaccounted contents"));
    let json = serde_json::to_string(&err).expect("serialize");
    let decoded: ClzError = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(decoded, err);
}
