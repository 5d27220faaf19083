//! Single-file artifacts: a magic header, a schema version and a bincode payload.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::errors::{ClzError, ErrorInfo};
use crate::provenance::SchemaVersion;

fn serde_error(code: &str, path: &Path, err: impl ToString) -> ClzError {
    ClzError::Serde(ErrorInfo::new(code, err.to_string()).with_path(path))
}

/// Creates the parent directory of `path` if it is missing.
pub fn create_parent_dir(path: &Path) -> Result<(), ClzError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| ClzError::from_io("parent-mkdir", parent, err))?;
    }
    Ok(())
}

/// Writes `value` behind `magic` and `schema`, creating parent directories.
pub fn write_artifact<T: Serialize>(
    path: &Path,
    magic: &[u8],
    schema: SchemaVersion,
    value: &T,
) -> Result<(), ClzError> {
    create_parent_dir(path)?;
    let mut bytes = magic.to_vec();
    bincode::serialize_into(&mut bytes, &schema)
        .map_err(|err| serde_error("artifact-serialize", path, err))?;
    bincode::serialize_into(&mut bytes, value)
        .map_err(|err| serde_error("artifact-serialize", path, err))?;
    fs::write(path, bytes).map_err(|err| ClzError::from_io("artifact-write", path, err))
}

/// Reads an artifact written by [`write_artifact`] with the same `magic`.
///
/// Files with another magic header or an incompatible major schema version
/// are rejected before the payload is decoded.
pub fn read_artifact<T: DeserializeOwned>(
    path: &Path,
    magic: &[u8],
    schema: SchemaVersion,
) -> Result<T, ClzError> {
    let bytes = fs::read(path).map_err(|err| ClzError::from_io("artifact-read", path, err))?;
    let Some(mut payload) = bytes.strip_prefix(magic) else {
        return Err(ClzError::Serde(
            ErrorInfo::new("artifact-magic", "file is not an artifact of the expected kind")
                .with_path(path),
        ));
    };
    let found: SchemaVersion = bincode::deserialize_from(&mut payload)
        .map_err(|err| serde_error("artifact-schema", path, err))?;
    if !schema.is_compatible(&found) {
        return Err(ClzError::Serde(
            ErrorInfo::new("artifact-schema", "unsupported artifact schema")
                .with_path(path)
                .with_context("found", found.to_string())
                .with_context("supported", schema.to_string()),
        ));
    }
    bincode::deserialize_from(&mut payload).map_err(|err| serde_error("artifact-deserialize", path, err))
}

/// Writes `value` as pretty JSON, creating parent directories.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ClzError> {
    let json = serde_json::to_vec_pretty(value).map_err(|err| serde_error("json-serialize", path, err))?;
    create_parent_dir(path)?;
    fs::write(path, json).map_err(|err| ClzError::from_io("json-write", path, err))
}

/// Reads a JSON document.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ClzError> {
    let bytes = fs::read(path).map_err(|err| ClzError::from_io("json-read", path, err))?;
    serde_json::from_slice(&bytes).map_err(|err| serde_error("json-parse", path, err))
}

/// Hex encoded SHA-256 digest of a file.
pub fn digest_file(path: &Path) -> Result<String, ClzError> {
    let bytes = fs::read(path).map_err(|err| ClzError::from_io("digest-read", path, err))?;
    let digest = Sha256::digest(&bytes);
    Ok(digest.iter().map(|byte| format!("{byte:02x}")).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const MAGIC: &[u8] = b"CLZTEST\0";

    #[test]
    fn rejects_foreign_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("value.bin");
        write_artifact(&path, MAGIC, SchemaVersion::new(1, 0, 0), &vec![1.5f64, 2.5]).unwrap();

        let value: Vec<f64> = read_artifact(&path, MAGIC, SchemaVersion::new(1, 2, 0)).unwrap();
        assert_eq!(value, vec![1.5, 2.5]);

        let err = read_artifact::<Vec<f64>>(&path, b"OTHER\0\0\0", SchemaVersion::new(1, 0, 0))
            .unwrap_err();
        assert_eq!(err.info().code, "artifact-magic");

        let err =
            read_artifact::<Vec<f64>>(&path, MAGIC, SchemaVersion::new(2, 0, 0)).unwrap_err();
        assert_eq!(err.info().code, "artifact-schema");
    }

    #[test]
    fn digest_is_stable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty");
        fs::write(&path, b"").unwrap();
        assert_eq!(
            digest_file(&path).unwrap(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
