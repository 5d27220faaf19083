#![deny(missing_docs)]
#![doc = "Core error, coordinate, artifact and seeding types shared by the clustz crates."]

pub mod artifact;
pub mod coords;
pub mod errors;
pub mod provenance;
pub mod rng;

pub use artifact::{create_parent_dir, digest_file, read_artifact, read_json, write_artifact, write_json};
pub use coords::{angular_distance, radec_to_vector, CoordSky, UnitVector};
pub use errors::{ClzError, ErrorInfo};
pub use provenance::SchemaVersion;
pub use rng::{RngHandle, DEFAULT_SEED};
