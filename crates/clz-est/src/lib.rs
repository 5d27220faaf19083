#![deny(missing_docs)]
#![doc = "Redshift estimates from clustering measurements and their normalised densities."]

pub mod density;
pub mod policy;
pub mod redshift;

pub use clz_corr::{ResamplingConfig, ResamplingMethod};
pub use density::DensityEnsemble;
pub use policy::{ClipNegative, DensityPolicy, FiniteOnly, PolicyKind};
pub use redshift::{
    estimate, EstimatorChoice, RedshiftData, RedshiftEstimate, REDSHIFT_MAGIC, REDSHIFT_SCHEMA,
};
