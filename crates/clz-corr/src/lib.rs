#![deny(missing_docs)]
#![doc = "Redshift-binned, patch-resolved pair counting with jackknife correlation estimates."]

pub mod binning;
pub mod config;
pub mod corrfunc;
pub mod cosmology;
pub mod counts;
pub mod runner;

pub use binning::Binning;
pub use config::{BackendConfig, BinningConfig, BinningMethod, Configuration, ScalesConfig};
pub use corrfunc::{
    jackknife_covariance, write_text_files, CorrData, CorrFunc, Estimator, ResamplingConfig,
    ResamplingMethod, CORRFUNC_MAGIC, CORRFUNC_SCHEMA,
};
pub use cosmology::Cosmology;
pub use counts::PairCounts;
pub use runner::{autocorrelate, crosscorrelate};
