//! Static table of every stage parameter.

use std::fmt;

/// Value type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Text.
    Str,
    /// Non-negative integer.
    Int,
    /// Floating point number; integers are accepted.
    Float,
    /// Boolean.
    Bool,
    /// List of floating point numbers.
    FloatList,
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParamKind::Str => "string",
            ParamKind::Int => "integer",
            ParamKind::Float => "float",
            ParamKind::Bool => "boolean",
            ParamKind::FloatList => "list of floats",
        };
        f.write_str(name)
    }
}

/// Default value of an optional parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamDefault {
    /// Text default.
    Str(&'static str),
    /// Integer default.
    Int(u64),
    /// Float default.
    Float(f64),
    /// Boolean default.
    Bool(bool),
}

/// Metadata of one configuration parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    /// Key in the stage configuration.
    pub name: &'static str,
    /// Expected value type.
    pub kind: ParamKind,
    /// Value used when the key is absent.
    pub default: Option<ParamDefault>,
    /// Whether the key must be present.
    pub required: bool,
    /// One line description.
    pub help: &'static str,
}

const fn required(name: &'static str, kind: ParamKind, help: &'static str) -> ParamSpec {
    ParamSpec { name, kind, default: None, required: true, help }
}

const fn optional(name: &'static str, kind: ParamKind, help: &'static str) -> ParamSpec {
    ParamSpec { name, kind, default: None, required: false, help }
}

const fn with_default(
    name: &'static str,
    kind: ParamKind,
    default: ParamDefault,
    help: &'static str,
) -> ParamSpec {
    ParamSpec { name, kind, default: Some(default), required: false, help }
}

/// Cache location.
pub const CACHE_PARAMS: &[ParamSpec] = &[
    required("path", ParamKind::Str, "path to cache directory, must not exist"),
    with_default(
        "overwrite",
        ParamKind::Bool,
        ParamDefault::Bool(false),
        "overwrite the path if it is an existing cache directory",
    ),
];

/// Input columns.
pub const COLUMN_PARAMS: &[ParamSpec] = &[
    with_default("ra_name", ParamKind::Str, ParamDefault::Str("ra"), "column name of right ascension (in degrees)"),
    with_default("dec_name", ParamKind::Str, ParamDefault::Str("dec"), "column name of declination (in degrees)"),
    optional("redshift_name", ParamKind::Str, "column name of redshift"),
    optional("weight_name", ParamKind::Str, "column name of weight"),
];

/// Patch creation.
pub const PATCH_PARAMS: &[ParamSpec] = &[
    optional("patch_file", ParamKind::Str, "path to ASCII file that lists patch centers (RA Dec in radians)"),
    optional("patch_name", ParamKind::Str, "column name of patch index (starting from 0)"),
    optional("n_patches", ParamKind::Int, "number of spatial patches to create using k-means on coordinates of randoms"),
    with_default("seed", ParamKind::Int, ParamDefault::Int(12345), "seed of the k-means initialisation"),
];

/// Separation scales.
pub const SCALE_PARAMS: &[ParamSpec] = &[
    required("rmin", ParamKind::Float, "lower scale limit in kpc"),
    required("rmax", ParamKind::Float, "upper scale limit in kpc"),
    optional("rweight", ParamKind::Float, "power-law exponent used to weight pairs by separation"),
    with_default("rbin_num", ParamKind::Int, ParamDefault::Int(50), "number of log bins used to evaluate rweight"),
];

/// Redshift binning.
pub const BINNING_PARAMS: &[ParamSpec] = &[
    optional("zmin", ParamKind::Float, "lowest redshift bin edge"),
    optional("zmax", ParamKind::Float, "highest redshift bin edge"),
    with_default("zbin_num", ParamKind::Int, ParamDefault::Int(30), "number of redshift bins"),
    with_default("method", ParamKind::Str, ParamDefault::Str("linear"), "bin spacing: linear, comoving or logspace"),
    optional("zbins", ParamKind::FloatList, "explicit redshift bin edges, overrides zmin, zmax and zbin_num"),
];

/// Pair counting backend.
pub const BACKEND_PARAMS: &[ParamSpec] = &[
    with_default("crosspatch", ParamKind::Bool, ParamDefault::Bool(true), "count pairs across patch boundaries"),
    optional("thread_num", ParamKind::Int, "number of threads, all cores if unset"),
];

/// Correlation estimators.
pub const ESTIMATOR_PARAMS: &[ParamSpec] = &[
    optional("cross_est", ParamKind::Str, "correlation estimator to use for cross-correlation (LS or DP)"),
    optional("ref_est", ParamKind::Str, "correlation estimator to use for reference sample autocorrelation"),
    optional("unk_est", ParamKind::Str, "correlation estimator to use for unknown sample autocorrelation"),
];

/// Resampling and post-processing of the estimate.
pub const SUMMARY_PARAMS: &[ParamSpec] = &[
    with_default("crosspatch", ParamKind::Bool, ParamDefault::Bool(true), "include pairs across patch boundaries in jackknife samples"),
    with_default("policy", ParamKind::Str, ParamDefault::Str("clip-negative"), "post-processing: clip-negative or finite-only"),
];

/// Logging, accepted by every stage.
pub const VERBOSE_PARAMS: &[ParamSpec] = &[with_default(
    "verbose",
    ParamKind::Str,
    ParamDefault::Str("info"),
    "lowest log level emitted by clustz",
)];
