use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use clz_stage::StageKind;
use flexi_logger::LoggerHandle;

use super::{execute, slots, StageOptions};

#[derive(Args, Debug)]
pub struct AutoArgs {
    /// Handle of the cache to correlate; it must hold randoms.
    #[arg(long)]
    pub sample: PathBuf,
    /// Correlation function file to write.
    #[arg(long)]
    pub output: PathBuf,
    #[command(flatten)]
    pub options: StageOptions,
}

#[derive(Args, Debug)]
pub struct CrossArgs {
    /// Handle of the reference cache; its redshifts define the bins.
    #[arg(long)]
    pub reference: PathBuf,
    /// Handle of the unknown cache.
    #[arg(long)]
    pub unknown: PathBuf,
    /// Correlation function file to write.
    #[arg(long)]
    pub output: PathBuf,
    #[command(flatten)]
    pub options: StageOptions,
}

pub fn run_auto(args: &AutoArgs, verbose: Option<&str>, logger: &mut LoggerHandle) -> Result<(), Box<dyn Error>> {
    execute(
        StageKind::AutoCorrelate,
        &args.options,
        verbose,
        slots([("sample", Some(args.sample.as_path()))]),
        slots([("auto_corr", Some(args.output.as_path()))]),
        logger,
    )
}

pub fn run_cross(args: &CrossArgs, verbose: Option<&str>, logger: &mut LoggerHandle) -> Result<(), Box<dyn Error>> {
    execute(
        StageKind::CrossCorrelate,
        &args.options,
        verbose,
        slots([
            ("reference", Some(args.reference.as_path())),
            ("unknown", Some(args.unknown.as_path())),
        ]),
        slots([("cross_corr", Some(args.output.as_path()))]),
        logger,
    )
}
