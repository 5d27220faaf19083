use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use clz_stage::StageKind;
use flexi_logger::LoggerHandle;

use super::{execute, slots, StageOptions};

#[derive(Args, Debug)]
pub struct SummarizeArgs {
    /// Cross-correlation function file.
    #[arg(long)]
    pub cross_corr: PathBuf,
    /// Autocorrelation of the reference sample.
    #[arg(long)]
    pub auto_corr_ref: Option<PathBuf>,
    /// Autocorrelation of the unknown sample.
    #[arg(long)]
    pub auto_corr_unk: Option<PathBuf>,
    /// CSV file for the normalised densities.
    #[arg(long)]
    pub output: PathBuf,
    /// File for the estimate with its jackknife samples.
    #[arg(long)]
    pub estimate: PathBuf,
    #[command(flatten)]
    pub options: StageOptions,
}

pub fn run(args: &SummarizeArgs, verbose: Option<&str>, logger: &mut LoggerHandle) -> Result<(), Box<dyn Error>> {
    execute(
        StageKind::Summarize,
        &args.options,
        verbose,
        slots([
            ("cross_corr", Some(args.cross_corr.as_path())),
            ("auto_corr_ref", args.auto_corr_ref.as_deref()),
            ("auto_corr_unk", args.auto_corr_unk.as_deref()),
        ]),
        slots([
            ("output", Some(args.output.as_path())),
            ("estimate", Some(args.estimate.as_path())),
        ]),
        logger,
    )
}
