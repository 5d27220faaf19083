use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use clz_stage::Pipeline;
use flexi_logger::LoggerHandle;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// YAML pipeline; relative paths resolve against its directory.
    #[arg(long)]
    pub pipeline: PathBuf,
    /// Write the run report to this JSON file instead of stdout.
    #[arg(long)]
    pub report: Option<PathBuf>,
    /// Validate the pipeline without running it.
    #[arg(long)]
    pub check: bool,
}

pub fn run(args: &RunArgs, logger: &mut LoggerHandle) -> Result<(), Box<dyn Error>> {
    let pipeline = Pipeline::load(&args.pipeline)?;
    log::info!("loaded {} stages from {}", pipeline.stages().len(), args.pipeline.display());
    if args.check {
        for stage in pipeline.stages() {
            println!("{}: {}", stage.name(), stage.kind().name());
        }
        return Ok(());
    }
    let report = pipeline.run(Some(logger))?;
    match &args.report {
        Some(path) => report.write(path)?,
        None => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}
