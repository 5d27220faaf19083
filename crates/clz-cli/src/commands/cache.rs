use std::error::Error;
use std::path::PathBuf;

use clap::{Args, Subcommand};
use clz_catalog::write_patch_centers;
use clz_stage::{CacheDrop, CacheHandle, StageConfig, StageKind};
use flexi_logger::LoggerHandle;
use serde_yaml::Value;

use super::{execute, slots, StageOptions};

#[derive(Args, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommand,
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Split data and optional randoms into patches under a new cache.
    Create(CreateArgs),
    /// Remove a cache and everything in it.
    Drop(DropArgs),
    /// Export the patch centers of a cache as a patch file.
    Centers(CentersArgs),
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// CSV file with the data sample.
    #[arg(long)]
    pub data: PathBuf,
    /// CSV file with the random sample.
    #[arg(long)]
    pub rand: Option<PathBuf>,
    /// Cache handle whose patch centers are reused.
    #[arg(long)]
    pub patch_source: Option<PathBuf>,
    /// Where to write the handle of the new cache.
    #[arg(long)]
    pub output: PathBuf,
    #[command(flatten)]
    pub options: StageOptions,
}

#[derive(Args, Debug)]
pub struct DropArgs {
    /// Handle of the cache to drop.
    #[arg(long, required_unless_present = "path", conflicts_with = "path")]
    pub cache: Option<PathBuf>,
    /// Cache directory to drop.
    #[arg(long)]
    pub path: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct CentersArgs {
    /// Handle of the cache.
    #[arg(long)]
    pub cache: PathBuf,
    /// Text file to write, usable as `patch_file`.
    #[arg(long)]
    pub output: PathBuf,
}

pub fn run(args: &CacheArgs, verbose: Option<&str>, logger: &mut LoggerHandle) -> Result<(), Box<dyn Error>> {
    match &args.command {
        CacheCommand::Create(args) => execute(
            StageKind::CacheCreate,
            &args.options,
            verbose,
            slots([
                ("data", Some(args.data.as_path())),
                ("rand", args.rand.as_deref()),
                ("patch_source", args.patch_source.as_deref()),
            ]),
            slots([("cache", Some(args.output.as_path()))]),
            logger,
        ),
        CacheCommand::Drop(args) => {
            let path = match (&args.cache, &args.path) {
                (Some(handle), _) => CacheHandle::read(handle)?.path,
                (None, Some(path)) => path.clone(),
                (None, None) => return Err("either --cache or --path is required".into()),
            };
            let config = StageConfig::from_yaml_value(StageKind::CacheDrop, &Value::Null)?;
            CacheDrop::new(&config)?.run(&path)?;
            Ok(())
        }
        CacheCommand::Centers(args) => {
            let cache = CacheHandle::read(&args.cache)?.open()?;
            let centers = cache.patch_centers()?;
            write_patch_centers(&args.output, &centers)?;
            log::info!("wrote {} patch centers to {}", centers.len(), args.output.display());
            Ok(())
        }
    }
}
