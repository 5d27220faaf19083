use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clz_stage::init_logging;
use commands::{
    cache::{self, CacheArgs},
    correlate::{self, AutoArgs, CrossArgs},
    params::{self, ParamsArgs},
    run::{self, RunArgs},
    summarize::{self, SummarizeArgs},
};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "clustz", about = "Clustering redshift pipeline")]
struct Cli {
    /// Lowest log level of the clustz crates (error, warn, info, debug, trace, off).
    #[arg(long, global = true)]
    verbose: Option<String>,
    /// Also write logs to files in this directory.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create or drop a patch-split catalog cache.
    Cache(CacheArgs),
    /// Measure the autocorrelation of a cache.
    Auto(AutoArgs),
    /// Measure the cross-correlation of a reference and an unknown cache.
    Cross(CrossArgs),
    /// Turn correlation functions into a redshift density.
    Summarize(SummarizeArgs),
    /// Run a YAML pipeline.
    Run(RunArgs),
    /// List the parameters accepted by each stage.
    Params(ParamsArgs),
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let level = cli.verbose.as_deref().unwrap_or("info");
    let mut logger = init_logging(level, cli.log_dir.as_deref())?;
    let verbose = cli.verbose.as_deref();
    match cli.command {
        Command::Cache(args) => cache::run(&args, verbose, &mut logger),
        Command::Auto(args) => correlate::run_auto(&args, verbose, &mut logger),
        Command::Cross(args) => correlate::run_cross(&args, verbose, &mut logger),
        Command::Summarize(args) => summarize::run(&args, verbose, &mut logger),
        Command::Run(args) => run::run(&args, &mut logger),
        Command::Params(args) => params::run(&args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_cache_commands_parse() {
        let cli = Cli::try_parse_from([
            "clustz",
            "--verbose",
            "debug",
            "cache",
            "create",
            "--data",
            "ref.csv",
            "--output",
            "ref.json",
            "--set",
            "path=caches/ref",
            "--set",
            "n_patches=5",
        ])
        .unwrap();
        assert_eq!(cli.verbose.as_deref(), Some("debug"));
        assert!(matches!(cli.command, Command::Cache(_)));
    }

    #[test]
    fn run_requires_a_pipeline() {
        assert!(Cli::try_parse_from(["clustz", "run"]).is_err());
        assert!(Cli::try_parse_from(["clustz", "run", "--pipeline", "p.yaml"]).is_ok());
    }
}
