//! Service Harness CLI
//!
//! Runs scenario suites and bulk-operation benchmarks against a REST service
//! it starts and stops itself.

use std::path::PathBuf;

use clap::Parser;
use harness::common::{config::Config, logging};
use harness::{cli, commands::Commands};

#[derive(Parser)]
#[command(name = "harness", about = "Conformance and load harness for a local REST service")]
#[command(version, long_about = None)]
struct Cli {
    /// Config file (default: the user config directory's config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also write detailed logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let guard = logging::init_cli(cli.log_file.as_deref());

    let result = match Config::load(cli.config.as_deref()) {
        Ok(config) => cli::dispatch(cli.command, config).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        drop(guard);
        std::process::exit(1);
    }
}
