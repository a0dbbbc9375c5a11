//! Main entry point for the unity-platform-converter CLI

use anyhow::Result;
use clap::Parser;
use unity_platform_converter::cli::Cli;
use unity_platform_converter::orchestrator;

fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logger; -v/-q override RUST_LOG
    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if let Some(level) = cli.log_level() {
        logger.filter_level(level);
    }
    logger.init();

    // Skipped files are reported in the summary, not through the exit code
    orchestrator::run(&cli.into_config())?;
    Ok(())
}
