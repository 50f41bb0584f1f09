//! VidGuard command-line entry point

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};

use vidguard::cli::{commands, Cli};
use vidguard::utils::logging::{LoggingConfig, LoggingSystem};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let logging = LoggingSystem::new(LoggingConfig::new(cli.log_level, cli.log_format));
    logging.initialize()?;
    logging.log_system_info();

    vidguard::init()?;
    debug!(command = ?cli.command, "Executing command");

    let success = commands::run(cli).await?;
    info!("VidGuard finished");

    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
