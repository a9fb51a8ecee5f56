//! apiflow
//!
//! Runs sequential API-workflow scenarios against a REST service and prints a
//! report. Exits with 1 when any scenario fails and 2 on configuration errors.

use std::process::ExitCode;

use apiflow_harness::{HarnessConfig, ReportFormat, execute, init_logging};
use clap::Parser;
use tracing::info;

const EXIT_FAILED_RUN: u8 = 1;
const EXIT_CONFIG: u8 = 2;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let config = HarnessConfig::parse();
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        return Ok(ExitCode::from(EXIT_CONFIG));
    }

    info!(
        base_url = %config.base_url,
        ephemeral = config.ephemeral,
        scenario_files = config.scenario_files.len(),
        only = ?config.only,
        "Starting apiflow"
    );

    let report = execute(&config).await?;

    match config.format {
        ReportFormat::Text => println!("{report}"),
        ReportFormat::Json => println!("{}", report.to_json()?),
    }

    if report.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_FAILED_RUN))
    }
}
