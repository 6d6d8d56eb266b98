//! GitOps Promoter
//!
//! Entry point: parses the command line, initializes logging and runs one
//! promotion.

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use gitops_promoter::app::cli::Cli;
use gitops_promoter::app::run::run;
use gitops_promoter::logs::init_logging;
use gitops_promoter::utils::version_json;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Print version and exit
    if cli.version {
        match version_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Failed to serialize version info: {e}");
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    if let Err(e) = init_logging(cli.log_options()) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let options = match cli.into_options() {
        Ok(options) => options,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match run(options).await {
        Ok(outcomes) => {
            for outcome in outcomes {
                info!(
                    stack = %outcome.stack,
                    branch = %outcome.branch,
                    status = ?outcome.status,
                    deployed = outcome.deployed,
                    "promotion finished"
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to promote: {e}");
            ExitCode::FAILURE
        }
    }
}
