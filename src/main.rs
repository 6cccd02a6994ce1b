use std::io;
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use tracing::error;

use travelplan::app::{self, RunOutcome};
use travelplan::cli::{Cli, Command};
use travelplan::{GenerationError, TravelPlanConfig, TravelPlanError, logging};

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is normal
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = TravelPlanConfig::load_from_path(cli.config.clone());
    // default logging when the configured one is unavailable
    let logging_config = config.as_ref().map(|c| c.logging.clone()).unwrap_or_default();

    let _guard = match logging::init(&logging_config, cli.verbose) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            return ExitCode::FAILURE;
        }
    };

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!(error = format!("{e:#}"), "Failed to load configuration");
            eprintln!("{} {}", "error:".red().bold(), user_message(&e));
            return ExitCode::FAILURE;
        }
    };

    match run(&cli, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = format!("{e:#}"), "Run failed");
            eprintln!("\n{} {}", "error:".red().bold(), user_message(&e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli, config: &TravelPlanConfig) -> anyhow::Result<()> {
    match cli.command() {
        Command::Plan => {
            let outcome = app::run(config, &cli.run_options(), io::stdin().lock(), io::stdout()).await?;
            if let RunOutcome::Written(path) = outcome {
                tracing::info!(path = %path.display(), "Itinerary ready");
            }
        }
        Command::Providers => {
            print!("{}", app::describe_setup(config)?);
        }
    }
    Ok(())
}

fn user_message(e: &anyhow::Error) -> String {
    if let Some(e) = e.downcast_ref::<GenerationError>() {
        e.user_message()
    } else if let Some(e) = e.downcast_ref::<TravelPlanError>() {
        e.user_message()
    } else {
        format!("{e:#}")
    }
}
