mod config;
mod observability;

use activities::errors::RunError;
use clap::{Parser, Subcommand};
use config::{Config, ConfigError};
use observability::ObservabilityError;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "terminus", about = "Keyword-filtered Strava activities")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Serve the activities API and the admin endpoints.
    Run {
        #[arg(long)]
        config_file_path: PathBuf,
    },
    /// Fetch one athlete's activities with a refresh token and write them as JSON.
    Export {
        #[arg(long)]
        config_file_path: PathBuf,
        #[arg(long, env = "STRAVA_REFRESH_TOKEN", hide_env_values = true)]
        refresh_token: String,
        #[arg(long, default_value = "static/activities.json")]
        output: PathBuf,
    },
}

impl CliCommand {
    fn config_file_path(&self) -> &PathBuf {
        match self {
            CliCommand::Run { config_file_path } => config_file_path,
            CliCommand::Export {
                config_file_path, ..
            } => config_file_path,
        }
    }
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Observability(#[from] ObservabilityError),
    #[error("could not start runtime: {0}")]
    Runtime(std::io::Error),
    #[error(transparent)]
    Run(#[from] RunError),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli_main(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "terminus exited with an error");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn cli_main(cli: Cli) -> Result<(), CliError> {
    let config = Config::from_file(cli.command.config_file_path())?;

    let _sentry = observability::init_logging(config.common.logging.as_ref())?;
    observability::init_metrics(config.common.metrics.as_ref())?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    match cli.command {
        CliCommand::Run { .. } => {
            tracing::info!("starting activities service");
            rt.block_on(activities::run(config.activities))?;
        }
        CliCommand::Export {
            refresh_token,
            output,
            ..
        } => {
            let written = rt.block_on(activities::run_export(
                config.activities,
                &refresh_token,
                &output,
            ))?;
            tracing::info!(records = written, path = %output.display(), "export finished");
        }
    }

    Ok(())
}
