//! Votes Admin Entry Point
//!
//! Runs category migrations, previews and counter audits against the
//! PostgreSQL vote store.

use clap::Parser;
use dotenv::dotenv;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use votes_admin::{AdminError, Cli, Dependencies, LogFormat, Settings, commands};

/// Initialize tracing/logging.
fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("votes_admin=info,votes_engine=info,votes_repository=info"));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_target(true)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
    }

    info!(
        service_name = "votes-admin",
        service_version = env!("CARGO_PKG_VERSION"),
        log_format = ?format,
        "Tracing initialized"
    );
}

#[tokio::main]
async fn main() -> Result<(), AdminError> {
    // Load environment variables from .env file
    dotenv().ok();

    let cli = Cli::parse();
    init_tracing(LogFormat::from_env());

    let settings = Settings::from_env()?;
    let dependencies = match Dependencies::new(&settings).await {
        Ok(dependencies) => dependencies,
        Err(e) => {
            error!(error = %e, "Failed to initialize dependencies");
            return Err(e);
        }
    };

    match commands::run(cli.command, &dependencies, cli.json).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!(error = %e, "Command failed");
            Err(e)
        }
    }
}
