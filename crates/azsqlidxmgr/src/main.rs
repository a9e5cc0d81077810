use std::process::ExitCode;

use azsqlidxmgr_core::{Config, Settings};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod connection;
mod error;
mod output;

use cli::Cli;
use connection::ConnectionManager;
use error::AppError;

/// Conventional exit status after an interrupt
const EXIT_CANCELLED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity level
    init_tracing(cli.verbose);

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(AppError::Cancelled) => {
            warn!("Run cancelled");
            ExitCode::from(EXIT_CANCELLED)
        }
        Err(e) => {
            e.print_diagnostic();
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    // Check for RUST_LOG env var first, then fall back to verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "azsqlidxmgr=info,azsqlidxmgr_core=info,tiberius=warn",
            1 => "azsqlidxmgr=debug,azsqlidxmgr_core=debug,tiberius=info",
            _ => "azsqlidxmgr=trace,azsqlidxmgr_core=trace,tiberius=debug",
        };
        tracing_subscriber::EnvFilter::new(level)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbose > 0)
                .with_thread_ids(false)
                .with_thread_names(false)
                .compact(),
        )
        .init();

    debug!("Tracing initialized with verbosity level: {}", verbose);
}

fn load_settings(cli: &Cli) -> Result<Settings, AppError> {
    let config = if let Some(path) = &cli.config_file {
        debug!("Loading config from explicit path: {:?}", path);
        Config::load_from_path(path)?
    } else {
        debug!("Loading config from default location");
        Config::load()?
    };

    Ok(Settings::resolve(config, cli.overrides())?)
}

/// Cancel `token` on the first Ctrl-C, exit on the second
fn cancel_on_interrupt(token: CancellationToken) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            debug!("Unable to listen for Ctrl-C: {}", e);
            return;
        }
        warn!("Cancellation requested, stopping the current database (Ctrl-C again to exit now) ...");
        token.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted again, exiting");
            std::process::exit(i32::from(EXIT_CANCELLED));
        }
    });
}

async fn run(cli: &Cli) -> Result<(), AppError> {
    let settings = load_settings(cli)?;
    if settings.params.dry_run {
        info!("Dry run: no database will be modified");
    }

    let conn_mgr = ConnectionManager::new(settings);
    let runner = conn_mgr.create_runner()?;

    let cancel = CancellationToken::new();
    cancel_on_interrupt(cancel.clone());

    let start = std::time::Instant::now();
    let summary = runner.run(&cancel).await?;
    debug!("Run completed in {:?}", start.elapsed());

    output::print_summary(&summary, cli.output)?;
    Ok(())
}
