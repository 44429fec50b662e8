pub mod advisory; // Treatment advice lookup and formatting
pub mod cli;
pub mod config;
pub mod forward; // Case forwarding to officers
pub mod geo; // Officer directory and proximity
pub mod inference; // Disease classification
pub mod intake; // Photo preprocessing
pub mod services;
pub mod workflow; // Report state machine

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

pub fn run() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Agriverse starting v{}", config::APP_VERSION);

    let args = cli::Args::parse();

    // One draft at a time; a single thread is enough.
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start async runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(cli::execute(args)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Report failed");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
