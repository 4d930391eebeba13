use anyhow::{Context, Result};
use clap::Parser;
use cleaner::{
    coordinator::log_summary, CleanerConfig, Coordinator, FileOutcome, Mkvmerge, RunError,
};
use std::path::PathBuf;
use std::process::ExitCode;
use chrono::Local;
use log::{error, info, LevelFilter};
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Strips site advertisements and track names from MKV files
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Clean only this file, ignoring watch mode
    file: Option<PathBuf>,

    /// Path to configuration file (JSON or TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Environment file to load before reading settings (defaults to ./.env)
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // RUST_LOG wins; otherwise info, or debug with --verbose
    let default_level = if args.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .format_timestamp_secs()
        .init();

    load_env_file(args.env_file.as_deref())?;

    let cfg = CleanerConfig::from_file_and_env(args.config.as_deref())
        .context("Failed to load configuration")?;

    info!("MKV cleaner starting");
    info!("  Source folders: {:?}", cfg.source_roots);
    info!("  Ledger: {}", cfg.ledger_path.display());
    info!("  Add clean suffix: {}", cfg.add_clean_suffix);
    info!("  Remove site prefix: {}", cfg.remove_site_prefix);
    if cfg.schedule.enabled {
        info!(
            "  Execution window: {}h00 to {}h00",
            cfg.schedule.start_hour, cfg.schedule.end_hour
        );
    }

    let coordinator = Coordinator::new(&cfg, Mkvmerge::new(&cfg.mkvmerge_bin));

    if let Some(file) = args.file {
        return Ok(run_single_file(&coordinator, file).await);
    }

    // Leftover temp outputs are reported by the run itself, once the window allows work
    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_shutdown(cancel.clone()));

    if cfg.watch_mode {
        coordinator.run_forever(cancel).await;
        return Ok(ExitCode::SUCCESS);
    }

    match coordinator.run_once(&cancel).await {
        Ok(summary) => {
            log_summary(&summary);
            Ok(ExitCode::SUCCESS)
        }
        Err(e @ RunError::WindowClosed { .. }) => {
            error!("{}", e);
            error!("Current time: {}", Local::now().format("%H:%M:%S"));
            error!("No cleaning can start outside this window");
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e).context("Run failed"),
    }
}

async fn run_single_file(coordinator: &Coordinator<Mkvmerge>, file: PathBuf) -> ExitCode {
    match coordinator.run_file(&file).await {
        Ok(FileOutcome::Cleaned(outcome)) => {
            info!("OK: {}", outcome.final_path.display());
            ExitCode::SUCCESS
        }
        Ok(FileOutcome::AlreadyClean(_)) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Load `KEY=value` pairs into the process environment. A missing default `.env` is fine.
fn load_env_file(path: Option<&std::path::Path>) -> Result<()> {
    match path {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("Failed to load env file: {}", path.display()))?;
        }
        None => match dotenvy::dotenv() {
            Ok(_) => {}
            Err(e) if e.not_found() => {}
            Err(e) => return Err(e).context("Failed to load .env"),
        },
    }
    Ok(())
}

/// Cancel `token` on Ctrl+C or SIGTERM
async fn cancel_on_shutdown(token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }

    token.cancel();
}
