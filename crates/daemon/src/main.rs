// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! wardend
//!
//! Long-running daemon that keeps a fleet of game server installations in
//! step with their maintenance calendars.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod lifecycle;

use std::path::PathBuf;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// In-flight batches get this long to finish after shutdown is requested
const SHUTDOWN_CEILING: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config_path: Option<PathBuf> = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" => {
                println!("wardend {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--config" => {
                let path = args.next().ok_or("--config requires a path")?;
                config_path = Some(PathBuf::from(path));
            }
            other => return Err(format!("unknown argument: {}", other).into()),
        }
    }

    setup_logging();

    let config_path = match config_path {
        Some(path) => path,
        None => lifecycle::default_config_path()?,
    };
    info!(config = %config_path.display(), "starting wardend");

    let mut daemon = lifecycle::startup(&config_path)?;

    // Graceful shutdown on SIGTERM / SIGINT
    let shutdown = CancellationToken::new();
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
                _ = sigint.recv() => info!("received SIGINT, shutting down"),
            }
            shutdown.cancel();
        });
    }

    daemon.supervisor.run(shutdown).await;

    // Abandon future buckets; give in-flight batches a bounded window
    daemon.scheduler.shutdown();
    if !daemon.scheduler.wait_idle(SHUTDOWN_CEILING).await {
        warn!("shutdown ceiling reached with a batch still in flight, exiting anyway");
    }

    lifecycle::remove_pid_file(&daemon.pid_path);
    info!("wardend stopped");
    Ok(())
}

fn setup_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}
