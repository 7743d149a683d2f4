// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `roced`: the control-loop binary. Loads `roced.toml` (or the path given
//! as the first argument), wires the object graph, and runs the Core
//! Scheduler until SIGINT/SIGTERM.
//!
//! Ships with the no-transport [`roced_daemon::drivers`] by default — see
//! that module's doc comment. A real deployment forks `main` to construct
//! its own `BatchSystem`/`SiteAdapter` and calls
//! [`roced_daemon::build_scheduler`] directly instead.

use roced_adapters::{BatchSystem, SiteAdapter};
use roced_core::SystemClock;
use roced_daemon::drivers::{NullBatchSystem, NullSiteAdapter};
use roced_daemon::{build_scheduler, shutdown_signal, Config};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "roced.toml".to_string());
    let config = match Config::load(&PathBuf::from(&config_path)) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load config from {config_path}: {err}");
            return std::process::ExitCode::FAILURE;
        }
    };

    let _log_guard = init_logging(&config.registry.monitoring_dir);

    let batch: Arc<dyn BatchSystem> = Arc::new(NullBatchSystem);
    let mut site_adapters: HashMap<String, Arc<dyn SiteAdapter>> = HashMap::new();
    for site in &config.sites {
        site_adapters.insert(site.name.clone(), Arc::new(NullSiteAdapter));
    }

    let scheduler = build_scheduler(&config, Arc::new(SystemClock), batch, site_adapters);
    let shutdown = shutdown_signal().await;

    tracing::info!(cycle_seconds = config.scheduler.cycle_seconds, "roced starting");
    scheduler.run(shutdown).await;
    tracing::info!("roced stopped");

    std::process::ExitCode::SUCCESS
}

/// Structured logging to stdout plus a daily rolling file under the
/// registry's log directory (spec's expanded ambient-stack "Logging"
/// section). The returned guard must be held for the process lifetime or
/// buffered file writes are lost on exit.
fn init_logging(log_dir: &std::path::Path) -> tracing_appender::non_blocking::WorkerGuard {
    let file_appender = tracing_appender::rolling::daily(log_dir, "roced.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::fmt::layer().with_writer(file_writer).with_ansi(false))
        .init();

    guard
}
