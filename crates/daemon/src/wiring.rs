// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Assembles a [`CoreScheduler`] from a loaded [`Config`] plus injected
//! batch-system/site-adapter drivers (spec §6 composition root).

use crate::config::Config;
use roced_adapters::{BatchSystem, SiteAdapter};
use roced_core::site::SiteInfo;
use roced_core::Clock;
use roced_engine::{
    Broker, BrokerConfig, CoreScheduler, CoreSchedulerConfig, IntegrationAdapter, MachineProfile,
    RequirementAdapter, SlurmIntegrationAdapter, SlurmIntegrationAdapterConfig, SlurmRequirementAdapter,
    SlurmRequirementAdapterConfig,
};
use roced_storage::{default_backup_path, MonitoringSink, Registry, StatusLogWriter};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Builds the full control-loop object graph, restoring the registry
/// snapshot if one exists.
pub fn build_scheduler(
    config: &Config,
    clock: Arc<dyn Clock>,
    batch: Arc<dyn BatchSystem>,
    site_adapters: HashMap<String, Arc<dyn SiteAdapter>>,
) -> CoreScheduler {
    let backup_path = default_backup_path(&config.registry.snapshot_path);
    let mut registry = Registry::load(&config.registry.snapshot_path, &backup_path);

    let status_log = Arc::new(StatusLogWriter::new(config.registry.status_log_path.clone()));
    let monitoring = Arc::new(MonitoringSink::new(config.registry.monitoring_dir.clone()));

    // Cache TTL+grace knobs: the config schema names one pair of "wait"
    // durations under `[integration]`; reused as the Requirement Adapter's
    // job-list cache window too rather than inventing a second pair the
    // spec doesn't define.
    let validity = Duration::from_secs(config.integration.slurm_wait_pd_minutes * 60);
    let redundancy = Duration::from_secs(config.integration.slurm_wait_working_minutes * 60);

    let integration_adapter = Arc::new(SlurmIntegrationAdapter::new(
        SlurmIntegrationAdapterConfig {
            site_name: config.integration.site_name.clone(),
            slurm_deadline: chrono::Duration::minutes(config.integration.slurm_deadline_minutes as i64),
        },
        Arc::clone(&batch),
        Arc::clone(&clock),
        validity,
        redundancy,
        Arc::clone(&status_log),
        Arc::clone(&monitoring),
    ));
    registry
        .event_bus_mut()
        .subscribe(Box::new(integration_adapter.subscriber()));
    info!(
        logger = %config.integration.logger_name,
        site = %config.integration.site_name,
        "integration adapter ready"
    );

    let requirement_adapters: Vec<(MachineProfile, Arc<dyn RequirementAdapter>)> = config
        .machine_types
        .iter()
        .map(|machine_type| {
            let profile = MachineProfile {
                machine_type: machine_type.name.clone(),
                cores: machine_type.cores,
            };
            let adapter: Arc<dyn RequirementAdapter> = Arc::new(SlurmRequirementAdapter::new(
                SlurmRequirementAdapterConfig {
                    partition: config.requirement.slurm_partition.clone(),
                    profile: profile.clone(),
                },
                Arc::clone(&batch),
                Arc::clone(&clock),
                validity,
                redundancy,
            ));
            (profile, adapter)
        })
        .collect();

    let sites: Vec<SiteInfo> = config
        .sites
        .iter()
        .map(|site| SiteInfo {
            site_name: site.name.clone(),
            cost: site.cost,
            max_machines: site.max_machines,
            supported_machine_types: site.supported_machine_types.iter().cloned().collect(),
        })
        .collect();

    // The Broker's `SiteInfo` carries no provider tag; the site's own name
    // doubles as its `site_type` until a deployment needs the two to differ.
    let site_types: HashMap<String, String> = config
        .sites
        .iter()
        .map(|site| (site.name.clone(), site.name.clone()))
        .collect();

    let broker = Broker::new(BrokerConfig {
        default_max_instances: config.broker.max_instances,
        max_instances_by_type: HashMap::new(),
        shutdown_delay: chrono::Duration::seconds(config.broker.shutdown_delay_seconds as i64),
    });

    let scheduler_config = CoreSchedulerConfig {
        // Spec §5: "each concurrent fetch has a timeout bounded by the
        // cycle period" — the cycle period itself is that bound.
        cycle_period: Duration::from_secs(config.scheduler.cycle_seconds),
        adapter_timeout: Duration::from_secs(config.scheduler.cycle_seconds),
        snapshot_path: config.registry.snapshot_path.clone(),
        backup_path,
        site_types,
    };

    CoreScheduler::new(
        registry,
        requirement_adapters,
        vec![integration_adapter as Arc<dyn IntegrationAdapter>],
        site_adapters,
        broker,
        sites,
        clock,
        status_log,
        monitoring,
        scheduler_config,
    )
}

/// Waits for SIGINT or SIGTERM.
// Allow expect here as registering a signal handler only fails if the
// runtime has already torn down its signal-driver, which never happens
// this early in `main`.
#[cfg(unix)]
#[allow(clippy::expect_used)]
async fn wait_for_unix_signal() {
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .expect("install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

/// A `watch` channel that flips to `true` on SIGINT or SIGTERM, for
/// [`CoreScheduler::run`]'s cooperative shutdown (spec §5 cancellation at
/// cycle boundaries).
pub async fn shutdown_signal() -> tokio::sync::watch::Receiver<bool> {
    let (tx, rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        #[cfg(unix)]
        wait_for_unix_signal().await;
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }
        let _ = tx.send(true);
    });
    rx
}

#[cfg(test)]
#[path = "wiring_tests.rs"]
mod tests;
