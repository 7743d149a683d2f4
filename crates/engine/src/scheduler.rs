// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Core Scheduler: drives one control cycle end to end (spec §4.6).
//!
//! Requirement adapters run concurrently with a bounded per-call timeout
//! (spec §5 "parallelism where useful"); everything that touches the
//! registry — order dispatch, Integration Adapter reconcile, persistence —
//! runs sequentially on this task, matching §5's "registry touched only on
//! the main thread" constraint.

use crate::broker::Broker;
use crate::error::CycleError;
use crate::integration::IntegrationAdapter;
use crate::observability::log_status_change;
use crate::requirement::{MachineProfile, RequirementAdapter};
use chrono::{DateTime, Utc};
use roced_adapters::SiteAdapter;
use roced_core::machine::MachineStatus;
use roced_core::site::{MachineTypeDemand, SiteInfo};
use roced_core::{Clock, MachineId};
use roced_storage::{MonitoringSink, Registry, StatusLogWriter};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{error, warn};

/// Whether `status` counts toward a machine type's `actual` headcount fed
/// to the Broker — "booting through working" per spec §4.6 point 2.
fn is_active(status: MachineStatus) -> bool {
    matches!(
        status,
        MachineStatus::Booting | MachineStatus::Up | MachineStatus::Integrating | MachineStatus::Working
    )
}

pub struct CoreSchedulerConfig {
    pub cycle_period: Duration,
    pub adapter_timeout: Duration,
    pub snapshot_path: PathBuf,
    pub backup_path: PathBuf,
    /// Provider tag per site, used only when a spawn order creates a new
    /// machine record; the Broker's own `SiteInfo` carries no such field.
    /// A site missing here falls back to its own name.
    pub site_types: HashMap<String, String>,
}

pub struct CoreScheduler {
    registry: Registry,
    requirement_adapters: Vec<(MachineProfile, Arc<dyn RequirementAdapter>)>,
    integration_adapters: Vec<Arc<dyn IntegrationAdapter>>,
    site_adapters: HashMap<String, Arc<dyn SiteAdapter>>,
    broker: Broker,
    sites: Vec<SiteInfo>,
    clock: Arc<dyn Clock>,
    status_log: Arc<StatusLogWriter>,
    monitoring: Arc<MonitoringSink>,
    config: CoreSchedulerConfig,
}

impl CoreScheduler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Registry,
        requirement_adapters: Vec<(MachineProfile, Arc<dyn RequirementAdapter>)>,
        integration_adapters: Vec<Arc<dyn IntegrationAdapter>>,
        site_adapters: HashMap<String, Arc<dyn SiteAdapter>>,
        broker: Broker,
        sites: Vec<SiteInfo>,
        clock: Arc<dyn Clock>,
        status_log: Arc<StatusLogWriter>,
        monitoring: Arc<MonitoringSink>,
        config: CoreSchedulerConfig,
    ) -> Self {
        Self {
            registry,
            requirement_adapters,
            integration_adapters,
            site_adapters,
            broker,
            sites,
            clock,
            status_log,
            monitoring,
            config,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Run cycles forever until `shutdown` fires, sleeping the configured
    /// period between them. Cancellable at cycle boundaries only (spec §5).
    pub async fn run(mut self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        loop {
            let now = self.clock.now();
            if let Err(err) = self.run_cycle(now).await {
                error!(error = %err, "cycle aborted without persistence");
            }

            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.cycle_period) => {}
                _ = shutdown.changed() => break,
            }
        }
    }

    /// One control cycle: requirement -> broker -> dispatch -> integration
    /// reconcile -> persistence (spec §4.6, §5 ordering).
    pub async fn run_cycle(&mut self, now: DateTime<Utc>) -> Result<(), CycleError> {
        let demand = self.collect_demand(now).await;
        let orders = self.broker.decide(&demand, &self.sites, now);
        self.dispatch_orders(orders, now).await?;

        for adapter in self.integration_adapters.clone() {
            adapter.reconcile(&mut self.registry, now).await;
        }

        self.reap_disintegrated(now);

        if let Err(err) = self.registry.dump(&self.config.snapshot_path, &self.config.backup_path) {
            warn!(error = %err, "failed to persist machine registry; retrying next cycle");
        }

        Ok(())
    }

    async fn collect_demand(&self, now: DateTime<Utc>) -> HashMap<String, MachineTypeDemand> {
        let mut set = JoinSet::new();
        for (profile, adapter) in &self.requirement_adapters {
            let adapter = Arc::clone(adapter);
            let machine_type = profile.machine_type.clone();
            let timeout = self.config.adapter_timeout;
            set.spawn(async move {
                let required_delta = match tokio::time::timeout(timeout, adapter.required_delta()).await {
                    Ok(value) => value,
                    Err(_) => {
                        warn!(machine_type, "requirement adapter timed out, treating as unknown");
                        None
                    }
                };
                (machine_type, required_delta)
            });
        }

        let mut demand = HashMap::new();
        while let Some(result) = set.join_next().await {
            match result {
                Ok((machine_type, required_delta)) => {
                    let actual = self.actual_count(&machine_type);
                    // §9 note 2: `required_delta` already reports the
                    // shortfall as a negative number; negate it back into
                    // the absolute headcount the Broker's `required` wants.
                    let required = required_delta.map(|delta| -delta);
                    demand.insert(machine_type, MachineTypeDemand { required, actual });
                }
                Err(err) => warn!(error = %err, "requirement adapter task panicked"),
            }
        }
        demand
    }

    fn actual_count(&self, machine_type: &str) -> u32 {
        self.registry
            .get_machines(None, None, Some(machine_type))
            .values()
            .filter(|m| is_active(m.status))
            .count() as u32
    }

    async fn dispatch_orders(
        &mut self,
        orders: HashMap<String, HashMap<String, i64>>,
        now: DateTime<Utc>,
    ) -> Result<(), CycleError> {
        for (site_name, per_type) in orders {
            for (machine_type, delta) in per_type {
                if delta > 0 {
                    self.dispatch_spawn(&site_name, &machine_type, delta as u32, now).await?;
                } else if delta < 0 {
                    self.dispatch_shutdown(&site_name, &machine_type, (-delta) as u32, now).await;
                }
            }
        }
        Ok(())
    }

    async fn dispatch_spawn(
        &mut self,
        site_name: &str,
        machine_type: &str,
        count: u32,
        now: DateTime<Utc>,
    ) -> Result<(), CycleError> {
        let site_type = self
            .config
            .site_types
            .get(site_name)
            .cloned()
            .unwrap_or_else(|| site_name.to_string());

        for _ in 0..count {
            self.registry
                .new_machine(None, now, site_name, site_type.clone(), machine_type)?;
        }

        match self.site_adapters.get(site_name) {
            Some(site_adapter) => {
                if let Err(err) = site_adapter.spawn(machine_type, count).await {
                    warn!(site = site_name, machine_type, error = %err, "spawn call failed");
                }
            }
            None => warn!(site = site_name, "no site adapter registered, spawn not dispatched"),
        }
        Ok(())
    }

    async fn dispatch_shutdown(&mut self, site_name: &str, machine_type: &str, count: u32, now: DateTime<Utc>) {
        let candidates = self.select_shutdown_candidates(site_name, machine_type, count);
        for id in candidates {
            self.transition(&id, MachineStatus::PendingDisintegration, now);
            match self.site_adapters.get(site_name) {
                Some(site_adapter) => {
                    if let Err(err) = site_adapter.terminate(&id).await {
                        warn!(%id, error = %err, "terminate call failed");
                    }
                }
                None => warn!(site = site_name, "no site adapter registered, terminate not dispatched"),
            }
        }
    }

    /// Oldest-first selection among machines eligible to enter
    /// `PendingDisintegration`. `Working -> PendingDisintegration` is the
    /// only legal transition into that state (spec invariant 1,
    /// `MachineStatus::is_legal_transition`), so a `Booting`/`Up`/
    /// `Integrating` machine is never selected even though it still counts
    /// as `is_active` for demand purposes; spec §4.5 otherwise leaves
    /// instance selection unspecified (only the aggregate delta is
    /// mandated).
    fn select_shutdown_candidates(&self, site_name: &str, machine_type: &str, count: u32) -> Vec<MachineId> {
        let mut candidates: Vec<_> = self
            .registry
            .get_machines(Some(site_name), None, Some(machine_type))
            .into_iter()
            .filter(|(_, m)| m.status == MachineStatus::Working)
            .collect();
        candidates.sort_by_key(|(_, m)| m.status_last_update);
        candidates.into_iter().take(count as usize).map(|(id, _)| id).collect()
    }

    fn transition(&mut self, id: &MachineId, new: MachineStatus, now: DateTime<Utc>) {
        let site = self.registry.get(id).map(|m| m.site.clone());
        match self.registry.update_status(id, new, now) {
            Ok(entry) => {
                if let Some(site) = site {
                    log_status_change(&self.status_log, &self.monitoring, &site, id, &entry);
                }
            }
            Err(err) => warn!(%id, error = %err, "failed to transition machine status"),
        }
    }

    /// Removal per spec invariant 5 ("eligible for removal"); the spec
    /// doesn't name the trigger explicitly, so the scheduler reaps at the
    /// end of every cycle rather than leaving terminal records to
    /// accumulate forever.
    fn reap_disintegrated(&mut self, _now: DateTime<Utc>) {
        let ids: Vec<_> = self
            .registry
            .get_machines(None, Some(MachineStatus::Disintegrated), None)
            .into_keys()
            .collect();
        for id in ids {
            if let Err(err) = self.registry.remove_machine(&id) {
                warn!(%id, error = %err, "failed to remove disintegrated machine");
            }
        }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
