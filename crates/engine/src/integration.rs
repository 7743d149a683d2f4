// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Makes the Registry reflect the batch system's view of the nodes (spec
//! §4.4).
//!
//! `up -> integrating` is driven by an event-bus subscription rather than
//! by the reconcile scan itself, per spec §4.4's "Event handler" note. The
//! registry does not offer re-entrant `&mut` access during `publish`, so
//! the subscriber only records candidate ids; [`SlurmIntegrationAdapter::reconcile`]
//! drains that queue at the start of its own pass and re-validates each
//! id against the live registry (status still `up`, site still this
//! adapter's) before acting — cheap, and correct even if the same cycle's
//! reconcile pass removed or moved the machine in the meantime.

use crate::cache::CachingWrapper;
use crate::observability::log_status_change;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use roced_adapters::{BatchSystem, NodeInfo};
use roced_core::machine::{MachineStatus, SlotState};
use roced_core::{Clock, Event, MachineId, Subscriber};
use roced_storage::{MonitoringSink, Registry, StatusLogWriter};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

#[async_trait]
pub trait IntegrationAdapter: Send + Sync {
    /// One reconciliation pass over every machine at this adapter's site.
    async fn reconcile(&self, registry: &mut Registry, now: DateTime<Utc>);

    /// Administrative drain request; a no-op if the machine is already
    /// draining.
    async fn drain_machine(&self, machine_id: &MachineId);
}

pub struct SlurmIntegrationAdapterConfig {
    pub site_name: String,
    pub slurm_deadline: chrono::Duration,
}

/// Translates registry `host_ip` to the batch system's node name: `.` ->
/// `-`, prefixed with `host-` (spec §4.4).
pub fn hostname(ip: &str) -> String {
    format!("host-{}", ip.replace('.', "-"))
}

/// Subscriber half of [`SlurmIntegrationAdapter`]: records machines that
/// just transitioned to `up`, to be picked up at the next `reconcile`.
struct PendingUpListener {
    pending: Mutex<Vec<MachineId>>,
}

impl Subscriber for PendingUpListener {
    fn on_event(&self, event: &Event) {
        if let Event::StatusChanged {
            id,
            new: MachineStatus::Up,
            ..
        } = event
        {
            self.pending.lock().push(id.clone());
        }
    }
}

/// Slurm-shaped Integration Adapter (spec §4.4).
pub struct SlurmIntegrationAdapter {
    config: SlurmIntegrationAdapterConfig,
    batch: Arc<dyn BatchSystem>,
    cache: CachingWrapper<HashMap<String, NodeInfo>>,
    listener: Arc<PendingUpListener>,
    drained: Mutex<std::collections::HashSet<MachineId>>,
    status_log: Arc<StatusLogWriter>,
    monitoring: Arc<MonitoringSink>,
}

impl SlurmIntegrationAdapter {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: SlurmIntegrationAdapterConfig,
        batch: Arc<dyn BatchSystem>,
        clock: Arc<dyn Clock>,
        validity: Duration,
        redundancy: Duration,
        status_log: Arc<StatusLogWriter>,
        monitoring: Arc<MonitoringSink>,
    ) -> Self {
        Self {
            config,
            batch,
            cache: CachingWrapper::new(validity, redundancy, clock),
            listener: Arc::new(PendingUpListener {
                pending: Mutex::new(Vec::new()),
            }),
            drained: Mutex::new(std::collections::HashSet::new()),
            status_log,
            monitoring,
        }
    }

    /// The subscriber to register on the Registry's event bus at startup.
    pub fn subscriber(&self) -> Arc<dyn Subscriber> {
        self.listener.clone()
    }

    fn take_pending_up(&self) -> Vec<MachineId> {
        std::mem::take(&mut self.listener.pending.lock())
    }

    /// `update_status` plus the cross-cutting CSV/monitoring write that
    /// follows every transition (spec §6).
    fn transition(&self, registry: &mut Registry, id: &MachineId, new: MachineStatus, now: DateTime<Utc>) {
        let site = registry.get(id).map(|m| m.site.clone());
        match registry.update_status(id, new, now) {
            Ok(entry) => {
                if let Some(site) = site {
                    log_status_change(&self.status_log, &self.monitoring, &site, id, &entry);
                }
            }
            Err(err) => warn!(%id, error = %err, "failed to transition machine status"),
        }
    }
}

#[async_trait]
impl IntegrationAdapter for SlurmIntegrationAdapter {
    async fn reconcile(&self, registry: &mut Registry, now: DateTime<Utc>) {
        for id in self.take_pending_up() {
            let eligible = matches!(
                registry.get(&id),
                Some(m) if m.status == MachineStatus::Up && m.site == self.config.site_name
            );
            if eligible {
                self.transition(registry, &id, MachineStatus::Integrating, now);
            }
        }

        let batch = Arc::clone(&self.batch);
        let Some(nodes) = self.cache.get(|| async move { batch.list_nodes().await }).await else {
            warn!(site = %self.config.site_name, "node list unavailable this cycle");
            return;
        };

        let machines = registry.get_machines(Some(&self.config.site_name), None, None);
        for (id, machine) in machines {
            let node = nodes.get(&hostname(&machine.host_ip));

            match machine.status {
                MachineStatus::Integrating => {
                    if let Some(node) = node {
                        if let Some(reg_machine) = registry.get_mut(&id) {
                            reg_machine.slot_status = node.slots.clone();
                            reg_machine.machine_cores = node.slots.len() as u32;
                        }
                        self.transition(registry, &id, MachineStatus::Working, now);
                    } else if registry.time_since_last_change(&id, now)
                        > self.config.slurm_deadline.num_seconds() as f64
                    {
                        self.transition(registry, &id, MachineStatus::Disintegrated, now);
                    }
                }
                MachineStatus::Working => {
                    if let Some(node) = node {
                        let draining = node
                            .slots
                            .iter()
                            .any(|(state, _)| matches!(state, SlotState::Draining | SlotState::Drained));

                        let was_zero_load = machine.machine_load == 0.0;
                        if let Some(reg_machine) = registry.get_mut(&id) {
                            reg_machine.slot_status = node.slots.clone();
                            reg_machine.recompute_load();
                            // §9 note 5: preserved as documented, not "fixed" —
                            // the timestamp only advances when load rises above
                            // zero, so a machine sitting at full load forever
                            // shows no further drift.
                            if was_zero_load && reg_machine.machine_load > 0.0 {
                                reg_machine.status_last_update = now;
                            }
                        }
                        if draining {
                            self.transition(registry, &id, MachineStatus::PendingDisintegration, now);
                        }
                    }
                    // Absent from the batch list: may belong to another
                    // partition, never transitioned here.
                }
                MachineStatus::PendingDisintegration => {
                    if node.is_none() {
                        self.transition(registry, &id, MachineStatus::Disintegrating, now);
                    }
                }
                MachineStatus::Disintegrating => {
                    self.transition(registry, &id, MachineStatus::Disintegrated, now);
                }
                _ => {}
            }
        }
    }

    async fn drain_machine(&self, machine_id: &MachineId) {
        let mut drained = self.drained.lock();
        if drained.contains(machine_id) {
            return;
        }
        let node_name = machine_id.to_string();
        if let Err(err) = self.batch.drain_node(&node_name).await {
            warn!(%machine_id, error = %err, "drain command failed");
            return;
        }
        drained.insert(machine_id.clone());
    }
}

#[cfg(test)]
#[path = "integration_tests.rs"]
mod tests;
