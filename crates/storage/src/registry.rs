// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The authoritative Machine Registry.
//!
//! Reframed per spec §9 as an explicit value owned by the Core Scheduler
//! and passed to adapters by reference, rather than global state: it owns
//! a `HashMap<MachineId, Machine>` and an `EventBus` it publishes
//! through.

use chrono::{DateTime, Utc};
use roced_core::machine::{Machine, MachineStatus, StatusChangeEntry};
use roced_core::{Event, EventBus, IdGen, MachineId, UuidIdGen};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::error;

use crate::snapshot;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("machine id already exists: {0}")]
    DuplicateId(MachineId),
    #[error("machine not found: {0}")]
    NotFound(MachineId),
    #[error("snapshot write failed: {0}")]
    Snapshot(#[from] crate::snapshot::SnapshotError),
}

/// Process-wide store of machine records plus the event bus it publishes
/// through. Owned by the Core Scheduler and passed to adapters by
/// reference (spec §9 "process-wide registry" redesign).
pub struct Registry {
    machines: HashMap<MachineId, Machine>,
    bus: EventBus,
    id_gen: Box<dyn IdGen>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            machines: HashMap::new(),
            bus: EventBus::new(),
            id_gen: Box::new(UuidIdGen),
        }
    }

    pub fn with_id_gen(id_gen: impl IdGen + 'static) -> Self {
        Self {
            machines: HashMap::new(),
            bus: EventBus::new(),
            id_gen: Box::new(id_gen),
        }
    }

    pub fn event_bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    /// Create a machine record. A supplied `id` must be unique (§4.2) —
    /// a collision is an internal error that aborts the cycle without
    /// persistence. An omitted id is generated via the registry's `IdGen`.
    pub fn new_machine(
        &mut self,
        id: Option<MachineId>,
        now: DateTime<Utc>,
        site: impl Into<String>,
        site_type: impl Into<String>,
        machine_type: impl Into<String>,
    ) -> Result<MachineId, RegistryError> {
        let id = id.unwrap_or_else(|| MachineId::new(self.id_gen.next()));
        if self.machines.contains_key(&id) {
            return Err(RegistryError::DuplicateId(id));
        }
        let machine = Machine::new(id.clone(), now, site, site_type, machine_type);
        self.machines.insert(id.clone(), machine);
        self.bus.publish(&Event::NewMachine { id: id.clone() });
        Ok(id)
    }

    pub fn remove_machine(&mut self, id: &MachineId) -> Result<(), RegistryError> {
        if self.machines.remove(id).is_none() {
            return Err(RegistryError::NotFound(id.clone()));
        }
        self.bus.publish(&Event::MachineRemoved { id: id.clone() });
        Ok(())
    }

    /// Write a new status, append the history entry, and publish
    /// `StatusChanged`. Returns the entry so the caller can compose it
    /// into the CSV log / monitoring sink (§6) — those are cross-cutting
    /// concerns, not written by the registry itself.
    pub fn update_status(
        &mut self,
        id: &MachineId,
        new: MachineStatus,
        now: DateTime<Utc>,
    ) -> Result<StatusChangeEntry, RegistryError> {
        let machine = self
            .machines
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))?;

        let old = if machine.status_change_history.is_empty() {
            None
        } else {
            Some(machine.status)
        };
        let elapsed = (now - machine.status_last_update).num_milliseconds() as f64 / 1000.0;

        let entry = StatusChangeEntry {
            old,
            new,
            timestamp: now,
            elapsed: elapsed.max(0.0),
        };

        machine.status = new;
        machine.status_last_update = now;
        machine.status_change_history.push(entry.clone());

        self.bus.publish(&Event::StatusChanged {
            id: id.clone(),
            old,
            new,
        });

        Ok(entry)
    }

    /// Conjunctive filter; `None` matches all.
    pub fn get_machines(
        &self,
        site: Option<&str>,
        status: Option<MachineStatus>,
        machine_type: Option<&str>,
    ) -> HashMap<MachineId, Machine> {
        self.machines
            .iter()
            .filter(|(_, m)| site.map(|s| m.site == s).unwrap_or(true))
            .filter(|(_, m)| status.map(|s| m.status == s).unwrap_or(true))
            .filter(|(_, m)| machine_type.map(|t| m.machine_type == t).unwrap_or(true))
            .map(|(id, m)| (id.clone(), m.clone()))
            .collect()
    }

    pub fn get(&self, id: &MachineId) -> Option<&Machine> {
        self.machines.get(id)
    }

    pub fn get_mut(&mut self, id: &MachineId) -> Option<&mut Machine> {
        self.machines.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.machines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }

    /// Seconds since `id`'s last status write; `0.0` if unknown or never
    /// transitioned.
    pub fn time_since_last_change(&self, id: &MachineId, now: DateTime<Utc>) -> f64 {
        match self.machines.get(id) {
            Some(m) => (now - m.status_last_update).num_milliseconds() as f64 / 1000.0,
            None => 0.0,
        }
    }

    /// Persist to `path`, rotating the existing primary to `backup_path`
    /// (single-deep). A write failure is logged by the caller; the
    /// in-memory registry is unaffected (§7).
    pub fn dump(&self, path: &Path, backup_path: &Path) -> Result<(), RegistryError> {
        snapshot::save(path, backup_path, &self.machines)?;
        Ok(())
    }

    /// Restore from `path`, falling back to `backup_path`. Never fails
    /// the caller — any read/parse failure (including the backup) logs
    /// at `error` and yields an empty registry (§7).
    pub fn load(path: &Path, backup_path: &Path) -> Self {
        let machines = snapshot::load(path, backup_path);
        Self {
            machines,
            bus: EventBus::new(),
            id_gen: Box::new(UuidIdGen),
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn log_dump_failure(err: &RegistryError) {
    error!(error = %err, "failed to persist machine registry; retrying next cycle");
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
