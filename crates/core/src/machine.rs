// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Machine identity, the lifecycle state machine, and the machine record.

use crate::MachineId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a machine.
///
/// Legal forward transitions follow the DAG in `is_legal_transition`; the
/// only legal regressions are `PendingDisintegration -> Working`
/// (re-activation) and `Integrating | Disintegrating -> Disintegrated`
/// (timeout fast-forward). `down` from the legacy interchange format is an
/// alias for `Disintegrated` and is never produced as a distinct variant —
/// callers should match on `Disintegrated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineStatus {
    Booting,
    Up,
    Integrating,
    Working,
    PendingDisintegration,
    Disintegrating,
    Disintegrated,
}

impl MachineStatus {
    /// Whether `self -> next` is a legal transition per the lifecycle DAG
    /// in spec §4.2, including the two documented regressions.
    pub fn is_legal_transition(&self, next: &MachineStatus) -> bool {
        use MachineStatus::*;
        matches!(
            (self, next),
            (Booting, Up)
                | (Up, Integrating)
                | (Integrating, Working)
                | (Integrating, Disintegrated)
                | (Working, PendingDisintegration)
                | (PendingDisintegration, Working)
                | (PendingDisintegration, Disintegrating)
                | (Disintegrating, Disintegrated)
        )
    }
}

impl std::fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MachineStatus::Booting => "booting",
            MachineStatus::Up => "up",
            MachineStatus::Integrating => "integrating",
            MachineStatus::Working => "working",
            MachineStatus::PendingDisintegration => "pending-disintegration",
            MachineStatus::Disintegrating => "disintegrating",
            MachineStatus::Disintegrated => "disintegrated",
        };
        write!(f, "{s}")
    }
}

/// One core's allocation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    Allocated,
    Idle,
    Draining,
    Drained,
}

/// Free-form label attached to a slot: a job id, or empty when idle.
pub type SlotActivity = String;

/// One entry in a machine's append-only status history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChangeEntry {
    pub old: Option<MachineStatus>,
    pub new: MachineStatus,
    pub timestamp: DateTime<Utc>,
    /// Seconds spent in `old` before this write; 0.0 on the first transition.
    pub elapsed: f64,
}

/// The authoritative record for a single machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Machine {
    pub id: MachineId,
    pub status: MachineStatus,
    pub status_last_update: DateTime<Utc>,
    pub status_change_history: Vec<StatusChangeEntry>,
    pub site: String,
    pub site_type: String,
    pub machine_type: String,
    pub machine_cores: u32,
    /// Fraction of slots allocated, in `[0, 1]`. Recomputed by the
    /// Integration Adapter from a live slot snapshot — never by the
    /// record itself.
    pub machine_load: f64,
    pub host_ip: String,
    pub hostname: String,
    pub gateway: Option<String>,
    pub vpn_ip: Option<String>,
    /// One `(state, activity)` pair per core.
    pub slot_status: Vec<(SlotState, SlotActivity)>,
}

impl Machine {
    pub fn new(
        id: MachineId,
        now: DateTime<Utc>,
        site: impl Into<String>,
        site_type: impl Into<String>,
        machine_type: impl Into<String>,
    ) -> Self {
        Self {
            id,
            status: MachineStatus::Booting,
            status_last_update: now,
            status_change_history: Vec::new(),
            site: site.into(),
            site_type: site_type.into(),
            machine_type: machine_type.into(),
            machine_cores: 0,
            machine_load: 0.0,
            host_ip: String::new(),
            hostname: String::new(),
            gateway: None,
            vpn_ip: None,
            slot_status: Vec::new(),
        }
    }

    /// `#allocated slots / #slots`. Callers must not call this when
    /// `slot_status` is empty — the ratio is ill-defined (spec §3 invariant 3).
    pub fn recompute_load(&mut self) {
        if self.slot_status.is_empty() {
            return;
        }
        let allocated = self
            .slot_status
            .iter()
            .filter(|(state, _)| *state == SlotState::Allocated)
            .count();
        self.machine_load = allocated as f64 / self.slot_status.len() as f64;
    }
}

#[cfg(test)]
#[path = "machine_tests.rs"]
mod tests;
