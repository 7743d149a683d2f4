// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::machine::{Machine, MachineStatus, SlotState};
use crate::MachineId;
use chrono::{DateTime, Utc};

/// Build a machine fixture in `Booting` status at the given site/type.
pub fn machine_fixture(id: &str, site: &str, machine_type: &str, now: DateTime<Utc>) -> Machine {
    Machine::new(MachineId::new(id), now, site, "test-cloud", machine_type)
}

/// Build a machine fixture already in `status`, with a single history
/// entry recording the transition from `Booting`.
pub fn machine_in_status(
    id: &str,
    site: &str,
    machine_type: &str,
    status: MachineStatus,
    now: DateTime<Utc>,
) -> Machine {
    let mut m = machine_fixture(id, site, machine_type, now);
    m.status = status;
    m.status_last_update = now;
    m
}

/// Four-slot layout: one allocated, three idle — `machine_load == 0.25`.
pub fn four_slots_one_allocated() -> Vec<(SlotState, String)> {
    vec![
        (SlotState::Allocated, String::new()),
        (SlotState::Idle, String::new()),
        (SlotState::Idle, String::new()),
        (SlotState::Idle, String::new()),
    ]
}
