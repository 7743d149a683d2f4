// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Value types shared between the Requirement Adapter, the Registry, and
//! the Site Broker: site metadata, per-type demand, and the orders the
//! Broker emits.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Read-only Broker input describing one cloud site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteInfo {
    pub site_name: String,
    /// Lower is cheaper.
    pub cost: f64,
    /// Capacity cap; `None` means unbounded.
    pub max_machines: Option<u32>,
    pub supported_machine_types: HashSet<String>,
}

impl SiteInfo {
    pub fn supports(&self, machine_type: &str) -> bool {
        self.supported_machine_types.contains(machine_type)
    }
}

/// Per-machine-type demand fed into the Broker.
///
/// `required = None` is the explicit "suppress new requests" failure
/// state (spec §3): a read failure upstream, not a demand of zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MachineTypeDemand {
    pub required: Option<i64>,
    pub actual: u32,
}

/// A Broker directive: spawn (`delta > 0`) or shut down (`delta < 0`)
/// `|delta|` machines of `machine_type` at `site_name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub site_name: String,
    pub machine_type: String,
    pub delta: i64,
}

#[cfg(test)]
#[path = "site_tests.rs"]
mod tests;
