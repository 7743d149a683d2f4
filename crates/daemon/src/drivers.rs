// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Default batch-system and site-adapter drivers.
//!
//! Concrete transports (SSH-to-`sinfo`, a cloud API client, ...) are
//! external collaborators the control plane consumes through
//! `roced_adapters::{BatchSystem, SiteAdapter}`, not something this
//! workspace ships (spec §1, §9 open question #4 — library-agnostic by
//! design). These `Null*` drivers are the safe default a deployment starts
//! from: the control loop runs, persists, and logs exactly as it would with
//! a real transport, just with every external read reported as unknown and
//! every external write refused. A real deployment replaces them by handing
//! its own `Arc<dyn BatchSystem>` / `Arc<dyn SiteAdapter>` to
//! [`crate::wiring::build_scheduler`] instead of calling `main` as shipped.

use async_trait::async_trait;
use roced_adapters::{AdapterError, BatchSystem, DrainError, JobObservation, NodeInfo, SiteAdapter};
use roced_core::MachineId;
use std::collections::HashMap;
use tracing::warn;

pub struct NullBatchSystem;

#[async_trait]
impl BatchSystem for NullBatchSystem {
    async fn list_jobs(&self) -> Option<Vec<JobObservation>> {
        warn!("no batch-system driver configured; job list is unknown this cycle");
        None
    }

    async fn list_nodes(&self) -> Option<HashMap<String, NodeInfo>> {
        warn!("no batch-system driver configured; node list is unknown this cycle");
        None
    }

    async fn drain_node(&self, node_name: &str) -> Result<(), DrainError> {
        Err(DrainError::CommandFailed {
            node: node_name.to_string(),
            message: "no batch-system driver configured".to_string(),
        })
    }
}

pub struct NullSiteAdapter;

#[async_trait]
impl SiteAdapter for NullSiteAdapter {
    async fn spawn(&self, machine_type: &str, _count: u32) -> Result<(), AdapterError> {
        Err(AdapterError::SpawnFailed {
            machine_type: machine_type.to_string(),
            message: "no site adapter driver configured".to_string(),
        })
    }

    async fn terminate(&self, machine_id: &MachineId) -> Result<(), AdapterError> {
        Err(AdapterError::TerminateFailed {
            id: machine_id.clone(),
            message: "no site adapter driver configured".to_string(),
        })
    }
}

#[cfg(test)]
#[path = "drivers_tests.rs"]
mod tests;
