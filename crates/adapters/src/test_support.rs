// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake adapters for use across crate boundaries in tests, mirroring this
//! workspace's `FakeAdapter`/`FakeSession`/`FakeNotifyAdapter` pattern:
//! canned responses plus a call-history vector protected by a mutex.

use crate::batch_system::{BatchSystem, JobObservation, NodeInfo};
use crate::site_adapter::{AdapterError, SiteAdapter};
use async_trait::async_trait;
use parking_lot::Mutex;
use roced_core::MachineId;
use std::collections::HashMap;
use std::sync::Arc;

/// Canned, swappable `BatchSystem` for tests. `list_jobs`/`list_nodes`
/// return whatever was last set via `set_jobs`/`set_nodes`; defaults to
/// `None` so a fresh fake models "not configured yet" the same way a real
/// transient failure would.
#[derive(Clone, Default)]
pub struct FakeBatchSystem {
    inner: Arc<Mutex<FakeBatchState>>,
}

#[derive(Default)]
struct FakeBatchState {
    jobs: Option<Vec<JobObservation>>,
    nodes: Option<HashMap<String, NodeInfo>>,
    drained: Vec<String>,
}

impl FakeBatchSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_jobs(&self, jobs: Vec<JobObservation>) {
        self.inner.lock().jobs = Some(jobs);
    }

    pub fn fail_jobs(&self) {
        self.inner.lock().jobs = None;
    }

    pub fn set_nodes(&self, nodes: HashMap<String, NodeInfo>) {
        self.inner.lock().nodes = Some(nodes);
    }

    pub fn fail_nodes(&self) {
        self.inner.lock().nodes = None;
    }

    pub fn drained_nodes(&self) -> Vec<String> {
        self.inner.lock().drained.clone()
    }
}

#[async_trait]
impl BatchSystem for FakeBatchSystem {
    async fn list_jobs(&self) -> Option<Vec<JobObservation>> {
        self.inner.lock().jobs.clone()
    }

    async fn list_nodes(&self) -> Option<HashMap<String, NodeInfo>> {
        self.inner.lock().nodes.clone()
    }

    async fn drain_node(&self, node_name: &str) -> Result<(), crate::batch_system::DrainError> {
        let mut state = self.inner.lock();
        if !state.drained.iter().any(|n| n == node_name) {
            state.drained.push(node_name.to_string());
        }
        Ok(())
    }
}

/// One recorded call against a `FakeSiteAdapter`.
#[derive(Debug, Clone, PartialEq)]
pub enum SiteAdapterCall {
    Spawn { machine_type: String, count: u32 },
    Terminate { machine_id: MachineId },
}

#[derive(Default)]
struct FakeSiteState {
    calls: Vec<SiteAdapterCall>,
    fail_spawn: bool,
    fail_terminate: bool,
}

/// Records `spawn`/`terminate` calls for assertion; can be told to fail
/// either operation.
#[derive(Clone, Default)]
pub struct FakeSiteAdapter {
    inner: Arc<Mutex<FakeSiteState>>,
}

impl FakeSiteAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<SiteAdapterCall> {
        self.inner.lock().calls.clone()
    }

    pub fn fail_spawn(&self) {
        self.inner.lock().fail_spawn = true;
    }

    pub fn fail_terminate(&self) {
        self.inner.lock().fail_terminate = true;
    }
}

#[async_trait]
impl SiteAdapter for FakeSiteAdapter {
    async fn spawn(&self, machine_type: &str, count: u32) -> Result<(), AdapterError> {
        let mut state = self.inner.lock();
        state.calls.push(SiteAdapterCall::Spawn {
            machine_type: machine_type.to_string(),
            count,
        });
        if state.fail_spawn {
            return Err(AdapterError::SpawnFailed {
                machine_type: machine_type.to_string(),
                message: "fake spawn failure".to_string(),
            });
        }
        Ok(())
    }

    async fn terminate(&self, machine_id: &MachineId) -> Result<(), AdapterError> {
        let mut state = self.inner.lock();
        state.calls.push(SiteAdapterCall::Terminate {
            machine_id: machine_id.clone(),
        });
        if state.fail_terminate {
            return Err(AdapterError::TerminateFailed {
                id: machine_id.clone(),
                message: "fake terminate failure".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "test_support_tests.rs"]
mod tests;
