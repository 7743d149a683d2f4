// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The batch-system observation surface consumed by the Requirement and
//! Integration Adapters (spec §6 "Batch-system interface (consumed)").
//!
//! `None` uniformly represents the transient-failure contract from §4.3,
//! §4.4 and §7 — a caller never needs to distinguish "the adapter errored"
//! from "the adapter returned nothing this cycle"; both are `None`, and the
//! calling adapter treats either as "unknown" (suppresses growth/shrink).

use async_trait::async_trait;
use roced_core::machine::{SlotActivity, SlotState};
use std::collections::HashSet;

/// One job as reported by the batch scheduler.
#[derive(Debug, Clone, PartialEq)]
pub struct JobObservation {
    pub partition: String,
    pub job_state: JobState,
    pub state_reason: StateReason,
    pub pn_min_cpus: u32,
    /// Array task spec string, e.g. `"1-20"` or `"1-7%3"`; `None` for a
    /// non-array job.
    pub array_task_str: Option<String>,
    pub nodes: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    Pending,
    Running,
    Cancelled,
    /// Any state the Requirement Adapter does not classify — logged and
    /// ignored (spec §4.3 point 2 "otherwise").
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateReason {
    Dependency,
    PartitionTimeLimit,
    None,
    Other,
}

/// Live per-node state as reported by the batch scheduler. Hard-down nodes
/// are omitted by the batch system itself before this reaches the caller
/// (spec §4.4).
#[derive(Debug, Clone, PartialEq)]
pub struct NodeInfo {
    pub cpus: u32,
    pub alloc_cpus: u32,
    /// One or more of `{Down, Draining, Drained, Idle, Allocated, Mixed}`.
    pub state: HashSet<NodeState>,
    /// One `(state, activity)` pair per core, used by the Integration
    /// Adapter to populate a machine's `slot_status` (spec §4.4).
    pub slots: Vec<(SlotState, SlotActivity)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeState {
    Down,
    Draining,
    Drained,
    Idle,
    Allocated,
    Mixed,
}

/// Queue and node observation surface for a batch scheduler such as Slurm.
#[async_trait]
pub trait BatchSystem: Send + Sync {
    /// All jobs visible to the scheduler. `None` on any read failure or
    /// timeout (spec §4.3 point 4, §5, §7).
    async fn list_jobs(&self) -> Option<Vec<JobObservation>>;

    /// Live nodes, keyed by batch-system node name. `None` on any read
    /// failure or timeout (spec §4.4, §5, §7).
    async fn list_nodes(&self) -> Option<std::collections::HashMap<String, NodeInfo>>;

    /// Administrative drain instruction (spec §4.4 `drain_machine`). A
    /// no-op if the node is already draining; implementation is
    /// transport-specific.
    async fn drain_node(&self, node_name: &str) -> Result<(), DrainError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DrainError {
    #[error("drain command failed for node {node}: {message}")]
    CommandFailed { node: String, message: String },
}
