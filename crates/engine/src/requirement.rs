// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Translates live queue state into a signed required-delta per machine
//! type (spec §4.3).
//!
//! `required_delta()` reports the per-machine-type shortfall as a negative
//! integer — not an absolute headcount, and not a delta relative to the
//! registry's `actual` count (spec §9 note 2; the Core Scheduler is the one
//! that negates this value into the absolute `required` the Broker wants).
//! `None` means "a read failure occurred upstream — take no spawn action."

use crate::cache::CachingWrapper;
use async_trait::async_trait;
use roced_adapters::{BatchSystem, JobObservation, JobState, StateReason};
use roced_core::Clock;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

#[async_trait]
pub trait RequirementAdapter: Send + Sync {
    async fn required_delta(&self) -> Option<i64>;
}

/// Static per-type machine profile used to convert CPU demand into a
/// machine count.
#[derive(Debug, Clone)]
pub struct MachineProfile {
    pub machine_type: String,
    pub cores: u32,
}

pub struct SlurmRequirementAdapterConfig {
    pub partition: String,
    pub profile: MachineProfile,
}

/// Slurm-shaped Requirement Adapter (spec §4.3).
pub struct SlurmRequirementAdapter {
    config: SlurmRequirementAdapterConfig,
    batch: Arc<dyn BatchSystem>,
    cache: CachingWrapper<Vec<JobObservation>>,
    dependency_cpus: AtomicU32,
}

impl SlurmRequirementAdapter {
    pub fn new(
        config: SlurmRequirementAdapterConfig,
        batch: Arc<dyn BatchSystem>,
        clock: Arc<dyn Clock>,
        validity: Duration,
        redundancy: Duration,
    ) -> Self {
        Self {
            config,
            batch,
            cache: CachingWrapper::new(validity, redundancy, clock),
            dependency_cpus: AtomicU32::new(0),
        }
    }

    /// Diagnostic-only counter of CPUs held by jobs blocked on a
    /// dependency; never fed into demand (spec §4.3 point 2).
    pub fn last_dependency_cpus(&self) -> u32 {
        self.dependency_cpus.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RequirementAdapter for SlurmRequirementAdapter {
    async fn required_delta(&self) -> Option<i64> {
        let batch = Arc::clone(&self.batch);
        let jobs = self.cache.get(|| async move { batch.list_jobs().await }).await?;

        let mut idle_cpus: u64 = 0;
        let mut running_cpus: u64 = 0;
        let mut dependency_cpus: u32 = 0;

        for job in jobs.iter().filter(|j| j.partition == self.config.partition) {
            if job.state_reason == StateReason::Dependency {
                dependency_cpus = dependency_cpus.saturating_add(job.pn_min_cpus);
                continue;
            }
            if job.state_reason == StateReason::PartitionTimeLimit {
                continue;
            }
            match job.job_state {
                JobState::Cancelled => {}
                JobState::Pending => {
                    let multiplicity = array_multiplicity(job.array_task_str.as_deref());
                    idle_cpus += job.pn_min_cpus as u64 * multiplicity as u64;
                }
                JobState::Running => {
                    running_cpus += job.pn_min_cpus as u64;
                }
                JobState::Other => {
                    warn!(partition = %self.config.partition, "unknown job state, ignoring");
                }
            }
        }

        self.dependency_cpus.store(dependency_cpus, Ordering::SeqCst);

        let required_cpus = idle_cpus + running_cpus;
        let cores_per_machine = self.config.profile.cores.max(1) as u64;
        let needed_machines = required_cpus.div_ceil(cores_per_machine);

        Some(-(needed_machines as i64))
    }
}

/// Array-job concurrency multiplier from a Slurm array task spec string
/// (spec §4.3 "Array-job multiplicity", test table in §8).
///
/// - `None` -> 1.
/// - Contains `%k` -> `k` (a concurrency cap).
/// - Otherwise, split on `,`; each piece `a-b` contributes `b - a + 1`, a
///   bare integer contributes exactly 1 (never its numeric value).
pub fn array_multiplicity(s: Option<&str>) -> u32 {
    let Some(s) = s else { return 1 };

    if let Some((range_part, cap)) = s.split_once('%') {
        let _ = range_part;
        return cap.parse().unwrap_or(1);
    }

    s.split(',')
        .map(|piece| match piece.split_once('-') {
            Some((a, b)) => {
                let a: i64 = a.trim().parse().unwrap_or(0);
                let b: i64 = b.trim().parse().unwrap_or(0);
                (b - a + 1).max(0) as u32
            }
            None => 1,
        })
        .sum()
}

#[cfg(test)]
#[path = "requirement_tests.rs"]
mod tests;
