// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The site-provisioning surface the Core Scheduler drives with Broker
//! orders (spec §6 "Site-adapter interface (consumed)").
//!
//! Observational polling that updates registry fields for machines a site
//! owns is named in §6 but left "implementation may vary" for concrete
//! drivers; this crate ships only the trait and fakes, never a concrete
//! cloud-site driver (out of scope per spec §1).

use async_trait::async_trait;
use roced_core::MachineId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("spawn failed for machine_type {machine_type}: {message}")]
    SpawnFailed { machine_type: String, message: String },
    #[error("terminate failed for machine {id}: {message}")]
    TerminateFailed { id: MachineId, message: String },
}

/// One cloud site's provisioning surface.
#[async_trait]
pub trait SiteAdapter: Send + Sync {
    /// Boot `count` machines of `machine_type` at this site.
    async fn spawn(&self, machine_type: &str, count: u32) -> Result<(), AdapterError>;

    /// Terminate a specific machine at this site.
    async fn terminate(&self, machine_id: &MachineId) -> Result<(), AdapterError>;
}
