// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cycle-level error type (spec §7).
//!
//! Every other failure mode in a cycle (external read failure, capacity
//! shortfall, snapshot write failure) degrades gracefully and is only
//! logged — see the Requirement/Integration/Broker modules. The one
//! exception is a duplicate machine identity, which is surfaced as an
//! internal error that aborts the cycle without persisting the registry.

use roced_storage::RegistryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("registry operation failed, aborting cycle without persistence: {0}")]
    Registry(#[from] RegistryError),
}
