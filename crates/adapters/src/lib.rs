// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Capability traits the engine consumes for external I/O (spec §6): the
//! batch-system observation surface and the site-provisioning surface.
//!
//! Both traits are library-agnostic — no concrete SSH or HTTP transport is
//! shipped here (spec §9 open question #4 is deliberately left unresolved).
//! Concrete cloud-site drivers are out of scope per spec §1.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod batch_system;
pub mod site_adapter;

pub use batch_system::{BatchSystem, JobObservation, JobState, NodeInfo, NodeState, StateReason};
pub use site_adapter::{AdapterError, SiteAdapter};

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

#[cfg(any(test, feature = "test-support"))]
pub use test_support::{FakeBatchSystem, FakeSiteAdapter, SiteAdapterCall};
