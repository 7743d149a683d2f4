// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! The control loop: the Caching Wrapper, Requirement Adapter, Integration
//! Adapter, Site Broker, and the Core Scheduler that drives one cycle of
//! all four (spec §4.3 - §4.7).

pub mod broker;
pub mod cache;
pub mod error;
pub mod integration;
mod observability;
pub mod requirement;
pub mod scheduler;

pub use broker::{Broker, BrokerConfig};
pub use cache::CachingWrapper;
pub use error::CycleError;
pub use integration::{hostname, IntegrationAdapter, SlurmIntegrationAdapter, SlurmIntegrationAdapterConfig};
pub use requirement::{
    array_multiplicity, MachineProfile, RequirementAdapter, SlurmRequirementAdapter,
    SlurmRequirementAdapterConfig,
};
pub use scheduler::{CoreScheduler, CoreSchedulerConfig};
