// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! The ambient stack around the control loop: TOML configuration, the
//! object-graph composition root, and the default no-transport drivers a
//! deployment replaces with its own (spec §1, §6, §9 open question #4).

pub mod config;
pub mod drivers;
pub mod wiring;

pub use config::{Config, ConfigError};
pub use wiring::{build_scheduler, shutdown_signal};
