// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TOML configuration schema (spec §6, expanded — see `SPEC_FULL.md`'s
//! "Configuration" section for the canonical example file).
//!
//! Missing or malformed required keys are a startup-time fatal error; there
//! is no partial/optional config beyond what's marked `Option` below.

use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: Box<toml::de::Error>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub scheduler: SchedulerSection,
    pub registry: RegistrySection,
    pub broker: BrokerSection,
    pub sites: Vec<SiteSection>,
    pub machine_types: Vec<MachineTypeSection>,
    pub integration: IntegrationSection,
    pub requirement: RequirementSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSection {
    pub cycle_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistrySection {
    pub snapshot_path: PathBuf,
    pub status_log_path: PathBuf,
    pub monitoring_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrokerSection {
    pub max_instances: u32,
    pub shutdown_delay_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteSection {
    pub name: String,
    pub cost: f64,
    pub max_machines: Option<u32>,
    pub supported_machine_types: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MachineTypeSection {
    pub name: String,
    pub cores: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IntegrationSection {
    pub site_name: String,
    pub slurm_partition: String,
    pub slurm_wait_pd_minutes: u64,
    pub slurm_wait_working_minutes: u64,
    pub slurm_deadline_minutes: u64,
    /// Identifies this adapter instance in structured log output; one
    /// daemon process drives a single site/partition pair today, so this
    /// is mostly useful once a deployment runs several `roced` processes
    /// side by side.
    pub logger_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequirementSection {
    pub slurm_partition: String,
}

impl Config {
    pub fn load(path: &std::path::Path) -> Result<Config, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source: Box::new(source),
        })
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
