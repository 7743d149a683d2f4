// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::config::{
    BrokerSection, IntegrationSection, MachineTypeSection, RegistrySection, RequirementSection,
    SchedulerSection, SiteSection,
};
use roced_adapters::test_support::{FakeBatchSystem, FakeSiteAdapter};
use roced_core::SystemClock;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn config(tmp: &TempDir) -> Config {
    Config {
        scheduler: SchedulerSection { cycle_seconds: 60 },
        registry: RegistrySection {
            snapshot_path: tmp.path().join("registry.json"),
            status_log_path: tmp.path().join("status.csv"),
            monitoring_dir: tmp.path().join("monitoring"),
        },
        broker: BrokerSection {
            max_instances: 100,
            shutdown_delay_seconds: 0,
        },
        sites: vec![SiteSection {
            name: "site-a".to_string(),
            cost: 1.0,
            max_machines: Some(50),
            supported_machine_types: vec!["default".to_string()],
        }],
        machine_types: vec![MachineTypeSection {
            name: "default".to_string(),
            cores: 8,
        }],
        integration: IntegrationSection {
            site_name: "site-a".to_string(),
            slurm_partition: "batch".to_string(),
            slurm_wait_pd_minutes: 5,
            slurm_wait_working_minutes: 10,
            slurm_deadline_minutes: 15,
            logger_name: "integration.site-a".to_string(),
        },
        requirement: RequirementSection {
            slurm_partition: "batch".to_string(),
        },
    }
}

#[test]
fn backup_path_is_the_spec_mandated_sibling_file() {
    let backup = default_backup_path(Path::new("log/machine_registry.json"));
    assert_eq!(backup, PathBuf::from("log/old_machine_registry.json"));
}

#[tokio::test]
async fn builds_a_scheduler_against_fresh_storage() {
    let tmp = TempDir::new().expect("tempdir");
    let config = config(&tmp);

    let batch: Arc<dyn BatchSystem> = Arc::new(FakeBatchSystem::new());
    let mut site_adapters: HashMap<String, Arc<dyn SiteAdapter>> = HashMap::new();
    site_adapters.insert("site-a".to_string(), Arc::new(FakeSiteAdapter::new()));

    let mut scheduler = build_scheduler(&config, Arc::new(SystemClock), batch, site_adapters);
    let now = chrono::Utc::now();
    scheduler.run_cycle(now).await.expect("cycle runs");

    assert!(config.registry.snapshot_path.exists());
}
