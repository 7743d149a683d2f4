// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::requirement::RequirementAdapter;
use async_trait::async_trait;
use roced_adapters::test_support::FakeSiteAdapter;
use roced_core::{FakeClock, SequentialIdGen};
use std::collections::HashSet;
use tempfile::TempDir;

struct FixedRequirementAdapter(Option<i64>);

#[async_trait]
impl RequirementAdapter for FixedRequirementAdapter {
    async fn required_delta(&self) -> Option<i64> {
        self.0
    }
}

struct SlowRequirementAdapter;

#[async_trait]
impl RequirementAdapter for SlowRequirementAdapter {
    async fn required_delta(&self) -> Option<i64> {
        tokio::time::sleep(Duration::from_millis(200)).await;
        Some(-5)
    }
}

struct Harness {
    scheduler: CoreScheduler,
    site_adapter: FakeSiteAdapter,
    _tmp: TempDir,
}

fn harness(required_delta: Option<i64>) -> Harness {
    let tmp = TempDir::new().expect("tempdir");
    let registry = Registry::with_id_gen(SequentialIdGen::new("m"));

    let site = SiteInfo {
        site_name: "A".to_string(),
        cost: 1.0,
        max_machines: None,
        supported_machine_types: HashSet::from(["T".to_string()]),
    };

    let site_adapter = FakeSiteAdapter::new();
    let mut site_adapters: HashMap<String, Arc<dyn SiteAdapter>> = HashMap::new();
    site_adapters.insert("A".to_string(), Arc::new(site_adapter.clone()));

    let profile = MachineProfile {
        machine_type: "T".to_string(),
        cores: 4,
    };
    let requirement_adapters: Vec<(MachineProfile, Arc<dyn RequirementAdapter>)> =
        vec![(profile, Arc::new(FixedRequirementAdapter(required_delta)))];

    let config = CoreSchedulerConfig {
        cycle_period: Duration::from_secs(60),
        adapter_timeout: Duration::from_secs(5),
        snapshot_path: tmp.path().join("registry.json"),
        backup_path: tmp.path().join("registry.json.bak"),
        site_types: HashMap::new(),
    };

    let scheduler = CoreScheduler::new(
        registry,
        requirement_adapters,
        Vec::new(),
        site_adapters,
        Broker::new(crate::broker::BrokerConfig {
            default_max_instances: 1000,
            max_instances_by_type: HashMap::new(),
            shutdown_delay: chrono::Duration::zero(),
        }),
        vec![site],
        Arc::new(FakeClock::new()),
        Arc::new(StatusLogWriter::new(tmp.path().join("status.csv"))),
        Arc::new(MonitoringSink::new(tmp.path().join("monitoring"))),
        config,
    );

    Harness {
        scheduler,
        site_adapter,
        _tmp: tmp,
    }
}

fn now() -> DateTime<Utc> {
    "2026-01-01T00:00:00Z".parse().unwrap()
}

#[tokio::test]
async fn grow_from_empty_creates_booting_machines_and_calls_spawn() {
    let mut h = harness(Some(-3));
    h.scheduler.run_cycle(now()).await.unwrap();

    assert_eq!(h.scheduler.actual_count("T"), 3);
    assert_eq!(
        h.site_adapter.calls(),
        vec![roced_adapters::test_support::SiteAdapterCall::Spawn {
            machine_type: "T".to_string(),
            count: 3
        }]
    );
}

#[tokio::test]
async fn shrink_marks_oldest_machines_pending_disintegration_and_calls_terminate() {
    let mut h = harness(Some(0));

    // Seed three Working machines directly, then ask for a shrink to 1.
    for _ in 0..3 {
        let id = h
            .scheduler
            .registry
            .new_machine(None, now(), "A", "A", "T")
            .unwrap();
        let _ = h.scheduler.registry.update_status(&id, MachineStatus::Up, now());
        let _ = h
            .scheduler
            .registry
            .update_status(&id, MachineStatus::Integrating, now());
        let _ = h
            .scheduler
            .registry
            .update_status(&id, MachineStatus::Working, now());
    }

    // required_delta = -1 negates to required = 1, against actual = 3.
    h.scheduler.requirement_adapters[0].1 = Arc::new(FixedRequirementAdapter(Some(-1)));
    h.scheduler.run_cycle(now()).await.unwrap();

    let pd = h
        .scheduler
        .registry()
        .get_machines(Some("A"), Some(MachineStatus::PendingDisintegration), None);
    assert_eq!(pd.len(), 2);

    let terminate_calls = h
        .site_adapter
        .calls()
        .into_iter()
        .filter(|c| matches!(c, roced_adapters::test_support::SiteAdapterCall::Terminate { .. }))
        .count();
    assert_eq!(terminate_calls, 2);
}

#[tokio::test]
async fn duplicate_machine_id_aborts_cycle_without_persistence() {
    let mut h = harness(Some(-1));
    // Pre-seed the id the SequentialIdGen will hand out next, already
    // disintegrated so it doesn't itself count toward `actual` and mask
    // the spawn this test wants to trigger.
    let id = h
        .scheduler
        .registry
        .new_machine(Some(MachineId::new("m-1")), now(), "A", "A", "T")
        .unwrap();
    let _ = h.scheduler.registry.update_status(&id, MachineStatus::Disintegrated, now());

    let result = h.scheduler.run_cycle(now()).await;
    assert!(result.is_err());
    assert!(!h.scheduler.config.snapshot_path.exists());
}

#[tokio::test]
async fn disintegrated_machines_are_reaped_at_cycle_end() {
    let mut h = harness(None);
    let id = h
        .scheduler
        .registry
        .new_machine(None, now(), "A", "A", "T")
        .unwrap();
    for status in [
        MachineStatus::Up,
        MachineStatus::Integrating,
        MachineStatus::Disintegrated,
    ] {
        let _ = h.scheduler.registry.update_status(&id, status, now());
    }

    h.scheduler.run_cycle(now()).await.unwrap();
    assert!(h.scheduler.registry().get(&id).is_none());
}

#[tokio::test]
async fn persists_registry_snapshot_after_a_cycle() {
    let mut h = harness(None);
    h.scheduler.run_cycle(now()).await.unwrap();
    assert!(h.scheduler.config.snapshot_path.exists());
}

#[tokio::test]
async fn requirement_adapter_timeout_is_treated_as_unknown() {
    let tmp = TempDir::new().unwrap();
    let registry = Registry::with_id_gen(SequentialIdGen::new("m"));
    let profile = MachineProfile {
        machine_type: "T".to_string(),
        cores: 4,
    };
    let requirement_adapters: Vec<(MachineProfile, Arc<dyn RequirementAdapter>)> =
        vec![(profile, Arc::new(SlowRequirementAdapter))];
    let site = SiteInfo {
        site_name: "A".to_string(),
        cost: 1.0,
        max_machines: None,
        supported_machine_types: HashSet::from(["T".to_string()]),
    };
    let config = CoreSchedulerConfig {
        cycle_period: Duration::from_secs(60),
        adapter_timeout: Duration::from_millis(20),
        snapshot_path: tmp.path().join("registry.json"),
        backup_path: tmp.path().join("registry.json.bak"),
        site_types: HashMap::new(),
    };
    let mut scheduler = CoreScheduler::new(
        registry,
        requirement_adapters,
        Vec::new(),
        HashMap::new(),
        Broker::new(crate::broker::BrokerConfig {
            default_max_instances: 1000,
            max_instances_by_type: HashMap::new(),
            shutdown_delay: chrono::Duration::zero(),
        }),
        vec![site],
        Arc::new(FakeClock::new()),
        Arc::new(StatusLogWriter::new(tmp.path().join("status.csv"))),
        Arc::new(MonitoringSink::new(tmp.path().join("monitoring"))),
        config,
    );

    scheduler.run_cycle(now()).await.unwrap();
    // A timed-out adapter suppresses growth entirely: no machines created.
    assert_eq!(scheduler.actual_count("T"), 0);
}
