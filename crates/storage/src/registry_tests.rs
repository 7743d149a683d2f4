// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use roced_core::machine::MachineStatus;
use roced_core::test_support::four_slots_one_allocated;
use roced_core::{Event, SequentialIdGen, Subscriber};
use std::sync::{Arc, Mutex as StdMutex};
use tempfile::tempdir;

fn now() -> DateTime<Utc> {
    "2026-01-01T00:00:00Z".parse().unwrap()
}

struct RecordingSubscriber {
    events: Arc<StdMutex<Vec<Event>>>,
}

impl Subscriber for RecordingSubscriber {
    fn on_event(&self, event: &Event) {
        self.events.lock().unwrap().push(event.clone());
    }
}

#[test]
fn new_machine_generates_id_and_publishes_event() {
    let events = Arc::new(StdMutex::new(Vec::new()));
    let mut registry = Registry::with_id_gen(SequentialIdGen::new("m"));
    registry
        .event_bus_mut()
        .subscribe(Box::new(RecordingSubscriber {
            events: events.clone(),
        }));

    let id = registry
        .new_machine(None, now(), "site-a", "cloud", "default")
        .unwrap();
    assert_eq!(id.as_str(), "m-1");
    assert_eq!(events.lock().unwrap().len(), 1);
    assert!(matches!(events.lock().unwrap()[0], Event::NewMachine { .. }));
}

#[test]
fn new_machine_rejects_duplicate_supplied_id() {
    let mut registry = Registry::new();
    let id = MachineId::new("fixed");
    registry
        .new_machine(Some(id.clone()), now(), "site-a", "cloud", "default")
        .unwrap();
    let err = registry
        .new_machine(Some(id), now(), "site-a", "cloud", "default")
        .unwrap_err();
    assert!(matches!(err, RegistryError::DuplicateId(_)));
}

#[test]
fn remove_machine_publishes_event_and_drops_record() {
    let events = Arc::new(StdMutex::new(Vec::new()));
    let mut registry = Registry::new();
    let id = registry
        .new_machine(None, now(), "site-a", "cloud", "default")
        .unwrap();
    registry
        .event_bus_mut()
        .subscribe(Box::new(RecordingSubscriber {
            events: events.clone(),
        }));

    registry.remove_machine(&id).unwrap();
    assert!(registry.get(&id).is_none());
    assert!(matches!(
        events.lock().unwrap()[0],
        Event::MachineRemoved { .. }
    ));
}

#[test]
fn remove_machine_fails_if_absent() {
    let mut registry = Registry::new();
    let err = registry.remove_machine(&MachineId::new("nope")).unwrap_err();
    assert!(matches!(err, RegistryError::NotFound(_)));
}

#[test]
fn update_status_appends_history_and_old_is_none_first_time() {
    let mut registry = Registry::new();
    let id = registry
        .new_machine(None, now(), "site-a", "cloud", "default")
        .unwrap();

    let entry = registry
        .update_status(&id, MachineStatus::Up, now())
        .unwrap();
    assert_eq!(entry.old, None);
    assert_eq!(entry.new, MachineStatus::Up);

    let machine = registry.get(&id).unwrap();
    assert_eq!(machine.status, MachineStatus::Up);
    assert_eq!(machine.status_change_history.len(), 1);
    assert_eq!(machine.status_change_history.last().unwrap().new, MachineStatus::Up);
}

#[test]
fn update_status_second_transition_has_old_set() {
    let mut registry = Registry::new();
    let id = registry
        .new_machine(None, now(), "site-a", "cloud", "default")
        .unwrap();
    registry.update_status(&id, MachineStatus::Up, now()).unwrap();

    let later = now() + chrono::Duration::seconds(10);
    let entry = registry
        .update_status(&id, MachineStatus::Integrating, later)
        .unwrap();
    assert_eq!(entry.old, Some(MachineStatus::Up));
    assert_eq!(entry.elapsed, 10.0);
}

#[test]
fn get_machines_filters_conjunctively() {
    let mut registry = Registry::new();
    let a = registry
        .new_machine(None, now(), "site-a", "cloud", "small")
        .unwrap();
    let _b = registry
        .new_machine(None, now(), "site-b", "cloud", "small")
        .unwrap();
    registry.update_status(&a, MachineStatus::Up, now()).unwrap();

    let matched = registry.get_machines(Some("site-a"), Some(MachineStatus::Up), Some("small"));
    assert_eq!(matched.len(), 1);
    assert!(matched.contains_key(&a));

    let all = registry.get_machines(None, None, None);
    assert_eq!(all.len(), 2);
}

#[test]
fn time_since_last_change_is_zero_for_unknown_machine() {
    let registry = Registry::new();
    assert_eq!(
        registry.time_since_last_change(&MachineId::new("ghost"), now()),
        0.0
    );
}

#[test]
fn time_since_last_change_reflects_last_status_write() {
    let mut registry = Registry::new();
    let id = registry
        .new_machine(None, now(), "site-a", "cloud", "default")
        .unwrap();
    registry.update_status(&id, MachineStatus::Up, now()).unwrap();

    let later = now() + chrono::Duration::seconds(30);
    assert_eq!(registry.time_since_last_change(&id, later), 30.0);
}

#[test]
fn dump_then_load_round_trips() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("registry.json");
    let backup = dir.path().join("old_registry.json");

    let mut registry = Registry::new();
    let id = registry
        .new_machine(None, now(), "site-a", "cloud", "default")
        .unwrap();
    registry.update_status(&id, MachineStatus::Up, now()).unwrap();
    {
        let m = registry.get_mut(&id).unwrap();
        m.slot_status = four_slots_one_allocated();
        m.recompute_load();
    }

    registry.dump(&path, &backup).unwrap();
    let reloaded = Registry::load(&path, &backup);

    assert_eq!(reloaded.len(), 1);
    let m = reloaded.get(&id).unwrap();
    assert_eq!(m.status, MachineStatus::Up);
    assert_eq!(m.machine_load, 0.25);
}

#[test]
fn load_with_no_files_yields_empty_registry() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("registry.json");
    let backup = dir.path().join("old_registry.json");
    let registry = Registry::load(&path, &backup);
    assert!(registry.is_empty());
}
