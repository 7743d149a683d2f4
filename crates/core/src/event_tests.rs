// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::MachineId;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

struct Recorder {
    order: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<(usize, String)>>>,
}

impl Subscriber for Recorder {
    fn on_event(&self, event: &Event) {
        let seq = self.order.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push((seq, event.name().to_string()));
    }
}

#[test]
fn publish_with_no_subscribers_is_a_no_op() {
    let bus = EventBus::new();
    bus.publish(&Event::NewMachine { id: MachineId::new("m1") });
    assert_eq!(bus.subscriber_count(), 0);
}

#[test]
fn subscribers_are_notified_in_registration_order() {
    let order = Arc::new(AtomicUsize::new(0));
    let seen_a = Arc::new(Mutex::new(Vec::new()));
    let seen_b = Arc::new(Mutex::new(Vec::new()));

    let mut bus = EventBus::new();
    bus.subscribe(Box::new(Recorder {
        order: Arc::clone(&order),
        seen: Arc::clone(&seen_a),
    }));
    bus.subscribe(Box::new(Recorder {
        order: Arc::clone(&order),
        seen: Arc::clone(&seen_b),
    }));

    bus.publish(&Event::NewMachine { id: MachineId::new("m1") });

    let a = seen_a.lock().unwrap();
    let b = seen_b.lock().unwrap();
    assert_eq!(a[0].0, 0);
    assert_eq!(b[0].0, 1);
}

#[test]
fn status_changed_log_summary_handles_missing_old() {
    let event = Event::StatusChanged {
        id: MachineId::new("m1"),
        old: None,
        new: MachineStatus::Booting,
    };
    assert_eq!(event.log_summary(), "machine:status_changed id=m1 old=none new=booting");
}

#[test]
fn status_changed_log_summary_includes_old() {
    let event = Event::StatusChanged {
        id: MachineId::new("m1"),
        old: Some(MachineStatus::Booting),
        new: MachineStatus::Up,
    };
    assert_eq!(event.log_summary(), "machine:status_changed id=m1 old=booting new=up");
}

#[test]
fn event_serializes_with_type_tag() {
    let event = Event::NewMachine { id: MachineId::new("m1") };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], "NewMachine");
}
