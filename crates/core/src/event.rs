// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registry event types and the synchronous in-process event bus.
//!
//! Delivery is synchronous and registration-ordered: `publish` calls every
//! subscriber's [`Subscriber::on_event`] in turn before returning. There is
//! no async queue and no back-pressure — a subscriber that needs to do
//! slow or async work must hand it off itself rather than block the bus.

use crate::machine::MachineStatus;
use crate::MachineId;
use serde::{Deserialize, Serialize};

/// A registry state change, delivered to every subscriber in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A machine was added to the registry.
    NewMachine { id: MachineId },
    /// A machine was removed from the registry.
    MachineRemoved { id: MachineId },
    /// A machine's lifecycle status changed.
    StatusChanged {
        id: MachineId,
        old: Option<MachineStatus>,
        new: MachineStatus,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::NewMachine { .. } => "machine:new",
            Event::MachineRemoved { .. } => "machine:removed",
            Event::StatusChanged { .. } => "machine:status_changed",
        }
    }

    pub fn log_summary(&self) -> String {
        let t = self.name();
        match self {
            Event::NewMachine { id } => format!("{t} id={id}"),
            Event::MachineRemoved { id } => format!("{t} id={id}"),
            Event::StatusChanged { id, old, new } => match old {
                Some(old) => format!("{t} id={id} old={old} new={new}"),
                None => format!("{t} id={id} old=none new={new}"),
            },
        }
    }
}

/// A registration-ordered listener on the event bus.
///
/// Implementors must not block: `on_event` is called synchronously from
/// inside `EventBus::publish`, on whatever thread published the event.
pub trait Subscriber: Send + Sync {
    fn on_event(&self, event: &Event);
}

/// Lets a subscriber shared elsewhere (e.g. an adapter's own field) also
/// be registered on the bus without a second implementation.
impl<T: Subscriber + ?Sized> Subscriber for std::sync::Arc<T> {
    fn on_event(&self, event: &Event) {
        (**self).on_event(event);
    }
}

/// In-process, synchronous publish/subscribe bus.
///
/// Subscribers register once (typically at startup) and are never
/// unregistered; `publish` fans an event out to all of them in
/// registration order before returning, per the no-async-queue contract.
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<Box<dyn Subscriber>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, subscriber: Box<dyn Subscriber>) {
        self.subscribers.push(subscriber);
    }

    pub fn publish(&self, event: &Event) {
        for subscriber in &self.subscribers {
            subscriber.on_event(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
