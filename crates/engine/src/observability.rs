// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helper for the cross-cutting write that follows every
//! `Registry::update_status` call: one CSV row plus one monitoring
//! sample. `Registry` deliberately doesn't do this itself (see its doc
//! comment) so call sites — the Integration Adapter and the Core
//! Scheduler — each pull this in rather than duplicate the two calls.

use roced_core::machine::StatusChangeEntry;
use roced_core::MachineId;
use roced_storage::{MonitoringSink, StatusLogWriter};
use tracing::warn;

pub(crate) fn log_status_change(
    status_log: &StatusLogWriter,
    monitoring: &MonitoringSink,
    site: &str,
    id: &MachineId,
    entry: &StatusChangeEntry,
) {
    if let Err(err) = status_log.append(site, id, entry) {
        warn!(%id, error = %err, "failed to append status change log entry");
    }
    if let Err(err) = monitoring.record(site, "status_transition_seconds", entry.elapsed, entry.timestamp) {
        warn!(%id, error = %err, "failed to record monitoring entry");
    }
}
