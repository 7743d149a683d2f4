// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registry snapshot persistence.
//!
//! The snapshot is a JSON object mapping machine id to record, written
//! atomically (temp file + `sync_all` + rename) with a single backup
//! generation — unlike this workspace's WAL-backed `Snapshot`, which keeps
//! a rotating `MAX_BAK_FILES` history, spec §6 names exactly one backup
//! path, so no rotation helper is carried over.
//!
//! Datetimes serialize in the legacy interchange format
//! `{"__class__": "datetime.datetime", "__value__": "YYYY-MM-DD HH:MM:SS:ffffff"}`
//! rather than chrono's default RFC 3339, so the file matches the
//! original byte-for-byte. An unrecognized `__class__` fails that read.

use chrono::{DateTime, NaiveDateTime, Utc};
use roced_core::machine::{Machine, MachineStatus, SlotActivity, SlotState, StatusChangeEntry};
use roced_core::MachineId;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

const LEGACY_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S:%6f";
const LEGACY_CLASS_TAG: &str = "datetime.datetime";

/// `DateTime<Utc>` that (de)serializes in the legacy
/// `{"__class__": "datetime.datetime", "__value__": "..."}` shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTimeValue(pub DateTime<Utc>);

impl Serialize for DateTimeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("DateTimeValue", 2)?;
        s.serialize_field("__class__", LEGACY_CLASS_TAG)?;
        s.serialize_field("__value__", &self.0.format(LEGACY_DATETIME_FORMAT).to_string())?;
        s.end()
    }
}

impl<'de> Deserialize<'de> for DateTimeValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            __class__: String,
            __value__: String,
        }
        let raw = Raw::deserialize(deserializer)?;
        if raw.__class__ != LEGACY_CLASS_TAG {
            return Err(D::Error::custom(format!(
                "unrecognized __class__ tag: {}",
                raw.__class__
            )));
        }
        let naive = NaiveDateTime::parse_from_str(&raw.__value__, LEGACY_DATETIME_FORMAT)
            .map_err(|e| D::Error::custom(format!("invalid datetime value: {e}")))?;
        Ok(DateTimeValue(naive.and_utc()))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StatusChangeEntrySnapshot {
    old: Option<MachineStatus>,
    new: MachineStatus,
    timestamp: DateTimeValue,
    elapsed: f64,
}

impl From<&StatusChangeEntry> for StatusChangeEntrySnapshot {
    fn from(entry: &StatusChangeEntry) -> Self {
        Self {
            old: entry.old,
            new: entry.new,
            timestamp: DateTimeValue(entry.timestamp),
            elapsed: entry.elapsed,
        }
    }
}

impl From<StatusChangeEntrySnapshot> for StatusChangeEntry {
    fn from(s: StatusChangeEntrySnapshot) -> Self {
        Self {
            old: s.old,
            new: s.new,
            timestamp: s.timestamp.0,
            elapsed: s.elapsed,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct MachineSnapshot {
    status: MachineStatus,
    status_last_update: DateTimeValue,
    status_change_history: Vec<StatusChangeEntrySnapshot>,
    site: String,
    site_type: String,
    machine_type: String,
    machine_cores: u32,
    machine_load: f64,
    host_ip: String,
    hostname: String,
    gateway: Option<String>,
    vpn_ip: Option<String>,
    slot_status: Vec<(SlotState, SlotActivity)>,
}

impl From<&Machine> for MachineSnapshot {
    fn from(m: &Machine) -> Self {
        Self {
            status: m.status,
            status_last_update: DateTimeValue(m.status_last_update),
            status_change_history: m.status_change_history.iter().map(Into::into).collect(),
            site: m.site.clone(),
            site_type: m.site_type.clone(),
            machine_type: m.machine_type.clone(),
            machine_cores: m.machine_cores,
            machine_load: m.machine_load,
            host_ip: m.host_ip.clone(),
            hostname: m.hostname.clone(),
            gateway: m.gateway.clone(),
            vpn_ip: m.vpn_ip.clone(),
            slot_status: m.slot_status.clone(),
        }
    }
}

impl MachineSnapshot {
    fn into_machine(self, id: MachineId) -> Machine {
        Machine {
            id,
            status: self.status,
            status_last_update: self.status_last_update.0,
            status_change_history: self
                .status_change_history
                .into_iter()
                .map(Into::into)
                .collect(),
            site: self.site,
            site_type: self.site_type,
            machine_type: self.machine_type,
            machine_cores: self.machine_cores,
            machine_load: self.machine_load,
            host_ip: self.host_ip,
            hostname: self.hostname,
            gateway: self.gateway,
            vpn_ip: self.vpn_ip,
            slot_status: self.slot_status,
        }
    }
}

/// Default single-deep backup path for `default_backup_path(primary)`.
pub fn default_backup_path(primary: &Path) -> std::path::PathBuf {
    match primary.parent() {
        Some(dir) => dir.join("old_machine_registry.json"),
        None => std::path::PathBuf::from("old_machine_registry.json"),
    }
}

/// Atomically write the registry to `path`, first renaming any existing
/// primary snapshot to `backup_path` (single-deep — the previous backup,
/// if any, is overwritten).
pub fn save(
    path: &Path,
    backup_path: &Path,
    machines: &HashMap<MachineId, Machine>,
) -> Result<(), SnapshotError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    if path.exists() {
        fs::rename(path, backup_path)?;
    }

    let snapshot: HashMap<String, MachineSnapshot> = machines
        .iter()
        .map(|(id, m)| (id.as_str().to_string(), MachineSnapshot::from(m)))
        .collect();

    let tmp_path = path.with_extension("tmp");
    {
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &snapshot)?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;

    Ok(())
}

/// Load the registry from `path`, falling back to `backup_path` on any
/// read/parse failure. Both failing yields an empty registry (spec §7) —
/// this never surfaces an `Err` to the caller, only logs.
pub fn load(path: &Path, backup_path: &Path) -> HashMap<MachineId, Machine> {
    match load_file(path) {
        Ok(machines) => return machines,
        Err(e) => {
            warn!(error = %e, path = %path.display(), "primary snapshot unreadable, trying backup");
        }
    }

    match load_file(backup_path) {
        Ok(machines) => machines,
        Err(e) => {
            error!(error = %e, path = %backup_path.display(), "backup snapshot unreadable, starting with an empty registry");
            HashMap::new()
        }
    }
}

fn load_file(path: &Path) -> Result<HashMap<MachineId, Machine>, SnapshotError> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let raw: HashMap<String, MachineSnapshot> = serde_json::from_reader(reader)?;
    Ok(raw
        .into_iter()
        .map(|(id, snap)| (MachineId::new(id.clone()), snap.into_machine(MachineId::new(id))))
        .collect())
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
