// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only CSV log of status transitions (spec §6 "Status change log").
//!
//! One row is appended per `Registry::update_status` call, composed at the
//! call site (Core Scheduler / Integration Adapter) right after the
//! registry returns the `StatusChangeEntry` — the registry itself never
//! touches this file, keeping the persistence format separate from state
//! mutation.

use roced_core::machine::{MachineStatus, StatusChangeEntry};
use roced_core::MachineId;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatusLogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

const HEADER: &str = "site,mid,old_status,new_status,timestamp,time_diff\n";

/// Appends rows to the CSV status-change log, writing the header once.
pub struct StatusLogWriter {
    path: PathBuf,
}

impl StatusLogWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Append one row for `entry`. Writes the header first if the file is
    /// new or currently empty.
    pub fn append(
        &self,
        site: &str,
        id: &MachineId,
        entry: &StatusChangeEntry,
    ) -> Result<(), StatusLogError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let needs_header = !self.path.exists() || std::fs::metadata(&self.path)?.len() == 0;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        if needs_header {
            file.write_all(HEADER.as_bytes())?;
        }

        let old = old_status_label(entry.old);
        let row = format!(
            "{site},{mid},{old},{new},{timestamp},{time_diff}\n",
            site = csv_escape(site),
            mid = csv_escape(id.as_str()),
            old = old,
            new = entry.new,
            timestamp = entry.timestamp.to_rfc3339(),
            time_diff = entry.elapsed,
        );
        file.write_all(row.as_bytes())?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn old_status_label(old: Option<MachineStatus>) -> String {
    match old {
        Some(s) => s.to_string(),
        None => String::new(),
    }
}

/// Quotes a field if it contains the delimiter, a quote, or a newline.
fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
#[path = "status_log_tests.rs"]
mod tests;
