// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daily JSON monitoring sink (spec §6 "Monitoring JSON").
//!
//! `log/monitoring_YYYY-MM-DD.json` holds a single JSON object keyed by
//! unix timestamp (a string, since JSON object keys are always strings),
//! whose value is `{site -> {metric -> value}}`. Volume is one entry per
//! status transition, so a read-modify-write on every call is cheap enough
//! and avoids inventing an append-only framing the spec doesn't specify.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum MonitoringError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Read-modify-write sink for the daily monitoring file.
pub struct MonitoringSink {
    dir: PathBuf,
}

impl MonitoringSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, now: DateTime<Utc>) -> PathBuf {
        self.dir
            .join(format!("monitoring_{}.json", now.format("%Y-%m-%d")))
    }

    /// Record one `{site -> {metric -> value}}` entry under `now`'s unix
    /// timestamp key, merging into whatever today's file already holds.
    // Allow expect here: both entries are inserted as `Value::Object` a few
    // lines above, so `as_object_mut` can never see a non-object variant.
    #[allow(clippy::expect_used)]
    pub fn record(
        &self,
        site: &str,
        metric: &str,
        value: f64,
        now: DateTime<Utc>,
    ) -> Result<(), MonitoringError> {
        let path = self.path_for(now);
        let mut doc = load(&path)?;

        let ts_key = now.timestamp().to_string();
        let entry = doc
            .entry(ts_key)
            .or_insert_with(|| Value::Object(Default::default()));
        let site_map = entry
            .as_object_mut()
            .expect("monitoring entries are always objects")
            .entry(site.to_string())
            .or_insert_with(|| Value::Object(Default::default()));
        site_map
            .as_object_mut()
            .expect("monitoring site entries are always objects")
            .insert(metric.to_string(), Value::from(value));

        save(&path, &doc)
    }
}

/// Ordered by timestamp key so the file reads chronologically when
/// inspected by hand.
fn load(path: &Path) -> Result<BTreeMap<String, Value>, MonitoringError> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            warn!(error = %e, path = %path.display(), "monitoring file unreadable, starting fresh");
            return Ok(BTreeMap::new());
        }
    };
    let reader = BufReader::new(file);
    match serde_json::from_reader(reader) {
        Ok(doc) => Ok(doc),
        Err(e) => {
            warn!(error = %e, path = %path.display(), "monitoring file malformed, starting fresh");
            Ok(BTreeMap::new())
        }
    }
}

fn save(path: &Path, doc: &BTreeMap<String, Value>) -> Result<(), MonitoringError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("tmp");
    {
        let file = File::create(&tmp_path)?;
        serde_json::to_writer_pretty(file, doc)?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
#[path = "monitoring_tests.rs"]
mod tests;
