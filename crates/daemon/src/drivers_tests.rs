// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn null_batch_system_reports_unknown() {
    let batch = NullBatchSystem;
    assert!(batch.list_jobs().await.is_none());
    assert!(batch.list_nodes().await.is_none());
}

#[tokio::test]
async fn null_batch_system_refuses_to_drain() {
    let batch = NullBatchSystem;
    assert!(batch.drain_node("host-10-0-0-1").await.is_err());
}

#[tokio::test]
async fn null_site_adapter_refuses_every_call() {
    let adapter = NullSiteAdapter;
    assert!(adapter.spawn("default", 1).await.is_err());
    assert!(adapter.terminate(&MachineId::new("m-1")).await.is_err());
}
