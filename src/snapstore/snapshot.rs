//! snapstore/snapshot — export every entity table into a new artifact.
//!
//! - capture(): read all seven tables (fixed registry order) into a Snapshot.
//!   A table whose read fails is kept as an empty sequence and listed in
//!   `incomplete`; the export carries on with the other tables.
//! - export(): capture + write under a fresh (or given) name + replace `latest`.
//!
//! The live store is only read.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::manifest::Snapshot;
use super::{SnapshotStore, LATEST};
use crate::error::VaultError;
use crate::metrics::record_snapshot_written;
use crate::schema::Table;
use crate::store::LiveStore;

#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub name: String,
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
    pub counts: BTreeMap<String, usize>,
    pub incomplete: Vec<String>,
}

impl ExportReport {
    pub fn total_rows(&self) -> usize {
        self.counts.values().sum()
    }

    /// Err(PartialFailure) when any table was exported empty because its read failed.
    pub fn ensure_complete(&self) -> Result<()> {
        if self.incomplete.is_empty() {
            return Ok(());
        }
        Err(VaultError::PartialFailure {
            operation: "snapshot",
            failed: self.incomplete.len(),
            total: Table::ALL.len(),
        }
        .into())
    }
}

/// Read every entity table into an in-memory snapshot.
pub fn capture<S: LiveStore + ?Sized>(store: &S) -> Snapshot {
    let mut snap = Snapshot::new();
    for table in Table::ALL {
        match store.read_all(table) {
            Ok(rows) => snap.set_table(table, rows),
            Err(e) => {
                warn!("snapshot: table {} unreadable, exported empty: {:#}", table, e);
                snap.mark_incomplete(table);
            }
        }
    }
    snap
}

/// Capture the live store and persist it as a new artifact, then point `latest` at it.
pub fn export<S: LiveStore + ?Sized>(
    store: &S,
    snapstore: &SnapshotStore,
    name: Option<&str>,
) -> Result<ExportReport> {
    let name = match name {
        Some(n) => n.to_string(),
        None => snapstore.generate_name()?,
    };
    info!(
        "snapshot: start, name={}, dir={}",
        name,
        snapstore.dir_path().display()
    );

    let snap = capture(store);

    let path = snapstore
        .write(&name, &snap)
        .with_context(|| format!("write snapshot '{}'", name))?;
    snapstore
        .write(LATEST, &snap)
        .context("update latest snapshot alias")?;

    let report = ExportReport {
        name,
        path,
        created_at: snap.created_at,
        counts: snap.counts(),
        incomplete: snap.incomplete.clone(),
    };
    record_snapshot_written(report.total_rows() as u64, report.incomplete.len() as u64);

    if report.incomplete.is_empty() {
        info!(
            "snapshot: done, name={}, rows={}, tables={}",
            report.name,
            report.total_rows(),
            report.counts.len()
        );
    } else {
        warn!(
            "snapshot: done with incomplete tables [{}], name={}, rows={}",
            report.incomplete.join(", "),
            report.name,
            report.total_rows()
        );
    }
    Ok(report)
}
