//! snapstore/restore — merge the artifact's `sales` rows back into the live store.
//!
//! Only the transactional table is restored. Reference tables (clients,
//! representatives, packs, ...) are regenerated by their own import jobs, so a
//! restored sale may point at a row that no longer exists; the integrity auditor
//! picks those up afterwards.
//!
//! Semantics:
//! - Upsert by id: absent -> insert, present -> overwrite with the artifact's values.
//! - Rows are written one at a time in artifact order. A failing row is logged and
//!   tallied; earlier rows stay committed and later rows are still attempted.
//! - Missing or empty `sales` entry: successful no-op (restored = total = 0).

use log::{debug, info, warn};
use serde::Serialize;

use super::manifest::Snapshot;
use crate::error::{FailureKind, VaultError};
use crate::metrics::record_restore_row;
use crate::schema::Table;
use crate::store::{row_id, LiveStore};

#[derive(Debug, Clone, Serialize)]
pub struct RowFailure {
    /// Position of the row in the artifact's `sales` sequence.
    pub index: usize,
    pub id: Option<i64>,
    pub kind: FailureKind,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RestoreReport {
    pub restored: usize,
    pub total: usize,
    pub failures: Vec<RowFailure>,
}

impl RestoreReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Err(PartialFailure) when any row failed.
    pub fn ensure_complete(&self) -> anyhow::Result<()> {
        if self.failures.is_empty() {
            return Ok(());
        }
        Err(VaultError::PartialFailure {
            operation: "restore",
            failed: self.failures.len(),
            total: self.total,
        }
        .into())
    }
}

/// Upsert every sale of `snap` into `store`, best effort.
pub fn restore_sales<S: LiveStore + ?Sized>(store: &mut S, snap: &Snapshot) -> RestoreReport {
    let rows = match snap.table(Table::Sales) {
        Some(rows) if !rows.is_empty() => rows,
        _ => {
            info!("restore: artifact has no sales rows, nothing to do");
            return RestoreReport::default();
        }
    };

    let mut report = RestoreReport {
        total: rows.len(),
        ..RestoreReport::default()
    };
    info!("restore: start, sales rows={}", report.total);

    for (index, row) in rows.iter().enumerate() {
        let id = row_id(row);
        let outcome = match id {
            Some(_) => store.upsert(Table::Sales, row),
            None => Err(VaultError::ConstraintViolation(
                "sale row without integer id".to_string(),
            )
            .into()),
        };
        match outcome {
            Ok(()) => {
                debug!("restore: sale {:?} written", id);
                report.restored += 1;
                record_restore_row(true);
            }
            Err(e) => {
                warn!("restore: sale {:?} (row {}) failed: {:#}", id, index, e);
                report.failures.push(RowFailure {
                    index,
                    id,
                    kind: FailureKind::of(&e),
                    error: format!("{:#}", e),
                });
                record_restore_row(false);
            }
        }
    }

    info!(
        "restore: done, restored={}/{}, failed={}",
        report.restored,
        report.total,
        report.failed()
    );
    report
}
