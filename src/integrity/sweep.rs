//! integrity/sweep — delete placeholder clients that no sale references any more.
//!
//! A placeholder is a client whose external id starts with the policy prefix. Once the
//! real client has been re-imported and the sales relinked, the placeholder is dead
//! weight. Non-placeholder clients are never touched.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::BTreeSet;

use super::repair::RepairPolicy;
use crate::metrics::record_placeholders_swept;
use crate::schema::{RefField, Table, CLIENT_EXTERNAL_ID};
use crate::store::{row_id, LiveStore};

#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    /// Placeholder clients found.
    pub examined: usize,
    /// Ids of the placeholders removed.
    pub deleted: Vec<i64>,
    /// Placeholders still referenced by at least one sale.
    pub kept: usize,
    pub failed: usize,
}

pub fn sweep_placeholders<S: LiveStore + ?Sized>(
    store: &mut S,
    policy: &RepairPolicy,
) -> Result<SweepReport> {
    let referenced: BTreeSet<i64> = store
        .read_all(Table::Sales)
        .context("read sales")?
        .iter()
        .filter_map(|s| s.get(RefField::Client.column()).and_then(|v| v.as_i64()))
        .collect();

    let placeholders: Vec<i64> = store
        .read_all(Table::Clients)
        .context("read clients")?
        .iter()
        .filter(|c| {
            c.get(CLIENT_EXTERNAL_ID)
                .and_then(|v| v.as_str())
                .map(|ext| policy.is_placeholder(ext))
                .unwrap_or(false)
        })
        .filter_map(row_id)
        .collect();

    let mut report = SweepReport {
        examined: placeholders.len(),
        ..SweepReport::default()
    };
    for id in placeholders {
        if referenced.contains(&id) {
            report.kept += 1;
            continue;
        }
        match store.delete(Table::Clients, id) {
            Ok(true) => {
                debug!("sweep: placeholder client #{} deleted", id);
                report.deleted.push(id);
            }
            Ok(false) => {}
            Err(e) => {
                warn!("sweep: placeholder client #{} not deleted: {:#}", id, e);
                report.failed += 1;
            }
        }
    }

    record_placeholders_swept(report.deleted.len() as u64);
    info!(
        "sweep: placeholders={}, deleted={}, kept={}, failed={}",
        report.examined,
        report.deleted.len(),
        report.kept,
        report.failed
    );
    Ok(report)
}
