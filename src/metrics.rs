//! Lightweight process-wide metrics for salesvault.
//!
//! Atomic counters per subsystem:
//! - Snapshots (export / prune)
//! - Restore
//! - Integrity (audit / repair / sweep)

use std::sync::atomic::{AtomicU64, Ordering};

// ----- Snapshots -----
static SNAPSHOTS_WRITTEN: AtomicU64 = AtomicU64::new(0);
static SNAPSHOT_ROWS_EXPORTED: AtomicU64 = AtomicU64::new(0);
static SNAPSHOT_TABLES_INCOMPLETE: AtomicU64 = AtomicU64::new(0);
static SNAPSHOTS_PRUNED: AtomicU64 = AtomicU64::new(0);

// ----- Restore -----
static RESTORE_ROWS_WRITTEN: AtomicU64 = AtomicU64::new(0);
static RESTORE_ROWS_FAILED: AtomicU64 = AtomicU64::new(0);

// ----- Integrity -----
static AUDIT_DEFECTS_FOUND: AtomicU64 = AtomicU64::new(0);
static REPAIR_PLACEHOLDERS_CREATED: AtomicU64 = AtomicU64::new(0);
static REPAIR_PLACEHOLDERS_REUSED: AtomicU64 = AtomicU64::new(0);
static REPAIR_REFS_REASSIGNED: AtomicU64 = AtomicU64::new(0);
static REPAIR_UNRESOLVED: AtomicU64 = AtomicU64::new(0);
static SWEEP_PLACEHOLDERS_DELETED: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct MetricsSnapshot {
    // Snapshots
    pub snapshots_written: u64,
    pub snapshot_rows_exported: u64,
    pub snapshot_tables_incomplete: u64,
    pub snapshots_pruned: u64,

    // Restore
    pub restore_rows_written: u64,
    pub restore_rows_failed: u64,

    // Integrity
    pub audit_defects_found: u64,
    pub repair_placeholders_created: u64,
    pub repair_placeholders_reused: u64,
    pub repair_refs_reassigned: u64,
    pub repair_unresolved: u64,
    pub sweep_placeholders_deleted: u64,
}

pub fn metrics_snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        snapshots_written: SNAPSHOTS_WRITTEN.load(Ordering::Relaxed),
        snapshot_rows_exported: SNAPSHOT_ROWS_EXPORTED.load(Ordering::Relaxed),
        snapshot_tables_incomplete: SNAPSHOT_TABLES_INCOMPLETE.load(Ordering::Relaxed),
        snapshots_pruned: SNAPSHOTS_PRUNED.load(Ordering::Relaxed),
        restore_rows_written: RESTORE_ROWS_WRITTEN.load(Ordering::Relaxed),
        restore_rows_failed: RESTORE_ROWS_FAILED.load(Ordering::Relaxed),
        audit_defects_found: AUDIT_DEFECTS_FOUND.load(Ordering::Relaxed),
        repair_placeholders_created: REPAIR_PLACEHOLDERS_CREATED.load(Ordering::Relaxed),
        repair_placeholders_reused: REPAIR_PLACEHOLDERS_REUSED.load(Ordering::Relaxed),
        repair_refs_reassigned: REPAIR_REFS_REASSIGNED.load(Ordering::Relaxed),
        repair_unresolved: REPAIR_UNRESOLVED.load(Ordering::Relaxed),
        sweep_placeholders_deleted: SWEEP_PLACEHOLDERS_DELETED.load(Ordering::Relaxed),
    }
}

pub fn metrics_reset() {
    for c in [
        &SNAPSHOTS_WRITTEN,
        &SNAPSHOT_ROWS_EXPORTED,
        &SNAPSHOT_TABLES_INCOMPLETE,
        &SNAPSHOTS_PRUNED,
        &RESTORE_ROWS_WRITTEN,
        &RESTORE_ROWS_FAILED,
        &AUDIT_DEFECTS_FOUND,
        &REPAIR_PLACEHOLDERS_CREATED,
        &REPAIR_PLACEHOLDERS_REUSED,
        &REPAIR_REFS_REASSIGNED,
        &REPAIR_UNRESOLVED,
        &SWEEP_PLACEHOLDERS_DELETED,
    ] {
        c.store(0, Ordering::Relaxed);
    }
}

// ----- recorders -----

pub fn record_snapshot_written(rows: u64, incomplete_tables: u64) {
    SNAPSHOTS_WRITTEN.fetch_add(1, Ordering::Relaxed);
    SNAPSHOT_ROWS_EXPORTED.fetch_add(rows, Ordering::Relaxed);
    SNAPSHOT_TABLES_INCOMPLETE.fetch_add(incomplete_tables, Ordering::Relaxed);
}

pub fn record_snapshots_pruned(n: u64) {
    SNAPSHOTS_PRUNED.fetch_add(n, Ordering::Relaxed);
}

pub fn record_restore_row(ok: bool) {
    if ok {
        RESTORE_ROWS_WRITTEN.fetch_add(1, Ordering::Relaxed);
    } else {
        RESTORE_ROWS_FAILED.fetch_add(1, Ordering::Relaxed);
    }
}

pub fn record_defects_found(n: u64) {
    AUDIT_DEFECTS_FOUND.fetch_add(n, Ordering::Relaxed);
}

pub fn record_placeholder(created: bool) {
    if created {
        REPAIR_PLACEHOLDERS_CREATED.fetch_add(1, Ordering::Relaxed);
    } else {
        REPAIR_PLACEHOLDERS_REUSED.fetch_add(1, Ordering::Relaxed);
    }
}

pub fn record_ref_reassigned() {
    REPAIR_REFS_REASSIGNED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_unresolved() {
    REPAIR_UNRESOLVED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_placeholders_swept(n: u64) {
    SWEEP_PLACEHOLDERS_DELETED.fetch_add(n, Ordering::Relaxed);
}
