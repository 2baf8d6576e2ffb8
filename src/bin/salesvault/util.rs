use anyhow::Result;
use serde::Serialize;

use salesvault::metrics::metrics_snapshot;

/// Pretty JSON to stdout.
pub fn print_json<T: Serialize>(v: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(v)?);
    Ok(())
}

pub fn print_metrics() {
    let m = metrics_snapshot();
    println!("metrics:");
    println!("  snapshots_written           = {}", m.snapshots_written);
    println!("  snapshot_rows_exported      = {}", m.snapshot_rows_exported);
    println!("  snapshot_tables_incomplete  = {}", m.snapshot_tables_incomplete);
    println!("  snapshots_pruned            = {}", m.snapshots_pruned);
    println!("  restore_rows_written        = {}", m.restore_rows_written);
    println!("  restore_rows_failed         = {}", m.restore_rows_failed);
    println!("  audit_defects_found         = {}", m.audit_defects_found);
    println!("  repair_placeholders_created = {}", m.repair_placeholders_created);
    println!("  repair_placeholders_reused  = {}", m.repair_placeholders_reused);
    println!("  repair_refs_reassigned      = {}", m.repair_refs_reassigned);
    println!("  repair_unresolved           = {}", m.repair_unresolved);
    println!("  sweep_placeholders_deleted  = {}", m.sweep_placeholders_deleted);
}

/// Human-readable byte size.
pub fn human_size(n: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut v = n as f64;
    let mut i = 0;
    while v >= 1024.0 && i + 1 < UNITS.len() {
        v /= 1024.0;
        i += 1;
    }
    if i == 0 {
        format!("{} {}", n, UNITS[0])
    } else {
        format!("{:.1} {}", v, UNITS[i])
    }
}
