use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Backup, restore and referential-integrity maintenance for the sales database
#[derive(Parser, Debug)]
#[command(name = "salesvault", version, about = "salesvault CLI")]
pub struct Cli {
    /// Live database file (overrides SV_DB_PATH)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Snapshot directory (overrides SV_SNAPSHOT_DIR)
    #[arg(long, global = true)]
    pub snapshot_dir: Option<String>,

    /// Enforce foreign keys on the live store (overrides SV_FOREIGN_KEYS)
    #[arg(long, global = true)]
    pub foreign_keys: bool,

    /// Print process metrics after the command
    #[arg(long, global = true)]
    pub metrics: bool,

    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Create the database (all entity tables) and the snapshot directory
    Init,
    /// Table counts, defect count and snapshot inventory
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Export all tables into a new snapshot (or manage snapshots)
    Snapshot(SnapshotArgs),
    /// Restore sales from a snapshot (name or "latest")
    Restore {
        name: String,
        /// Exit non-zero if any row failed
        #[arg(long)]
        strict: bool,
        #[arg(long)]
        json: bool,
    },
    /// List sales with dangling client / representative / pack references
    Audit {
        #[arg(long)]
        json: bool,
        /// Exit non-zero when defects exist
        #[arg(long)]
        strict: bool,
    },
    /// Repair dangling references found by audit
    Repair {
        /// Print the planned fix per defect without writing
        #[arg(long)]
        dry_run: bool,
        /// Representative id to relink broken representative references to
        #[arg(long)]
        fallback_rep: Option<i64>,
        #[arg(long)]
        json: bool,
        /// Exit non-zero if any defect stayed unresolved
        #[arg(long)]
        strict: bool,
    },
    /// Delete placeholder clients no sale references any more
    Sweep {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
#[command(args_conflicts_with_subcommands = true)]
pub struct SnapshotArgs {
    #[command(subcommand)]
    pub action: Option<SnapshotCmd>,

    /// Artifact name (default: backup-YYYYMMDD-HHMMSS-mmm)
    #[arg(long)]
    pub name: Option<String>,

    /// Prune to this many snapshots afterwards (overrides SV_SNAPSHOT_KEEP)
    #[arg(long)]
    pub keep: Option<usize>,

    /// Write the artifact gzip-compressed
    #[arg(long)]
    pub gzip: bool,

    /// Exit non-zero if any table could not be read
    #[arg(long)]
    pub strict: bool,

    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum SnapshotCmd {
    /// List snapshots, newest first
    List {
        #[arg(long)]
        json: bool,
    },
    /// Metadata and per-table row counts of one snapshot
    Inspect {
        name: String,
        #[arg(long)]
        json: bool,
    },
    /// Delete all but the newest N snapshots ("latest" is never pruned)
    Prune {
        #[arg(long)]
        keep: usize,
    },
}
