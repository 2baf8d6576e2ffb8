//! ops — `Vault`, the operation facade used by the CLI and by embedding callers.
//!
//! Each call opens the live store (and the snapshot directory when needed) for the
//! duration of that one operation only; nothing is held between calls.

use anyhow::{anyhow, Context, Result};
use log::info;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::VaultConfig;
use crate::integrity::{self, Defect, PlannedFix, RepairReport, SweepReport};
use crate::schema::Table;
use crate::snapstore::{
    self, ExportReport, RestoreReport, SnapshotInfo, SnapshotStore, SnapshotSummary,
};
use crate::store::SqliteStore;

/// Result of `Vault::snapshot`: the export plus whatever auto-prune removed.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotOutcome {
    #[serde(flatten)]
    pub export: ExportReport,
    pub pruned: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VaultStatus {
    pub db_path: PathBuf,
    pub snapshot_dir: PathBuf,
    pub tables: BTreeMap<String, u64>,
    pub defects: usize,
    pub snapshots: usize,
    pub latest: Option<SnapshotInfo>,
}

pub struct Vault {
    cfg: VaultConfig,
}

impl Vault {
    pub fn new(cfg: VaultConfig) -> Self {
        Self { cfg }
    }

    /// Vault configured from SV_* variables.
    pub fn from_env() -> Self {
        Self::new(VaultConfig::from_env())
    }

    pub fn config(&self) -> &VaultConfig {
        &self.cfg
    }

    fn db_path(&self) -> Result<&Path> {
        self.cfg
            .db_path
            .as_deref()
            .ok_or_else(|| anyhow!("no database configured (set SV_DB_PATH or pass --db)"))
    }

    /// Open the existing live store.
    pub fn open_store(&self) -> Result<SqliteStore> {
        SqliteStore::open(self.db_path()?, self.cfg.store_options())
    }

    /// Open (creating if needed) the snapshot directory.
    pub fn open_snapshots(&self) -> Result<SnapshotStore> {
        Ok(SnapshotStore::open_or_create(&self.cfg.snapshot_dir())?
            .with_gzip(self.cfg.snapshot_gzip))
    }

    /// Create the database file with all entity tables, and the snapshot directory.
    pub fn init(&self) -> Result<()> {
        let path = self.db_path()?;
        let store = SqliteStore::create(path, self.cfg.store_options())?;
        store.init_schema()?;
        let snaps = self.open_snapshots()?;
        info!(
            "init: database {} ready, snapshots in {}",
            path.display(),
            snaps.dir_path().display()
        );
        Ok(())
    }

    /// Export the live store; prune afterwards when `snapshot_keep` is set.
    pub fn snapshot(&self, name: Option<&str>) -> Result<SnapshotOutcome> {
        let store = self.open_store()?;
        let snaps = self.open_snapshots()?;
        let export = snapstore::export(&store, &snaps, name)?;
        let pruned = match self.cfg.snapshot_keep {
            Some(keep) => snaps.prune(keep).context("auto-prune after snapshot")?,
            None => Vec::new(),
        };
        Ok(SnapshotOutcome { export, pruned })
    }

    /// Restore `sales` from a named artifact (`latest` accepted).
    pub fn restore(&self, name: &str) -> Result<RestoreReport> {
        let snaps = self.open_snapshots()?;
        let snap = snaps.read(name)?;
        let mut store = self.open_store()?;
        info!("restore: from '{}' ({})", name, snap.created_at);
        Ok(snapstore::restore_sales(&mut store, &snap))
    }

    pub fn list_snapshots(&self) -> Result<Vec<SnapshotInfo>> {
        self.open_snapshots()?.list()
    }

    pub fn prune_snapshots(&self, keep: usize) -> Result<Vec<String>> {
        self.open_snapshots()?.prune(keep)
    }

    pub fn inspect_snapshot(&self, name: &str) -> Result<SnapshotSummary> {
        self.open_snapshots()?.inspect(name)
    }

    pub fn audit(&self) -> Result<Vec<Defect>> {
        integrity::audit(&self.open_store()?)
    }

    pub fn is_consistent(&self) -> Result<bool> {
        integrity::is_consistent(&self.open_store()?)
    }

    /// Repair the given defects with the configured policy.
    pub fn repair(&self, defects: &[Defect]) -> Result<RepairReport> {
        let mut store = self.open_store()?;
        integrity::repair(&mut store, defects, &self.cfg.repair_policy())
    }

    /// Audit then repair in one go.
    pub fn audit_and_repair(&self) -> Result<RepairReport> {
        let mut store = self.open_store()?;
        let defects = integrity::audit(&store)?;
        integrity::repair(&mut store, &defects, &self.cfg.repair_policy())
    }

    /// What `audit_and_repair` would do, without writing.
    pub fn plan_repair(&self) -> Result<Vec<PlannedFix>> {
        let store = self.open_store()?;
        let defects = integrity::audit(&store)?;
        integrity::plan(&store, &defects, &self.cfg.repair_policy())
    }

    pub fn sweep_placeholders(&self) -> Result<SweepReport> {
        let mut store = self.open_store()?;
        integrity::sweep_placeholders(&mut store, &self.cfg.repair_policy())
    }

    /// Table counts, defect count and snapshot inventory.
    pub fn status(&self) -> Result<VaultStatus> {
        let store = self.open_store()?;
        let mut tables = BTreeMap::new();
        for t in Table::ALL {
            tables.insert(t.name().to_string(), store.count(t)?);
        }
        let defects = integrity::defect_count(&store)?;
        drop(store);

        let list = self.list_snapshots()?;
        let latest = list.iter().find(|i| !i.alias).cloned();
        Ok(VaultStatus {
            db_path: self.db_path()?.to_path_buf(),
            snapshot_dir: self.cfg.snapshot_dir(),
            tables,
            defects,
            snapshots: list.iter().filter(|i| !i.alias).count(),
            latest,
        })
    }
}
