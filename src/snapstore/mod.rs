//! snapstore — named, timestamped snapshot artifacts in a dedicated directory.
//!
//! Layout:
//!   <snapshot_dir>/<name>.json       — plain artifact
//!   <snapshot_dir>/<name>.json.gz    — gzip artifact
//!   <snapshot_dir>/latest.json[.gz]  — alias, replaced on every export
//!   <snapshot_dir>/snapstore.lock    — fs2 lock (exclusive for write/prune, shared for read/list)
//!
//! Rules:
//! - write() never replaces an existing artifact; only the `latest` alias is replaceable.
//! - read() of a missing name fails with VaultError::NotFound.
//! - prune(keep) deletes all but the `keep` newest non-alias artifacts; empty store is a no-op.
//! - Files land via tmp + rename, so readers never see half-written artifacts.
//!
//! Composition:
//! - manifest: the artifact document (Snapshot) and its encoding.
//! - snapshot: exporter (live store -> artifact).
//! - restore: restorer (artifact -> live store, sales only).

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::error::VaultError;
use crate::lock::DirLock;
use crate::metrics::record_snapshots_pruned;

pub mod manifest;
mod restore;
pub mod snapshot;

pub use manifest::{Snapshot, SNAPSHOT_FORMAT_VERSION};
pub use restore::{restore_sales, RestoreReport, RowFailure};
pub use snapshot::{capture, export, ExportReport};

/// Reserved alias that always points at the most recent export.
pub const LATEST: &str = "latest";

/// Prefix of generated artifact names.
pub const NAME_PREFIX: &str = "backup";

const EXT_PLAIN: &str = ".json";
const EXT_GZIP: &str = ".json.gz";
const MAX_NAME_LEN: usize = 128;

/// Listing entry.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotInfo {
    pub name: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
    pub alias: bool,
    pub compressed: bool,
}

/// Inspection result: metadata plus per-table counts.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotSummary {
    pub name: String,
    pub size: u64,
    pub sha256: String,
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub incomplete: Vec<String>,
    pub counts: BTreeMap<String, usize>,
}

pub struct SnapshotStore {
    dir: PathBuf,
    gzip: bool,
}

impl SnapshotStore {
    /// Open or create the snapshot directory. An unwritable directory is a hard failure.
    pub fn open_or_create(dir: &Path) -> Result<Self> {
        if !dir.exists() {
            fs::create_dir_all(dir)
                .with_context(|| format!("create snapshot dir {}", dir.display()))?;
        }
        if !dir.is_dir() {
            bail!("snapshot path {} is not a directory", dir.display());
        }
        Ok(Self {
            dir: dir.to_path_buf(),
            gzip: false,
        })
    }

    /// Compress artifacts written from now on.
    pub fn with_gzip(mut self, on: bool) -> Self {
        self.gzip = on;
        self
    }

    pub fn dir_path(&self) -> &Path {
        &self.dir
    }

    /// Persist `snap` under `name`. Fails if the name is taken, except for `latest`.
    pub fn write(&self, name: &str, snap: &Snapshot) -> Result<PathBuf> {
        validate_name(name)?;
        let bytes = snap.encode(self.gzip)?;
        let _lk = DirLock::exclusive(&self.dir)?;

        let existing = self.locate(name);
        if existing.is_some() && name != LATEST {
            bail!(
                "snapshot '{}' already exists in {}",
                name,
                self.dir.display()
            );
        }

        let path = self.artifact_path(name, self.gzip);
        let tmp = self.dir.join(format!("{name}.tmp"));
        {
            let mut f = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp)
                .with_context(|| format!("open tmp {}", tmp.display()))?;
            f.write_all(&bytes)
                .with_context(|| format!("write {}", tmp.display()))?;
            f.sync_all()
                .with_context(|| format!("sync {}", tmp.display()))?;
        }
        fs::rename(&tmp, &path)
            .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;

        // alias written in the other encoding last time
        if let Some(old) = existing {
            if old != path {
                fs::remove_file(&old).with_context(|| {
                    format!("remove superseded alias {}", old.display())
                })?;
            }
        }

        debug!("snapstore: wrote {} ({} B)", path.display(), bytes.len());
        Ok(path)
    }

    /// Load an artifact by name (`latest` included).
    pub fn read(&self, name: &str) -> Result<Snapshot> {
        let bytes = self.read_bytes(name)?;
        Snapshot::decode(&bytes).with_context(|| format!("decode snapshot '{}'", name))
    }

    /// Load the artifact the `latest` alias holds.
    pub fn latest(&self) -> Result<Snapshot> {
        self.read(LATEST)
    }

    /// All artifacts, newest first (created time, then name).
    pub fn list(&self) -> Result<Vec<SnapshotInfo>> {
        let _lk = DirLock::shared(&self.dir)?;
        self.list_unlocked()
    }

    /// Delete all but the `keep` newest non-alias artifacts. Returns the deleted names.
    pub fn prune(&self, keep: usize) -> Result<Vec<String>> {
        let _lk = DirLock::exclusive(&self.dir)?;
        let candidates: Vec<SnapshotInfo> = self
            .list_unlocked()?
            .into_iter()
            .filter(|i| !i.alias)
            .collect();

        let mut deleted = Vec::new();
        for info in candidates.into_iter().skip(keep) {
            if let Some(p) = self.locate(&info.name) {
                fs::remove_file(&p).with_context(|| format!("remove {}", p.display()))?;
                deleted.push(info.name);
            }
        }
        if !deleted.is_empty() {
            info!(
                "snapstore: pruned {} snapshot(s), kept {} in {}",
                deleted.len(),
                keep,
                self.dir.display()
            );
            record_snapshots_pruned(deleted.len() as u64);
        }
        Ok(deleted)
    }

    /// Metadata, digest and per-table counts of one artifact.
    pub fn inspect(&self, name: &str) -> Result<SnapshotSummary> {
        let bytes = self.read_bytes(name)?;
        let snap = Snapshot::decode(&bytes).with_context(|| format!("decode snapshot '{}'", name))?;
        Ok(SnapshotSummary {
            name: name.to_string(),
            size: bytes.len() as u64,
            sha256: sha256_hex(&bytes),
            version: snap.version,
            created_at: snap.created_at,
            incomplete: snap.incomplete.clone(),
            counts: snap.counts(),
        })
    }

    /// Fresh artifact name: backup-YYYYMMDD-HHMMSS-mmm, suffixed -NN on collision.
    pub fn generate_name(&self) -> Result<String> {
        let base = format!(
            "{}-{}",
            NAME_PREFIX,
            Utc::now().format("%Y%m%d-%H%M%S-%3f")
        );
        for suffix in 0..100 {
            let candidate = if suffix == 0 {
                base.clone()
            } else {
                format!("{base}-{suffix:02}")
            };
            if self.locate(&candidate).is_none() {
                return Ok(candidate);
            }
        }
        Err(anyhow!("unable to allocate a snapshot name in {}", self.dir.display()))
    }

    // ----------------- internals -----------------

    fn read_bytes(&self, name: &str) -> Result<Vec<u8>> {
        validate_name(name)?;
        let _lk = DirLock::shared(&self.dir)?;
        let path = self
            .locate(name)
            .ok_or_else(|| VaultError::not_found(format!("snapshot '{}'", name)))?;
        let mut f = OpenOptions::new()
            .read(true)
            .open(&path)
            .with_context(|| format!("open {}", path.display()))?;
        let mut buf = Vec::new();
        f.read_to_end(&mut buf)
            .with_context(|| format!("read {}", path.display()))?;
        Ok(buf)
    }

    fn list_unlocked(&self) -> Result<Vec<SnapshotInfo>> {
        let mut out = Vec::new();
        for e in fs::read_dir(&self.dir).with_context(|| format!("read_dir {}", self.dir.display()))? {
            let e = e?;
            let meta = match e.metadata() {
                Ok(m) if m.is_file() => m,
                _ => continue,
            };
            let file_name = e.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            let Some((name, compressed)) = artifact_name(file_name) else {
                continue;
            };
            let created_at = match meta.modified() {
                Ok(t) => DateTime::<Utc>::from(t),
                Err(err) => {
                    warn!("snapstore: no mtime for {}: {}", file_name, err);
                    DateTime::<Utc>::from(std::time::UNIX_EPOCH)
                }
            };
            out.push(SnapshotInfo {
                alias: name == LATEST,
                name: name.to_string(),
                size: meta.len(),
                created_at,
                compressed,
            });
        }
        out.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.name.cmp(&a.name))
        });
        Ok(out)
    }

    fn artifact_path(&self, name: &str, gzip: bool) -> PathBuf {
        let ext = if gzip { EXT_GZIP } else { EXT_PLAIN };
        self.dir.join(format!("{name}{ext}"))
    }

    /// Existing file for a name, whichever encoding it was written in.
    fn locate(&self, name: &str) -> Option<PathBuf> {
        [self.artifact_path(name, false), self.artifact_path(name, true)]
            .into_iter()
            .find(|p| p.is_file())
    }
}

// ----------------- helpers -----------------

/// Split a directory entry into (artifact name, compressed).
fn artifact_name(file_name: &str) -> Option<(&str, bool)> {
    if let Some(n) = file_name.strip_suffix(EXT_GZIP) {
        return valid(n).then_some((n, true));
    }
    if let Some(n) = file_name.strip_suffix(EXT_PLAIN) {
        return valid(n).then_some((n, false));
    }
    None
}

fn valid(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
}

/// Artifact names: 1..=128 chars of [A-Za-z0-9._-], no leading dot.
pub fn validate_name(name: &str) -> Result<()> {
    if valid(name) {
        Ok(())
    } else {
        Err(anyhow!("invalid snapshot name '{}'", name))
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest.iter() {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_validated() {
        for ok in ["latest", "backup-20261016-093000-123", "pre_migration.v2"] {
            assert!(validate_name(ok).is_ok(), "{ok}");
        }
        for bad in ["", ".hidden", "../etc", "a/b", "with space"] {
            assert!(validate_name(bad).is_err(), "{bad}");
        }
        assert!(validate_name(&"x".repeat(129)).is_err());
    }

    #[test]
    fn artifact_names_are_recognised_by_extension() {
        assert_eq!(artifact_name("latest.json"), Some(("latest", false)));
        assert_eq!(artifact_name("b-1.json.gz"), Some(("b-1", true)));
        assert_eq!(artifact_name("b-1.tmp"), None);
        assert_eq!(artifact_name("snapstore.lock"), None);
        assert_eq!(artifact_name(".json"), None);
    }

    #[test]
    fn sha256_of_empty_input() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
