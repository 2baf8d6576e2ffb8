//! Centralized configuration and builder for salesvault.
//!
//! Goals:
//! - One place for tunables instead of scattered env lookups.
//! - `VaultConfig::from_env()` reads the SV_* variables; CLI flags override on top.
//! - `VaultBuilder` starts from env (or from clean defaults) and returns a VaultConfig.
//!
//! Variables:
//! - SV_DB_PATH            — live database file.
//! - SV_SNAPSHOT_DIR       — snapshot directory; absolute, or relative to the database's
//!                           directory. Default: <db dir>/backups.
//! - SV_SNAPSHOT_KEEP      — prune to this many snapshots after each `snapshot` (default: off).
//! - SV_SNAPSHOT_GZIP      — write artifacts gzip-compressed (default false).
//! - SV_FOREIGN_KEYS       — PRAGMA foreign_keys on the live store (default false).
//! - SV_BUSY_TIMEOUT_MS    — SQLite busy timeout (default 5000).
//! - SV_PLACEHOLDER_PREFIX — external-id prefix of synthesized clients (default PLACEHOLDER_).
//! - SV_FALLBACK_REP       — representative id used to relink broken representative refs.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::integrity::RepairPolicy;
use crate::store::StoreOptions;

pub const DEFAULT_SNAPSHOT_SUBDIR: &str = "backups";
pub const DEFAULT_PLACEHOLDER_PREFIX: &str = "PLACEHOLDER_";

#[derive(Clone, Debug)]
pub struct VaultConfig {
    /// Live database file.
    /// Env: SV_DB_PATH
    pub db_path: Option<PathBuf>,

    /// Snapshot directory override (see `snapshot_dir()` for resolution).
    /// Env: SV_SNAPSHOT_DIR
    pub snapshot_dir: Option<String>,

    /// Auto-prune after a snapshot, keeping this many artifacts.
    /// Env: SV_SNAPSHOT_KEEP
    pub snapshot_keep: Option<usize>,

    /// Gzip artifacts on write.
    /// Env: SV_SNAPSHOT_GZIP = 0|1|true|false
    pub snapshot_gzip: bool,

    /// Enforce SQLite foreign keys on the live store.
    /// Env: SV_FOREIGN_KEYS = 0|1|true|false
    pub foreign_keys: bool,

    /// Env: SV_BUSY_TIMEOUT_MS (default 5000)
    pub busy_timeout_ms: u64,

    /// Env: SV_PLACEHOLDER_PREFIX (default "PLACEHOLDER_")
    pub placeholder_prefix: String,

    /// Env: SV_FALLBACK_REP
    pub fallback_representative: Option<i64>,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            snapshot_dir: None,
            snapshot_keep: None,
            snapshot_gzip: false,
            foreign_keys: false,
            busy_timeout_ms: 5000,
            placeholder_prefix: DEFAULT_PLACEHOLDER_PREFIX.to_string(),
            fallback_representative: None,
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name).ok().map(|v| parse_flag(&v))
}

fn env_str(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub(crate) fn parse_flag(v: &str) -> bool {
    let s = v.trim().to_ascii_lowercase();
    s == "1" || s == "true" || s == "yes" || s == "on"
}

impl VaultConfig {
    /// Load configuration from SV_* environment variables.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Some(v) = env_str("SV_DB_PATH") {
            cfg.db_path = Some(PathBuf::from(v));
        }
        cfg.snapshot_dir = env_str("SV_SNAPSHOT_DIR");
        if let Some(n) = env_str("SV_SNAPSHOT_KEEP").and_then(|v| v.parse::<usize>().ok()) {
            cfg.snapshot_keep = Some(n);
        }
        if let Some(on) = env_flag("SV_SNAPSHOT_GZIP") {
            cfg.snapshot_gzip = on;
        }
        if let Some(on) = env_flag("SV_FOREIGN_KEYS") {
            cfg.foreign_keys = on;
        }
        if let Some(n) = env_str("SV_BUSY_TIMEOUT_MS").and_then(|v| v.parse::<u64>().ok()) {
            cfg.busy_timeout_ms = n;
        }
        if let Some(p) = env_str("SV_PLACEHOLDER_PREFIX") {
            cfg.placeholder_prefix = p;
        }
        if let Some(id) = env_str("SV_FALLBACK_REP").and_then(|v| v.parse::<i64>().ok()) {
            cfg.fallback_representative = Some(id);
        }

        cfg
    }

    // ----- fluent overrides -----

    pub fn with_db_path<P: Into<PathBuf>>(mut self, path: Option<P>) -> Self {
        if let Some(p) = path {
            self.db_path = Some(p.into());
        }
        self
    }

    pub fn with_snapshot_dir<S: Into<String>>(mut self, dir: Option<S>) -> Self {
        if let Some(d) = dir {
            self.snapshot_dir = Some(d.into());
        }
        self
    }

    pub fn with_snapshot_keep(mut self, keep: Option<usize>) -> Self {
        if keep.is_some() {
            self.snapshot_keep = keep;
        }
        self
    }

    pub fn with_snapshot_gzip(mut self, on: bool) -> Self {
        self.snapshot_gzip = on;
        self
    }

    pub fn with_foreign_keys(mut self, on: bool) -> Self {
        self.foreign_keys = on;
        self
    }

    pub fn with_fallback_representative(mut self, id: Option<i64>) -> Self {
        if id.is_some() {
            self.fallback_representative = id;
        }
        self
    }

    /// Resolve the snapshot directory.
    ///
    /// Rules:
    /// - unset    → <db dir>/backups
    /// - absolute → as is
    /// - relative → <db dir>/<value>
    pub fn snapshot_dir(&self) -> PathBuf {
        let base = self
            .db_path
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_default();
        match self.snapshot_dir.as_deref() {
            None => base.join(DEFAULT_SNAPSHOT_SUBDIR),
            Some(s) => {
                let p = Path::new(s);
                if p.is_absolute() {
                    p.to_path_buf()
                } else {
                    base.join(p)
                }
            }
        }
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            foreign_keys: self.foreign_keys,
            busy_timeout_ms: self.busy_timeout_ms,
        }
    }

    pub fn repair_policy(&self) -> RepairPolicy {
        RepairPolicy {
            placeholder_prefix: self.placeholder_prefix.clone(),
            fallback_representative: self.fallback_representative,
        }
    }
}

impl fmt::Display for VaultConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "VaultConfig {{ \
             db_path: {}, \
             snapshot_dir: {}, \
             snapshot_keep: {}, \
             snapshot_gzip: {}, \
             foreign_keys: {}, \
             busy_timeout_ms: {}, \
             placeholder_prefix: {}, \
             fallback_representative: {} \
             }}",
            self.db_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(unset)".to_string()),
            self.snapshot_dir().display(),
            self.snapshot_keep
                .map(|v| v.to_string())
                .unwrap_or_else(|| "off".to_string()),
            self.snapshot_gzip,
            self.foreign_keys,
            self.busy_timeout_ms,
            self.placeholder_prefix,
            self.fallback_representative
                .map(|v| v.to_string())
                .unwrap_or_else(|| "none".to_string()),
        )
    }
}

/// Builder producing a VaultConfig. Starts from env, like `VaultConfig::from_env()`.
#[derive(Clone, Debug)]
pub struct VaultBuilder {
    cfg: VaultConfig,
}

impl Default for VaultBuilder {
    fn default() -> Self {
        Self {
            cfg: VaultConfig::from_env(),
        }
    }
}

impl VaultBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a clean default (without reading env).
    pub fn from_default() -> Self {
        Self {
            cfg: VaultConfig::default(),
        }
    }

    pub fn db_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.cfg.db_path = Some(path.into());
        self
    }

    pub fn snapshot_dir<S: Into<String>>(mut self, dir: S) -> Self {
        self.cfg.snapshot_dir = Some(dir.into());
        self
    }

    pub fn snapshot_keep(mut self, keep: Option<usize>) -> Self {
        self.cfg.snapshot_keep = keep;
        self
    }

    pub fn snapshot_gzip(mut self, on: bool) -> Self {
        self.cfg.snapshot_gzip = on;
        self
    }

    pub fn foreign_keys(mut self, on: bool) -> Self {
        self.cfg.foreign_keys = on;
        self
    }

    pub fn busy_timeout_ms(mut self, ms: u64) -> Self {
        self.cfg.busy_timeout_ms = ms;
        self
    }

    pub fn placeholder_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.cfg.placeholder_prefix = prefix.into();
        self
    }

    pub fn fallback_representative(mut self, id: Option<i64>) -> Self {
        self.cfg.fallback_representative = id;
        self
    }

    pub fn build(self) -> VaultConfig {
        self.cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_accept_common_spellings() {
        for on in ["1", "true", "YES", " on "] {
            assert!(parse_flag(on), "{on}");
        }
        for off in ["0", "false", "no", "", "maybe"] {
            assert!(!parse_flag(off), "{off}");
        }
    }
}
