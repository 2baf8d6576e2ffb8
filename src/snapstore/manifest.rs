//! snapstore/manifest — persisted snapshot artifact format.
//!
//! One artifact is a self-describing JSON document:
//!
//! ```text
//! {
//!   "version": 1,
//!   "created_at": "2026-10-16T09:30:00.123Z",
//!   "incomplete": ["gifts"],            // tables whose read failed (exported empty)
//!   "tables": {
//!     "sales":   [ {"id": 7, "client_id": 999, ...}, ... ],
//!     "clients": [ ... ],
//!     ...                               // all seven tables, always present
//!   }
//! }
//! ```
//!
//! Stored as pretty JSON, or gzip-compressed JSON when compression is on. `decode`
//! sniffs the gzip magic, so readers never need to know which one was written.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{Read, Write};

use crate::schema::Table;
use crate::store::Row;

pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub incomplete: Vec<String>,
    pub tables: BTreeMap<String, Vec<Row>>,
}

impl Snapshot {
    /// Empty snapshot stamped now.
    pub fn new() -> Self {
        Self {
            version: SNAPSHOT_FORMAT_VERSION,
            created_at: Utc::now(),
            incomplete: Vec::new(),
            tables: BTreeMap::new(),
        }
    }

    pub fn set_table(&mut self, table: Table, rows: Vec<Row>) {
        self.tables.insert(table.name().to_string(), rows);
    }

    /// Record a table whose read failed: kept in the document as an empty sequence.
    pub fn mark_incomplete(&mut self, table: Table) {
        self.tables.insert(table.name().to_string(), Vec::new());
        if !self.incomplete.iter().any(|t| t == table.name()) {
            self.incomplete.push(table.name().to_string());
        }
    }

    pub fn table(&self, table: Table) -> Option<&[Row]> {
        self.tables.get(table.name()).map(Vec::as_slice)
    }

    /// Row count per table name.
    pub fn counts(&self) -> BTreeMap<String, usize> {
        self.tables
            .iter()
            .map(|(k, v)| (k.clone(), v.len()))
            .collect()
    }

    pub fn total_rows(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }

    pub fn encode(&self, gzip: bool) -> Result<Vec<u8>> {
        let json = serde_json::to_vec_pretty(self).context("serialize snapshot")?;
        if !gzip {
            return Ok(json);
        }
        let mut enc = GzEncoder::new(Vec::with_capacity(json.len() / 4), Compression::default());
        enc.write_all(&json).context("gzip snapshot")?;
        enc.finish().context("finish gzip snapshot")
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let snap: Snapshot = if bytes.starts_with(&GZIP_MAGIC) {
            let mut json = Vec::new();
            GzDecoder::new(bytes)
                .read_to_end(&mut json)
                .context("gunzip snapshot")?;
            serde_json::from_slice(&json).context("parse snapshot json")?
        } else {
            serde_json::from_slice(bytes).context("parse snapshot json")?
        };
        if snap.version != SNAPSHOT_FORMAT_VERSION {
            return Err(anyhow!(
                "unsupported snapshot version {} (expected {})",
                snap.version,
                SNAPSHOT_FORMAT_VERSION
            ));
        }
        Ok(snap)
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::new()
    }
}
