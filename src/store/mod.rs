//! store — the live relational store as seen by the maintenance operations.
//!
//! `LiveStore` is the seam: exporter, restorer, auditor and repairer only talk to it.
//! `SqliteStore` is the production backend; tests wrap it to inject row failures.
//!
//! Rows are JSON objects keyed by column name, so field names survive a snapshot
//! round trip unchanged.

use anyhow::Result;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

use crate::schema::{Table, ID_COLUMN};

pub mod sqlite;
pub mod value;

pub use sqlite::{SqliteStore, StoreOptions};

/// One table row: column name -> value.
pub type Row = Map<String, Value>;

pub trait LiveStore {
    /// All rows of a table in stable key order.
    fn read_all(&self, table: Table) -> Result<Vec<Row>>;

    /// Row with the given integer id, if present.
    fn read_by_id(&self, table: Table, id: i64) -> Result<Option<Row>>;

    /// First row (in key order) whose `column` equals `value`.
    fn find_by(&self, table: Table, column: &str, value: &Value) -> Result<Option<Row>>;

    /// Insert a row and return its id (rowid for tables without an id column).
    fn insert(&mut self, table: Table, row: &Row) -> Result<i64>;

    /// Insert, or overwrite the existing row with the same key (replace-on-conflict).
    fn upsert(&mut self, table: Table, row: &Row) -> Result<()>;

    /// Apply `changes` to the row with the given id. Missing row -> `VaultError::NotFound`.
    fn update(&mut self, table: Table, id: i64, changes: &Row) -> Result<()>;

    /// Delete by id; returns whether a row existed.
    fn delete(&mut self, table: Table, id: i64) -> Result<bool>;

    /// Set of ids present in a table.
    fn ids(&self, table: Table) -> Result<BTreeSet<i64>> {
        Ok(self.read_all(table)?.iter().filter_map(row_id).collect())
    }
}

/// Integer id of a row, when it has one.
pub fn row_id(row: &Row) -> Option<i64> {
    row.get(ID_COLUMN).and_then(Value::as_i64)
}

/// Build a single-column change set.
pub fn change(column: &str, value: Value) -> Row {
    let mut m = Row::new();
    m.insert(column.to_string(), value);
    m
}
