//! store/sqlite — `LiveStore` over a rusqlite connection.
//!
//! The connection is opened per operation and closed on drop. Statement text is built
//! from the static table registry; column names coming from rows are quoted as
//! identifiers, values are always bound as parameters.
//!
//! Constraint failures (UNIQUE, FOREIGN KEY, NOT NULL) surface as
//! `VaultError::ConstraintViolation` so per-row accounting can tell them apart from
//! I/O trouble.

use anyhow::{anyhow, Context, Result};
use log::debug;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, ErrorCode, OpenFlags, Statement};
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use super::value::{json_to_sql, sql_to_json};
use super::{LiveStore, Row};
use crate::error::VaultError;
use crate::schema::{Table, DDL, ID_COLUMN};

/// Connection tunables (see `VaultConfig::store_options`).
#[derive(Debug, Clone, Copy)]
pub struct StoreOptions {
    /// PRAGMA foreign_keys. Off on a stock SQLite database.
    pub foreign_keys: bool,
    /// How long a statement waits on a locked database.
    pub busy_timeout_ms: u64,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            foreign_keys: false,
            busy_timeout_ms: 5000,
        }
    }
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open an existing database file.
    pub fn open(path: &Path, opts: StoreOptions) -> Result<Self> {
        if !path.exists() {
            return Err(VaultError::not_found(format!("database {}", path.display())).into());
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("open database {}", path.display()))?;
        Self::configure(conn, Some(path), opts)
    }

    /// Open or create a database file.
    pub fn create(path: &Path, opts: StoreOptions) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create {}", parent.display()))?;
            }
        }
        let conn = Connection::open(path)
            .with_context(|| format!("create database {}", path.display()))?;
        Self::configure(conn, Some(path), opts)
    }

    /// Private in-memory database (tests, dry runs).
    pub fn open_in_memory(opts: StoreOptions) -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        Self::configure(conn, None, opts)
    }

    fn configure(conn: Connection, path: Option<&Path>, opts: StoreOptions) -> Result<Self> {
        conn.busy_timeout(Duration::from_millis(opts.busy_timeout_ms))
            .context("set busy_timeout")?;
        conn.pragma_update(None, "foreign_keys", opts.foreign_keys)
            .context("set foreign_keys")?;
        debug!(
            "store: opened {} (foreign_keys={}, busy_timeout_ms={})",
            path.map(|p| p.display().to_string())
                .unwrap_or_else(|| ":memory:".to_string()),
            opts.foreign_keys,
            opts.busy_timeout_ms
        );
        Ok(Self { conn })
    }

    /// Create all entity tables if they do not exist yet.
    pub fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(DDL)
            .context("create entity tables")?;
        Ok(())
    }

    /// Row count of a table.
    pub fn count(&self, table: Table) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table.name()));
        let n: i64 = self
            .conn
            .query_row(&sql, [], |r| r.get(0))
            .map_err(|e| classify(e, format!("count {}", table)))?;
        Ok(n.max(0) as u64)
    }

    fn query_rows(&self, sql: &str, params: &[SqlValue], what: &str) -> Result<Vec<Row>> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| classify(e, format!("prepare {what}")))?;
        collect_rows(&mut stmt, params).map_err(|e| classify(e, what.to_string()))
    }
}

impl LiveStore for SqliteStore {
    fn read_all(&self, table: Table) -> Result<Vec<Row>> {
        let sql = format!(
            "SELECT * FROM {} ORDER BY {}",
            quote_ident(table.name()),
            table.order_by()
        );
        self.query_rows(&sql, &[], &format!("read {}", table))
    }

    fn read_by_id(&self, table: Table, id: i64) -> Result<Option<Row>> {
        require_id(table)?;
        let sql = format!(
            "SELECT * FROM {} WHERE {} = ?1",
            quote_ident(table.name()),
            quote_ident(ID_COLUMN)
        );
        let mut rows =
            self.query_rows(&sql, &[SqlValue::Integer(id)], &format!("read {}#{}", table, id))?;
        Ok(rows.pop())
    }

    fn find_by(&self, table: Table, column: &str, value: &Value) -> Result<Option<Row>> {
        let sql = format!(
            "SELECT * FROM {} WHERE {} = ?1 ORDER BY {} LIMIT 1",
            quote_ident(table.name()),
            quote_ident(column),
            table.order_by()
        );
        let mut rows = self.query_rows(
            &sql,
            &[json_to_sql(value)],
            &format!("find {} by {}", table, column),
        )?;
        Ok(rows.pop())
    }

    fn insert(&mut self, table: Table, row: &Row) -> Result<i64> {
        let (cols, vals) = split_row(row);
        let sql = if cols.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", quote_ident(table.name()))
        } else {
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote_ident(table.name()),
                column_list(&cols),
                placeholders(cols.len(), 1)
            )
        };
        self.conn
            .execute(&sql, params_from_iter(vals.iter()))
            .map_err(|e| classify(e, format!("insert into {}", table)))?;
        Ok(self.conn.last_insert_rowid())
    }

    fn upsert(&mut self, table: Table, row: &Row) -> Result<()> {
        let (cols, vals) = split_row(row);
        if cols.is_empty() {
            return Err(anyhow!("upsert into {}: empty row", table));
        }
        let keys = conflict_columns(table);
        let updates: Vec<String> = cols
            .iter()
            .filter(|c| !keys.contains(&c.as_str()))
            .map(|c| format!("{0} = excluded.{0}", quote_ident(c)))
            .collect();
        let on_conflict = if updates.is_empty() {
            "DO NOTHING".to_string()
        } else {
            format!("DO UPDATE SET {}", updates.join(", "))
        };
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT({}) {}",
            quote_ident(table.name()),
            column_list(&cols),
            placeholders(cols.len(), 1),
            keys.join(", "),
            on_conflict
        );
        self.conn
            .execute(&sql, params_from_iter(vals.iter()))
            .map_err(|e| classify(e, format!("upsert into {}", table)))?;
        Ok(())
    }

    fn update(&mut self, table: Table, id: i64, changes: &Row) -> Result<()> {
        require_id(table)?;
        let (cols, mut vals) = split_row(changes);
        if cols.is_empty() {
            return Ok(());
        }
        let sets: Vec<String> = cols
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{} = ?{}", quote_ident(c), i + 1))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?{}",
            quote_ident(table.name()),
            sets.join(", "),
            quote_ident(ID_COLUMN),
            cols.len() + 1
        );
        vals.push(SqlValue::Integer(id));
        let n = self
            .conn
            .execute(&sql, params_from_iter(vals.iter()))
            .map_err(|e| classify(e, format!("update {}#{}", table, id)))?;
        if n == 0 {
            return Err(VaultError::not_found(format!("{}#{}", table, id)).into());
        }
        Ok(())
    }

    fn delete(&mut self, table: Table, id: i64) -> Result<bool> {
        require_id(table)?;
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?1",
            quote_ident(table.name()),
            quote_ident(ID_COLUMN)
        );
        let n = self
            .conn
            .execute(&sql, [id])
            .map_err(|e| classify(e, format!("delete {}#{}", table, id)))?;
        Ok(n > 0)
    }

    fn ids(&self, table: Table) -> Result<BTreeSet<i64>> {
        require_id(table)?;
        let sql = format!(
            "SELECT {} FROM {} WHERE {} IS NOT NULL",
            quote_ident(ID_COLUMN),
            quote_ident(table.name()),
            quote_ident(ID_COLUMN)
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| classify(e, format!("prepare ids of {}", table)))?;
        let ids = stmt
            .query_map([], |r| r.get::<_, i64>(0))
            .and_then(|it| it.collect::<rusqlite::Result<BTreeSet<i64>>>())
            .map_err(|e| classify(e, format!("ids of {}", table)))?;
        Ok(ids)
    }
}

// ----------------- helpers -----------------

fn collect_rows(stmt: &mut Statement<'_>, params: &[SqlValue]) -> rusqlite::Result<Vec<Row>> {
    let names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
    let mut rows = stmt.query(params_from_iter(params.iter()))?;
    let mut out = Vec::new();
    while let Some(r) = rows.next()? {
        let mut row = Row::new();
        for (i, name) in names.iter().enumerate() {
            let v: SqlValue = r.get(i)?;
            row.insert(name.clone(), sql_to_json(v));
        }
        out.push(row);
    }
    Ok(out)
}

fn split_row(row: &Row) -> (Vec<String>, Vec<SqlValue>) {
    let mut cols = Vec::with_capacity(row.len());
    let mut vals = Vec::with_capacity(row.len());
    for (k, v) in row {
        cols.push(k.clone());
        vals.push(json_to_sql(v));
    }
    (cols, vals)
}

fn conflict_columns(table: Table) -> Vec<&'static str> {
    match table {
        Table::PackArticles => vec!["pack_id", "article_id"],
        _ => vec![ID_COLUMN],
    }
}

fn column_list(cols: &[String]) -> String {
    cols.iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ")
}

fn placeholders(n: usize, start: usize) -> String {
    (start..start + n)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn require_id(table: Table) -> Result<()> {
    if table.has_id() {
        Ok(())
    } else {
        Err(anyhow!("table {} is not addressed by id", table))
    }
}

/// Constraint errors become `VaultError::ConstraintViolation`; the rest keep their chain.
fn classify(err: rusqlite::Error, what: String) -> anyhow::Error {
    if err.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) {
        VaultError::ConstraintViolation(format!("{what}: {err}")).into()
    } else {
        anyhow::Error::new(err).context(what)
    }
}
