//! schema — static registry of the seven entity tables and the Sale foreign keys.
//!
//! Table names, export order and key shape are known at compile time; nothing here
//! parses schema text. `DDL` is what `salesvault init` (and the tests) create.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Entity tables, in snapshot export order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Sales,
    Clients,
    Representatives,
    Packs,
    Articles,
    Gifts,
    PackArticles,
}

impl Table {
    pub const ALL: [Table; 7] = [
        Table::Sales,
        Table::Clients,
        Table::Representatives,
        Table::Packs,
        Table::Articles,
        Table::Gifts,
        Table::PackArticles,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Table::Sales => "sales",
            Table::Clients => "clients",
            Table::Representatives => "representatives",
            Table::Packs => "packs",
            Table::Articles => "articles",
            Table::Gifts => "gifts",
            Table::PackArticles => "pack_articles",
        }
    }

    pub fn from_name(name: &str) -> Option<Table> {
        Table::ALL.iter().copied().find(|t| t.name() == name)
    }

    /// Whether rows are addressed by an integer `id` column.
    /// The pack/article join table is keyed by its (pack_id, article_id) pair instead.
    pub fn has_id(&self) -> bool {
        !matches!(self, Table::PackArticles)
    }

    /// Stable ordering used when reading a whole table.
    pub fn order_by(&self) -> &'static str {
        match self {
            Table::PackArticles => "pack_id, article_id",
            _ => "id",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Primary key column for tables with `has_id()`.
pub const ID_COLUMN: &str = "id";

/// External identifier column of `clients` (placeholders are looked up by it).
pub const CLIENT_EXTERNAL_ID: &str = "client_id";

/// The three foreign keys carried by every Sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefField {
    Client,
    Representative,
    Pack,
}

impl RefField {
    pub const ALL: [RefField; 3] = [RefField::Client, RefField::Representative, RefField::Pack];

    /// Column on `sales` holding the reference.
    pub fn column(&self) -> &'static str {
        match self {
            RefField::Client => "client_id",
            RefField::Representative => "representative_id",
            RefField::Pack => "pack_id",
        }
    }

    /// Table the reference must resolve into.
    pub fn target(&self) -> Table {
        match self {
            RefField::Client => Table::Clients,
            RefField::Representative => Table::Representatives,
            RefField::Pack => Table::Packs,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RefField::Client => "client",
            RefField::Representative => "representative",
            RefField::Pack => "pack",
        }
    }
}

impl fmt::Display for RefField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Schema of the live store. Foreign keys are declared so that enabling
/// `PRAGMA foreign_keys` turns dangling writes into constraint violations.
pub const DDL: &str = "
CREATE TABLE IF NOT EXISTS representatives (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    code          TEXT UNIQUE,
    full_name     TEXT,
    username      TEXT UNIQUE,
    password_hash TEXT,
    wilaya        TEXT
);
CREATE TABLE IF NOT EXISTS clients (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    client_id  TEXT UNIQUE,
    full_name  TEXT,
    wilaya     TEXT,
    city       TEXT,
    phone      TEXT,
    latitude   REAL,
    longitude  REAL
);
CREATE TABLE IF NOT EXISTS gifts (
    id   INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT
);
CREATE TABLE IF NOT EXISTS articles (
    id    INTEGER PRIMARY KEY AUTOINCREMENT,
    name  TEXT,
    price REAL
);
CREATE TABLE IF NOT EXISTS packs (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT,
    total_price REAL,
    gift_id     INTEGER REFERENCES gifts(id)
);
CREATE TABLE IF NOT EXISTS pack_articles (
    pack_id    INTEGER NOT NULL REFERENCES packs(id),
    article_id INTEGER NOT NULL REFERENCES articles(id),
    quantity   INTEGER NOT NULL DEFAULT 1,
    PRIMARY KEY (pack_id, article_id)
);
CREATE TABLE IF NOT EXISTS sales (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    client_id         INTEGER REFERENCES clients(id),
    representative_id INTEGER REFERENCES representatives(id),
    pack_id           INTEGER REFERENCES packs(id),
    total_price       REAL,
    sale_date         TEXT
);
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names_round_trip_and_order_is_fixed() {
        let names: Vec<&str> = Table::ALL.iter().map(|t| t.name()).collect();
        assert_eq!(
            names,
            [
                "sales",
                "clients",
                "representatives",
                "packs",
                "articles",
                "gifts",
                "pack_articles"
            ]
        );
        for t in Table::ALL {
            assert_eq!(Table::from_name(t.name()), Some(t));
        }
        assert_eq!(Table::from_name("users"), None);
    }

    #[test]
    fn ref_fields_point_at_reference_tables() {
        assert_eq!(RefField::Client.target(), Table::Clients);
        assert_eq!(RefField::Representative.column(), "representative_id");
        assert!(RefField::ALL.iter().all(|f| f.target().has_id()));
    }
}
