// Ambient
pub mod config;
pub mod error;
pub mod lock;
pub mod metrics;

// Live store and its table registry
pub mod schema;
pub mod store;

// Snapshot store: exporter + restorer
pub mod snapstore;

// Referential integrity: auditor + repairer
pub mod integrity;

// Operation facade (CLI entry points)
pub mod ops;

// Re-exports
pub use config::{VaultBuilder, VaultConfig};
pub use error::{FailureKind, VaultError};
pub use integrity::{
    audit, is_consistent, repair, sweep_placeholders, Defect, RepairPolicy, RepairReport,
};
pub use ops::{Vault, VaultStatus};
pub use schema::{RefField, Table};
pub use snapstore::{export, restore_sales, ExportReport, RestoreReport, Snapshot, SnapshotStore};
pub use store::{LiveStore, Row, SqliteStore, StoreOptions};
