//! integrity — dangling foreign keys on `sales`: detection and repair.
//!
//! - audit.rs:  read-only scan producing one Defect per broken reference.
//! - repair.rs: per-defect strategies (placeholder client, fallback pack, optional
//!              fallback representative); never deletes a sale.
//! - sweep.rs:  removes placeholder clients nothing references any more.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::schema::RefField;

mod audit;
mod repair;
mod sweep;

pub use audit::{audit, defect_count, is_consistent};
pub use repair::{plan, repair, PlannedFix, RepairPolicy, RepairReport, Strategy, Unresolved};
pub use sweep::{sweep_placeholders, SweepReport};

/// One broken reference of one sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Defect {
    pub sale_id: i64,
    pub broken_field: RefField,
    pub broken_value: Value,
}

impl fmt::Display for Defect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sale {} -> {} {}",
            self.sale_id, self.broken_field, self.broken_value
        )
    }
}
