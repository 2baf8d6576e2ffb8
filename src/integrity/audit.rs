//! integrity/audit — find sales whose client, representative or pack reference
//! does not resolve.
//!
//! A reference resolves when it holds an integer that is an id of the target table.
//! NULL and non-integer values never resolve. A sale can yield up to three defects;
//! output is ordered by sale (store order) then field (client, representative, pack).
//! Sales without an integer id cannot be addressed and are skipped with a warning.

use anyhow::{Context, Result};
use log::{info, warn};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use super::Defect;
use crate::metrics::record_defects_found;
use crate::schema::{RefField, Table};
use crate::store::{row_id, LiveStore};

pub fn audit<S: LiveStore + ?Sized>(store: &S) -> Result<Vec<Defect>> {
    let mut known: BTreeMap<RefField, BTreeSet<i64>> = BTreeMap::new();
    for field in RefField::ALL {
        let ids = store
            .ids(field.target())
            .with_context(|| format!("read ids of {}", field.target()))?;
        known.insert(field, ids);
    }

    let sales = store.read_all(Table::Sales).context("read sales")?;
    let mut defects = Vec::new();
    for sale in &sales {
        let Some(sale_id) = row_id(sale) else {
            warn!("audit: sale row without integer id skipped: {:?}", sale);
            continue;
        };
        for field in RefField::ALL {
            let value = sale.get(field.column()).cloned().unwrap_or(Value::Null);
            if !resolves(&value, &known[&field]) {
                defects.push(Defect {
                    sale_id,
                    broken_field: field,
                    broken_value: value,
                });
            }
        }
    }

    record_defects_found(defects.len() as u64);
    info!(
        "audit: scanned {} sale(s), found {} broken reference(s)",
        sales.len(),
        defects.len()
    );
    Ok(defects)
}

/// Number of broken references currently in the store.
pub fn defect_count<S: LiveStore + ?Sized>(store: &S) -> Result<usize> {
    Ok(audit(store)?.len())
}

/// True when every sale reference resolves.
pub fn is_consistent<S: LiveStore + ?Sized>(store: &S) -> Result<bool> {
    Ok(defect_count(store)? == 0)
}

pub(super) fn resolves(value: &Value, ids: &BTreeSet<i64>) -> bool {
    value.as_i64().map(|id| ids.contains(&id)).unwrap_or(false)
}
