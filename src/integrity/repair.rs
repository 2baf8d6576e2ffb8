//! integrity/repair — resolve audit defects without ever deleting a sale.
//!
//! Strategy per broken field:
//! - client:         synthesize a placeholder client whose external id is
//!                   `<prefix><broken value>` (reused if it already exists) and relink.
//! - pack:           relink to the first pack by id. Packs are catalog data, so no
//!                   placeholder is synthesized.
//! - representative: relink to the configured fallback representative, if any;
//!                   otherwise the defect is reported as unresolvable.
//!
//! Each defect is handled on a fresh read of its sale, in input order, one write at a
//! time. If the sale's reference resolves by now it is left untouched
//! (`already_consistent`), which makes a second run over the same list a no-op. A broken
//! value that only resolves because this run's own placeholder took that id is still
//! repaired.
//! Per-defect failures are tallied in `unresolved` and never abort the run.

use anyhow::Result;
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};

use super::audit::audit;
use super::Defect;
use crate::config::DEFAULT_PLACEHOLDER_PREFIX;
use crate::error::{FailureKind, VaultError};
use crate::metrics::{record_placeholder, record_ref_reassigned, record_unresolved};
use crate::schema::{RefField, Table, CLIENT_EXTERNAL_ID};
use crate::store::value::scalar_text;
use crate::store::{change, row_id, LiveStore, Row};

#[derive(Debug, Clone)]
pub struct RepairPolicy {
    /// External-id prefix of synthesized clients.
    pub placeholder_prefix: String,
    /// Representative that broken representative references are relinked to.
    pub fallback_representative: Option<i64>,
}

impl Default for RepairPolicy {
    fn default() -> Self {
        Self {
            placeholder_prefix: DEFAULT_PLACEHOLDER_PREFIX.to_string(),
            fallback_representative: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Strategy {
    Placeholder,
    FirstPack,
    FixedRepresentative { id: i64 },
    Unmapped,
}

impl RepairPolicy {
    pub fn strategy(&self, field: RefField) -> Strategy {
        match field {
            RefField::Client => Strategy::Placeholder,
            RefField::Pack => Strategy::FirstPack,
            RefField::Representative => match self.fallback_representative {
                Some(id) => Strategy::FixedRepresentative { id },
                None => Strategy::Unmapped,
            },
        }
    }

    /// Deterministic external id for the placeholder standing in for `broken`.
    pub fn placeholder_external_id(&self, broken: &Value) -> Option<String> {
        scalar_text(broken).map(|v| format!("{}{}", self.placeholder_prefix, v))
    }

    pub fn is_placeholder(&self, external_id: &str) -> bool {
        external_id.starts_with(&self.placeholder_prefix)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Unresolved {
    pub defect: Defect,
    pub kind: FailureKind,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairReport {
    pub resolved: usize,
    pub placeholders_created: usize,
    pub placeholders_reused: usize,
    /// Defects whose sale already resolved when it was re-read.
    pub already_consistent: usize,
    pub unresolved: Vec<Unresolved>,
    /// Broken references left after the run (None if the closing audit failed).
    pub remaining: Option<usize>,
}

impl RepairReport {
    pub fn processed(&self) -> usize {
        self.resolved + self.already_consistent + self.unresolved.len()
    }

    /// Err(PartialFailure) when any defect stayed unresolved.
    pub fn ensure_complete(&self) -> Result<()> {
        if self.unresolved.is_empty() {
            return Ok(());
        }
        Err(VaultError::PartialFailure {
            operation: "repair",
            failed: self.unresolved.len(),
            total: self.processed(),
        }
        .into())
    }
}

enum Outcome {
    Fixed,
    AlreadyConsistent,
}

struct Repairer<'a, S: LiveStore + ?Sized> {
    store: &'a mut S,
    policy: &'a RepairPolicy,
    placeholders: HashMap<String, i64>,
    /// Client ids inserted by this run.
    created: BTreeSet<i64>,
    fallback_pack: Option<i64>,
    report: RepairReport,
}

impl<'a, S: LiveStore + ?Sized> Repairer<'a, S> {
    fn repair_one(&mut self, d: &Defect) -> Result<Outcome> {
        let field = d.broken_field;
        let sale = self
            .store
            .read_by_id(Table::Sales, d.sale_id)?
            .ok_or_else(|| VaultError::not_found(format!("sale {}", d.sale_id)))?;

        let current = sale.get(field.column()).cloned().unwrap_or(Value::Null);
        if let Some(id) = current.as_i64() {
            // a placeholder inserted earlier in this run may have taken the broken id
            let taken_by_us = field == RefField::Client
                && current == d.broken_value
                && self.created.contains(&id);
            if !taken_by_us && self.store.read_by_id(field.target(), id)?.is_some() {
                return Ok(Outcome::AlreadyConsistent);
            }
        }

        let target = match self.policy.strategy(field) {
            Strategy::Placeholder => self.placeholder_for(&current)?,
            Strategy::FirstPack => self.fallback_pack()?,
            Strategy::FixedRepresentative { id } => {
                if self.store.read_by_id(Table::Representatives, id)?.is_none() {
                    return Err(
                        VaultError::not_found(format!("fallback representative {}", id)).into(),
                    );
                }
                id
            }
            Strategy::Unmapped => {
                return Err(VaultError::UnresolvableDefect(format!(
                    "no repair strategy for a broken {} reference",
                    field
                ))
                .into())
            }
        };

        self.store
            .update(Table::Sales, d.sale_id, &change(field.column(), Value::from(target)))?;
        record_ref_reassigned();
        debug!(
            "repair: sale {} {} {} -> {}",
            d.sale_id,
            field,
            current,
            target
        );
        Ok(Outcome::Fixed)
    }

    /// Id of the placeholder client for `broken`, creating it on first use.
    fn placeholder_for(&mut self, broken: &Value) -> Result<i64> {
        let external = self.policy.placeholder_external_id(broken).ok_or_else(|| {
            VaultError::UnresolvableDefect(format!(
                "cannot derive a placeholder client from {}",
                broken
            ))
        })?;

        if let Some(&id) = self.placeholders.get(&external) {
            self.note_placeholder(false);
            return Ok(id);
        }

        let existing = self
            .store
            .find_by(Table::Clients, CLIENT_EXTERNAL_ID, &Value::from(external.clone()))?
            .as_ref()
            .and_then(row_id);
        let (id, created) = match existing {
            Some(id) => (id, false),
            None => {
                let label = scalar_text(broken).unwrap_or_default();
                let mut row = Row::new();
                row.insert(CLIENT_EXTERNAL_ID.to_string(), Value::from(external.clone()));
                row.insert(
                    "full_name".to_string(),
                    Value::from(format!("Client {} (Historical)", label)),
                );
                let id = self.store.insert(Table::Clients, &row)?;
                self.created.insert(id);
                info!("repair: created placeholder client {} (#{})", external, id);
                (id, true)
            }
        };
        self.placeholders.insert(external, id);
        self.note_placeholder(created);
        Ok(id)
    }

    fn note_placeholder(&mut self, created: bool) {
        if created {
            self.report.placeholders_created += 1;
        } else {
            self.report.placeholders_reused += 1;
        }
        record_placeholder(created);
    }

    fn fallback_pack(&mut self) -> Result<i64> {
        if let Some(id) = self.fallback_pack {
            return Ok(id);
        }
        let id = self
            .store
            .ids(Table::Packs)?
            .into_iter()
            .next()
            .ok_or_else(|| {
                VaultError::UnresolvableDefect("no pack available to reassign to".to_string())
            })?;
        self.fallback_pack = Some(id);
        Ok(id)
    }
}

/// Apply repair strategies to `defects`, then re-audit.
pub fn repair<S: LiveStore + ?Sized>(
    store: &mut S,
    defects: &[Defect],
    policy: &RepairPolicy,
) -> Result<RepairReport> {
    info!("repair: start, defects={}", defects.len());

    let mut r = Repairer {
        store: &mut *store,
        policy,
        placeholders: HashMap::new(),
        created: BTreeSet::new(),
        fallback_pack: None,
        report: RepairReport::default(),
    };
    for d in defects {
        match r.repair_one(d) {
            Ok(Outcome::Fixed) => r.report.resolved += 1,
            Ok(Outcome::AlreadyConsistent) => {
                debug!("repair: {} already consistent, left as is", d);
                r.report.already_consistent += 1;
            }
            Err(e) => {
                warn!("repair: {} unresolved: {:#}", d, e);
                record_unresolved();
                r.report.unresolved.push(Unresolved {
                    defect: d.clone(),
                    kind: FailureKind::of(&e),
                    reason: format!("{:#}", e),
                });
            }
        }
    }
    let mut report = r.report;

    report.remaining = match audit(&*store) {
        Ok(left) => Some(left.len()),
        Err(e) => {
            warn!("repair: closing audit failed: {:#}", e);
            None
        }
    };

    info!(
        "repair: done, resolved={}, placeholders created={} reused={}, already_consistent={}, unresolved={}, remaining={}",
        report.resolved,
        report.placeholders_created,
        report.placeholders_reused,
        report.already_consistent,
        report.unresolved.len(),
        report
            .remaining
            .map(|n| n.to_string())
            .unwrap_or_else(|| "?".to_string())
    );
    Ok(report)
}

/// Dry-run preview of what `repair` would do for each defect. Read-only.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedFix {
    pub defect: Defect,
    pub strategy: Strategy,
    pub action: String,
}

pub fn plan<S: LiveStore + ?Sized>(
    store: &S,
    defects: &[Defect],
    policy: &RepairPolicy,
) -> Result<Vec<PlannedFix>> {
    let first_pack = store.ids(Table::Packs)?.into_iter().next();
    let mut out = Vec::with_capacity(defects.len());
    for d in defects {
        let strategy = policy.strategy(d.broken_field);
        let action = match strategy {
            Strategy::Placeholder => match policy.placeholder_external_id(&d.broken_value) {
                Some(ext) => {
                    let existing = store
                        .find_by(Table::Clients, CLIENT_EXTERNAL_ID, &Value::from(ext.clone()))?
                        .as_ref()
                        .and_then(row_id);
                    match existing {
                        Some(id) => format!("relink to existing placeholder client {} (#{})", ext, id),
                        None => format!("create placeholder client {} and relink", ext),
                    }
                }
                None => format!("unresolvable: no placeholder from {}", d.broken_value),
            },
            Strategy::FirstPack => match first_pack {
                Some(id) => format!("relink to pack #{}", id),
                None => "unresolvable: no pack available".to_string(),
            },
            Strategy::FixedRepresentative { id } => {
                if store.read_by_id(Table::Representatives, id)?.is_some() {
                    format!("relink to representative #{}", id)
                } else {
                    format!("unresolvable: fallback representative #{} does not exist", id)
                }
            }
            Strategy::Unmapped => "unresolvable: no strategy for this field".to_string(),
        };
        out.push(PlannedFix {
            defect: d.clone(),
            strategy,
            action,
        });
    }
    Ok(out)
}
