//! Error taxonomy for maintenance operations.
//!
//! Library functions return `anyhow::Result`; where one of the kinds below applies the
//! error is raised as a `VaultError` so callers can `downcast_ref::<VaultError>()`.
//! Per-row failures inside bulk operations are never raised: they are tallied in the
//! operation report and only surface as `PartialFailure` through `ensure_complete()`.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Classification of a failure, used both for raised errors and for tallied row failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NotFound,
    PartialFailure,
    UnresolvableDefect,
    ConstraintViolation,
    /// Any other store or I/O error.
    Store,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::NotFound => "not_found",
            FailureKind::PartialFailure => "partial_failure",
            FailureKind::UnresolvableDefect => "unresolvable_defect",
            FailureKind::ConstraintViolation => "constraint_violation",
            FailureKind::Store => "store",
        }
    }

    /// Classify an arbitrary error chain.
    pub fn of(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<VaultError>() {
            Some(v) => v.kind(),
            None => FailureKind::Store,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("partial failure in {operation}: {failed} of {total} row(s) failed")]
    PartialFailure {
        operation: &'static str,
        failed: usize,
        total: usize,
    },

    #[error("unresolvable defect: {0}")]
    UnresolvableDefect(String),

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
}

impl VaultError {
    pub fn not_found(what: impl Into<String>) -> Self {
        VaultError::NotFound(what.into())
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            VaultError::NotFound(_) => FailureKind::NotFound,
            VaultError::PartialFailure { .. } => FailureKind::PartialFailure,
            VaultError::UnresolvableDefect(_) => FailureKind::UnresolvableDefect,
            VaultError::ConstraintViolation(_) => FailureKind::ConstraintViolation,
        }
    }
}

/// True when the error chain carries `VaultError::NotFound`.
pub fn is_not_found(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<VaultError>(), Some(VaultError::NotFound(_)))
}
