//! Denormalized-reference consistency checking and repair.
//!
//! # Responsibility
//! - Load whole collections into an immutable [`snapshot::Snapshot`].
//! - Evaluate the fixed rule set into a [`problem::ProblemSet`].
//! - Render summaries and batch reports, and apply one rule's repair.
//!
//! # Invariants
//! - Dangling references are problem records, never errors.
//! - A repair for an unknown rule fails before any write.

use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod engine;
pub mod notify;
pub mod problem;
pub mod repair;
pub mod report;
pub mod rules;
pub mod snapshot;

#[derive(Debug)]
pub enum ConsistencyError {
    /// The snapshot could not be loaded; no partial snapshot is used.
    StoreUnavailable(RepoError),
    /// The requested action key names no rule.
    UnknownRule(String),
    /// A persist failed while applying a repair.
    RepairFailed {
        rule: rules::RuleName,
        source: RepoError,
    },
}

impl Display for ConsistencyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StoreUnavailable(err) => write!(f, "entity store unavailable: {err}"),
            Self::UnknownRule(key) => write!(f, "unknown consistency rule `{key}`"),
            Self::RepairFailed { rule, source } => {
                write!(f, "repair `{rule}` failed: {source}")
            }
        }
    }
}

impl Error for ConsistencyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StoreUnavailable(err) | Self::RepairFailed { source: err, .. } => Some(err),
            Self::UnknownRule(_) => None,
        }
    }
}

impl From<RepoError> for ConsistencyError {
    fn from(value: RepoError) -> Self {
        Self::StoreUnavailable(value)
    }
}
