//! Consistency check and repair use-cases.
//!
//! # Responsibility
//! - Gate interactive checks and repairs to staff callers.
//! - Produce the dashboard summary or the plain-text batch report.
//! - Notify administrators when a batch run finds problems.
//!
//! # Invariants
//! - Every pass loads a fresh snapshot; nothing is cached across calls.
//! - Batch checks bypass the staff gate and always return plain text.
//! - Notifier failures are logged and never fail the check.

use crate::config::ConsistencyConfig;
use crate::consistency::engine::{evaluate, evaluate_rule};
use crate::consistency::notify::Notifier;
use crate::consistency::repair::{repair, RepairContext, RepairSummary};
use crate::consistency::report::{batch_report, summarize, RuleSummary};
use crate::consistency::rules::RuleName;
use crate::consistency::snapshot::Snapshot;
use crate::consistency::ConsistencyError;
use crate::model::user::UserId;
use crate::repo::EntityStore;
use log::{error, info, warn};

const NOTIFY_SUBJECT: &str = "Consistency check found problems";

/// Identity of whoever triggered a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    Anonymous,
    User { id: UserId, is_staff: bool },
}

impl Caller {
    pub fn staff(id: impl Into<UserId>) -> Self {
        Self::User {
            id: id.into(),
            is_staff: true,
        }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self, Self::User { is_staff: true, .. })
    }

    pub fn user_id(&self) -> Option<&UserId> {
        match self {
            Self::Anonymous => None,
            Self::User { id, .. } => Some(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckRequest {
    pub caller: Caller,
    /// Set by the scheduler for unattended runs.
    pub batch: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckResponse {
    Redirect { location: String },
    Dashboard { rules: Vec<RuleSummary> },
    PlainText { body: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairResponse {
    Redirect { location: String },
    /// `location` is where the caller re-runs the check.
    Repaired {
        summary: RepairSummary,
        location: String,
    },
}

pub struct ConsistencyService<S: EntityStore, N: Notifier> {
    store: S,
    notifier: N,
    config: ConsistencyConfig,
}

impl<S: EntityStore, N: Notifier> ConsistencyService<S, N> {
    pub fn new(store: S, notifier: N, config: ConsistencyConfig) -> Self {
        Self {
            store,
            notifier,
            config,
        }
    }

    /// Runs every rule for the given trigger mode.
    ///
    /// # Errors
    /// - `StoreUnavailable` when the snapshot cannot be loaded.
    pub fn check(&self, request: &CheckRequest) -> Result<CheckResponse, ConsistencyError> {
        if !request.batch && !request.caller.is_staff() {
            info!("event=consistency_check module=service status=redirect mode=interactive");
            return Ok(self.redirect_to_login());
        }

        let snapshot = Snapshot::load(&self.store, self.config.page_size)?;
        let problems = evaluate(&snapshot);

        if !request.batch {
            return Ok(CheckResponse::Dashboard {
                rules: summarize(&problems, self.config.dangling_owner_policy),
            });
        }

        let body = batch_report(&problems, &self.config.report_url);
        if problems.is_empty() {
            info!("event=consistency_check module=service status=ok mode=batch problems=0");
        } else {
            error!(
                "event=consistency_check module=service status=problems mode=batch problems={} report={:?}",
                problems.total(),
                body
            );
            if let Err(err) = self.notifier.notify_admins(NOTIFY_SUBJECT, &body) {
                warn!(
                    "event=admin_notify module=service status=error error_code=notify_failed error={}",
                    err
                );
            }
        }
        Ok(CheckResponse::PlainText { body })
    }

    /// Re-evaluates one rule on a fresh snapshot and applies its repair.
    ///
    /// # Errors
    /// - `UnknownRule` before anything is loaded or written.
    /// - `StoreUnavailable` / `RepairFailed` from the load or the writes.
    pub fn repair(&self, caller: &Caller, action: &str) -> Result<RepairResponse, ConsistencyError> {
        if !caller.is_staff() {
            info!("event=consistency_repair module=service status=redirect action={action:?}");
            return Ok(RepairResponse::Redirect {
                location: self.config.login_url.clone(),
            });
        }
        let rule = RuleName::parse(action)
            .ok_or_else(|| ConsistencyError::UnknownRule(action.trim().to_string()))?;

        let snapshot = Snapshot::load(&self.store, self.config.page_size)?;
        let records = evaluate_rule(&snapshot, rule);
        let context = RepairContext {
            policy: self.config.dangling_owner_policy,
            acting_user: caller.user_id().cloned(),
        };
        let summary = repair(&self.store, rule.as_str(), &records, &context)?;

        Ok(RepairResponse::Repaired {
            summary,
            location: self.config.report_path.clone(),
        })
    }

    fn redirect_to_login(&self) -> CheckResponse {
        CheckResponse::Redirect {
            location: self.config.login_url.clone(),
        }
    }
}
