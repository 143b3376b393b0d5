//! Core domain logic for Minderbot.
//! This crate owns the entity model, its SQLite store and the consistency
//! engine that checks and repairs denormalized references between entities.

pub mod config;
pub mod consistency;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, ConsistencyConfig, DanglingOwnerPolicy};
pub use consistency::notify::{LogNotifier, Notifier, NotifyError};
pub use consistency::problem::{ProblemRecord, ProblemSet};
pub use consistency::repair::{RepairContext, RepairSummary};
pub use consistency::report::RuleSummary;
pub use consistency::rules::RuleName;
pub use consistency::snapshot::Snapshot;
pub use consistency::ConsistencyError;
pub use db::{open_db, open_db_in_memory, DbError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use repo::sqlite_store::SqliteEntityStore;
pub use repo::{EntityStore, PageQuery, RepoError, RepoResult};
pub use service::consistency_service::{
    Caller, CheckRequest, CheckResponse, ConsistencyService, RepairResponse,
};
pub use service::suggestion_service::{SuggestionService, SuggestionServiceError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
