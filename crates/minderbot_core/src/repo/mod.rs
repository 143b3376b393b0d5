//! Entity store contracts and persistence implementations.
//!
//! # Responsibility
//! - Define the key-value style `EntityStore` contract used by the
//!   consistency engine and services.
//! - Isolate SQLite query details from business orchestration.
//!
//! # Invariants
//! - Write paths call the entity `validate()` before SQL mutations.
//! - Read paths return stored data as-is, including dangling references.
//! - Collection listings are keyset-paged by id, ascending.

use crate::db::DbError;
use crate::model::feedback::Feedback;
use crate::model::suggestion::Suggestion;
use crate::model::tag::Tag;
use crate::model::user::{User, UserId};
use crate::model::ValidationError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod sqlite_store;

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for entity persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    NotFound { kind: &'static str, id: String },
    InvalidData(String),
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound { .. } | Self::InvalidData(_) | Self::MissingRequiredTable(_) => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Keyset page over one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    /// Return only ids strictly greater than this one.
    pub after: Option<String>,
    /// Maximum rows to return.
    pub limit: u32,
}

impl PageQuery {
    pub fn first(limit: u32) -> Self {
        Self { after: None, limit }
    }
}

/// Persistent store of tags, suggestions, feedback and users.
///
/// `put_*` methods upsert the whole record including its reference list.
/// `delete_*` methods are idempotent.
pub trait EntityStore {
    fn list_tags(&self, page: &PageQuery) -> RepoResult<Vec<Tag>>;
    fn list_suggestions(&self, page: &PageQuery) -> RepoResult<Vec<Suggestion>>;
    fn list_feedback(&self, page: &PageQuery) -> RepoResult<Vec<Feedback>>;
    fn list_user_ids(&self, page: &PageQuery) -> RepoResult<Vec<UserId>>;

    fn get_tag(&self, id: &str) -> RepoResult<Option<Tag>>;
    fn get_suggestion(&self, id: &str) -> RepoResult<Option<Suggestion>>;
    fn get_feedback(&self, id: &str) -> RepoResult<Option<Feedback>>;
    fn get_user(&self, id: &str) -> RepoResult<Option<User>>;

    fn put_tag(&self, tag: &Tag) -> RepoResult<()>;
    fn delete_tag(&self, id: &str) -> RepoResult<()>;
    fn put_suggestion(&self, suggestion: &Suggestion) -> RepoResult<()>;
    fn delete_suggestion(&self, id: &str) -> RepoResult<()>;
    fn put_feedback(&self, feedback: &Feedback) -> RepoResult<()>;
    fn put_user(&self, user: &User) -> RepoResult<()>;

    /// Runs `batch` as one unit of writes.
    ///
    /// Stores with multi-entity transactions commit everything or nothing.
    /// The default runs the closure directly: writes are sequential and a
    /// failure leaves earlier writes in place.
    fn atomic<T, F>(&self, batch: F) -> RepoResult<T>
    where
        Self: Sized,
        F: FnOnce(&Self) -> RepoResult<T>,
    {
        batch(self)
    }
}
