//! Domain model for suggestions, tags, feedback and users.
//!
//! # Responsibility
//! - Define the entity records persisted by the entity store.
//! - Provide write-side validation shared by repository implementations.
//!
//! # Invariants
//! - Every entity is identified by a stable string id.
//! - Cross-entity references are stored as ids only and may dangle.
//! - Validation runs on write paths; reads accept inconsistent data so the
//!   consistency checker can see it.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod feedback;
pub mod suggestion;
pub mod tag;
pub mod user;

/// Write-side validation failure for any entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Entity id is empty or whitespace.
    BlankId { kind: &'static str },
    /// Public suggestion id is not a lowercase slug.
    InvalidSlug(String),
    /// Suggestion title is empty or whitespace.
    BlankTitle(String),
    /// Tag name is empty or contains whitespace.
    InvalidTagName(String),
    /// Tag count is negative.
    NegativeCount { tag: String, count: i64 },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankId { kind } => write!(f, "{kind} id cannot be blank"),
            Self::InvalidSlug(id) => {
                write!(f, "suggestion id `{id}` must be a lowercase slug")
            }
            Self::BlankTitle(id) => write!(f, "suggestion `{id}` has a blank title"),
            Self::InvalidTagName(name) => write!(f, "invalid tag name `{name}`"),
            Self::NegativeCount { tag, count } => {
                write!(f, "tag `{tag}` has negative count {count}")
            }
        }
    }
}

impl Error for ValidationError {}
