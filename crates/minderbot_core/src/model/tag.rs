//! Tag entity.
//!
//! # Responsibility
//! - Hold the forward reference list from one tag to its suggestions.
//! - Cache the reference count and the earliest referenced `created` stamp.
//!
//! # Invariants
//! - `id` is the tag name and doubles as primary key.
//! - `count` should equal `suggestions.len()`; a tag at count 0 should not be
//!   persisted. Both are checked, not enforced, because the list is
//!   maintained by hand on both sides.

use crate::model::suggestion::SuggestionId;
use crate::model::ValidationError;
use serde::{Deserialize, Serialize};

/// Tag name, used as primary key.
pub type TagId = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    /// Forward references. May contain duplicates or dangling ids.
    pub suggestions: Vec<SuggestionId>,
    /// Cached cardinality of `suggestions`.
    pub count: i64,
    /// Unix epoch milliseconds of the oldest referenced suggestion.
    pub created: Option<i64>,
}

impl Tag {
    /// Creates an empty tag. Callers add references before persisting it.
    pub fn new(id: impl Into<TagId>) -> Self {
        Self {
            id: id.into(),
            suggestions: Vec::new(),
            count: 0,
            created: None,
        }
    }

    /// Returns the number of stored references as a count value.
    pub fn reference_count(&self) -> i64 {
        i64::try_from(self.suggestions.len()).unwrap_or(i64::MAX)
    }

    /// Recomputes `count` from the reference list.
    pub fn recount(&mut self) {
        self.count = self.reference_count();
    }

    /// Whether the tag references the given suggestion at least once.
    pub fn references(&self, suggestion_id: &str) -> bool {
        self.suggestions.iter().any(|id| id == suggestion_id)
    }

    /// Moves `created` back to `candidate` when that is older (or unset).
    pub fn lower_created(&mut self, candidate: i64) {
        self.created = Some(match self.created {
            Some(current) if current <= candidate => current,
            _ => candidate,
        });
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_tag_name(&self.id)?;
        if self.count < 0 {
            return Err(ValidationError::NegativeCount {
                tag: self.id.clone(),
                count: self.count,
            });
        }
        Ok(())
    }
}

/// Tag names are single words: non-empty and free of whitespace.
pub fn validate_tag_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidTagName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::Tag;

    #[test]
    fn recount_tracks_list_length_including_duplicates() {
        let mut tag = Tag::new("a");
        tag.suggestions = vec!["a-b".into(), "a-b".into(), "a-c".into()];
        tag.recount();
        assert_eq!(tag.count, 3);
    }

    #[test]
    fn lower_created_only_moves_backwards() {
        let mut tag = Tag::new("a");
        tag.lower_created(500);
        assert_eq!(tag.created, Some(500));
        tag.lower_created(900);
        assert_eq!(tag.created, Some(500));
        tag.lower_created(100);
        assert_eq!(tag.created, Some(100));
    }

    #[test]
    fn validate_rejects_whitespace_in_name() {
        assert!(Tag::new("two words").validate().is_err());
        assert!(Tag::new("").validate().is_err());
        assert!(Tag::new("ok").validate().is_ok());
    }
}
