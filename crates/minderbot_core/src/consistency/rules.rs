//! Catalogue of consistency rules.
//!
//! # Invariants
//! - Variant declaration order equals the string order of `as_str()`, so the
//!   derived `Ord` sorts rules the same way reports do.
//! - `as_str()` values are the stable action keys used by callers to select
//!   a repair.

use crate::config::DanglingOwnerPolicy;
use serde::{Serialize, Serializer};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RuleName {
    /// Feedback submitter id does not resolve to a user.
    FeedbackSubmitter,
    /// Suggestion owner or author id does not resolve to a user.
    SuggestionOwner,
    /// Suggestion references a tag that does not exist.
    SuggestionTagMissing,
    /// Suggestion references a tag that does not reference it back.
    SuggestionTagReverse,
    /// Tag count differs from its reference list length.
    TagCount,
    /// Tag timestamp is unset or later than its oldest suggestion.
    TagCreated,
    /// Tag references no suggestions.
    TagEmpty,
    /// Tag references the same suggestion more than once.
    TagSuggestionDuplicate,
    /// Tag references a suggestion that does not exist.
    TagSuggestionMissing,
    /// Tag references a suggestion that does not reference it back.
    TagSuggestionReverse,
}

impl RuleName {
    pub const ALL: [RuleName; 10] = [
        Self::FeedbackSubmitter,
        Self::SuggestionOwner,
        Self::SuggestionTagMissing,
        Self::SuggestionTagReverse,
        Self::TagCount,
        Self::TagCreated,
        Self::TagEmpty,
        Self::TagSuggestionDuplicate,
        Self::TagSuggestionMissing,
        Self::TagSuggestionReverse,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::FeedbackSubmitter => "feedback_submitter",
            Self::SuggestionOwner => "suggestion_owner",
            Self::SuggestionTagMissing => "suggestion_tag_missing",
            Self::SuggestionTagReverse => "suggestion_tag_reverse",
            Self::TagCount => "tag_count",
            Self::TagCreated => "tag_created",
            Self::TagEmpty => "tag_empty",
            Self::TagSuggestionDuplicate => "tag_suggestion_duplicate",
            Self::TagSuggestionMissing => "tag_suggestion_missing",
            Self::TagSuggestionReverse => "tag_suggestion_reverse",
        }
    }

    /// Parses an action key. Surrounding whitespace is ignored.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL.into_iter().find(|rule| rule.as_str() == value)
    }

    /// Headline shown when the rule found problems.
    pub fn problem_headline(self) -> &'static str {
        match self {
            Self::FeedbackSubmitter => "Missing submitters on some feedback.",
            Self::SuggestionOwner => "Some suggestions have missing owners or authors.",
            Self::SuggestionTagMissing => "Some referenced tags don't exist.",
            Self::SuggestionTagReverse => "Some suggestion-tag references don't have a reverse.",
            Self::TagCount => "Some tag count fields are incorrect.",
            Self::TagCreated => "Some tag timestamps are missing or too late.",
            Self::TagEmpty => "Some tags don't reference any suggestions.",
            Self::TagSuggestionDuplicate => {
                "Some tags reference the same suggestion more than once."
            }
            Self::TagSuggestionMissing => "References to missing suggestions.",
            Self::TagSuggestionReverse => "Some tag-suggestion references don't have a reverse.",
        }
    }

    /// Headline shown when the rule found nothing.
    pub fn success_headline(self) -> &'static str {
        match self {
            Self::FeedbackSubmitter => "All feedback submitters exist.",
            Self::SuggestionOwner => "All suggestions have valid owners and authors.",
            Self::SuggestionTagMissing => "All referenced tags exist.",
            Self::SuggestionTagReverse => "All suggestion-tag references have a reverse.",
            Self::TagCount => "All tag count fields are correct.",
            Self::TagCreated => "All tag timestamps are reasonable.",
            Self::TagEmpty => "All tags reference at least one suggestion.",
            Self::TagSuggestionDuplicate => "No tag references a suggestion twice.",
            Self::TagSuggestionMissing => "All referenced suggestions exist.",
            Self::TagSuggestionReverse => "All tag-suggestion references have a reverse.",
        }
    }

    /// Label of the button that triggers the repair.
    pub fn action_label(self, policy: DanglingOwnerPolicy) -> &'static str {
        match self {
            Self::FeedbackSubmitter => "Make anonymous",
            Self::SuggestionOwner => match policy {
                DanglingOwnerPolicy::Clear => "Make anonymous",
                DanglingOwnerPolicy::Claim => "Claim ownership",
            },
            Self::SuggestionTagMissing => "Create missing tags",
            Self::SuggestionTagReverse | Self::TagSuggestionReverse => {
                "Create reverse references"
            }
            Self::TagCount => "Adjust count fields",
            Self::TagCreated => "Adjust timestamps",
            Self::TagEmpty => "Delete empty tags",
            Self::TagSuggestionDuplicate => "Remove duplicate references",
            Self::TagSuggestionMissing => "Delete dangling references",
        }
    }

    /// Whether the rule is evaluated by the per-tag scan.
    pub fn is_tag_direction(self) -> bool {
        matches!(
            self,
            Self::TagCount
                | Self::TagCreated
                | Self::TagEmpty
                | Self::TagSuggestionDuplicate
                | Self::TagSuggestionMissing
                | Self::TagSuggestionReverse
        )
    }
}

impl Display for RuleName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RuleName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
