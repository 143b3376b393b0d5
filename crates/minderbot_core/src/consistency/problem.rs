//! Problem records produced by the rule engine.
//!
//! A record is a rule, a message template and an ordered list of subjects.
//! Subjects that are entities render as their id, never as their fields.

use crate::consistency::rules::RuleName;
use crate::model::feedback::FeedbackId;
use crate::model::suggestion::SuggestionId;
use crate::model::tag::TagId;
use crate::model::user::UserId;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Reference to one stored entity by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityRef {
    Tag(TagId),
    Suggestion(SuggestionId),
    Feedback(FeedbackId),
    User(UserId),
}

impl EntityRef {
    pub fn id(&self) -> &str {
        match self {
            Self::Tag(id) | Self::Suggestion(id) | Self::Feedback(id) | Self::User(id) => id,
        }
    }
}

/// One substitution value of a message template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    Entity(EntityRef),
    Count(i64),
}

impl Display for Subject {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Entity(entity) => f.write_str(entity.id()),
            Self::Count(value) => write!(f, "{value}"),
        }
    }
}

/// Which user reference of a suggestion dangles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerField {
    Owner,
    Author,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProblemRecord {
    TagCount {
        tag: TagId,
        count: i64,
        length: i64,
    },
    TagEmpty {
        tag: TagId,
    },
    TagSuggestionMissing {
        tag: TagId,
        suggestion: SuggestionId,
    },
    TagSuggestionReverse {
        tag: TagId,
        suggestion: SuggestionId,
    },
    TagSuggestionDuplicate {
        tag: TagId,
        suggestion: SuggestionId,
        occurrences: i64,
    },
    SuggestionTagMissing {
        suggestion: SuggestionId,
        tag: TagId,
        /// `created` of the referencing suggestion, seeds the synthesized tag.
        created: i64,
    },
    SuggestionTagReverse {
        suggestion: SuggestionId,
        tag: TagId,
    },
    TagCreatedMissing {
        tag: TagId,
        oldest: SuggestionId,
        created: i64,
    },
    TagCreatedLate {
        tag: TagId,
        oldest: SuggestionId,
        created: i64,
    },
    SuggestionOwnerMissing {
        suggestion: SuggestionId,
        field: OwnerField,
        user: UserId,
    },
    FeedbackSubmitterMissing {
        feedback: FeedbackId,
        user: UserId,
    },
}

impl ProblemRecord {
    pub fn rule(&self) -> RuleName {
        match self {
            Self::TagCount { .. } => RuleName::TagCount,
            Self::TagEmpty { .. } => RuleName::TagEmpty,
            Self::TagSuggestionMissing { .. } => RuleName::TagSuggestionMissing,
            Self::TagSuggestionReverse { .. } => RuleName::TagSuggestionReverse,
            Self::TagSuggestionDuplicate { .. } => RuleName::TagSuggestionDuplicate,
            Self::SuggestionTagMissing { .. } => RuleName::SuggestionTagMissing,
            Self::SuggestionTagReverse { .. } => RuleName::SuggestionTagReverse,
            Self::TagCreatedMissing { .. } | Self::TagCreatedLate { .. } => RuleName::TagCreated,
            Self::SuggestionOwnerMissing { .. } => RuleName::SuggestionOwner,
            Self::FeedbackSubmitterMissing { .. } => RuleName::FeedbackSubmitter,
        }
    }

    /// Message template; each `{}` takes the next subject.
    pub fn template(&self) -> &'static str {
        match self {
            Self::TagCount { .. } => "Tag {} has count {} but references {} suggestions.",
            Self::TagEmpty { .. } => "Tag {} does not reference any suggestions.",
            Self::TagSuggestionMissing { .. } => "Tag {} references missing suggestion {}.",
            Self::TagSuggestionReverse { .. } => "Tag {} references {} but not reverse.",
            Self::TagSuggestionDuplicate { .. } => "Tag {} references suggestion {} {} times.",
            Self::SuggestionTagMissing { .. } => "Suggestion {} references missing tag {}.",
            Self::SuggestionTagReverse { .. } => "Suggestion {} references {} but not reverse.",
            Self::TagCreatedMissing { .. } => "Tag {} is missing a timestamp.",
            Self::TagCreatedLate { .. } => "Tag {} was created after suggestion {}.",
            Self::SuggestionOwnerMissing {
                field: OwnerField::Owner,
                ..
            } => "Reminder {} references a missing owner.",
            Self::SuggestionOwnerMissing {
                field: OwnerField::Author,
                ..
            } => "Suggestion {} references a missing author.",
            Self::FeedbackSubmitterMissing { .. } => "Feedback {} references a missing submitter.",
        }
    }

    /// Template subjects in placeholder order.
    pub fn subjects(&self) -> Vec<Subject> {
        let tag = |id: &TagId| Subject::Entity(EntityRef::Tag(id.clone()));
        let suggestion = |id: &SuggestionId| Subject::Entity(EntityRef::Suggestion(id.clone()));
        match self {
            Self::TagCount { tag: id, count, length } => {
                vec![tag(id), Subject::Count(*count), Subject::Count(*length)]
            }
            Self::TagEmpty { tag: id } | Self::TagCreatedMissing { tag: id, .. } => vec![tag(id)],
            Self::TagSuggestionMissing { tag: t, suggestion: s }
            | Self::TagSuggestionReverse { tag: t, suggestion: s }
            | Self::TagCreatedLate {
                tag: t, oldest: s, ..
            } => vec![tag(t), suggestion(s)],
            Self::TagSuggestionDuplicate {
                tag: t,
                suggestion: s,
                occurrences,
            } => vec![tag(t), suggestion(s), Subject::Count(*occurrences)],
            Self::SuggestionTagMissing { suggestion: s, tag: t, .. }
            | Self::SuggestionTagReverse { suggestion: s, tag: t } => {
                vec![suggestion(s), tag(t)]
            }
            Self::SuggestionOwnerMissing { suggestion: s, .. } => vec![suggestion(s)],
            Self::FeedbackSubmitterMissing { feedback, .. } => {
                vec![Subject::Entity(EntityRef::Feedback(feedback.clone()))]
            }
        }
    }

    /// `(primary, secondary)` subject ids used for deterministic ordering.
    pub fn sort_key(&self) -> (&str, &str) {
        let (primary, secondary): (&String, Option<&String>) = match self {
            Self::TagCount { tag, .. } | Self::TagEmpty { tag } => (tag, None),
            Self::TagSuggestionMissing { tag, suggestion }
            | Self::TagSuggestionReverse { tag, suggestion }
            | Self::TagSuggestionDuplicate { tag, suggestion, .. }
            | Self::TagCreatedMissing {
                tag,
                oldest: suggestion,
                ..
            }
            | Self::TagCreatedLate {
                tag,
                oldest: suggestion,
                ..
            } => (tag, Some(suggestion)),
            Self::SuggestionTagMissing { suggestion, tag, .. }
            | Self::SuggestionTagReverse { suggestion, tag } => (suggestion, Some(tag)),
            Self::SuggestionOwnerMissing { suggestion, user, .. } => (suggestion, Some(user)),
            Self::FeedbackSubmitterMissing { feedback, user } => (feedback, Some(user)),
        };
        (primary.as_str(), secondary.map_or("", String::as_str))
    }

    /// Renders the one-line human message.
    pub fn render(&self) -> String {
        let mut subjects = self.subjects().into_iter();
        let mut pieces = self.template().split("{}");
        let mut message = pieces.next().unwrap_or_default().to_string();
        for piece in pieces {
            if let Some(subject) = subjects.next() {
                message.push_str(&subject.to_string());
            }
            message.push_str(piece);
        }
        message
    }
}

impl Display for ProblemRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

/// Problems grouped by rule. Only rules with at least one record are stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProblemSet {
    by_rule: BTreeMap<RuleName, Vec<ProblemRecord>>,
}

impl ProblemSet {
    /// Stores `records` for `rule`; an empty list removes the entry.
    pub fn insert(&mut self, rule: RuleName, records: Vec<ProblemRecord>) {
        if records.is_empty() {
            self.by_rule.remove(&rule);
        } else {
            self.by_rule.insert(rule, records);
        }
    }

    /// Records of one rule, empty when the rule passed.
    pub fn get(&self, rule: RuleName) -> &[ProblemRecord] {
        self.by_rule.get(&rule).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.by_rule.is_empty()
    }

    /// Total record count over all rules.
    pub fn total(&self) -> usize {
        self.by_rule.values().map(Vec::len).sum()
    }

    /// Failing rules in key order with their records.
    pub fn iter(&self) -> impl Iterator<Item = (RuleName, &[ProblemRecord])> {
        self.by_rule
            .iter()
            .map(|(rule, records)| (*rule, records.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::{OwnerField, ProblemRecord, ProblemSet};
    use crate::consistency::rules::RuleName;

    #[test]
    fn render_substitutes_ids_and_counts() {
        let record = ProblemRecord::TagCount {
            tag: "a".into(),
            count: 3,
            length: 2,
        };
        assert_eq!(record.render(), "Tag a has count 3 but references 2 suggestions.");
        assert_eq!(record.rule(), RuleName::TagCount);
    }

    #[test]
    fn render_ignores_subjects_without_placeholder() {
        let record = ProblemRecord::TagCreatedMissing {
            tag: "a".into(),
            oldest: "a-b".into(),
            created: 10,
        };
        assert_eq!(record.render(), "Tag a is missing a timestamp.");
        assert_eq!(record.rule(), RuleName::TagCreated);
    }

    #[test]
    fn owner_and_author_render_differently() {
        let owner = ProblemRecord::SuggestionOwnerMissing {
            suggestion: "a-b".into(),
            field: OwnerField::Owner,
            user: "phantom".into(),
        };
        let author = ProblemRecord::SuggestionOwnerMissing {
            suggestion: "a-b".into(),
            field: OwnerField::Author,
            user: "phantom".into(),
        };
        assert_eq!(owner.render(), "Reminder a-b references a missing owner.");
        assert_eq!(author.render(), "Suggestion a-b references a missing author.");
        assert!(!owner.render().contains("phantom"));
    }

    #[test]
    fn problem_set_drops_empty_rules() {
        let mut set = ProblemSet::default();
        set.insert(RuleName::TagEmpty, vec![ProblemRecord::TagEmpty { tag: "a".into() }]);
        set.insert(RuleName::TagCount, Vec::new());

        assert_eq!(set.total(), 1);
        assert!(set.get(RuleName::TagCount).is_empty());
        assert_eq!(set.iter().count(), 1);

        set.insert(RuleName::TagEmpty, Vec::new());
        assert!(set.is_empty());
    }
}
