//! Suggestion / reminder domain model.
//!
//! # Responsibility
//! - Define the single record shared by public suggestions and personal
//!   reminders.
//! - Render recurrence intervals as human text.
//!
//! # Invariants
//! - `owner == None` marks a public suggestion whose id is a URL slug.
//! - `owner == Some(_)` marks a personal reminder whose id is random hex.
//! - `tags` is the forward half of the tag <-> suggestion reference pair;
//!   the matching `Tag::suggestions` lists are maintained separately.

use crate::model::tag::{validate_tag_name, TagId};
use crate::model::user::UserId;
use crate::model::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

static SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid slug regex"));

/// Stable suggestion id (slug or hex string).
pub type SuggestionId = String;

/// Recurrence of a reminder. Any combination of units may be set; the
/// reminder is due when the first of them elapses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub days: Option<u32>,
    pub months: Option<u32>,
    pub years: Option<u32>,
    pub miles: Option<u32>,
    pub kilometers: Option<u32>,
}

impl Interval {
    /// Renders the interval as text, e.g. `week or 6 months`.
    ///
    /// Day counts divisible by seven are shown as weeks. Units equal to one
    /// are listed first as bare nouns, larger units follow with their count.
    pub fn describe(&self) -> String {
        let (days, weeks) = match self.days {
            Some(days) if days > 0 && days % 7 == 0 => (None, Some(days / 7)),
            other => (other, None),
        };
        let units = [
            (days, "day", "days"),
            (weeks, "week", "weeks"),
            (self.months, "month", "months"),
            (self.years, "year", "years"),
            (self.miles, "mile", "miles"),
            (self.kilometers, "kilometer", "kilometers"),
        ];

        let mut parts: Vec<String> = units
            .iter()
            .filter(|(value, _, _)| *value == Some(1))
            .map(|(_, singular, _)| (*singular).to_string())
            .collect();
        parts.extend(units.iter().filter_map(|(value, _, plural)| match value {
            Some(value) if *value > 1 => Some(format!("{value} {plural}")),
            _ => None,
        }));
        parts.join(" or ")
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: SuggestionId,
    pub title: String,
    /// Tag names in user-entered order.
    pub tags: Vec<TagId>,
    /// Set for personal reminders only.
    pub owner: Option<UserId>,
    /// Staff member who published the suggestion.
    pub author: Option<UserId>,
    pub interval: Interval,
    /// Unix epoch milliseconds of the last completion.
    pub previous: Option<i64>,
    /// Unix epoch milliseconds of the next due date.
    pub next: Option<i64>,
    /// Unix epoch milliseconds.
    pub created: i64,
}

impl Suggestion {
    /// Creates a public suggestion without tags.
    pub fn new(id: impl Into<SuggestionId>, title: impl Into<String>, created: i64) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            tags: Vec::new(),
            owner: None,
            author: None,
            interval: Interval::default(),
            previous: None,
            next: None,
            created,
        }
    }

    /// Copies this suggestion into a personal reminder owned by `owner`.
    ///
    /// The copy gets a fresh random hex id and keeps title, tags and interval.
    pub fn personalize(&self, owner: impl Into<UserId>, created: i64) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            title: self.title.clone(),
            tags: self.tags.clone(),
            owner: Some(owner.into()),
            author: None,
            interval: self.interval,
            previous: None,
            next: None,
            created,
        }
    }

    /// Personal reminders carry an owner, public suggestions do not.
    pub fn is_personal(&self) -> bool {
        self.owner.is_some()
    }

    /// Whether `tag_id` appears in the forward tag list.
    pub fn has_tag(&self, tag_id: &str) -> bool {
        self.tags.iter().any(|tag| tag == tag_id)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::BlankId { kind: "suggestion" });
        }
        if !self.is_personal() && !SLUG_RE.is_match(&self.id) {
            return Err(ValidationError::InvalidSlug(self.id.clone()));
        }
        if self.title.trim().is_empty() {
            return Err(ValidationError::BlankTitle(self.id.clone()));
        }
        for tag in &self.tags {
            validate_tag_name(tag)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Interval, Suggestion};
    use crate::model::ValidationError;

    #[test]
    fn describe_lists_singular_units_before_plural_ones() {
        let interval = Interval {
            days: Some(7),
            months: Some(6),
            ..Interval::default()
        };
        assert_eq!(interval.describe(), "week or 6 months");
    }

    #[test]
    fn describe_keeps_days_not_divisible_by_seven() {
        let interval = Interval {
            days: Some(10),
            miles: Some(1),
            kilometers: Some(5000),
            ..Interval::default()
        };
        assert_eq!(interval.describe(), "mile or 10 days or 5000 kilometers");
    }

    #[test]
    fn describe_of_empty_interval_is_empty() {
        assert_eq!(Interval::default().describe(), "");
    }

    #[test]
    fn personalize_copies_template_with_fresh_hex_id() {
        let mut template = Suggestion::new("smoke-alarm", "Replace smoke alarm batteries", 10);
        template.tags = vec!["home".into(), "safety".into()];
        template.author = Some("staff".into());

        let reminder = template.personalize("joe", 20);
        assert_ne!(reminder.id, template.id);
        assert_eq!(reminder.id.len(), 32);
        assert!(reminder.is_personal());
        assert_eq!(reminder.tags, template.tags);
        assert_eq!(reminder.author, None);
        assert_eq!(reminder.created, 20);
        reminder.validate().expect("personal reminder should validate");
    }

    #[test]
    fn validate_requires_slug_for_public_suggestions() {
        let suggestion = Suggestion::new("Not A Slug", "title", 0);
        assert_eq!(
            suggestion.validate().unwrap_err(),
            ValidationError::InvalidSlug("Not A Slug".to_string())
        );
    }
}
