//! Feedback entity submitted from any page.

use crate::model::user::UserId;
use crate::model::ValidationError;
use serde::{Deserialize, Serialize};

pub type FeedbackId = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: FeedbackId,
    pub message: String,
    /// Path of the page the feedback was submitted from.
    pub page: String,
    /// `None` for anonymous feedback.
    pub submitter: Option<UserId>,
    /// Unix epoch milliseconds.
    pub submitted: i64,
}

impl Feedback {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::BlankId { kind: "feedback" });
        }
        Ok(())
    }
}
