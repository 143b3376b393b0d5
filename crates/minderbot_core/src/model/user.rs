//! User identity as seen by the consistency engine.
//!
//! Accounts are managed elsewhere; other entities hold weak references to
//! them by id, which may dangle after an account is removed.

use crate::model::ValidationError;
use serde::{Deserialize, Serialize};

pub type UserId = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    /// Staff members may view and repair consistency problems.
    pub is_staff: bool,
}

impl User {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::BlankId { kind: "user" });
        }
        Ok(())
    }
}
