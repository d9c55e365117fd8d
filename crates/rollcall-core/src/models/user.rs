//! Staff identity model

use serde::{Deserialize, Serialize};

/// Role granted to a signed-in staff member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Organizer,
    #[default]
    Staff,
    Viewer,
}

/// The person operating the check-in desk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: UserRole,
}

impl User {
    /// Build a staff user identified only by email.
    #[must_use]
    pub fn from_email(email: impl Into<String>) -> Self {
        let email = email.into();
        Self {
            id: email.clone(),
            name: email.split('@').next().unwrap_or_default().to_string(),
            email,
            role: UserRole::Staff,
        }
    }

    /// Actor id written into `_checkin_by` / `_updated_by`.
    #[must_use]
    pub fn actor_id(&self) -> &str {
        &self.email
    }
}
