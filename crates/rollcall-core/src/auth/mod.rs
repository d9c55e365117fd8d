//! Signed-in staff session.
//!
//! The token itself is obtained outside Rollcall; this module only carries it
//! to the HTTP transport and names the actor recorded in audit columns.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::User;
use crate::sheets::{HttpSheetsTransport, SheetsClient};
use crate::util::normalize_text_option;

pub const ENV_ACCESS_TOKEN: &str = "ROLLCALL_ACCESS_TOKEN";
pub const ENV_ACTOR: &str = "ROLLCALL_ACTOR";

/// Bearer token plus the identity it belongs to
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub user: User,
}

impl fmt::Debug for Session {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Session")
            .field("access_token", &"[REDACTED]")
            .field("user", &self.user)
            .finish()
    }
}

impl Session {
    pub fn new(access_token: impl Into<String>, user: User) -> Self {
        Self {
            access_token: access_token.into(),
            user,
        }
    }

    /// Build a session from `ROLLCALL_ACCESS_TOKEN` and `ROLLCALL_ACTOR`.
    ///
    /// Returns `None` without a token. Without an actor the user falls back
    /// to `fallback_actor`.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        fallback_actor: &str,
    ) -> Option<Self> {
        let access_token = normalize_text_option(lookup(ENV_ACCESS_TOKEN))?;
        Some(Self::new(access_token, actor_from_lookup(lookup, fallback_actor)))
    }

    /// Attach the bearer token to a sheet client.
    pub fn authorize(&self, client: &mut SheetsClient<HttpSheetsTransport>) {
        client.set_access_token(&self.access_token);
    }
}

/// The configured actor, or a user named by `fallback`.
pub fn actor_from_lookup(lookup: impl Fn(&str) -> Option<String>, fallback: &str) -> User {
    normalize_text_option(lookup(ENV_ACTOR)).map_or_else(|| User::from_email(fallback), User::from_email)
}
