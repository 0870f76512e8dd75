//! Login session; issued and verified by the credential layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entity::{Audit, impl_entity};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
    pub audit: Audit,
}

impl_entity!(Session, "session");

impl Session {
    pub fn new(user_id: impl Into<String>, access_expires_at: DateTime<Utc>, refresh_expires_at: DateTime<Utc>) -> Self {
        Self {
            id: String::new(),
            user_id: user_id.into(),
            access_expires_at,
            refresh_expires_at,
            audit: Audit::default(),
        }
    }

    /// Whether the access window has passed at `now`
    pub fn is_access_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.access_expires_at
    }
}
