//! User record

use serde::{Deserialize, Serialize};

use super::entity::{Audit, impl_entity};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    /// Credential digest; never leaves the process
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub team_ids: Vec<String>,
    pub audit: Audit,
}

impl_entity!(User, "user");

impl User {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            email: email.into(),
            password_hash: String::new(),
            team_ids: Vec::new(),
            audit: Audit::default(),
        }
    }
}
