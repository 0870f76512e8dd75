//! Comment on a task

use serde::{Deserialize, Serialize};

use super::entity::{Audit, impl_entity};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub task_id: String,
    pub user_id: String,
    pub content: String,
    pub audit: Audit,
}

impl_entity!(Comment, "comment");

impl Comment {
    pub fn new(task_id: impl Into<String>, user_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            task_id: task_id.into(),
            user_id: user_id.into(),
            content: content.into(),
            audit: Audit::default(),
        }
    }
}
