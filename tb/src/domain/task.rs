//! Task record and its status

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entity::{Audit, impl_entity};

/// Where a task sits on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Todo => write!(f, "todo"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Done => write!(f, "done"),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "todo" | "to_do" => Ok(Self::Todo),
            "in_progress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            other => Err(format!("unknown task status '{}'", other)),
        }
    }
}

/// A unit of work belonging to one team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub due_date: DateTime<Utc>,
    /// Assigned user id
    pub assigned_to: Option<String>,
    /// Owning team id; also the event group for this task
    pub team_id: String,
    pub audit: Audit,
}

impl_entity!(Task, "task");

impl Task {
    /// Create an unsaved task; the repository assigns the id
    pub fn new(title: impl Into<String>, team_id: impl Into<String>, due_date: DateTime<Utc>) -> Self {
        Self {
            id: String::new(),
            title: title.into(),
            description: None,
            status: TaskStatus::Todo,
            due_date,
            assigned_to: None,
            team_id: team_id.into(),
            audit: Audit::default(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_assignee(mut self, user_id: impl Into<String>) -> Self {
        self.assigned_to = Some(user_id.into());
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }
}

/// What deleted-task subscribers receive; the row itself may already be gone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedTaskNotification {
    pub task_id: String,
    pub deleted: bool,
}

impl DeletedTaskNotification {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            deleted: true,
        }
    }
}
