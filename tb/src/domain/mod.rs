//! Domain types for teamboard
//!
//! Plain records: Task, User and Team are stored and loaded by the core;
//! Comment and Session are the remaining board records. All implement the
//! [`Entity`] trait so the generic repository and the batched loaders can
//! address them by id.

mod comment;
mod entity;
mod session;
mod task;
mod team;
mod user;

pub use comment::Comment;
pub use entity::{Audit, Entity, generate_id};
pub use session::Session;
pub use task::{DeletedTaskNotification, Task, TaskStatus};
pub use team::Team;
pub use user::User;
