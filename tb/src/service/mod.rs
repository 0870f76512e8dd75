//! Mutation and query layer
//!
//! Services validate input, talk to the repositories and, after every
//! successful task write, publish the change on the task bus under the
//! task's team id. Queries read through the request's loaders.

mod error;
mod task;
mod team;
mod user;

pub use error::{ServiceError, ServiceResult, code_for_status};
pub use task::{AssignTaskInput, CreateTaskInput, MoveTaskInput, TaskBus, TaskService, UpdateTaskInput};
pub use team::{CreateTeamInput, TeamService, TeamSummary, UpdateTeamInput};
pub use user::{AssignedUser, RegisterUserInput, UserService};
