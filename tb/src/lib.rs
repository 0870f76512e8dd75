//! teamboard - team task board backend
//!
//! Two pieces of request plumbing sit between the mutation/query layer and
//! the repositories:
//!
//! - **Live task events**: every task mutation is published on an
//!   [`events::EventBus`] under the task's team id. Clients open one
//!   [`events::EventStream`] per event kind and see that team's changes in
//!   publish order until they disconnect.
//! - **Batched loading**: each inbound request carries its own
//!   [`loader::Loaders`]. Lookups made within a short window are merged
//!   into one bulk repository fetch and cached for the rest of the request.
//!
//! # Modules
//!
//! - [`domain`] - Task, User, Team, Comment and Session records
//! - [`repo`] - repository contract and in-memory store
//! - [`events`] - team-grouped event bus and typed streams
//! - [`loader`] - per-request batching loaders and request context
//! - [`service`] - task, team and user use cases
//! - [`resolver`] - relation resolvers over the request's loaders
//! - [`app`] - wiring
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod app;
pub mod cli;
pub mod config;
pub mod domain;
pub mod events;
pub mod loader;
pub mod repo;
pub mod resolver;
pub mod service;

pub use app::App;
pub use config::Config;
