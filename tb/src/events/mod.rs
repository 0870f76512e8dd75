//! Live change notifications
//!
//! Mutations publish to the [`EventBus`] under the owning team's id. Each
//! live client holds an [`EventStream`] that wraps one bus subscription,
//! keeps only one kind of event and hands the mapped notifications to the
//! client.
//!
//! # Architecture
//!
//! ```text
//!   TaskService::create_task ──┐
//!   TaskService::update_task ──┼──► EventBus::publish(team, kind, task)
//!   TaskService::delete_task ──┘            │
//!                                           │ one bounded channel per subscriber
//!                 ┌─────────────────────────┼─────────────────────────┐
//!                 ▼                         ▼                         ▼
//!        forward task (created)   forward task (updated)   forward task (deleted)
//!                 │                         │                         │
//!                 ▼                         ▼                         ▼
//!        EventStream<Task>         EventStream<Task>     EventStream<DeletedTaskNotification>
//! ```
//!
//! # Lifecycle
//!
//! The bus owns every subscriber sender. A subscription ends when either
//! side lets go: the client drops its stream (the forward task then
//! unsubscribes) or the bus tears the group down (the forward task sees the
//! inbound channel close and closes the stream).

mod bus;
mod stream;
mod types;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, EventBus, SubscriberId, Subscription};
pub use stream::EventStream;
pub use types::{Event, EventKind};
