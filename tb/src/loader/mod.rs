//! Request-scoped batched entity loading
//!
//! Every inbound request gets a fresh [`Loaders`] set attached to its
//! [`RequestContext`]. Resolvers serving that request load related entities
//! through it, so many single-id lookups collapse into a few bulk fetches
//! and one request never sees another request's cached rows.

mod batch;
mod context;
mod set;

pub use batch::{BatchFn, DEFAULT_MAX_BATCH, DEFAULT_WAIT, LoadError, LoadResult, Loader};
pub use context::RequestContext;
pub use set::{Loaders, RepositoryBatch};
