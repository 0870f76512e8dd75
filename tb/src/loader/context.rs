//! Request context threaded through resolvers

use std::sync::Arc;

use tracing::debug;

use super::set::Loaders;
use crate::domain::generate_id;

/// State that lives exactly as long as one inbound request
///
/// Cloning shares the same loader set.
#[derive(Clone)]
pub struct RequestContext {
    request_id: String,
    actor: Option<String>,
    loaders: Option<Arc<Loaders>>,
}

impl RequestContext {
    /// A context without loaders; attach them with [`RequestContext::with_loaders`]
    pub fn new(actor: Option<String>) -> Self {
        let request_id = generate_id();
        debug!(%request_id, ?actor, "RequestContext::new: called");
        Self {
            request_id,
            actor,
            loaders: None,
        }
    }

    /// Attach the request's loader set
    pub fn with_loaders(mut self, loaders: Loaders) -> Self {
        self.loaders = Some(Arc::new(loaders));
        self
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Id of the user acting in this request, if authenticated
    pub fn actor(&self) -> Option<&str> {
        self.actor.as_deref()
    }

    pub fn try_loaders(&self) -> Option<&Loaders> {
        self.loaders.as_deref()
    }

    /// The request's loader set
    ///
    /// # Panics
    ///
    /// When no loaders were attached; request wiring is broken and a
    /// loader-less fallback would hide it.
    pub fn loaders(&self) -> &Loaders {
        match self.loaders.as_deref() {
            Some(loaders) => loaders,
            None => panic!("no loaders attached to request context {}", self.request_id),
        }
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("request_id", &self.request_id)
            .field("actor", &self.actor)
            .field("has_loaders", &self.loaders.is_some())
            .finish()
    }
}
