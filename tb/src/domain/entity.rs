//! Entity trait and audit fields shared by every record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Generate a fresh record id (UUIDv7, time ordered)
pub fn generate_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

/// Creation/modification stamps carried by every record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Audit {
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub created_by: Option<String>,
    pub modified_by: Option<String>,
}

impl Audit {
    /// Stamp a new record as created now by `actor`
    pub fn new(actor: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            modified_at: now,
            created_by: actor.clone(),
            modified_by: actor,
        }
    }

    /// Record a modification by `actor`
    pub fn touch(&mut self, actor: Option<String>) {
        self.modified_at = Utc::now();
        if actor.is_some() {
            self.modified_by = actor;
        }
    }
}

impl Default for Audit {
    fn default() -> Self {
        Self::new(None)
    }
}

/// A record addressable by a string id
pub trait Entity: Clone + Send + Sync + 'static {
    /// Human readable kind, used in errors and logs
    const KIND: &'static str;

    fn id(&self) -> &str;

    /// Replace the id (used by repositories on create when the id is empty)
    fn assign_id(&mut self, id: String);

    fn audit(&self) -> &Audit;

    fn audit_mut(&mut self) -> &mut Audit;
}

/// Implements [`Entity`] for a record with `id: String` and `audit: Audit` fields
macro_rules! impl_entity {
    ($ty:ty, $kind:literal) => {
        impl $crate::domain::Entity for $ty {
            const KIND: &'static str = $kind;

            fn id(&self) -> &str {
                &self.id
            }

            fn assign_id(&mut self, id: String) {
                self.id = id;
            }

            fn audit(&self) -> &$crate::domain::Audit {
                &self.audit
            }

            fn audit_mut(&mut self) -> &mut $crate::domain::Audit {
                &mut self.audit
            }
        }
    };
}

pub(crate) use impl_entity;
