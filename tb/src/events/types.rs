//! Event vocabulary

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// The mutation that produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Created,
    Updated,
    Deleted,
}

impl EventKind {
    pub const ALL: [EventKind; 3] = [EventKind::Created, EventKind::Updated, EventKind::Deleted];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "created" => Ok(Self::Created),
            "updated" => Ok(Self::Updated),
            "deleted" => Ok(Self::Deleted),
            other => Err(format!("unknown event kind '{}'", other)),
        }
    }
}

/// One published change, shared by every subscriber of its group
///
/// Fields are fixed at construction; cloning shares the payload.
#[derive(Debug)]
pub struct Event<P> {
    kind: EventKind,
    group: String,
    payload: Arc<P>,
}

impl<P> Event<P> {
    pub fn new(kind: EventKind, group: impl Into<String>, payload: P) -> Self {
        Self {
            kind,
            group: group.into(),
            payload: Arc::new(payload),
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    /// Shared handle to the payload
    pub fn payload_arc(&self) -> Arc<P> {
        Arc::clone(&self.payload)
    }
}

impl<P> Clone for Event<P> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            group: self.group.clone(),
            payload: Arc::clone(&self.payload),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_round_trip_names() {
        for kind in EventKind::ALL {
            assert_eq!(kind.as_str().parse::<EventKind>().unwrap(), kind);
        }
        assert!("moved".parse::<EventKind>().is_err());
    }

    #[test]
    fn test_event_clone_shares_payload() {
        let event = Event::new(EventKind::Created, "team-1", vec![1, 2, 3]);
        let copy = event.clone();
        assert!(Arc::ptr_eq(&event.payload_arc(), &copy.payload_arc()));
        assert_eq!(copy.group(), "team-1");
        assert_eq!(copy.kind(), EventKind::Created);
    }
}
