//! Event Bus - per-team publish/subscribe hub
//!
//! Subscribers are grouped by team id. Every subscriber owns one bounded
//! channel; a publish to a full channel waits until the subscriber drains it
//! or goes away. The registry lock is only held to read or edit the
//! subscriber lists, never across a send.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::types::{Event, EventKind};

/// Default per-subscriber channel capacity (events)
/// One undelivered event per subscriber; the next publish waits for it to drain.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1;

/// Source of subscriber ids; shared by every bus so a handle can never
/// match a subscriber registered on another bus
static NEXT_SUBSCRIBER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one subscription, unique within the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

struct Subscriber<P> {
    id: SubscriberId,
    tx: mpsc::Sender<Event<P>>,
}

struct Group<P> {
    /// Serialises publishes to this group so all subscribers see one order
    lane: Arc<tokio::sync::Mutex<()>>,
    subscribers: Vec<Subscriber<P>>,
}

impl<P> Group<P> {
    fn new() -> Self {
        Self {
            lane: Arc::new(tokio::sync::Mutex::new(())),
            subscribers: Vec::new(),
        }
    }
}

/// Receiving end of one bus subscription
///
/// Hand it back to [`EventBus::unsubscribe`] when done. Taking it by value
/// makes a second unsubscribe of the same handle impossible.
pub struct Subscription<P> {
    id: SubscriberId,
    group: String,
    rx: mpsc::Receiver<Event<P>>,
}

impl<P> Subscription<P> {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    /// Next event, or `None` once the bus has dropped this subscriber
    pub async fn recv(&mut self) -> Option<Event<P>> {
        self.rx.recv().await
    }

    /// Next buffered event without waiting
    pub fn try_recv(&mut self) -> Option<Event<P>> {
        self.rx.try_recv().ok()
    }
}

impl<P> std::fmt::Debug for Subscription<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("group", &self.group)
            .finish()
    }
}

/// In-memory topic registry keyed by team id
pub struct EventBus<P> {
    groups: Mutex<HashMap<String, Group<P>>>,
    capacity: usize,
}

impl<P: Send + Sync + 'static> EventBus<P> {
    /// Create a new event bus; `capacity` is the per-subscriber buffer (at least 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        debug!(capacity, "EventBus::new: creating event bus");
        Self {
            groups: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    /// Create a new event bus with default capacity
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Per-subscriber channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<String, Group<P>>> {
        // Registry edits never leave a list half-written, so a poisoned lock is still usable
        self.groups.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new subscriber under `group`
    ///
    /// Only events published after this call are received.
    pub fn subscribe(&self, group: &str) -> Subscription<P> {
        let (tx, rx) = mpsc::channel(self.capacity);
        let id = SubscriberId(NEXT_SUBSCRIBER_ID.fetch_add(1, Ordering::Relaxed));

        let count = {
            let mut groups = self.registry();
            let entry = groups.entry(group.to_string()).or_insert_with(Group::new);
            entry.subscribers.retain(|s| !s.tx.is_closed());
            entry.subscribers.push(Subscriber { id, tx });
            entry.subscribers.len()
        };

        info!(%group, %id, subscribers = count, "EventBus::subscribe: new subscriber");
        Subscription {
            id,
            group: group.to_string(),
            rx,
        }
    }

    /// Build an event and deliver it to every subscriber of `group`
    ///
    /// Subscribers are served in registration order. With no subscribers the
    /// event is dropped and the call returns at once. Waits while a
    /// subscriber's buffer is full; a subscriber that goes away meanwhile is
    /// skipped. Returns the number of subscribers that got the event.
    pub async fn publish(&self, group: &str, kind: EventKind, payload: P) -> usize {
        debug!(%group, %kind, "EventBus::publish: called");

        let lane = {
            let groups = self.registry();
            match groups.get(group) {
                Some(g) => Arc::clone(&g.lane),
                None => {
                    debug!(%group, "EventBus::publish: no subscribers, dropping event");
                    return 0;
                }
            }
        };
        let _turn = lane.lock().await;

        // Snapshot under the lock, send outside it
        let targets: Vec<(SubscriberId, mpsc::Sender<Event<P>>)> = {
            let groups = self.registry();
            groups
                .get(group)
                .map(|g| g.subscribers.iter().map(|s| (s.id, s.tx.clone())).collect())
                .unwrap_or_default()
        };

        let event = Event::new(kind, group, payload);
        let mut delivered = 0;
        let mut gone = Vec::new();
        for (id, tx) in targets {
            match tx.send(event.clone()).await {
                Ok(()) => delivered += 1,
                Err(_) => {
                    debug!(%group, %id, "EventBus::publish: subscriber gone");
                    gone.push(id);
                }
            }
        }

        if !gone.is_empty() {
            self.remove(group, &gone);
        }

        debug!(%group, %kind, delivered, "EventBus::publish: done");
        delivered
    }

    /// Remove a subscription and close its channel
    ///
    /// An unknown handle (already dropped by `close_group` or `shutdown`, or
    /// issued by another bus) is logged and ignored. Returns whether the
    /// handle was registered.
    pub fn unsubscribe(&self, subscription: Subscription<P>) -> bool {
        let Subscription { id, group, mut rx } = subscription;
        debug!(%group, %id, "EventBus::unsubscribe: called");

        // Closing the receiving side wakes any publisher waiting on this channel
        rx.close();
        let removed = self.remove(&group, &[id]);
        drop(rx);

        if removed {
            info!(%group, %id, "EventBus::unsubscribe: removed subscriber");
        } else {
            warn!(%group, %id, "EventBus::unsubscribe: subscriber not registered, ignoring");
        }
        removed
    }

    /// Drop registry entries for `ids`; empties the group entry when nothing is left
    fn remove(&self, group: &str, ids: &[SubscriberId]) -> bool {
        let mut groups = self.registry();
        let Some(entry) = groups.get_mut(group) else {
            return false;
        };
        let before = entry.subscribers.len();
        entry.subscribers.retain(|s| !ids.contains(&s.id));
        let removed = entry.subscribers.len() != before;
        if entry.subscribers.is_empty() {
            groups.remove(group);
        }
        removed
    }

    /// Tear down every subscription of `group`; their streams end
    pub fn close_group(&self, group: &str) -> usize {
        let closed = self.registry().remove(group).map(|g| g.subscribers.len()).unwrap_or(0);
        info!(%group, closed, "EventBus::close_group: closed subscriptions");
        closed
    }

    /// Tear down every subscription on the bus
    pub fn shutdown(&self) -> usize {
        let drained: Vec<Group<P>> = self.registry().drain().map(|(_, g)| g).collect();
        let closed = drained.iter().map(|g| g.subscribers.len()).sum();
        info!(closed, "EventBus::shutdown: closed all subscriptions");
        closed
    }

    /// Number of subscribers registered under `group`
    pub fn subscriber_count(&self, group: &str) -> usize {
        self.registry().get(group).map(|g| g.subscribers.len()).unwrap_or(0)
    }

    /// Number of groups with at least one subscriber
    pub fn group_count(&self) -> usize {
        self.registry().len()
    }
}

impl<P: Send + Sync + 'static> Default for EventBus<P> {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}
