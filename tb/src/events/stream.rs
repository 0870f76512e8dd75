//! Typed event streams for live subscription clients
//!
//! One [`EventStream`] per client per event kind. A background forward task
//! reads the bus subscription, keeps the events of the requested kind and
//! hands their mapped form to the client over a channel of the bus capacity.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tracing::debug;

use super::bus::{EventBus, Subscription};
use super::types::{Event, EventKind};

/// Lazy, non-restartable sequence of notifications of one kind for one team
///
/// Ends when the bus tears the subscription down. Dropping it is how a
/// client disconnects: the forward task notices and unsubscribes.
pub struct EventStream<N> {
    group: String,
    kind: EventKind,
    rx: mpsc::Receiver<N>,
}

impl<N: Send + 'static> EventStream<N> {
    /// Subscribe to `group` on `bus` and start forwarding `kind` events through `map`
    ///
    /// Must be called inside a tokio runtime. The subscription is registered
    /// before this returns, so every event published afterwards is seen.
    pub fn spawn<P, F>(bus: Arc<EventBus<P>>, group: &str, kind: EventKind, map: F) -> Self
    where
        P: Send + Sync + 'static,
        F: Fn(&Event<P>) -> N + Send + 'static,
    {
        debug!(%group, %kind, "EventStream::spawn: called");
        let subscription = bus.subscribe(group);
        let (tx, rx) = mpsc::channel(bus.capacity());
        tokio::spawn(forward(bus, subscription, kind, map, tx));
        Self {
            group: group.to_string(),
            kind,
            rx,
        }
    }
}

impl<N> EventStream<N> {
    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Next notification, or `None` once the subscription is gone
    pub async fn recv(&mut self) -> Option<N> {
        self.rx.recv().await
    }
}

impl<N> Stream for EventStream<N> {
    type Item = N;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<N>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

enum Step<P> {
    Disconnected,
    Closed,
    Received(Event<P>),
}

/// Forward task: runs until the client goes away or the subscription closes
async fn forward<P, N, F>(
    bus: Arc<EventBus<P>>,
    mut subscription: Subscription<P>,
    kind: EventKind,
    map: F,
    tx: mpsc::Sender<N>,
) where
    P: Send + Sync + 'static,
    N: Send + 'static,
    F: Fn(&Event<P>) -> N + Send + 'static,
{
    let id = subscription.id();
    loop {
        let step = tokio::select! {
            biased;
            _ = tx.closed() => Step::Disconnected,
            event = subscription.recv() => match event {
                Some(event) => Step::Received(event),
                None => Step::Closed,
            },
        };

        match step {
            Step::Received(event) => {
                if event.kind() != kind {
                    continue;
                }
                if tx.send(map(&event)).await.is_err() {
                    debug!(%id, %kind, "forward: client dropped during send");
                    bus.unsubscribe(subscription);
                    return;
                }
            }
            Step::Disconnected => {
                debug!(%id, %kind, "forward: client disconnected");
                bus.unsubscribe(subscription);
                return;
            }
            Step::Closed => {
                // Dropping tx ends the client's stream
                debug!(%id, %kind, "forward: subscription closed");
                return;
            }
        }
    }
}
