//! Stream sessions
//!
//! A session binds one long-lived observer connection to one topic:
//!
//! ```text
//! connecting ──(connected event)──> streaming ──(disconnect / shutdown)──> closed
//! ```
//!
//! The registration is made when the session opens, before the `connected`
//! event goes out, so nothing published after the observer was accepted is
//! missed. Leaving `streaming` by any path (end of queue, the transport
//! dropping the stream, a panic unwinding through it) unregisters exactly
//! once: `close` takes the subscription out of the session and `Drop` calls
//! `close`.

use futures::Stream;
use std::sync::Arc;

use super::bus::{EventBus, Subscription};
use super::types::{DocumentEvent, Topic};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Streaming,
    Closed,
}

/// One observer connection's view of the bus
pub struct StreamSession {
    topic: Topic,
    state: SessionState,
    subscription: Option<Subscription>,
    delivered: u64,
}

impl StreamSession {
    /// Register with the bus; the session starts in `Connecting`
    pub fn open(bus: &EventBus, topic: Topic) -> Self {
        let subscription = bus.subscribe(topic.clone());

        tracing::info!(
            topic = %topic,
            subscriber_id = subscription.id(),
            "Event stream opened"
        );

        Self {
            topic,
            state: SessionState::Connecting,
            subscription: Some(subscription),
            delivered: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Events forwarded from the bus so far (the `connected` event excluded)
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    /// Next event for the observer
    ///
    /// The first call yields the synthetic `connected` event. After that it
    /// waits on the bus queue. `None` means the session is closed.
    pub async fn next_event(&mut self) -> Option<Arc<DocumentEvent>> {
        match self.state {
            SessionState::Connecting => {
                self.state = SessionState::Streaming;
                Some(Arc::new(DocumentEvent::connected(&self.topic)))
            }
            SessionState::Streaming => {
                let pulled = match self.subscription.as_mut() {
                    Some(subscription) => subscription.pull().await,
                    None => None,
                };
                match pulled {
                    Some(event) => {
                        self.delivered += 1;
                        Some(event)
                    }
                    None => {
                        self.close();
                        None
                    }
                }
            }
            SessionState::Closed => None,
        }
    }

    /// Unregister and stop; later calls are no-ops
    pub fn close(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.unsubscribe();
            tracing::info!(
                topic = %self.topic,
                subscriber_id = subscription.id(),
                delivered = self.delivered,
                "Event stream closed"
            );
        }
        self.state = SessionState::Closed;
    }

    /// Drive the session as a stream; dropping the stream closes the session
    pub fn into_stream(self) -> impl Stream<Item = Arc<DocumentEvent>> + Send + 'static {
        futures::stream::unfold(self, |mut session| async move {
            let event = session.next_event().await?;
            Some((event, session))
        })
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueuePolicy;
    use crate::events::EventKind;
    use futures::StreamExt;
    use std::time::Duration;

    fn bus() -> EventBus {
        EventBus::new(QueuePolicy::Unbounded)
    }

    fn ready_event(doc_id: &str) -> DocumentEvent {
        let mut event = DocumentEvent::connected(&Topic::document(doc_id));
        event.event = EventKind::ResultReady;
        event
    }

    #[tokio::test]
    async fn test_connected_event_comes_first() {
        let bus = bus();
        let mut session = StreamSession::open(&bus, Topic::document("d1"));
        assert_eq!(session.state(), SessionState::Connecting);

        // Published before the observer read anything: still delivered after `connected`
        bus.publish(&Topic::document("d1"), ready_event("d1"));

        let first = session.next_event().await.unwrap();
        assert_eq!(first.event, EventKind::Connected);
        assert_eq!(first.doc_id.as_deref(), Some("d1"));
        assert_eq!(session.state(), SessionState::Streaming);

        let second = session.next_event().await.unwrap();
        assert_eq!(second.event, EventKind::ResultReady);
        assert_eq!(session.delivered(), 1);
    }

    #[tokio::test]
    async fn test_close_unregisters_once() {
        let bus = bus();
        let topic = Topic::Global;
        let mut session = StreamSession::open(&bus, topic.clone());
        assert_eq!(bus.subscriber_count(&topic), 1);

        session.close();
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(bus.subscriber_count(&topic), 0);

        session.close();
        drop(session);
        assert_eq!(bus.topic_count(), 0);
        assert!(bus.publish(&topic, ready_event("d1")) == 0);
    }

    #[tokio::test]
    async fn test_dropping_stream_unregisters() {
        let bus = bus();
        let topic = Topic::document("d1");
        let mut stream = Box::pin(StreamSession::open(&bus, topic.clone()).into_stream());

        let connected = stream.next().await.unwrap();
        assert_eq!(connected.event, EventKind::Connected);

        // Observer blocked in pull, then the transport goes away
        let pending = tokio::time::timeout(Duration::from_millis(20), stream.next()).await;
        assert!(pending.is_err());
        assert_eq!(bus.subscriber_count(&topic), 1);

        drop(stream);
        assert_eq!(bus.subscriber_count(&topic), 0);
    }

    #[tokio::test]
    async fn test_bus_shutdown_ends_stream() {
        let bus = bus();
        let stream = StreamSession::open(&bus, Topic::Global).into_stream();

        let collector = tokio::spawn(async move { stream.collect::<Vec<_>>().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        bus.publish(&Topic::document("d7"), ready_event("d7"));
        tokio::time::sleep(Duration::from_millis(10)).await;
        bus.close();

        let events = collector.await.unwrap();
        let kinds: Vec<_> = events.iter().map(|e| e.event).collect();
        assert_eq!(kinds, vec![EventKind::Connected, EventKind::ResultReady]);
        assert_eq!(events[1].doc_id.as_deref(), Some("d7"));
    }

    #[tokio::test]
    async fn test_global_connected_carries_scope() {
        let bus = bus();
        let mut session = StreamSession::open(&bus, Topic::Global);
        let connected = session.next_event().await.unwrap();
        assert_eq!(connected.scope, Some("global"));
        assert!(connected.doc_id.is_none());
    }
}
