//! In-process publish/subscribe for document events
//!
//! Every subscriber owns a private queue. The bus only keeps the sending
//! halves, grouped by topic. Publishing walks the subscribers of the event's
//! topic plus the global topic and offers the event to each queue without
//! waiting: a full or closed queue loses that one event and nothing else.
//!
//! The registry lock is a synchronous `parking_lot::RwLock` that is never
//! held across an `.await`. Publishers share the read lock, so events for
//! unrelated documents are fanned out concurrently; only registration
//! changes take the write lock.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::types::{DocumentEvent, Topic};
use crate::config::{QueuePolicy, MAX_QUEUE_CAPACITY};

/// Identifies one registration on the bus
pub type SubscriberId = u64;

type SubscriberMap = HashMap<SubscriberId, QueueSender>;

/// Shared event bus handle
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<EventBusInner>,
}

struct EventBusInner {
    /// Topic → live subscriber queues
    topics: RwLock<HashMap<Topic, SubscriberMap>>,

    next_id: AtomicU64,

    /// Capacity policy applied to queues created from now on
    policy: QueuePolicy,

    /// Events that could not be enqueued because a queue was full
    dropped: AtomicU64,

    closed: AtomicBool,
}

/// Snapshot of registry size, for health reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct BusStats {
    pub topics: usize,
    pub subscribers: usize,
    pub dropped: u64,
}

impl EventBus {
    /// Create an empty bus
    pub fn new(policy: QueuePolicy) -> Self {
        Self {
            inner: Arc::new(EventBusInner {
                topics: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                policy,
                dropped: AtomicU64::new(0),
                closed: AtomicBool::new(false),
            }),
        }
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Register a new queue under `topic`
    ///
    /// Never fails. On a closed bus the returned subscription is already at
    /// end-of-stream.
    pub fn subscribe(&self, topic: Topic) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = queue(self.inner.policy);

        let registered = {
            let mut topics = self.inner.topics.write();
            // Checked under the lock so `close` cannot miss this registration
            if self.inner.closed.load(Ordering::Acquire) {
                false
            } else {
                topics.entry(topic.clone()).or_default().insert(id, sender);
                true
            }
        };

        if registered {
            tracing::debug!(subscriber_id = id, topic = %topic, "Subscriber registered");
        } else {
            tracing::debug!(subscriber_id = id, topic = %topic, "Subscribe on closed bus");
        }

        Subscription {
            id,
            topic,
            receiver,
            bus: self.clone(),
            registered,
        }
    }

    /// Remove a registration
    ///
    /// Returns `false` if it was already gone. Empty topics are discarded.
    pub fn unsubscribe(&self, topic: &Topic, id: SubscriberId) -> bool {
        let removed = {
            let mut topics = self.inner.topics.write();
            match topics.get_mut(topic) {
                Some(subscribers) => {
                    let removed = subscribers.remove(&id).is_some();
                    if subscribers.is_empty() {
                        topics.remove(topic);
                    }
                    removed
                }
                None => false,
            }
        };

        if removed {
            tracing::debug!(subscriber_id = id, topic = %topic, "Subscriber removed");
        }

        removed
    }

    // ========================================================================
    // Delivery
    // ========================================================================

    /// Offer `event` to every subscriber of `topic` and of the global topic
    ///
    /// Never blocks and never fails. Returns how many queues accepted the
    /// event.
    pub fn publish(&self, topic: &Topic, event: DocumentEvent) -> usize {
        let event = Arc::new(event);
        let mut delivered = 0;
        let mut full = 0u64;
        let global_topic = Topic::Global;

        {
            let topics = self.inner.topics.read();
            let global = (!topic.is_global()).then_some(&global_topic);

            for target in std::iter::once(topic).chain(global) {
                let Some(subscribers) = topics.get(target) else {
                    continue;
                };
                for (id, sender) in subscribers {
                    match sender.offer(&event) {
                        Offer::Accepted => delivered += 1,
                        Offer::Full => {
                            full += 1;
                            tracing::warn!(
                                subscriber_id = *id,
                                topic = %target,
                                event = %event.event,
                                "Subscriber queue full, event dropped"
                            );
                        }
                        // Receiver is mid-teardown; its registration is about to go
                        Offer::Closed => {}
                    }
                }
            }
        }

        if full > 0 {
            self.inner.dropped.fetch_add(full, Ordering::Relaxed);
        }

        tracing::debug!(topic = %topic, event = %event.event, delivered, "Event published");

        delivered
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Release every queue; pending pulls observe end-of-stream
    ///
    /// Used on process shutdown. Later subscriptions are born closed.
    pub fn close(&self) {
        let released = {
            let mut topics = self.inner.topics.write();
            self.inner.closed.store(true, Ordering::Release);
            let count: usize = topics.values().map(HashMap::len).sum();
            topics.clear();
            count
        };

        tracing::info!(subscribers = released, "Event bus closed");
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        self.inner.topics.read().get(topic).map_or(0, HashMap::len)
    }

    pub fn topic_count(&self) -> usize {
        self.inner.topics.read().len()
    }

    pub fn dropped_count(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> BusStats {
        let topics = self.inner.topics.read();
        BusStats {
            topics: topics.len(),
            subscribers: topics.values().map(HashMap::len).sum(),
            dropped: self.dropped_count(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(QueuePolicy::default())
    }
}

// ============================================================================
// Subscription
// ============================================================================

/// Receiving side of one registration
///
/// Dropping the subscription unregisters it.
pub struct Subscription {
    id: SubscriberId,
    topic: Topic,
    receiver: QueueReceiver,
    bus: EventBus,
    registered: bool,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next event
    ///
    /// Returns `None` once the subscription has been removed from the bus
    /// (unsubscribe or bus shutdown) and its queue is drained. Cancel-safe.
    pub async fn pull(&mut self) -> Option<Arc<DocumentEvent>> {
        self.receiver.recv().await
    }

    /// Take an already queued event without waiting
    pub fn try_pull(&mut self) -> Option<Arc<DocumentEvent>> {
        self.receiver.try_recv()
    }

    /// Remove this registration from the bus
    ///
    /// Returns `true` only for the call that actually removed it.
    pub fn unsubscribe(&mut self) -> bool {
        if !std::mem::replace(&mut self.registered, false) {
            return false;
        }
        self.bus.unsubscribe(&self.topic, self.id)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("topic", &self.topic)
            .field("registered", &self.registered)
            .finish()
    }
}

// ============================================================================
// Queues
// ============================================================================

enum Offer {
    Accepted,
    Full,
    Closed,
}

enum QueueSender {
    Bounded(mpsc::Sender<Arc<DocumentEvent>>),
    Unbounded(mpsc::UnboundedSender<Arc<DocumentEvent>>),
}

impl QueueSender {
    fn offer(&self, event: &Arc<DocumentEvent>) -> Offer {
        match self {
            QueueSender::Bounded(tx) => match tx.try_send(Arc::clone(event)) {
                Ok(()) => Offer::Accepted,
                Err(mpsc::error::TrySendError::Full(_)) => Offer::Full,
                Err(mpsc::error::TrySendError::Closed(_)) => Offer::Closed,
            },
            QueueSender::Unbounded(tx) => match tx.send(Arc::clone(event)) {
                Ok(()) => Offer::Accepted,
                Err(_) => Offer::Closed,
            },
        }
    }
}

enum QueueReceiver {
    Bounded(mpsc::Receiver<Arc<DocumentEvent>>),
    Unbounded(mpsc::UnboundedReceiver<Arc<DocumentEvent>>),
}

impl QueueReceiver {
    async fn recv(&mut self) -> Option<Arc<DocumentEvent>> {
        match self {
            QueueReceiver::Bounded(rx) => rx.recv().await,
            QueueReceiver::Unbounded(rx) => rx.recv().await,
        }
    }

    fn try_recv(&mut self) -> Option<Arc<DocumentEvent>> {
        match self {
            QueueReceiver::Bounded(rx) => rx.try_recv().ok(),
            QueueReceiver::Unbounded(rx) => rx.try_recv().ok(),
        }
    }
}

fn queue(policy: QueuePolicy) -> (QueueSender, QueueReceiver) {
    match policy {
        QueuePolicy::Unbounded => {
            let (tx, rx) = mpsc::unbounded_channel();
            (QueueSender::Unbounded(tx), QueueReceiver::Unbounded(rx))
        }
        QueuePolicy::Bounded(capacity) => {
            let (tx, rx) = mpsc::channel(capacity.clamp(1, MAX_QUEUE_CAPACITY));
            (QueueSender::Bounded(tx), QueueReceiver::Bounded(rx))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use std::time::Duration;

    fn event(doc_id: &str, kind: EventKind) -> DocumentEvent {
        let mut event = DocumentEvent::connected(&Topic::document(doc_id));
        event.event = kind;
        event
    }

    fn drain(subscription: &mut Subscription) -> Vec<Arc<DocumentEvent>> {
        std::iter::from_fn(|| subscription.try_pull()).collect()
    }

    #[tokio::test]
    async fn test_fan_out_exactly_once_per_subscriber() {
        for k in 0..5 {
            let bus = EventBus::new(QueuePolicy::Unbounded);
            let topic = Topic::document("d1");
            let mut doc_subs: Vec<_> = (0..k).map(|_| bus.subscribe(topic.clone())).collect();
            let mut global_subs: Vec<_> = (0..2).map(|_| bus.subscribe(Topic::Global)).collect();

            let delivered = bus.publish(&topic, event("d1", EventKind::ProcessingStarted));
            assert_eq!(delivered, k + 2);

            for sub in doc_subs.iter_mut().chain(global_subs.iter_mut()) {
                let received = drain(sub);
                assert_eq!(received.len(), 1);
                assert_eq!(received[0].event, EventKind::ProcessingStarted);
                assert_eq!(received[0].doc_id.as_deref(), Some("d1"));
            }
        }
    }

    #[tokio::test]
    async fn test_global_publish_not_duplicated() {
        let bus = EventBus::new(QueuePolicy::Unbounded);
        let mut global = bus.subscribe(Topic::Global);

        assert_eq!(bus.publish(&Topic::Global, event("d1", EventKind::Uploaded)), 1);
        assert_eq!(drain(&mut global).len(), 1);
    }

    #[tokio::test]
    async fn test_topics_are_isolated() {
        let bus = EventBus::new(QueuePolicy::Unbounded);
        let mut d1 = bus.subscribe(Topic::document("d1"));
        let mut d2 = bus.subscribe(Topic::document("d2"));

        bus.publish(&Topic::document("d1"), event("d1", EventKind::ResultReady));

        assert_eq!(drain(&mut d1).len(), 1);
        assert!(drain(&mut d2).is_empty());
    }

    #[tokio::test]
    async fn test_unsubscribe_idempotent_and_discards_empty_topic() {
        let bus = EventBus::new(QueuePolicy::Unbounded);
        let topic = Topic::document("d1");
        let mut first = bus.subscribe(topic.clone());
        let _second = bus.subscribe(topic.clone());
        assert_eq!(bus.subscriber_count(&topic), 2);

        assert!(first.unsubscribe());
        assert_eq!(bus.subscriber_count(&topic), 1);
        assert!(!first.unsubscribe());
        assert!(!bus.unsubscribe(&topic, first.id()));
        assert_eq!(bus.subscriber_count(&topic), 1);
        assert_eq!(bus.topic_count(), 1);

        drop(_second);
        assert_eq!(bus.subscriber_count(&topic), 0);
        assert_eq!(bus.topic_count(), 0);
    }

    #[tokio::test]
    async fn test_no_delivery_after_unsubscribe() {
        let bus = EventBus::new(QueuePolicy::Unbounded);
        let topic = Topic::document("d1");
        let mut old = bus.subscribe(topic.clone());
        old.unsubscribe();

        let mut fresh = bus.subscribe(topic.clone());
        bus.publish(&topic, event("d1", EventKind::Error));

        assert!(old.pull().await.is_none());
        let received = drain(&mut fresh);
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].event, EventKind::Error);
    }

    #[tokio::test]
    async fn test_full_queue_drops_only_for_that_subscriber() {
        let bus = EventBus::new(QueuePolicy::Bounded(2));
        let topic = Topic::document("d1");
        let _stalled = bus.subscribe(topic.clone());
        let mut active = bus.subscribe(topic.clone());

        for _ in 0..5 {
            bus.publish(&topic, event("d1", EventKind::ProcessingStarted));
            assert_eq!(drain(&mut active).len(), 1);
        }

        // Stalled queue accepted two, lost three
        assert_eq!(bus.dropped_count(), 3);
    }

    #[tokio::test]
    async fn test_publish_does_not_wait_for_stalled_subscribers() {
        let bus = EventBus::new(QueuePolicy::Bounded(1));
        let topic = Topic::document("d1");
        let _stalled: Vec<_> = (0..100).map(|_| bus.subscribe(topic.clone())).collect();

        let publishing = async {
            for _ in 0..1000 {
                bus.publish(&topic, event("d1", EventKind::ProcessingStarted));
            }
        };
        tokio::time::timeout(Duration::from_secs(5), publishing)
            .await
            .expect("publish blocked on a full queue");
    }

    #[tokio::test]
    async fn test_oversized_capacity_still_subscribes() {
        let bus = EventBus::new(QueuePolicy::Bounded(usize::MAX));
        let mut sub = bus.subscribe(Topic::Global);

        assert_eq!(bus.publish(&Topic::document("d1"), event("d1", EventKind::Uploaded)), 1);
        assert_eq!(drain(&mut sub).len(), 1);

        let parsed = QueuePolicy::parse(&usize::MAX.to_string()).unwrap();
        let bus = EventBus::new(parsed);
        let _sub = bus.subscribe(Topic::Global);
        assert_eq!(bus.stats().subscribers, 1);
    }

    #[tokio::test]
    async fn test_pull_waits_for_next_event() {
        let bus = EventBus::new(QueuePolicy::Unbounded);
        let mut sub = bus.subscribe(Topic::document("d1"));

        let waiter = tokio::spawn(async move { sub.pull().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        bus.publish(&Topic::document("d1"), event("d1", EventKind::ResultReady));
        let received = waiter.await.unwrap().unwrap();
        assert_eq!(received.event, EventKind::ResultReady);
    }

    #[tokio::test]
    async fn test_close_ends_pending_pulls() {
        let bus = EventBus::new(QueuePolicy::Unbounded);
        let mut sub = bus.subscribe(Topic::Global);

        let waiter = tokio::spawn(async move { sub.pull().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        bus.close();

        assert!(waiter.await.unwrap().is_none());
        assert_eq!(bus.topic_count(), 0);

        let mut late = bus.subscribe(Topic::Global);
        assert!(late.pull().await.is_none());
        assert_eq!(bus.stats().subscribers, 0);
    }

    #[tokio::test]
    async fn test_concurrent_subscribe_publish_unsubscribe() {
        let bus = EventBus::new(QueuePolicy::Unbounded);
        let mut tasks = Vec::new();

        for n in 0..16 {
            let bus = bus.clone();
            tasks.push(tokio::spawn(async move {
                let doc = format!("d{}", n % 4);
                let mut sub = bus.subscribe(Topic::document(doc.clone()));
                bus.publish(&Topic::document(doc.clone()), event(&doc, EventKind::Uploaded));
                tokio::task::yield_now().await;
                let got = sub.pull().await;
                sub.unsubscribe();
                got.is_some()
            }));
        }

        for task in tasks {
            assert!(task.await.unwrap());
        }
        assert_eq!(bus.topic_count(), 0);
    }
}
