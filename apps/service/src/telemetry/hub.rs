use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use futures::Stream;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info};

use super::HubMessage;

/// Identifier of a registered sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SinkId(u64);

impl fmt::Display for SinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sink-{}", self.0)
    }
}

type SinkSender = mpsc::Sender<Arc<HubMessage>>;

struct HubInner {
    sinks: RwLock<HashMap<SinkId, SinkSender>>,
    buffer: usize,
    next_id: AtomicU64,
}

/// Fan-out broadcaster from the probe engine to live subscribers.
///
/// Every sink owns a bounded buffer of `buffer` messages. `publish` never
/// waits on a sink: a sink whose buffer is full is disconnected on the spot
/// and its stream ends once the already-buffered messages are consumed.
/// Sinks whose receiving side was dropped are pruned the same way.
#[derive(Clone)]
pub struct Hub {
    inner: Arc<HubInner>,
}

impl fmt::Debug for Hub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hub")
            .field("buffer", &self.inner.buffer)
            .field("sinks", &self.sink_count())
            .finish()
    }
}

impl Hub {
    pub fn new(buffer: usize) -> Self {
        Self {
            inner: Arc::new(HubInner {
                sinks: RwLock::new(HashMap::new()),
                buffer: buffer.max(1),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Register a new sink and return its receiving end
    pub fn register(&self) -> Subscription {
        let id = SinkId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.inner.buffer);
        self.inner.sinks.write().unwrap_or_else(PoisonError::into_inner).insert(id, tx);
        debug!(sink = %id, "Sink registered");
        Subscription { id, rx }
    }

    /// Remove a sink; returns false if it was already gone
    pub fn unregister(&self, id: SinkId) -> bool {
        let removed = self.inner.sinks.write().unwrap_or_else(PoisonError::into_inner).remove(&id).is_some();
        if removed {
            debug!(sink = %id, "Sink unregistered");
        }
        removed
    }

    pub fn sink_count(&self) -> usize {
        self.inner.sinks.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Deliver `message` to every registered sink without blocking.
    ///
    /// Delivery problems are handled here and never reported to the caller.
    pub fn publish(&self, message: HubMessage) {
        let message = Arc::new(message);
        let mut disconnected = Vec::new();

        {
            let sinks = self.inner.sinks.read().unwrap_or_else(PoisonError::into_inner);
            for (id, tx) in sinks.iter() {
                match tx.try_send(Arc::clone(&message)) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        info!(sink = %id, buffer = self.inner.buffer, "Sink buffer full, disconnecting");
                        disconnected.push(*id);
                    }
                    Err(TrySendError::Closed(_)) => {
                        debug!(sink = %id, "Sink closed by subscriber");
                        disconnected.push(*id);
                    }
                }
            }
        }

        if !disconnected.is_empty() {
            let mut sinks = self.inner.sinks.write().unwrap_or_else(PoisonError::into_inner);
            for id in disconnected {
                sinks.remove(&id);
            }
        }
    }
}

/// Receiving end of a registered sink.
///
/// Yields messages until the sink is unregistered or disconnected.
pub struct Subscription {
    id: SinkId,
    rx: mpsc::Receiver<Arc<HubMessage>>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish_non_exhaustive()
    }
}

impl Subscription {
    pub fn id(&self) -> SinkId {
        self.id
    }

    /// Next message, or `None` once the sink has been removed and drained
    pub async fn recv(&mut self) -> Option<Arc<HubMessage>> {
        self.rx.recv().await
    }

    /// Non-blocking variant of [`recv`](Self::recv)
    pub fn try_recv(&mut self) -> Option<Arc<HubMessage>> {
        self.rx.try_recv().ok()
    }

    /// Lazy stream over the remaining messages
    pub fn into_stream(self) -> impl Stream<Item = Arc<HubMessage>> + Send + 'static {
        futures::stream::unfold(self, |mut subscription| async move {
            subscription.recv().await.map(|message| (message, subscription))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use std::time::{Duration, Instant};

    fn settings_message(n: u64) -> HubMessage {
        HubMessage::SettingsChanged(Settings { ping_interval_sec: n, ..Settings::default() })
    }

    fn interval_of(message: &HubMessage) -> u64 {
        match message {
            HubMessage::SettingsChanged(settings) => settings.ping_interval_sec,
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_every_sink_in_order() {
        let hub = Hub::new(16);
        let mut first = hub.register();
        let mut second = hub.register();

        for n in 1..=5 {
            hub.publish(settings_message(n));
        }

        for sub in [&mut first, &mut second] {
            let received: Vec<u64> = (0..5).map(|_| interval_of(&sub.try_recv().unwrap())).collect();
            assert_eq!(received, vec![1, 2, 3, 4, 5]);
        }
    }

    #[tokio::test]
    async fn test_full_sink_is_disconnected_without_blocking() {
        let hub = Hub::new(2);
        let mut stalled = hub.register();
        let mut healthy = hub.register();

        let started = Instant::now();
        for n in 1..=3 {
            hub.publish(settings_message(n));
            let _ = healthy.try_recv();
        }
        assert!(started.elapsed() < Duration::from_millis(100));

        assert_eq!(hub.sink_count(), 1);
        assert_eq!(interval_of(&stalled.recv().await.unwrap()), 1);
        assert_eq!(interval_of(&stalled.recv().await.unwrap()), 2);
        assert!(stalled.recv().await.is_none());

        hub.publish(settings_message(4));
        assert_eq!(interval_of(&healthy.try_recv().unwrap()), 4);
    }

    #[tokio::test]
    async fn test_dropped_subscription_is_pruned() {
        let hub = Hub::new(4);
        let subscription = hub.register();
        assert_eq!(hub.sink_count(), 1);

        drop(subscription);
        hub.publish(HubMessage::MonitorsChanged);
        assert_eq!(hub.sink_count(), 0);
    }

    #[tokio::test]
    async fn test_unregister_ends_stream() {
        use futures::StreamExt;

        let hub = Hub::new(4);
        let subscription = hub.register();
        let id = subscription.id();
        hub.publish(HubMessage::MonitorsChanged);

        assert!(hub.unregister(id));
        assert!(!hub.unregister(id));

        let collected: Vec<_> = subscription.into_stream().collect().await;
        assert_eq!(collected.len(), 1);
        assert_eq!(*collected[0], HubMessage::MonitorsChanged);
    }

    #[tokio::test]
    async fn test_concurrent_register_and_publish() {
        let hub = Hub::new(1024);
        let publisher = {
            let hub = hub.clone();
            tokio::spawn(async move {
                for _ in 0..500 {
                    hub.publish(HubMessage::MonitorsChanged);
                    tokio::task::yield_now().await;
                }
            })
        };

        let mut subscriptions = Vec::new();
        for _ in 0..50 {
            subscriptions.push(hub.register());
            tokio::task::yield_now().await;
        }
        publisher.await.unwrap();

        assert_eq!(hub.sink_count(), 50);
        hub.publish(HubMessage::MonitorsChanged);
        for sub in &mut subscriptions {
            let mut received = 0;
            while sub.try_recv().is_some() {
                received += 1;
            }
            assert!(received >= 1, "sink {} missed the final message", sub.id());
        }
    }
}
