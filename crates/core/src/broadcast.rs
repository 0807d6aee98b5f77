//! Fan-out of live reports to any number of subscribers.

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Mutex;

const LOG_TARGET: &str = "broadcast";
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 32;

struct Subscriber<T> {
    tx: mpsc::Sender<T>,
    lossless: bool,
}

/// Fans items out to subscribers. Closed subscribers are dropped.
///
/// A plain subscriber that is full misses the item. A lossless subscriber is waited on until
/// it has room, so it slows every broadcast down to its own pace.
pub struct Broadcaster<T> {
    subscribers: Mutex<Vec<Subscriber<T>>>,
    capacity: usize,
}

impl<T> Default for Broadcaster<T>
where
    T: Clone + Send,
{
    fn default() -> Self {
        Self::new(DEFAULT_SUBSCRIBER_CAPACITY)
    }
}

impl<T> Broadcaster<T>
where
    T: Clone + Send,
{
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            capacity: capacity.max(1),
        }
    }

    pub async fn subscribe(&self) -> mpsc::Receiver<T> {
        self.add_subscriber(false).await
    }

    /// For consumers that must see every item, such as a persisted log.
    pub async fn subscribe_lossless(&self) -> mpsc::Receiver<T> {
        self.add_subscriber(true).await
    }

    async fn add_subscriber(&self, lossless: bool) -> mpsc::Receiver<T> {
        let (tx, rx) = mpsc::channel(self.capacity);
        let mut subscribers = self.subscribers.lock().await;
        subscribers.push(Subscriber { tx, lossless });
        tracing::debug!(
            target: LOG_TARGET,
            subscribers = subscribers.len(),
            lossless,
            "subscriber added"
        );
        rx
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.lock().await.len()
    }

    /// Returns how many subscribers received the item.
    pub async fn broadcast(&self, item: &T) -> usize {
        let mut subscribers = self.subscribers.lock().await;
        let mut delivered = 0;
        let mut kept = Vec::with_capacity(subscribers.len());

        for sub in subscribers.drain(..) {
            let open = if sub.lossless {
                let sent = sub.tx.send(item.clone()).await.is_ok();
                delivered += usize::from(sent);
                sent
            } else {
                match sub.tx.try_send(item.clone()) {
                    Ok(()) => {
                        delivered += 1;
                        true
                    }
                    Err(TrySendError::Full(_)) => {
                        tracing::warn!(target: LOG_TARGET, "subscriber lagging, dropping item");
                        true
                    }
                    Err(TrySendError::Closed(_)) => false,
                }
            };
            if open {
                kept.push(sub);
            }
        }

        *subscribers = kept;
        delivered
    }
}
