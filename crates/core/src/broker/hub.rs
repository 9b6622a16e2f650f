//! Topic registry and fan-out.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;

use crate::metrics::{BROKER_ACTIVE_SUBSCRIBERS, BROKER_DELIVERIES_DROPPED, BROKER_MESSAGES_PUBLISHED};

use super::subscriber::{Delivery, Subscriber};

/// Inbox capacity used when none is configured.
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 10;

/// Errors returned by the broker.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BrokerError {
    /// The broker has been closed and accepts no new subscribers.
    #[error("broker is closed")]
    Closed,
}

type Registry<M> = HashMap<String, HashMap<u64, Arc<Delivery<M>>>>;

/// Topic-keyed publish/subscribe hub.
///
/// Publishing takes the registry's read lock; subscribing, unsubscribing and
/// closing take the write lock. No lock is held across an await point.
pub struct Broker<M> {
    topics: RwLock<Registry<M>>,
    next_id: AtomicU64,
    capacity: usize,
    closed: AtomicBool,
}

impl<M: Clone + Send + 'static> Broker<M> {
    /// Creates a broker whose subscribers buffer at most `capacity` messages.
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            capacity: capacity.max(1),
            closed: AtomicBool::new(false),
        }
    }

    /// Inbox capacity given to each new subscriber.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Registers a new subscriber under `topic`.
    pub fn subscribe(&self, topic: &str) -> Result<Subscriber<M>, BrokerError> {
        let mut topics = self.write();
        if self.closed.load(Ordering::Acquire) {
            return Err(BrokerError::Closed);
        }

        Self::sweep_done_locked(&mut topics);

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (subscriber, delivery) = Subscriber::new(id, topic.to_string(), self.capacity);
        topics.entry(topic.to_string()).or_default().insert(id, delivery);
        BROKER_ACTIVE_SUBSCRIBERS.inc();

        debug!(topic, subscriber_id = id, "Subscriber registered");
        Ok(subscriber)
    }

    /// Removes `subscriber` from `topic` and signals its completion.
    ///
    /// Returns `true` if this call signaled completion. Calling it again, or
    /// after [`close`](Self::close), is a no-op that returns `false`.
    pub fn unsubscribe(&self, topic: &str, subscriber: &Subscriber<M>) -> bool {
        let removed = {
            let mut topics = self.write();
            let removed = Self::remove_locked(&mut topics, topic, subscriber.id());
            Self::sweep_done_locked(&mut topics);
            removed
        };

        match removed {
            Some(delivery) => {
                debug!(topic, subscriber_id = subscriber.id(), "Subscriber removed");
                delivery.signal_done()
            }
            None => false,
        }
    }

    /// Delivers `message` to every subscriber currently registered under `topic`.
    ///
    /// Never blocks: a subscriber with a full inbox misses this message, and a
    /// subscriber that has already completed is unregistered instead. Returns
    /// the number of subscribers the message was enqueued for.
    pub fn publish(&self, topic: &str, message: M) -> usize {
        BROKER_MESSAGES_PUBLISHED.inc();

        let mut delivered = 0;
        let mut stale = Vec::new();
        {
            let topics = self.read();
            let Some(subscribers) = topics.get(topic) else {
                return 0;
            };

            for (id, delivery) in subscribers {
                if delivery.is_done() {
                    stale.push(*id);
                    continue;
                }
                match delivery.tx.try_send(message.clone()) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        BROKER_DELIVERIES_DROPPED.inc();
                        debug!(topic, subscriber_id = id, "Subscriber inbox full, dropping message");
                    }
                    Err(TrySendError::Closed(_)) => stale.push(*id),
                }
            }
        }

        if !stale.is_empty() {
            self.prune(topic, &stale);
        }

        delivered
    }

    /// Signals completion to every subscriber and clears all topics.
    ///
    /// After closing, `subscribe` fails with [`BrokerError::Closed`].
    pub fn close(&self) {
        let mut topics = self.write();
        self.closed.store(true, Ordering::Release);

        for (_, subscribers) in topics.drain() {
            for (_, delivery) in subscribers {
                BROKER_ACTIVE_SUBSCRIBERS.dec();
                delivery.signal_done();
            }
        }
        debug!("Broker closed");
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Number of subscribers registered under `topic`.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.read().get(topic).map(HashMap::len).unwrap_or(0)
    }

    /// Number of topics with at least one subscriber.
    pub fn topic_count(&self) -> usize {
        self.read().len()
    }

    fn prune(&self, topic: &str, ids: &[u64]) {
        let mut topics = self.write();
        for id in ids {
            if let Some(delivery) = Self::remove_locked(&mut topics, topic, *id) {
                delivery.signal_done();
                debug!(topic, subscriber_id = id, "Pruned completed subscriber");
            }
        }
    }

    /// Drops every entry whose handle has completed, on any topic.
    fn sweep_done_locked(topics: &mut Registry<M>) {
        topics.retain(|topic, subscribers| {
            subscribers.retain(|id, delivery| {
                if !delivery.is_done() {
                    return true;
                }
                BROKER_ACTIVE_SUBSCRIBERS.dec();
                debug!(topic = %topic, subscriber_id = id, "Pruned completed subscriber");
                false
            });
            !subscribers.is_empty()
        });
    }

    fn remove_locked(topics: &mut Registry<M>, topic: &str, id: u64) -> Option<Arc<Delivery<M>>> {
        let subscribers = topics.get_mut(topic)?;
        let removed = subscribers.remove(&id);
        if subscribers.is_empty() {
            topics.remove(topic);
        }
        if removed.is_some() {
            BROKER_ACTIVE_SUBSCRIBERS.dec();
        }
        removed
    }

    fn read(&self) -> RwLockReadGuard<'_, Registry<M>> {
        self.topics.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Registry<M>> {
        self.topics.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<M: Clone + Send + 'static> Default for Broker<M> {
    fn default() -> Self {
        Self::new(DEFAULT_SUBSCRIBER_CAPACITY)
    }
}

impl<M> std::fmt::Debug for Broker<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broker")
            .field("capacity", &self.capacity)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const TOPIC: &str = "video_processing:v1";

    #[tokio::test]
    async fn test_messages_arrive_in_publish_order() {
        let broker: Broker<u32> = Broker::default();
        let mut sub = broker.subscribe(TOPIC).unwrap();

        for i in 0..5 {
            assert_eq!(broker.publish(TOPIC, i), 1);
        }

        for i in 0..5 {
            assert_eq!(sub.recv().await, Some(i));
        }
        assert_eq!(sub.try_recv(), None);
    }

    #[test]
    fn test_publish_without_subscribers_is_noop() {
        let broker: Broker<String> = Broker::default();
        assert_eq!(broker.publish("nobody", "hello".to_string()), 0);
        assert_eq!(broker.topic_count(), 0);
    }

    #[tokio::test]
    async fn test_full_inbox_drops_only_for_that_subscriber() {
        let broker: Broker<u32> = Broker::new(3);
        let mut slow = broker.subscribe(TOPIC).unwrap();
        let mut fast = broker.subscribe(TOPIC).unwrap();

        for i in 0..3 {
            assert_eq!(broker.publish(TOPIC, i), 2);
            assert_eq!(fast.recv().await, Some(i));
        }

        // slow's inbox is now full
        assert_eq!(broker.publish(TOPIC, 99), 1);
        assert_eq!(fast.recv().await, Some(99));

        for i in 0..3 {
            assert_eq!(slow.try_recv(), Some(i));
        }
        assert_eq!(slow.try_recv(), None);
    }

    #[tokio::test]
    async fn test_unsubscribe_signals_once() {
        let broker: Broker<u32> = Broker::default();
        let mut sub = broker.subscribe(TOPIC).unwrap();

        assert!(broker.unsubscribe(TOPIC, &sub));
        assert!(sub.is_closed());
        assert_eq!(broker.subscriber_count(TOPIC), 0);
        assert_eq!(broker.topic_count(), 0);

        assert!(!broker.unsubscribe(TOPIC, &sub));
        assert_eq!(sub.recv().await, None);
    }

    #[test]
    fn test_unsubscribe_keeps_topic_with_remaining_subscribers() {
        let broker: Broker<u32> = Broker::default();
        let a = broker.subscribe(TOPIC).unwrap();
        let _b = broker.subscribe(TOPIC).unwrap();

        broker.unsubscribe(TOPIC, &a);
        assert_eq!(broker.subscriber_count(TOPIC), 1);
        assert_eq!(broker.topic_count(), 1);
    }

    #[test]
    fn test_unsubscribe_wrong_topic_is_noop() {
        let broker: Broker<u32> = Broker::default();
        let sub = broker.subscribe(TOPIC).unwrap();

        assert!(!broker.unsubscribe("other", &sub));
        assert!(!sub.is_closed());
        assert_eq!(broker.subscriber_count(TOPIC), 1);
    }

    #[tokio::test]
    async fn test_close_signals_every_subscriber() {
        let broker: Broker<u32> = Broker::default();
        let mut a = broker.subscribe(TOPIC).unwrap();
        let mut b = broker.subscribe("video_processing:v2").unwrap();

        broker.close();

        assert!(broker.is_closed());
        assert_eq!(broker.topic_count(), 0);
        assert_eq!(a.recv().await, None);
        assert_eq!(b.recv().await, None);
        assert_eq!(broker.subscribe(TOPIC).unwrap_err(), BrokerError::Closed);
    }

    #[test]
    fn test_unsubscribe_after_close_does_not_resignal() {
        let broker: Broker<u32> = Broker::default();
        let sub = broker.subscribe(TOPIC).unwrap();

        broker.close();
        assert!(sub.is_closed());
        assert!(!broker.unsubscribe(TOPIC, &sub));
    }

    #[test]
    fn test_dropped_subscriber_is_pruned_on_publish() {
        let broker: Broker<u32> = Broker::default();
        let gone = broker.subscribe(TOPIC).unwrap();
        let _kept = broker.subscribe(TOPIC).unwrap();
        drop(gone);

        assert_eq!(broker.subscriber_count(TOPIC), 2);
        assert_eq!(broker.publish(TOPIC, 1), 1);
        assert_eq!(broker.subscriber_count(TOPIC), 1);
    }

    #[test]
    fn test_dropped_subscriber_is_pruned_on_next_subscribe() {
        let broker: Broker<u32> = Broker::default();
        let gone = broker.subscribe(TOPIC).unwrap();
        drop(gone);
        assert_eq!(broker.topic_count(), 1);

        let _other = broker.subscribe("video_processing:v2").unwrap();
        assert_eq!(broker.subscriber_count(TOPIC), 0);
        assert_eq!(broker.topic_count(), 1);
    }

    #[test]
    fn test_dropped_subscriber_is_pruned_on_unsubscribe() {
        let broker: Broker<u32> = Broker::default();
        let gone = broker.subscribe("video_processing:v2").unwrap();
        let kept = broker.subscribe(TOPIC).unwrap();
        drop(gone);

        assert!(broker.unsubscribe(TOPIC, &kept));
        assert_eq!(broker.topic_count(), 0);
    }

    #[test]
    fn test_capacity_is_at_least_one() {
        assert_eq!(Broker::<u32>::new(0).capacity(), 1);
        assert_eq!(Broker::<u32>::default().capacity(), DEFAULT_SUBSCRIBER_CAPACITY);
    }

    #[tokio::test]
    async fn test_waiting_consumer_unblocks_on_close() {
        let broker: Arc<Broker<u32>> = Arc::new(Broker::default());
        let mut sub = broker.subscribe(TOPIC).unwrap();

        let consumer = tokio::spawn(async move { sub.recv().await });
        tokio::task::yield_now().await;
        broker.close();

        let got = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .expect("consumer should unblock")
            .unwrap();
        assert_eq!(got, None);
    }

    #[tokio::test]
    async fn test_concurrent_publishers() {
        let broker: Arc<Broker<u32>> = Arc::new(Broker::new(1000));
        let mut sub = broker.subscribe(TOPIC).unwrap();

        let mut handles = Vec::new();
        for p in 0..4u32 {
            let broker = Arc::clone(&broker);
            handles.push(tokio::spawn(async move {
                for i in 0..50 {
                    broker.publish(TOPIC, p * 1000 + i);
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let mut last_per_producer = [None::<u32>; 4];
        let mut count = 0;
        while let Some(msg) = sub.try_recv() {
            let producer = (msg / 1000) as usize;
            if let Some(prev) = last_per_producer[producer] {
                assert!(msg > prev, "per-producer order must be preserved");
            }
            last_per_producer[producer] = Some(msg);
            count += 1;
        }
        assert_eq!(count, 200);
    }
}
