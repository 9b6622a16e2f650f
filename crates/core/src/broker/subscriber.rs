//! Subscriber handles shared between the broker and an observer.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

/// Broker-side half of a subscription: the inbox sender and the completion flag.
#[derive(Debug)]
pub(super) struct Delivery<M> {
    pub(super) tx: mpsc::Sender<M>,
    done: watch::Sender<bool>,
}

impl<M> Delivery<M> {
    /// Sets the completion flag. Returns `true` only for the call that flipped it.
    pub(super) fn signal_done(&self) -> bool {
        self.done.send_if_modified(|done| {
            if *done {
                false
            } else {
                *done = true;
                true
            }
        })
    }

    pub(super) fn is_done(&self) -> bool {
        *self.done.borrow()
    }
}

/// Observer-side handle returned by [`Broker::subscribe`](super::Broker::subscribe).
///
/// Messages are received in the order they were enqueued. Once the
/// subscription completes (unsubscribe, broker close, or this handle being
/// dropped) `recv` returns `None`.
///
/// Prefer [`Broker::unsubscribe`](super::Broker::unsubscribe) over dropping
/// the handle. A dropped handle only marks its entry done; the broker removes
/// it on the next publish to that topic or the next subscribe/unsubscribe.
#[derive(Debug)]
pub struct Subscriber<M> {
    id: u64,
    topic: String,
    rx: mpsc::Receiver<M>,
    done_rx: watch::Receiver<bool>,
    delivery: Arc<Delivery<M>>,
}

impl<M> Subscriber<M> {
    pub(super) fn new(id: u64, topic: String, capacity: usize) -> (Self, Arc<Delivery<M>>) {
        let (tx, rx) = mpsc::channel(capacity);
        let (done, done_rx) = watch::channel(false);
        let delivery = Arc::new(Delivery { tx, done });

        let subscriber = Self {
            id,
            topic,
            rx,
            done_rx,
            delivery: Arc::clone(&delivery),
        };
        (subscriber, delivery)
    }

    /// Unique id of this subscription within its broker.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Topic this subscription was registered under.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Whether the completion signal has been set.
    pub fn is_closed(&self) -> bool {
        *self.done_rx.borrow()
    }

    /// Waits for the next message.
    ///
    /// Returns `None` as soon as the subscription is complete, even if
    /// undelivered messages remain in the inbox.
    pub async fn recv(&mut self) -> Option<M> {
        if self.is_closed() {
            return None;
        }

        tokio::select! {
            biased;
            _ = self.done_rx.wait_for(|done| *done) => None,
            msg = self.rx.recv() => msg,
        }
    }

    /// Takes the next queued message without waiting.
    pub fn try_recv(&mut self) -> Option<M> {
        if self.is_closed() {
            return None;
        }
        self.rx.try_recv().ok()
    }

    /// Resolves once the completion signal is set.
    pub async fn closed(&mut self) {
        let _ = self.done_rx.wait_for(|done| *done).await;
    }
}

impl<M> Drop for Subscriber<M> {
    fn drop(&mut self) {
        // Lets the broker prune this entry on its next registry change.
        self.delivery.signal_done();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_done_flips_once() {
        let (_sub, delivery) = Subscriber::<String>::new(1, "t".to_string(), 4);
        assert!(!delivery.is_done());
        assert!(delivery.signal_done());
        assert!(!delivery.signal_done());
        assert!(delivery.is_done());
    }

    #[test]
    fn test_drop_marks_delivery_done() {
        let (sub, delivery) = Subscriber::<String>::new(1, "t".to_string(), 4);
        drop(sub);
        assert!(delivery.is_done());
    }

    #[test]
    fn test_recv_parks_until_message_arrives() {
        let (mut sub, delivery) = Subscriber::<String>::new(1, "t".to_string(), 4);
        let mut recv = tokio_test::task::spawn(sub.recv());

        tokio_test::assert_pending!(recv.poll());
        delivery.tx.try_send("hello".to_string()).unwrap();
        assert!(recv.is_woken());
        tokio_test::assert_ready_eq!(recv.poll(), Some("hello".to_string()));
    }

    #[tokio::test]
    async fn test_recv_returns_none_after_done() {
        let (mut sub, delivery) = Subscriber::<u32>::new(7, "t".to_string(), 4);
        delivery.tx.try_send(1).unwrap();
        assert_eq!(sub.recv().await, Some(1));

        delivery.tx.try_send(2).unwrap();
        delivery.signal_done();
        assert!(sub.is_closed());
        assert_eq!(sub.recv().await, None);
        assert_eq!(sub.try_recv(), None);
    }

    #[tokio::test]
    async fn test_closed_wakes_waiter() {
        let (mut sub, delivery) = Subscriber::<u32>::new(3, "t".to_string(), 4);

        let waiter = tokio::spawn(async move {
            sub.closed().await;
            sub.id()
        });

        tokio::task::yield_now().await;
        delivery.signal_done();

        let id = tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
        assert_eq!(id, 3);
    }
}
