//! In-memory, topic-keyed publish/subscribe broker.
//!
//! The broker decouples a single producer (the processing orchestrator) from
//! any number of observers per topic. Delivery never blocks the publisher:
//! every subscriber owns a bounded inbox and a message that does not fit is
//! dropped for that subscriber only.
//!
//! # Example
//!
//! ```ignore
//! use vodpipe_core::broker::Broker;
//!
//! let broker: Broker<String> = Broker::new(10);
//! let mut sub = broker.subscribe("video_processing:abc")?;
//!
//! broker.publish("video_processing:abc", "hello".to_string());
//! assert_eq!(sub.recv().await.as_deref(), Some("hello"));
//!
//! broker.unsubscribe("video_processing:abc", &sub);
//! assert!(sub.recv().await.is_none());
//! ```

mod hub;
mod subscriber;

pub use hub::{Broker, BrokerError, DEFAULT_SUBSCRIBER_CAPACITY};
pub use subscriber::Subscriber;
