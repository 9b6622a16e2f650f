//! Server-sent events bridge from the broker to HTTP clients.
//!
//! Each connection subscribes to the item's topic, receives a `connected`
//! event and then one `video_update` event per published
//! [`ProcessingEvent`]. The subscription is removed when the client goes
//! away and the stream is dropped.

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{stream, Stream, StreamExt};
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, warn};
use vodpipe_core::{topic, Broker, ProcessingEvent, Subscriber};

use super::error::ApiError;
use crate::state::AppState;

pub const CONNECTED_EVENT: &str = "connected";
pub const UPDATE_EVENT: &str = "video_update";

/// Owns a subscription for the lifetime of one SSE connection.
struct SubscriptionGuard {
    broker: Arc<Broker<ProcessingEvent>>,
    subscriber: Subscriber<ProcessingEvent>,
}

impl SubscriptionGuard {
    async fn next(&mut self) -> Option<ProcessingEvent> {
        self.subscriber.recv().await
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        let topic = self.subscriber.topic().to_string();
        if self.broker.unsubscribe(&topic, &self.subscriber) {
            debug!(topic = %topic, id = self.subscriber.id(), "SSE client disconnected");
        }
    }
}

fn update_event(event: &ProcessingEvent) -> Option<Event> {
    match serde_json::to_string(event) {
        Ok(data) => Some(Event::default().event(UPDATE_EVENT).data(data)),
        Err(e) => {
            warn!("Failed to serialize processing event: {}", e);
            None
        }
    }
}

/// Stream processing updates for one media item.
pub async fn media_events(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    if state.store().find_by_id(&id).await?.is_none() {
        return Err(ApiError::media_not_found(&id));
    }

    let broker = Arc::clone(state.broker());
    let subscriber = broker
        .subscribe(&topic(&id))
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    debug!(id = %id, subscriber = subscriber.id(), "SSE client connected");

    let guard = SubscriptionGuard { broker, subscriber };

    let connected = Event::default()
        .event(CONNECTED_EVENT)
        .data(json!({ "id": id }).to_string());

    let updates = stream::unfold(guard, |mut guard| async move {
        let event = guard.next().await?;
        Some((update_event(&event), guard))
    })
    .filter_map(|event| async move { event.map(Ok::<_, Infallible>) });

    let events = stream::once(async move { Ok::<_, Infallible>(connected) }).chain(updates);

    Ok(Sse::new(events).keep_alive(KeepAlive::new().interval(state.sse_keepalive())))
}
