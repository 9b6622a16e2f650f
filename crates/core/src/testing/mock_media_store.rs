//! Mock media store for testing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::media::{
    CreateMediaRequest, MediaError, MediaFilter, MediaItem, MediaStatus, MediaStore,
};

/// Mock implementation of the MediaStore trait.
///
/// Keeps items in memory, enforces forward-only status transitions, and
/// records every status write for assertions.
#[derive(Debug)]
pub struct MockMediaStore {
    items: Arc<RwLock<HashMap<String, MediaItem>>>,
    status_history: Arc<RwLock<Vec<(String, MediaStatus)>>>,
    /// Status writes to this status fail.
    fail_status: Arc<RwLock<Option<MediaStatus>>>,
    /// If set, the next lookup fails with this error.
    next_error: Arc<RwLock<Option<MediaError>>>,
}

impl Default for MockMediaStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMediaStore {
    pub fn new() -> Self {
        Self {
            items: Arc::new(RwLock::new(HashMap::new())),
            status_history: Arc::new(RwLock::new(Vec::new())),
            fail_status: Arc::new(RwLock::new(None)),
            next_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Insert or replace an item.
    pub async fn insert(&self, item: MediaItem) {
        self.items.write().await.insert(item.id.clone(), item);
    }

    /// Current state of an item.
    pub async fn get(&self, id: &str) -> Option<MediaItem> {
        self.items.read().await.get(id).cloned()
    }

    /// Every successful status write, in order.
    pub async fn status_history(&self) -> Vec<(String, MediaStatus)> {
        self.status_history.read().await.clone()
    }

    /// Make writes of `status` fail with a database error.
    pub async fn fail_status_update(&self, status: MediaStatus) {
        *self.fail_status.write().await = Some(status);
    }

    /// Configure the next lookup to fail with the given error.
    pub async fn set_next_error(&self, error: MediaError) {
        *self.next_error.write().await = Some(error);
    }
}

#[async_trait]
impl MediaStore for MockMediaStore {
    async fn create(&self, request: CreateMediaRequest) -> Result<MediaItem, MediaError> {
        let request = request.validate()?;
        let id = uuid::Uuid::new_v4().to_string();
        let mut item = super::fixtures::pending_item(&id);
        item.title = request.title;
        item.description = request.description;
        item.visibility = request.visibility;
        self.insert(item.clone()).await;
        Ok(item)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<MediaItem>, MediaError> {
        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }
        Ok(self.get(id).await)
    }

    async fn update_status(
        &self,
        id: &str,
        status: MediaStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<MediaItem, MediaError> {
        if *self.fail_status.read().await == Some(status) {
            return Err(MediaError::Database(format!(
                "mock failure writing status {}",
                status
            )));
        }

        let mut items = self.items.write().await;
        let item = items
            .get_mut(id)
            .ok_or_else(|| MediaError::NotFound(id.to_string()))?;

        if !item.status.can_transition_to(status) {
            return Err(MediaError::InvalidTransition {
                id: id.to_string(),
                from: item.status,
                to: status,
            });
        }

        item.status = status;
        item.updated_at = updated_at;
        let updated = item.clone();
        drop(items);

        self.status_history
            .write()
            .await
            .push((id.to_string(), status));
        Ok(updated)
    }

    async fn list(&self, filter: &MediaFilter) -> Result<Vec<MediaItem>, MediaError> {
        let items = self.items.read().await;
        let mut matching: Vec<MediaItem> = items
            .values()
            .filter(|i| filter.status.is_none_or(|s| i.status == s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(matching
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .collect())
    }

    async fn count(&self, filter: &MediaFilter) -> Result<i64, MediaError> {
        let items = self.items.read().await;
        Ok(items
            .values()
            .filter(|i| filter.status.is_none_or(|s| i.status == s))
            .count() as i64)
    }
}
