//! SQLite-backed media store implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::store::{CreateMediaRequest, MediaError, MediaFilter, MediaStore};
use super::types::{MediaItem, MediaStatus, Visibility};

const SELECT_COLUMNS: &str = "SELECT id, title, description, visibility, status, source_key, output_prefix, created_at, updated_at FROM media_items";

/// SQLite-backed media store.
pub struct SqliteMediaStore {
    conn: Mutex<Connection>,
}

impl SqliteMediaStore {
    /// Opens (or creates) the database file and its tables.
    pub fn new(path: &Path) -> Result<Self, MediaError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| MediaError::Database(e.to_string()))?;
            }
        }
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, MediaError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), MediaError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS media_items (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                visibility TEXT NOT NULL,
                status TEXT NOT NULL,
                source_key TEXT NOT NULL,
                output_prefix TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_media_items_status ON media_items(status);
            CREATE INDEX IF NOT EXISTS idx_media_items_created_at ON media_items(created_at);
            "#,
        )?;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn build_where_clause(filter: &MediaFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        let where_clause = match filter.status {
            Some(status) => {
                params.push(Box::new(status.as_str()));
                "WHERE status = ?".to_string()
            }
            None => String::new(),
        };
        (where_clause, params)
    }

    fn row_to_item(row: &rusqlite::Row) -> rusqlite::Result<MediaItem> {
        let visibility_str: String = row.get(3)?;
        let status_str: String = row.get(4)?;
        let created_at_str: String = row.get(7)?;
        let updated_at_str: String = row.get(8)?;

        Ok(MediaItem {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            visibility: Visibility::parse(&visibility_str).unwrap_or_default(),
            status: MediaStatus::parse(&status_str).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    4,
                    rusqlite::types::Type::Text,
                    format!("unknown media status '{}'", status_str).into(),
                )
            })?,
            source_key: row.get(5)?,
            output_prefix: row.get(6)?,
            created_at: parse_timestamp(&created_at_str),
            updated_at: parse_timestamp(&updated_at_str),
        })
    }

    fn get_locked(conn: &Connection, id: &str) -> Result<Option<MediaItem>, MediaError> {
        let sql = format!("{} WHERE id = ?", SELECT_COLUMNS);
        match conn.query_row(&sql, params![id], Self::row_to_item) {
            Ok(item) => Ok(Some(item)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[async_trait]
impl MediaStore for SqliteMediaStore {
    async fn create(&self, request: CreateMediaRequest) -> Result<MediaItem, MediaError> {
        let request = request.validate()?;
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();

        let item = MediaItem {
            source_key: MediaItem::source_key_for(&id),
            output_prefix: MediaItem::output_prefix_for(&id),
            id,
            title: request.title,
            description: request.description,
            visibility: request.visibility,
            status: MediaStatus::PendingUpload,
            created_at: now,
            updated_at: now,
        };

        let conn = self.lock();
        conn.execute(
            "INSERT INTO media_items (id, title, description, visibility, status, source_key, output_prefix, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                item.id,
                item.title,
                item.description,
                item.visibility.as_str(),
                item.status.as_str(),
                item.source_key,
                item.output_prefix,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )?;

        Ok(item)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<MediaItem>, MediaError> {
        let conn = self.lock();
        Self::get_locked(&conn, id)
    }

    async fn update_status(
        &self,
        id: &str,
        status: MediaStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<MediaItem, MediaError> {
        let conn = self.lock();

        let current =
            Self::get_locked(&conn, id)?.ok_or_else(|| MediaError::NotFound(id.to_string()))?;

        if !current.status.can_transition_to(status) {
            return Err(MediaError::InvalidTransition {
                id: id.to_string(),
                from: current.status,
                to: status,
            });
        }

        conn.execute(
            "UPDATE media_items SET status = ?, updated_at = ? WHERE id = ?",
            params![status.as_str(), updated_at.to_rfc3339(), id],
        )?;

        Ok(MediaItem {
            status,
            updated_at,
            ..current
        })
    }

    async fn list(&self, filter: &MediaFilter) -> Result<Vec<MediaItem>, MediaError> {
        let conn = self.lock();

        let (where_clause, mut all_params) = Self::build_where_clause(filter);
        let sql = format!(
            "{} {} ORDER BY created_at DESC LIMIT ? OFFSET ?",
            SELECT_COLUMNS, where_clause
        );
        all_params.push(Box::new(filter.limit));
        all_params.push(Box::new(filter.offset));
        let param_refs: Vec<&dyn rusqlite::ToSql> = all_params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(param_refs.as_slice(), Self::row_to_item)?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }

    async fn count(&self, filter: &MediaFilter) -> Result<i64, MediaError> {
        let conn = self.lock();

        let (where_clause, params) = Self::build_where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM media_items {}", where_clause);
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let count: i64 = conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_store() -> SqliteMediaStore {
        SqliteMediaStore::in_memory().unwrap()
    }

    #[tokio::test]
    async fn test_create_item() {
        let store = create_test_store();
        let item = store
            .create(CreateMediaRequest::new("Cat video").with_visibility(Visibility::Private))
            .await
            .unwrap();

        assert!(!item.id.is_empty());
        assert_eq!(item.status, MediaStatus::PendingUpload);
        assert_eq!(item.visibility, Visibility::Private);
        assert_eq!(item.source_key, format!("raw-videos/{}.mp4", item.id));
        assert_eq!(item.output_prefix, format!("processed-videos/{}", item.id));
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_request() {
        let store = create_test_store();
        let err = store.create(CreateMediaRequest::new("")).await.unwrap_err();
        assert!(matches!(err, MediaError::Validation(_)));
        assert_eq!(store.count(&MediaFilter::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_find_by_id() {
        let store = create_test_store();
        let created = store.create(CreateMediaRequest::new("a")).await.unwrap();

        let fetched = store.find_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.title, "a");

        assert!(store.find_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_status_forward() {
        let store = create_test_store();
        let item = store.create(CreateMediaRequest::new("a")).await.unwrap();

        let later = Utc::now();
        let updated = store
            .update_status(&item.id, MediaStatus::Processing, later)
            .await
            .unwrap();
        assert_eq!(updated.status, MediaStatus::Processing);

        let ready = store
            .update_status(&item.id, MediaStatus::Ready, Utc::now())
            .await
            .unwrap();
        assert_eq!(ready.status, MediaStatus::Ready);

        let stored = store.find_by_id(&item.id).await.unwrap().unwrap();
        assert_eq!(stored.status, MediaStatus::Ready);
    }

    #[tokio::test]
    async fn test_update_status_rejects_backwards() {
        let store = create_test_store();
        let item = store.create(CreateMediaRequest::new("a")).await.unwrap();

        let err = store
            .update_status(&item.id, MediaStatus::Ready, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_update_status_unknown_id() {
        let store = create_test_store();
        let err = store
            .update_status("nope", MediaStatus::Processing, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_and_count_with_status_filter() {
        let store = create_test_store();
        let a = store.create(CreateMediaRequest::new("a")).await.unwrap();
        store.create(CreateMediaRequest::new("b")).await.unwrap();
        store.create(CreateMediaRequest::new("c")).await.unwrap();
        store
            .update_status(&a.id, MediaStatus::Processing, Utc::now())
            .await
            .unwrap();

        let all = store.list(&MediaFilter::new()).await.unwrap();
        assert_eq!(all.len(), 3);

        let pending = MediaFilter::new().with_status(MediaStatus::PendingUpload);
        assert_eq!(store.list(&pending).await.unwrap().len(), 2);
        assert_eq!(store.count(&pending).await.unwrap(), 2);

        let page = store
            .list(&MediaFilter::new().with_limit(1).with_offset(1))
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
    }

    #[tokio::test]
    async fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db").join("vodpipe.db");

        let id = {
            let store = SqliteMediaStore::new(&path).unwrap();
            store.create(CreateMediaRequest::new("kept")).await.unwrap().id
        };

        let reopened = SqliteMediaStore::new(&path).unwrap();
        let item = reopened.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(item.title, "kept");
    }
}
