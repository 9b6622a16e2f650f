//! Media items, their lifecycle events, and the record store.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteMediaStore;
pub use store::{
    CreateMediaRequest, MediaError, MediaFilter, MediaStore, MAX_DESCRIPTION_LEN, MAX_TITLE_LEN,
};
pub use types::{topic, EventKind, MediaItem, MediaStatus, ProcessingEvent, Visibility, TOPIC_PREFIX};
