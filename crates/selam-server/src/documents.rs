//! Store-backed implementations of the notifier's collaborators.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use selam_shared::{DailyVerse, DateKey, PushToken};
use selam_store::{Database, StoreError};

use crate::notifier::{NotificationLog, SourceError, TokenSource, VerseSource};

impl From<StoreError> for SourceError {
    fn from(e: StoreError) -> Self {
        SourceError(e.to_string())
    }
}

#[derive(Clone)]
pub struct SqliteDocuments {
    db: Arc<Mutex<Database>>,
}

impl SqliteDocuments {
    pub fn new(db: Arc<Mutex<Database>>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl VerseSource for SqliteDocuments {
    async fn active_verse_for(&self, key: &DateKey) -> Result<Option<DailyVerse>, SourceError> {
        let db = self.db.lock().await;
        Ok(db.find_active_verse(key)?)
    }
}

#[async_trait]
impl TokenSource for SqliteDocuments {
    async fn list_push_tokens(&self) -> Result<Vec<PushToken>, SourceError> {
        let db = self.db.lock().await;
        Ok(db.list_push_tokens()?)
    }
}

#[async_trait]
impl NotificationLog for SqliteDocuments {
    async fn already_sent(&self, key: &DateKey) -> Result<bool, SourceError> {
        let db = self.db.lock().await;
        Ok(db.notification_for(key)?.is_some())
    }

    async fn mark_sent(&self, key: &DateKey, sent: u64) -> Result<(), SourceError> {
        let db = self.db.lock().await;
        Ok(db.record_notification(key, sent)?)
    }
}
