//! Daily verse push job.
//!
//! One run: authorize the caller, work out today's date key in the
//! configured zone, find the active verse for that key, collect every
//! registered device token, then fan the reminder out in batches. The job
//! keeps no state between runs unless a [`NotificationLog`] is attached.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

use selam_shared::calendar;
use selam_shared::constants::{
    DAILY_VERSE_DATA_TYPE, DAILY_VERSE_FALLBACK_REFERENCE, DAILY_VERSE_TITLE,
    DEFAULT_VERSE_COORDINATE, MAX_TOKENS_PER_BATCH,
};
use selam_shared::{DailyVerse, DateKey, PushToken};

use crate::auth::secrets_match;
use crate::push::{PushDispatcher, PushMessage};

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// Failure reading from or writing to the document store.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct SourceError(pub String);

#[async_trait]
pub trait VerseSource: Send + Sync {
    /// The active verse scheduled for `key`, if any.
    async fn active_verse_for(&self, key: &DateKey) -> Result<Option<DailyVerse>, SourceError>;
}

#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn list_push_tokens(&self) -> Result<Vec<PushToken>, SourceError>;
}

/// Remembers which days already had their reminder sent.
#[async_trait]
pub trait NotificationLog: Send + Sync {
    async fn already_sent(&self, key: &DateKey) -> Result<bool, SourceError>;
    async fn mark_sent(&self, key: &DateKey, sent: u64) -> Result<(), SourceError>;
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Store query failed: {0}")]
    UpstreamQuery(#[from] SourceError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// One invocation of the job.
#[derive(Debug, Clone)]
pub struct Trigger {
    /// Value of the `x-cron-secret` header, if sent.
    pub presented_secret: Option<String>,
    pub now: DateTime<Utc>,
    pub request_id: Uuid,
}

impl Trigger {
    pub fn new(presented_secret: Option<String>) -> Self {
        Self {
            presented_secret,
            now: Utc::now(),
            request_id: Uuid::new_v4(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliverySummary {
    pub date_key: DateKey,
    /// Unique tokens attempted.
    pub total: usize,
    pub delivered: usize,
    pub failed: usize,
    pub batches: usize,
    pub failed_batches: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    Sent(DeliverySummary),
    NoVerse,
    NoTokens,
    AlreadySent,
}

/// JSON body returned to the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotifyReport {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batches: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_key: Option<DateKey>,
}

impl NotifyReport {
    fn skipped(message: &str) -> Self {
        Self {
            ok: false,
            sent: None,
            message: Some(message.to_string()),
            delivered: None,
            failed: None,
            batches: None,
            date_key: None,
        }
    }
}

impl From<NotifyOutcome> for NotifyReport {
    fn from(outcome: NotifyOutcome) -> Self {
        match outcome {
            NotifyOutcome::Sent(summary) => Self {
                ok: true,
                sent: Some(summary.total),
                message: None,
                delivered: Some(summary.delivered),
                failed: Some(summary.failed),
                batches: Some(summary.batches),
                date_key: Some(summary.date_key),
            },
            NotifyOutcome::NoVerse => Self::skipped("No daily verse found"),
            NotifyOutcome::NoTokens => Self::skipped("No push tokens registered"),
            NotifyOutcome::AlreadySent => Self::skipped("Daily verse already sent"),
        }
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

pub struct DailyVerseNotifier {
    verses: Arc<dyn VerseSource>,
    tokens: Arc<dyn TokenSource>,
    dispatcher: Arc<dyn PushDispatcher>,
    log: Option<Arc<dyn NotificationLog>>,
    cron_secret: Option<String>,
    time_zone: Tz,
    batch_size: usize,
}

impl DailyVerseNotifier {
    pub fn new(
        verses: Arc<dyn VerseSource>,
        tokens: Arc<dyn TokenSource>,
        dispatcher: Arc<dyn PushDispatcher>,
        cron_secret: Option<String>,
        time_zone: Tz,
    ) -> Self {
        Self {
            verses,
            tokens,
            dispatcher,
            log: None,
            cron_secret,
            time_zone,
            batch_size: MAX_TOKENS_PER_BATCH,
        }
    }

    /// Send at most once per date key.
    pub fn with_log(mut self, log: Arc<dyn NotificationLog>) -> Self {
        self.log = Some(log);
        self
    }

    /// Clamped to `1..=500`.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.clamp(1, MAX_TOKENS_PER_BATCH);
        self
    }

    /// Run on a separate task so a panic in a collaborator surfaces as
    /// [`NotifyError::Internal`] instead of tearing down the caller.
    pub async fn run_isolated(
        self: Arc<Self>,
        trigger: Trigger,
    ) -> Result<NotifyOutcome, NotifyError> {
        match tokio::spawn(async move { self.run(trigger).await }).await {
            Ok(result) => result,
            Err(e) => Err(NotifyError::Internal(format!("notifier task failed: {e}"))),
        }
    }

    pub async fn run(&self, trigger: Trigger) -> Result<NotifyOutcome, NotifyError> {
        let span = tracing::info_span!("notify_daily_verse", request_id = %trigger.request_id);
        self.run_inner(trigger).instrument(span).await
    }

    async fn run_inner(&self, trigger: Trigger) -> Result<NotifyOutcome, NotifyError> {
        self.authorize(trigger.presented_secret.as_deref())?;

        let key = DateKey::from(calendar::date_in(trigger.now, self.time_zone));

        if let Some(log) = &self.log {
            if log.already_sent(&key).await? {
                info!(key = %key, "Daily verse already sent today");
                return Ok(NotifyOutcome::AlreadySent);
            }
        }

        let Some(verse) = self.verses.active_verse_for(&key).await? else {
            info!(key = %key, "No active daily verse");
            return Ok(NotifyOutcome::NoVerse);
        };

        let records = self.tokens.list_push_tokens().await?;
        let tokens = unique_tokens(records.iter().map(|t| t.fcm_token.as_str()));
        if tokens.is_empty() {
            info!(key = %key, records = records.len(), "No push tokens registered");
            return Ok(NotifyOutcome::NoTokens);
        }

        let message = compose_message(&verse);
        let summary = self.dispatch(key, &message, &tokens).await;

        if let Some(log) = &self.log {
            if summary.delivered > 0 {
                if let Err(e) = log.mark_sent(&summary.date_key, summary.total as u64).await {
                    warn!(error = %e, key = %summary.date_key, "Failed to record daily verse send");
                }
            }
        }

        info!(
            key = %summary.date_key,
            verse_id = %verse.id,
            total = summary.total,
            delivered = summary.delivered,
            failed = summary.failed,
            batches = summary.batches,
            "Daily verse notification sent"
        );
        Ok(NotifyOutcome::Sent(summary))
    }

    fn authorize(&self, presented: Option<&str>) -> Result<(), NotifyError> {
        let Some(expected) = self.cron_secret.as_deref() else {
            return Ok(());
        };
        match presented {
            Some(presented) if secrets_match(presented, expected) => Ok(()),
            _ => {
                warn!(header_present = presented.is_some(), "Rejected daily verse trigger");
                Err(NotifyError::Unauthorized)
            }
        }
    }

    /// Batches go out one after another; a failed batch is counted and
    /// the remaining ones still run.
    async fn dispatch(&self, key: DateKey, message: &PushMessage, tokens: &[String]) -> DeliverySummary {
        let mut summary = DeliverySummary {
            date_key: key,
            total: tokens.len(),
            delivered: 0,
            failed: 0,
            batches: 0,
            failed_batches: 0,
        };

        for (index, chunk) in tokens.chunks(self.batch_size).enumerate() {
            summary.batches += 1;
            match self.dispatcher.send_multicast(message, chunk).await {
                Ok(report) => {
                    summary.delivered += report.success_count;
                    summary.failed += report.failure_count;
                }
                Err(e) => {
                    error!(batch = index, size = chunk.len(), error = %e, "Push batch failed");
                    summary.failed += chunk.len();
                    summary.failed_batches += 1;
                }
            }
        }

        summary
    }
}

/// Drop empty tokens and collapse duplicates, keeping first-seen order.
pub fn unique_tokens<'a>(tokens: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    tokens
        .into_iter()
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(*t))
        .map(str::to_string)
        .collect()
}

pub fn compose_message(verse: &DailyVerse) -> PushMessage {
    let reference = if verse.reference.trim().is_empty() {
        DAILY_VERSE_FALLBACK_REFERENCE
    } else {
        verse.reference.as_str()
    };

    let coordinate = |value: Option<u32>| value.unwrap_or(DEFAULT_VERSE_COORDINATE).to_string();

    let mut data = BTreeMap::new();
    data.insert("type".to_string(), DAILY_VERSE_DATA_TYPE.to_string());
    data.insert("book".to_string(), coordinate(verse.book));
    data.insert("chapter".to_string(), coordinate(verse.chapter));
    data.insert("verse".to_string(), coordinate(verse.verse));

    PushMessage {
        title: DAILY_VERSE_TITLE.to_string(),
        body: format!("Today's verse: {reference}, Click to continue!"),
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use chrono::TimeZone;
    use selam_shared::{GregorianDate, Platform, VerseStatus};

    use crate::push::{BatchReport, DispatchError};

    // 2023-09-12 00:30 in Addis Ababa is still 2023-09-11 in UTC.
    fn trigger(secret: Option<&str>) -> Trigger {
        Trigger {
            presented_secret: secret.map(str::to_string),
            now: Utc.with_ymd_and_hms(2023, 9, 11, 21, 30, 0).unwrap(),
            request_id: Uuid::new_v4(),
        }
    }

    fn verse() -> DailyVerse {
        let display_date = GregorianDate::new(2023, 9, 12).unwrap();
        DailyVerse {
            id: "v1".into(),
            book: Some(23),
            chapter: Some(40),
            verse: Some(29),
            reference: "ኢሳይያስ 40:29".into(),
            text: "He gives strength to the weary.".into(),
            tag: None,
            status: VerseStatus::Active,
            display_date,
            display_date_key: DateKey::from(display_date),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn push_token(n: usize, fcm: &str) -> PushToken {
        PushToken {
            user_id: format!("user-{n}"),
            device_id: format!("device-{n}"),
            platform: Platform::Android,
            fcm_token: fcm.to_string(),
            apns_token: None,
            app_version: "1.0.0".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[derive(Default)]
    struct FakeStore {
        verse: Option<DailyVerse>,
        tokens: Vec<PushToken>,
        queries: AtomicUsize,
        looked_up: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl VerseSource for FakeStore {
        async fn active_verse_for(&self, key: &DateKey) -> Result<Option<DailyVerse>, SourceError> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            self.looked_up.lock().unwrap().push(key.to_string());
            Ok(self
                .verse
                .clone()
                .filter(|v| v.display_date_key == *key && v.status == VerseStatus::Active))
        }
    }

    #[async_trait]
    impl TokenSource for FakeStore {
        async fn list_push_tokens(&self) -> Result<Vec<PushToken>, SourceError> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            Ok(self.tokens.clone())
        }
    }

    #[derive(Default)]
    struct RecordingDispatcher {
        batches: Mutex<Vec<(PushMessage, Vec<String>)>>,
        fail_batch: Option<usize>,
        reject_all: bool,
    }

    #[async_trait]
    impl PushDispatcher for RecordingDispatcher {
        async fn send_multicast(
            &self,
            message: &PushMessage,
            tokens: &[String],
        ) -> Result<BatchReport, DispatchError> {
            let mut batches = self.batches.lock().unwrap();
            let index = batches.len();
            batches.push((message.clone(), tokens.to_vec()));
            if self.fail_batch == Some(index) {
                return Err(DispatchError::Unreachable("connection reset".into()));
            }
            if self.reject_all {
                return Ok(BatchReport {
                    success_count: 0,
                    failure_count: tokens.len(),
                });
            }
            Ok(BatchReport {
                success_count: tokens.len(),
                failure_count: 0,
            })
        }
    }

    #[derive(Default)]
    struct MemoryLog {
        sent: Mutex<Vec<(String, u64)>>,
    }

    #[async_trait]
    impl NotificationLog for MemoryLog {
        async fn already_sent(&self, key: &DateKey) -> Result<bool, SourceError> {
            Ok(self.sent.lock().unwrap().iter().any(|(k, _)| k == key.as_str()))
        }

        async fn mark_sent(&self, key: &DateKey, sent: u64) -> Result<(), SourceError> {
            self.sent.lock().unwrap().push((key.to_string(), sent));
            Ok(())
        }
    }

    fn notifier(
        store: Arc<FakeStore>,
        dispatcher: Arc<RecordingDispatcher>,
        secret: Option<&str>,
    ) -> DailyVerseNotifier {
        DailyVerseNotifier::new(
            store.clone(),
            store,
            dispatcher,
            secret.map(str::to_string),
            chrono_tz::Africa::Addis_Ababa,
        )
    }

    #[tokio::test]
    async fn test_no_active_verse_is_a_noop() {
        let store = Arc::new(FakeStore {
            tokens: vec![push_token(1, "a")],
            ..Default::default()
        });
        let dispatcher = Arc::new(RecordingDispatcher::default());

        let outcome = notifier(store.clone(), dispatcher.clone(), None)
            .run(trigger(None))
            .await
            .unwrap();

        assert_eq!(outcome, NotifyOutcome::NoVerse);
        assert!(dispatcher.batches.lock().unwrap().is_empty());
        let report = serde_json::to_value(NotifyReport::from(outcome)).unwrap();
        assert_eq!(
            report,
            serde_json::json!({ "ok": false, "message": "No daily verse found" })
        );
    }

    #[tokio::test]
    async fn test_date_key_uses_configured_zone() {
        let store = Arc::new(FakeStore::default());
        let dispatcher = Arc::new(RecordingDispatcher::default());
        notifier(store.clone(), dispatcher, None)
            .run(trigger(None))
            .await
            .unwrap();
        assert_eq!(*store.looked_up.lock().unwrap(), vec!["2023-9-12".to_string()]);
    }

    #[tokio::test]
    async fn test_1200_tokens_go_out_in_three_batches() {
        let store = Arc::new(FakeStore {
            verse: Some(verse()),
            tokens: (0..1200).map(|i| push_token(i, &format!("fcm-{i}"))).collect(),
            ..Default::default()
        });
        let dispatcher = Arc::new(RecordingDispatcher::default());

        let outcome = notifier(store, dispatcher.clone(), None)
            .run(trigger(None))
            .await
            .unwrap();

        let sizes: Vec<usize> = dispatcher
            .batches
            .lock()
            .unwrap()
            .iter()
            .map(|(_, t)| t.len())
            .collect();
        assert_eq!(sizes, vec![500, 500, 200]);

        let report = NotifyReport::from(outcome);
        assert!(report.ok);
        assert_eq!(report.sent, Some(1200));
        assert_eq!(report.delivered, Some(1200));
        assert_eq!(report.batches, Some(3));
    }

    #[tokio::test]
    async fn test_duplicate_tokens_collapsed() {
        let store = Arc::new(FakeStore {
            verse: Some(verse()),
            tokens: vec![
                push_token(1, "shared"),
                push_token(2, ""),
                push_token(3, "other"),
                push_token(4, "shared"),
            ],
            ..Default::default()
        });
        let dispatcher = Arc::new(RecordingDispatcher::default());

        notifier(store, dispatcher.clone(), None)
            .run(trigger(None))
            .await
            .unwrap();

        let batches = dispatcher.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].1, vec!["shared".to_string(), "other".to_string()]);
    }

    #[tokio::test]
    async fn test_wrong_secret_touches_nothing() {
        let store = Arc::new(FakeStore {
            verse: Some(verse()),
            tokens: vec![push_token(1, "a")],
            ..Default::default()
        });
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let job = notifier(store.clone(), dispatcher.clone(), Some("s3cret"));

        for presented in [None, Some("wrong"), Some("s3cre")] {
            let result = job.run(trigger(presented)).await;
            assert!(matches!(result, Err(NotifyError::Unauthorized)));
        }
        assert_eq!(store.queries.load(Ordering::SeqCst), 0);
        assert!(dispatcher.batches.lock().unwrap().is_empty());

        assert!(job.run(trigger(Some("s3cret"))).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_coordinates_default_to_one() {
        let mut legacy = verse();
        legacy.book = None;
        legacy.chapter = None;
        legacy.verse = None;
        legacy.reference = "  ".into();

        let store = Arc::new(FakeStore {
            verse: Some(legacy),
            tokens: vec![push_token(1, "a")],
            ..Default::default()
        });
        let dispatcher = Arc::new(RecordingDispatcher::default());

        notifier(store, dispatcher.clone(), None)
            .run(trigger(None))
            .await
            .unwrap();

        let batches = dispatcher.batches.lock().unwrap();
        let message = &batches[0].0;
        assert_eq!(message.data["type"], "daily_verse");
        assert_eq!(message.data["book"], "1");
        assert_eq!(message.data["chapter"], "1");
        assert_eq!(message.data["verse"], "1");
        assert_eq!(message.body, "Today's verse: Daily Verse, Click to continue!");
        assert_eq!(message.title, "Daily reminder to read your Bible");
    }

    #[tokio::test]
    async fn test_failed_batch_does_not_stop_the_rest() {
        let store = Arc::new(FakeStore {
            verse: Some(verse()),
            tokens: (0..1200).map(|i| push_token(i, &format!("fcm-{i}"))).collect(),
            ..Default::default()
        });
        let dispatcher = Arc::new(RecordingDispatcher {
            fail_batch: Some(1),
            ..Default::default()
        });

        let outcome = notifier(store, dispatcher.clone(), None)
            .run(trigger(None))
            .await
            .unwrap();

        assert_eq!(dispatcher.batches.lock().unwrap().len(), 3);
        let NotifyOutcome::Sent(summary) = outcome else {
            panic!("expected a send");
        };
        assert_eq!(summary.total, 1200);
        assert_eq!(summary.delivered, 700);
        assert_eq!(summary.failed, 500);
        assert_eq!(summary.failed_batches, 1);
    }

    #[tokio::test]
    async fn test_no_tokens_is_a_noop() {
        let store = Arc::new(FakeStore {
            verse: Some(verse()),
            tokens: vec![push_token(1, "")],
            ..Default::default()
        });
        let dispatcher = Arc::new(RecordingDispatcher::default());

        let outcome = notifier(store, dispatcher.clone(), None)
            .run(trigger(None))
            .await
            .unwrap();
        assert_eq!(outcome, NotifyOutcome::NoTokens);
        assert_eq!(
            NotifyReport::from(outcome).message.as_deref(),
            Some("No push tokens registered")
        );
        assert!(dispatcher.batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_once_per_day_log() {
        let store = Arc::new(FakeStore {
            verse: Some(verse()),
            tokens: vec![push_token(1, "a"), push_token(2, "b")],
            ..Default::default()
        });
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let log = Arc::new(MemoryLog::default());
        let job = notifier(store, dispatcher.clone(), None).with_log(log.clone());

        assert!(matches!(job.run(trigger(None)).await.unwrap(), NotifyOutcome::Sent(_)));
        assert_eq!(job.run(trigger(None)).await.unwrap(), NotifyOutcome::AlreadySent);
        assert_eq!(dispatcher.batches.lock().unwrap().len(), 1);
        assert_eq!(*log.sent.lock().unwrap(), vec![("2023-9-12".to_string(), 2)]);
    }

    #[tokio::test]
    async fn test_fully_rejected_run_can_be_retried() {
        let store = Arc::new(FakeStore {
            verse: Some(verse()),
            tokens: (0..3).map(|i| push_token(i, &format!("fcm-{i}"))).collect(),
            ..Default::default()
        });
        let dispatcher = Arc::new(RecordingDispatcher {
            reject_all: true,
            ..Default::default()
        });
        let log = Arc::new(MemoryLog::default());
        let job = notifier(store, dispatcher.clone(), None).with_log(log.clone());

        let NotifyOutcome::Sent(summary) = job.run(trigger(None)).await.unwrap() else {
            panic!("expected a send");
        };
        assert_eq!((summary.delivered, summary.failed, summary.failed_batches), (0, 3, 0));
        assert!(log.sent.lock().unwrap().is_empty());

        assert!(matches!(job.run(trigger(None)).await.unwrap(), NotifyOutcome::Sent(_)));
        assert_eq!(dispatcher.batches.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_batch_size_is_clamped() {
        let store = Arc::new(FakeStore {
            verse: Some(verse()),
            tokens: (0..3).map(|i| push_token(i, &format!("fcm-{i}"))).collect(),
            ..Default::default()
        });
        let dispatcher = Arc::new(RecordingDispatcher::default());
        notifier(store, dispatcher.clone(), None)
            .with_batch_size(2)
            .run(trigger(None))
            .await
            .unwrap();
        assert_eq!(dispatcher.batches.lock().unwrap().len(), 2);

        let job = notifier(Arc::new(FakeStore::default()), dispatcher, None).with_batch_size(10_000);
        assert_eq!(job.batch_size, 500);
    }

    struct PanickingSource;

    #[async_trait]
    impl VerseSource for PanickingSource {
        async fn active_verse_for(&self, _key: &DateKey) -> Result<Option<DailyVerse>, SourceError> {
            panic!("corrupt record");
        }
    }

    #[tokio::test]
    async fn test_panic_becomes_internal_error() {
        let job = Arc::new(DailyVerseNotifier::new(
            Arc::new(PanickingSource),
            Arc::new(FakeStore::default()),
            Arc::new(RecordingDispatcher::default()),
            None,
            chrono_tz::Africa::Addis_Ababa,
        ));
        let result = job.run_isolated(trigger(None)).await;
        assert!(matches!(result, Err(NotifyError::Internal(_))));
    }

    #[test]
    fn test_unique_tokens_preserves_order() {
        assert_eq!(
            unique_tokens(["b", "a", "", "b", "c", "a"]),
            vec!["b".to_string(), "a".to_string(), "c".to_string()]
        );
    }
}
