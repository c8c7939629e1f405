//! Store-only records. The shared domain records (`DailyVerse`, `PushToken`)
//! live in `selam-shared` because the server and clients exchange them too.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Written after a successful daily verse send when once-per-day mode is on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationMarker {
    /// Date key of the day that was notified.
    pub date_key: String,
    /// Number of distinct tokens the send was attempted for.
    pub sent_count: u64,
    pub sent_at: DateTime<Utc>,
}
