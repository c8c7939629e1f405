use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use selam_shared::DateKey;

use crate::database::Database;
use crate::error::Result;
use crate::models::NotificationMarker;
use crate::verses::parse_timestamp;

impl Database {
    /// Remember that the daily verse for `key` went out.
    pub fn record_notification(&self, key: &DateKey, sent_count: u64) -> Result<()> {
        self.conn().execute(
            "INSERT INTO notification_log (date_key, sent_count, sent_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(date_key) DO UPDATE SET
                sent_count = excluded.sent_count,
                sent_at    = excluded.sent_at",
            params![
                key.as_str(),
                i64::try_from(sent_count).unwrap_or(i64::MAX),
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    pub fn notification_for(&self, key: &DateKey) -> Result<Option<NotificationMarker>> {
        let marker = self
            .conn()
            .query_row(
                "SELECT date_key, sent_count, sent_at FROM notification_log WHERE date_key = ?1",
                params![key.as_str()],
                |row| {
                    let sent_str: String = row.get(2)?;
                    let sent_at = parse_timestamp(&sent_str).map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            2,
                            rusqlite::types::Type::Text,
                            Box::new(e),
                        )
                    })?;
                    let sent_count: i64 = row.get(1)?;
                    Ok(NotificationMarker {
                        date_key: row.get(0)?,
                        sent_count: u64::try_from(sent_count).unwrap_or_default(),
                        sent_at,
                    })
                },
            )
            .optional()?;
        Ok(marker)
    }
}
