use chrono::Utc;
use rusqlite::params;

use selam_shared::form::PushTokenRegistration;
use selam_shared::types::push_token_doc_id;
use selam_shared::{Platform, PushToken};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::verses::parse_timestamp;

impl Database {
    /// Insert or refresh the token for a (user, device) pair. `created_at` is
    /// kept from the first registration.
    pub fn upsert_push_token(&self, registration: &PushTokenRegistration) -> Result<PushToken> {
        let id = push_token_doc_id(&registration.user_id, &registration.device_id);
        let now = Utc::now().to_rfc3339();

        self.conn().execute(
            "INSERT INTO push_tokens (id, user_id, device_id, platform, fcm_token, apns_token,
                                      app_version, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
             ON CONFLICT(id) DO UPDATE SET
                platform    = excluded.platform,
                fcm_token   = excluded.fcm_token,
                apns_token  = excluded.apns_token,
                app_version = excluded.app_version,
                updated_at  = excluded.updated_at",
            params![
                id,
                registration.user_id,
                registration.device_id,
                registration.platform.as_str(),
                registration.fcm_token,
                registration.apns_token,
                registration.app_version,
                now,
            ],
        )?;

        self.get_push_token(&registration.user_id, &registration.device_id)
    }

    pub fn get_push_token(&self, user_id: &str, device_id: &str) -> Result<PushToken> {
        self.conn()
            .query_row(
                "SELECT user_id, device_id, platform, fcm_token, apns_token, app_version,
                        created_at, updated_at
                 FROM push_tokens WHERE id = ?1",
                params![push_token_doc_id(user_id, device_id)],
                row_to_push_token,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    pub fn list_push_tokens(&self) -> Result<Vec<PushToken>> {
        let mut stmt = self.conn().prepare(
            "SELECT user_id, device_id, platform, fcm_token, apns_token, app_version,
                    created_at, updated_at
             FROM push_tokens ORDER BY created_at ASC",
        )?;
        let rows = stmt.query_map([], row_to_push_token)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    pub fn delete_push_token(&self, user_id: &str, device_id: &str) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM push_tokens WHERE id = ?1",
            params![push_token_doc_id(user_id, device_id)],
        )?;
        Ok(affected > 0)
    }
}

fn row_to_push_token(row: &rusqlite::Row<'_>) -> rusqlite::Result<PushToken> {
    let platform_str: String = row.get(2)?;
    let created_str: String = row.get(6)?;
    let updated_str: String = row.get(7)?;

    let platform: Platform = platform_str.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let created_at = parse_timestamp(&created_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let updated_at = parse_timestamp(&updated_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(PushToken {
        user_id: row.get(0)?,
        device_id: row.get(1)?,
        platform,
        fcm_token: row.get(3)?,
        apns_token: row.get(4)?,
        app_version: row.get(5)?,
        created_at,
        updated_at,
    })
}
