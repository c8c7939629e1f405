//! v001 -- Initial schema creation.
//!
//! Creates the `daily_verses` and `push_tokens` collections.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Daily verses
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS daily_verses (
    id               TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    book             INTEGER,                     -- nullable on legacy rows
    chapter          INTEGER,
    verse            INTEGER,
    reference        TEXT NOT NULL,
    text             TEXT NOT NULL,
    tag              TEXT,
    status           TEXT NOT NULL DEFAULT 'active',
    display_year     INTEGER NOT NULL,            -- Gregorian
    display_month    INTEGER NOT NULL,
    display_day      INTEGER NOT NULL,
    display_date_key TEXT NOT NULL,               -- "{year}-{month}-{day}", unpadded
    created_at       TEXT NOT NULL,               -- RFC-3339
    updated_at       TEXT
);

CREATE INDEX IF NOT EXISTS idx_daily_verses_key_status
    ON daily_verses(display_date_key, status);

-- ----------------------------------------------------------------
-- Push tokens
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS push_tokens (
    id          TEXT PRIMARY KEY NOT NULL,        -- "{user_id}__{device_id}"
    user_id     TEXT NOT NULL,
    device_id   TEXT NOT NULL,
    platform    TEXT NOT NULL,                    -- ios | android | web
    fcm_token   TEXT NOT NULL,
    apns_token  TEXT,
    app_version TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_push_tokens_user ON push_tokens(user_id);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
