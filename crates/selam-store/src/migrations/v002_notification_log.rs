use rusqlite::Connection;

const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS notification_log (
    date_key   TEXT PRIMARY KEY NOT NULL,         -- daily verse date key
    sent_count INTEGER NOT NULL,
    sent_at    TEXT NOT NULL
);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
