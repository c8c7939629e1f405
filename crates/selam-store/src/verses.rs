use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use selam_shared::form::VerseDraft;
use selam_shared::{DailyVerse, DateKey, GregorianDate, VerseStatus};

use crate::database::Database;
use crate::error::{Result, StoreError};

const VERSE_COLUMNS: &str = "id, book, chapter, verse, reference, text, tag, status,
     display_year, display_month, display_day, created_at, updated_at";

impl Database {
    pub fn insert_verse(&self, draft: &VerseDraft) -> Result<DailyVerse> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        self.conn().execute(
            "INSERT INTO daily_verses (id, book, chapter, verse, reference, text, tag, status,
                                       display_year, display_month, display_day,
                                       display_date_key, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                id,
                draft.book,
                draft.chapter,
                draft.verse,
                draft.reference,
                draft.text,
                draft.tag,
                draft.status.as_str(),
                draft.display_date.year(),
                draft.display_date.month(),
                draft.display_date.day(),
                draft.display_date_key.as_str(),
                now.to_rfc3339(),
            ],
        )?;

        tracing::debug!(id = %id, key = %draft.display_date_key, "inserted daily verse");
        self.get_verse(&id)
    }

    pub fn update_verse(&self, id: &str, draft: &VerseDraft) -> Result<DailyVerse> {
        let affected = self.conn().execute(
            "UPDATE daily_verses
             SET book = ?2, chapter = ?3, verse = ?4, reference = ?5, text = ?6, tag = ?7,
                 status = ?8, display_year = ?9, display_month = ?10, display_day = ?11,
                 display_date_key = ?12, updated_at = ?13
             WHERE id = ?1",
            params![
                id,
                draft.book,
                draft.chapter,
                draft.verse,
                draft.reference,
                draft.text,
                draft.tag,
                draft.status.as_str(),
                draft.display_date.year(),
                draft.display_date.month(),
                draft.display_date.day(),
                draft.display_date_key.as_str(),
                Utc::now().to_rfc3339(),
            ],
        )?;

        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_verse(id)
    }

    pub fn get_verse(&self, id: &str) -> Result<DailyVerse> {
        self.conn()
            .query_row(
                &format!("SELECT {VERSE_COLUMNS} FROM daily_verses WHERE id = ?1"),
                params![id],
                row_to_verse,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// All verses, newest first.
    pub fn list_verses(&self) -> Result<Vec<DailyVerse>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {VERSE_COLUMNS} FROM daily_verses ORDER BY created_at DESC"
        ))?;
        let rows = stmt.query_map([], row_to_verse)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// The active verse scheduled for the given day, if any.
    pub fn find_active_verse(&self, key: &DateKey) -> Result<Option<DailyVerse>> {
        let verse = self
            .conn()
            .query_row(
                &format!(
                    "SELECT {VERSE_COLUMNS} FROM daily_verses
                     WHERE display_date_key = ?1 AND status = ?2
                     LIMIT 1"
                ),
                params![key.as_str(), VerseStatus::Active.as_str()],
                row_to_verse,
            )
            .optional()?;
        Ok(verse)
    }

    pub fn delete_verse(&self, id: &str) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM daily_verses WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }
}

fn conversion_error<E>(column: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
}

fn row_to_verse(row: &rusqlite::Row<'_>) -> rusqlite::Result<DailyVerse> {
    let status_str: String = row.get(7)?;
    let year: i32 = row.get(8)?;
    let month: u32 = row.get(9)?;
    let day: u32 = row.get(10)?;
    let created_str: String = row.get(11)?;
    let updated_str: Option<String> = row.get(12)?;

    let status: VerseStatus = status_str.parse().map_err(|e| conversion_error(7, e))?;
    let display_date = GregorianDate::new(year, month, day).map_err(|e| conversion_error(8, e))?;
    let created_at = parse_timestamp(&created_str).map_err(|e| conversion_error(11, e))?;
    let updated_at = updated_str
        .as_deref()
        .map(parse_timestamp)
        .transpose()
        .map_err(|e| conversion_error(12, e))?;

    Ok(DailyVerse {
        id: row.get(0)?,
        book: row.get(1)?,
        chapter: row.get(2)?,
        verse: row.get(3)?,
        reference: row.get(4)?,
        text: row.get(5)?,
        tag: row.get(6)?,
        status,
        display_date,
        // Re-derived rather than read so the key can never drift from the date.
        display_date_key: DateKey::from(display_date),
        created_at,
        updated_at,
    })
}

pub(crate) fn parse_timestamp(s: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use selam_shared::calendar::DateParts;
    use selam_shared::form::VerseForm;

    fn draft(ethiopian: (i32, u32, u32), status: &str) -> VerseDraft {
        VerseForm {
            book: 19,
            chapter: 23,
            verse: 1,
            reference: Some("መዝሙር 23:1".into()),
            text: "The Lord is my shepherd".into(),
            tag: None,
            status: Some(status.into()),
            ethiopian_date: DateParts {
                year: ethiopian.0,
                month: ethiopian.1,
                day: ethiopian.2,
            },
        }
        .into_draft()
        .unwrap()
    }

    #[test]
    fn test_insert_and_get() {
        let db = Database::open_in_memory().unwrap();
        let verse = db.insert_verse(&draft((2016, 1, 1), "active")).unwrap();

        let fetched = db.get_verse(&verse.id).unwrap();
        assert_eq!(fetched, verse);
        assert_eq!(fetched.display_date_key.as_str(), "2023-9-12");
        assert_eq!(fetched.book, Some(19));
        assert!(fetched.updated_at.is_none());
    }

    #[test]
    fn test_find_active_verse_ignores_inactive() {
        let db = Database::open_in_memory().unwrap();
        db.insert_verse(&draft((2016, 1, 1), "inactive")).unwrap();

        let key = DateKey::from(GregorianDate::new(2023, 9, 12).unwrap());
        assert!(db.find_active_verse(&key).unwrap().is_none());

        let active = db.insert_verse(&draft((2016, 1, 1), "active")).unwrap();
        let found = db.find_active_verse(&key).unwrap().unwrap();
        assert_eq!(found.id, active.id);

        let other_day = DateKey::from(GregorianDate::new(2023, 9, 13).unwrap());
        assert!(db.find_active_verse(&other_day).unwrap().is_none());
    }

    #[test]
    fn test_update_moves_date_key() {
        let db = Database::open_in_memory().unwrap();
        let verse = db.insert_verse(&draft((2016, 1, 1), "active")).unwrap();

        let updated = db
            .update_verse(&verse.id, &draft((2016, 4, 29), "active"))
            .unwrap();
        assert_eq!(updated.display_date_key.as_str(), "2024-1-8");
        assert!(updated.updated_at.is_some());
        assert_eq!(updated.created_at, verse.created_at);
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        let result = db.update_verse("missing", &draft((2016, 1, 1), "active"));
        assert!(matches!(result, Err(StoreError::NotFound)));
    }

    #[test]
    fn test_delete_and_list() {
        let db = Database::open_in_memory().unwrap();
        let a = db.insert_verse(&draft((2016, 1, 1), "active")).unwrap();
        let b = db.insert_verse(&draft((2016, 1, 2), "active")).unwrap();
        assert_eq!(db.list_verses().unwrap().len(), 2);

        assert!(db.delete_verse(&a.id).unwrap());
        assert!(!db.delete_verse(&a.id).unwrap());

        let remaining = db.list_verses().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, b.id);
    }

    #[test]
    fn test_legacy_row_without_coordinates() {
        let db = Database::open_in_memory().unwrap();
        db.conn()
            .execute(
                "INSERT INTO daily_verses (id, reference, text, status, display_year,
                                           display_month, display_day, display_date_key, created_at)
                 VALUES ('legacy', '', 'text', 'active', 2024, 1, 8, '2024-1-8', ?1)",
                params![Utc::now().to_rfc3339()],
            )
            .unwrap();

        let key = DateKey::from(GregorianDate::new(2024, 1, 8).unwrap());
        let verse = db.find_active_verse(&key).unwrap().unwrap();
        assert_eq!(verse.id, "legacy");
        assert_eq!((verse.book, verse.chapter, verse.verse), (None, None, None));
    }
}
