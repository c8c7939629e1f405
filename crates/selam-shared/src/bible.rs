//! Book table for the 66-book canon.
//!
//! Books are addressed by their 1-based position (Genesis = 1, Revelation =
//! 66). Names and chapter counts are bundled; per-chapter verse counts come
//! from an external source and are modelled by [`VerseCounts`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const BOOK_COUNT: u32 = 66;

/// Amharic book names, Genesis through Revelation.
pub const AMHARIC_BOOKS: [&str; 66] = [
    "ኦሪት ዘፍጥረት",
    "ኦሪት ዘጸአት",
    "ኦሪት ዘሌዋውያን",
    "ኦሪት ዘኍልቍ",
    "ኦሪት ዘዳግም",
    "መጽሐፈ ኢያሱ ወልደ ነዌ",
    "መጽሐፈ መሣፍንት",
    "መጽሐፈ ሩት",
    "መጽሐፈ ሳሙኤል ቀዳማዊ",
    "መጽሐፈ ሳሙኤል ካል",
    "መጽሐፈ ነገሥት ቀዳማዊ",
    "መጽሐፈ ነገሥት ካልዕ",
    "መጽሐፈ ዜና መዋዕል ቀዳማዊ",
    "መጽሐፈ ዜና መዋዕል ካልዕ",
    "መጽሐፈ ዕዝራ",
    "መጽሐፈ ነህምያ",
    "መጽሐፈ አስቴር",
    "መጽሐፈ ኢዮብ",
    "መዝሙረ ዳዊት",
    "መጽሐፈ ምሳሌ",
    "መጽሐፈ መክብብ",
    "መኃልየ መኃልይ ዘሰሎሞን",
    "ትንቢተ ኢሳይያስ",
    "ትንቢተ ኤርምያስ",
    "ሰቆቃው ኤርምያስ",
    "ትንቢተ ሕዝቅኤል",
    "ትንቢተ ዳንኤል",
    "ትንቢተ ሆሴዕ",
    "ትንቢተ ኢዮኤል",
    "ትንቢተ አሞጽ",
    "ትንቢተ አብድዩ",
    "ትንቢተ ዮናስ",
    "ትንቢተ ሚክያስ",
    "ትንቢተ ናሆም",
    "ትንቢተ ዕንባቆም",
    "ትንቢተ ሶፎንያስ",
    "ትንቢተ ሐጌ",
    "ትንቢተ ዘካርያስ",
    "ትንቢተ ሚልክያ",
    "የማቴዎስ ወንጌል",
    "የማርቆስ ወንጌል",
    "የሉቃስ ወንጌል",
    "የዮሐንስ ወንጌል",
    "የሐዋርያት ሥራ",
    "ወደ ሮሜ ሰዎች",
    "1ኛ ወደ ቆሮንቶስ ሰዎች",
    "2ኛ ወደ ቆሮንቶስ ሰዎች",
    "ወደ ገላትያ ሰዎች",
    "ወደ ኤፌሶን ሰዎች",
    "ወደ ፊልጵስዩስ ሰዎች",
    "ወደ ቆላስይስ ሰዎች",
    "1ኛ ወደ ተሰሎንቄ ሰዎች",
    "2ኛ ወደ ተሰሎንቄ ሰዎች",
    "1ኛ ወደ ጢሞቴዎስ",
    "2ኛ ወደ ጢሞቴዎስ",
    "ወደ ቲቶ",
    "ወደ ፊልሞና",
    "ወደ ዕብራውያን",
    "የያዕቆብ መልእክት",
    "1ኛ የጴጥሮስ መልእክት",
    "2ኛ የጴጥሮስ መልእክት",
    "1ኛ የዮሐንስ መልእክት",
    "2ኛ የዮሐንስ መልእክት",
    "3ኛ የዮሐንስ መልእክት",
    "የይሁዳ መልእክት",
    "የዮሐንስ ራእይ",
];

/// Chapters per book (Protestant versification).
pub const CHAPTER_COUNTS: [u32; 66] = [
    50, 40, 27, 36, 34, 24, 21, 4, 31, 24, //
    22, 25, 29, 36, 10, 13, 10, 42, 150, 31, //
    12, 8, 66, 52, 5, 48, 12, 14, 3, 9, //
    1, 4, 7, 3, 3, 3, 2, 14, 4, 28, //
    16, 24, 21, 28, 16, 16, 13, 6, 6, 4, //
    4, 5, 3, 6, 4, 3, 1, 13, 5, 5, //
    3, 5, 1, 1, 1, 22,
];

fn book_slot(book: u32) -> Option<usize> {
    (1..=BOOK_COUNT).contains(&book).then(|| (book - 1) as usize)
}

pub fn amharic_book_name(book: u32) -> Option<&'static str> {
    book_slot(book).map(|i| AMHARIC_BOOKS[i])
}

pub fn chapter_count(book: u32) -> Option<u32> {
    book_slot(book).map(|i| CHAPTER_COUNTS[i])
}

/// Reject a book outside the canon or a chapter past the book's end.
pub fn check_chapter(book: u32, chapter: u32) -> Result<(), ValidationError> {
    let max = chapter_count(book).ok_or(ValidationError::UnknownBook(book))?;
    if chapter > max {
        return Err(ValidationError::ChapterOutOfRange { book, chapter, max });
    }
    Ok(())
}

/// Verse count of every chapter, keyed by 1-based book index.
///
/// Serializes as `{"1": [31, 25, ...], "2": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerseCounts(BTreeMap<u32, Vec<u32>>);

impl VerseCounts {
    /// Books in canonical order; the first entry becomes book 1.
    pub fn from_books<I>(books: I) -> Self
    where
        I: IntoIterator<Item = Vec<u32>>,
    {
        Self(
            books
                .into_iter()
                .zip(1..)
                .map(|(chapters, book)| (book, chapters))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn verses_in(&self, book: u32, chapter: u32) -> Option<u32> {
        let chapters = self.0.get(&book)?;
        let slot = chapter.checked_sub(1)? as usize;
        chapters.get(slot).copied()
    }

    pub fn check(&self, book: u32, chapter: u32, verse: u32) -> Result<(), ValidationError> {
        let chapters = self.0.get(&book).ok_or(ValidationError::UnknownBook(book))?;
        let max_chapter = u32::try_from(chapters.len()).unwrap_or(u32::MAX);
        let max = self
            .verses_in(book, chapter)
            .ok_or(ValidationError::ChapterOutOfRange {
                book,
                chapter,
                max: max_chapter,
            })?;
        if verse > max {
            return Err(ValidationError::VerseOutOfRange {
                book,
                chapter,
                verse,
                max,
            });
        }
        Ok(())
    }
}
