use std::fmt;

use thiserror::Error;

/// Which calendar a rejected date was expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarKind {
    Ethiopian,
    Gregorian,
}

impl fmt::Display for CalendarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalendarKind::Ethiopian => f.write_str("Ethiopian"),
            CalendarKind::Gregorian => f.write_str("Gregorian"),
        }
    }
}

/// Calendar conversion never clamps: every out-of-range component is an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    #[error("Invalid {calendar} month {month}: expected 1..={max}")]
    InvalidMonth {
        calendar: CalendarKind,
        month: u32,
        max: u32,
    },

    #[error("Invalid {calendar} day {day} for {year}-{month}: expected 1..={max}")]
    InvalidDay {
        calendar: CalendarKind,
        year: i32,
        month: u32,
        day: u32,
        max: u32,
    },

    #[error("{calendar} date {year}-{month}-{day} is outside the supported era")]
    OutOfRange {
        calendar: CalendarKind,
        year: i32,
        month: u32,
        day: u32,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid date: {0}")]
    Date(#[from] CalendarError),

    #[error("Missing or blank field: {0}")]
    MissingField(&'static str),

    #[error("{0} must be at least 1")]
    NotPositive(&'static str),

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Unknown verse status: {0}")]
    UnknownStatus(String),

    #[error("Unknown book {0}: expected 1..=66")]
    UnknownBook(u32),

    #[error("Book {book} has {max} chapters, got chapter {chapter}")]
    ChapterOutOfRange { book: u32, chapter: u32, max: u32 },

    #[error("Book {book} chapter {chapter} has {max} verses, got verse {verse}")]
    VerseOutOfRange {
        book: u32,
        chapter: u32,
        verse: u32,
        max: u32,
    },
}
