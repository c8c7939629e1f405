//! # selam-shared
//!
//! Types and pure logic shared by the Selam store and server: the Ethiopian
//! calendar converter, the bundled book table, the daily verse and push token records, and the
//! validation applied to editor and device payloads.

pub mod bible;
pub mod calendar;
pub mod constants;
pub mod error;
pub mod form;
pub mod types;

pub use bible::VerseCounts;
pub use calendar::{EthiopianDate, GregorianDate};
pub use error::{CalendarError, ValidationError};
pub use types::{DailyVerse, DateKey, Platform, PushToken, VerseStatus};
