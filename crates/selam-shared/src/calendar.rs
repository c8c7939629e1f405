//! Ethiopian ↔ Gregorian calendar conversion.
//!
//! The Ethiopian calendar has twelve 30-day months followed by Pagume, which
//! has 5 days in a common year and 6 in a leap year (`year mod 4 == 3`).
//!
//! Both directions go through the Julian Day Number (JDN). The Ethiopian side
//! uses the Amete Mihret epoch; the Gregorian side uses the Fliegel–Van
//! Flandern formulae. All arithmetic is on plain integers, so results do not
//! depend on the host time zone or on any runtime date object.
//!
//! Supported era: Ethiopian years `1..=9999` and the Gregorian dates they map
//! to. Anything outside that is rejected with [`CalendarError::OutOfRange`].

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::constants::AMHARIC_MONTHS;
use crate::error::{CalendarError, CalendarKind};

/// JDN of the day before Meskerem 1 of year 1, minus one Ethiopian year.
const ETHIOPIAN_EPOCH_OFFSET: i64 = 1_723_856;

pub const MIN_ETHIOPIAN_YEAR: i32 = 1;
pub const MAX_ETHIOPIAN_YEAR: i32 = 9999;

const MIN_JDN: i64 = ethiopian_to_jdn(MIN_ETHIOPIAN_YEAR, 1, 1);
// 9999 mod 4 == 3, so the last Pagume of the era has 6 days.
const MAX_JDN: i64 = ethiopian_to_jdn(MAX_ETHIOPIAN_YEAR, 13, 6);

// ---------------------------------------------------------------------------
// Leap-year and month-length rules
// ---------------------------------------------------------------------------

/// Ethiopian leap year: the year before the Gregorian one that has Feb 29.
pub fn is_leap_year(ethiopian_year: i32) -> bool {
    ethiopian_year.rem_euclid(4) == 3
}

/// Number of days in an Ethiopian month.
pub fn days_in_month(ethiopian_month: u32, ethiopian_year: i32) -> Result<u32, CalendarError> {
    match ethiopian_month {
        1..=12 => Ok(30),
        13 if is_leap_year(ethiopian_year) => Ok(6),
        13 => Ok(5),
        month => Err(CalendarError::InvalidMonth {
            calendar: CalendarKind::Ethiopian,
            month,
            max: 13,
        }),
    }
}

pub fn is_gregorian_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub fn gregorian_days_in_month(month: u32, year: i32) -> Result<u32, CalendarError> {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => Ok(31),
        4 | 6 | 9 | 11 => Ok(30),
        2 if is_gregorian_leap_year(year) => Ok(29),
        2 => Ok(28),
        month => Err(CalendarError::InvalidMonth {
            calendar: CalendarKind::Gregorian,
            month,
            max: 12,
        }),
    }
}

// ---------------------------------------------------------------------------
// Tuple-level conversions
// ---------------------------------------------------------------------------

/// Convert an Ethiopian `(year, month, day)` into a Gregorian one.
pub fn to_gregorian(year: i32, month: u32, day: u32) -> Result<(i32, u32, u32), CalendarError> {
    let date = EthiopianDate::new(year, month, day)?;
    Ok(date.to_gregorian().into_parts())
}

/// Convert a Gregorian `(year, month, day)` into an Ethiopian one.
pub fn to_ethiopian(year: i32, month: u32, day: u32) -> Result<(i32, u32, u32), CalendarError> {
    let date = GregorianDate::new(year, month, day)?;
    Ok(date.to_ethiopian()?.into_parts())
}

/// The calendar date an instant falls on in the given zone.
pub fn date_in(instant: DateTime<Utc>, tz: Tz) -> GregorianDate {
    GregorianDate::from_naive(tz.from_utc_datetime(&instant.naive_utc()).date_naive())
}

/// Today's calendar date in the given zone.
pub fn today_in(tz: Tz) -> GregorianDate {
    date_in(Utc::now(), tz)
}

// ---------------------------------------------------------------------------
// Date types
// ---------------------------------------------------------------------------

/// Unvalidated `{year, month, day}` triple as it arrives over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateParts {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

/// A validated Ethiopian calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "DateParts", into = "DateParts")]
pub struct EthiopianDate {
    year: i32,
    month: u32,
    day: u32,
}

impl EthiopianDate {
    pub fn new(year: i32, month: u32, day: u32) -> Result<Self, CalendarError> {
        let max = days_in_month(month, year)?;
        if day < 1 || day > max {
            return Err(CalendarError::InvalidDay {
                calendar: CalendarKind::Ethiopian,
                year,
                month,
                day,
                max,
            });
        }
        if !(MIN_ETHIOPIAN_YEAR..=MAX_ETHIOPIAN_YEAR).contains(&year) {
            return Err(CalendarError::OutOfRange {
                calendar: CalendarKind::Ethiopian,
                year,
                month,
                day,
            });
        }
        Ok(Self { year, month, day })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn into_parts(self) -> (i32, u32, u32) {
        (self.year, self.month, self.day)
    }

    pub fn month_name(&self) -> &'static str {
        // month is validated to 1..=13 on construction
        AMHARIC_MONTHS[(self.month - 1) as usize]
    }

    pub fn is_leap_year(&self) -> bool {
        is_leap_year(self.year)
    }

    pub fn to_gregorian(&self) -> GregorianDate {
        GregorianDate::from_jdn(ethiopian_to_jdn(self.year, self.month, self.day))
    }

    fn from_jdn(jdn: i64) -> Self {
        let n = jdn - ETHIOPIAN_EPOCH_OFFSET;
        let r = n.rem_euclid(1461);
        let day_of_year = r % 365 + 365 * (r / 1460);
        let year = 4 * n.div_euclid(1461) + r / 365 - r / 1460;

        Self {
            year: year as i32,
            month: (day_of_year / 30 + 1) as u32,
            day: (day_of_year % 30 + 1) as u32,
        }
    }
}

impl TryFrom<DateParts> for EthiopianDate {
    type Error = CalendarError;

    fn try_from(parts: DateParts) -> Result<Self, Self::Error> {
        Self::new(parts.year, parts.month, parts.day)
    }
}

impl From<EthiopianDate> for DateParts {
    fn from(date: EthiopianDate) -> Self {
        DateParts {
            year: date.year,
            month: date.month,
            day: date.day,
        }
    }
}

impl fmt::Display for EthiopianDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02} E.C.", self.year, self.month, self.day)
    }
}

/// A validated proleptic Gregorian date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "DateParts", into = "DateParts")]
pub struct GregorianDate {
    year: i32,
    month: u32,
    day: u32,
}

impl GregorianDate {
    pub fn new(year: i32, month: u32, day: u32) -> Result<Self, CalendarError> {
        let max = gregorian_days_in_month(month, year)?;
        if day < 1 || day > max {
            return Err(CalendarError::InvalidDay {
                calendar: CalendarKind::Gregorian,
                year,
                month,
                day,
                max,
            });
        }
        Ok(Self { year, month, day })
    }

    pub fn from_naive(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
            day: date.day(),
        }
    }

    pub fn to_naive(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn into_parts(self) -> (i32, u32, u32) {
        (self.year, self.month, self.day)
    }

    /// Convert to the Ethiopian calendar; fails outside the supported era.
    pub fn to_ethiopian(&self) -> Result<EthiopianDate, CalendarError> {
        let jdn = gregorian_to_jdn(self.year, self.month, self.day);
        if !(MIN_JDN..=MAX_JDN).contains(&jdn) {
            return Err(CalendarError::OutOfRange {
                calendar: CalendarKind::Gregorian,
                year: self.year,
                month: self.month,
                day: self.day,
            });
        }
        Ok(EthiopianDate::from_jdn(jdn))
    }

    fn from_jdn(jdn: i64) -> Self {
        let a = jdn + 32_044;
        let b = (4 * a + 3) / 146_097;
        let c = a - 146_097 * b / 4;
        let d = (4 * c + 3) / 1461;
        let e = c - 1461 * d / 4;
        let m = (5 * e + 2) / 153;

        Self {
            year: (100 * b + d - 4800 + m / 10) as i32,
            month: (m + 3 - 12 * (m / 10)) as u32,
            day: (e - (153 * m + 2) / 5 + 1) as u32,
        }
    }
}

impl TryFrom<DateParts> for GregorianDate {
    type Error = CalendarError;

    fn try_from(parts: DateParts) -> Result<Self, Self::Error> {
        Self::new(parts.year, parts.month, parts.day)
    }
}

impl From<GregorianDate> for DateParts {
    fn from(date: GregorianDate) -> Self {
        DateParts {
            year: date.year,
            month: date.month,
            day: date.day,
        }
    }
}

impl fmt::Display for GregorianDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

// ---------------------------------------------------------------------------
// Julian Day Number arithmetic
// ---------------------------------------------------------------------------

const fn ethiopian_to_jdn(year: i32, month: u32, day: u32) -> i64 {
    let y = year as i64;
    ETHIOPIAN_EPOCH_OFFSET + 365 + 365 * (y - 1) + y.div_euclid(4) + 30 * month as i64 + day as i64
        - 31
}

fn gregorian_to_jdn(year: i32, month: u32, day: u32) -> i64 {
    let a = (14 - i64::from(month)) / 12;
    let y = i64::from(year) + 4800 - a;
    let m = i64::from(month) + 12 * a - 3;

    i64::from(day) + (153 * m + 2) / 5 + 365 * y + y.div_euclid(4) - y.div_euclid(100)
        + y.div_euclid(400)
        - 32_045
}
