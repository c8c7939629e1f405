//! Validation of the payloads editors and devices submit.
//!
//! Editors pick dates in the Ethiopian calendar; [`VerseForm::into_draft`]
//! converts that date to Gregorian before anything is persisted, and derives
//! the lookup key from the converted date.

use serde::Deserialize;

use crate::bible;
use crate::calendar::{DateParts, EthiopianDate, GregorianDate};
use crate::error::ValidationError;
use crate::types::{DateKey, Platform, VerseStatus};

// ---------------------------------------------------------------------------
// Daily verse editor form
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct VerseForm {
    pub book: u32,
    pub chapter: u32,
    pub verse: u32,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    /// Display date as chosen in the Ethiopian date picker.
    pub ethiopian_date: DateParts,
}

/// A validated verse, ready to be written to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerseDraft {
    pub book: u32,
    pub chapter: u32,
    pub verse: u32,
    pub reference: String,
    pub text: String,
    pub tag: Option<String>,
    pub status: VerseStatus,
    pub ethiopian_date: EthiopianDate,
    pub display_date: GregorianDate,
    pub display_date_key: DateKey,
}

impl VerseForm {
    pub fn into_draft(self) -> Result<VerseDraft, ValidationError> {
        for (field, value) in [
            ("book", self.book),
            ("chapter", self.chapter),
            ("verse", self.verse),
        ] {
            if value < 1 {
                return Err(ValidationError::NotPositive(field));
            }
        }
        bible::check_chapter(self.book, self.chapter)?;

        let ethiopian_date = EthiopianDate::try_from(self.ethiopian_date)?;
        let display_date = ethiopian_date.to_gregorian();

        let reference = non_blank(self.reference).unwrap_or_else(|| {
            match bible::amharic_book_name(self.book) {
                Some(name) => format!("{name} {}:{}", self.chapter, self.verse),
                None => format!("{}:{}", self.chapter, self.verse),
            }
        });

        let status = match non_blank(self.status) {
            Some(raw) => raw.parse()?,
            None => VerseStatus::Active,
        };

        Ok(VerseDraft {
            book: self.book,
            chapter: self.chapter,
            verse: self.verse,
            reference,
            text: self.text.trim().to_string(),
            tag: non_blank(self.tag),
            status,
            ethiopian_date,
            display_date,
            display_date_key: DateKey::from(display_date),
        })
    }
}

// ---------------------------------------------------------------------------
// Push token registration
// ---------------------------------------------------------------------------

/// Registration body as posted by the mobile app. Every field is optional
/// here so a missing field is reported as invalid rather than as a parse
/// failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushTokenPayload {
    pub user_id: Option<String>,
    pub fcm_token: Option<String>,
    pub apns_token: Option<String>,
    pub platform: Option<String>,
    pub device_id: Option<String>,
    pub app_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushTokenRegistration {
    pub user_id: String,
    pub device_id: String,
    pub platform: Platform,
    pub fcm_token: String,
    pub apns_token: Option<String>,
    pub app_version: String,
}

impl PushTokenPayload {
    pub fn validate(self) -> Result<PushTokenRegistration, ValidationError> {
        // Compared verbatim against the caller's identity, so never trimmed.
        let user_id = self
            .user_id
            .filter(|v| !v.trim().is_empty())
            .ok_or(ValidationError::MissingField("userId"))?;
        let fcm_token = required(self.fcm_token, "fcmToken")?;
        let platform = required(self.platform, "platform")?;
        let device_id = required(self.device_id, "deviceId")?;
        let app_version = required(self.app_version, "appVersion")?;

        Ok(PushTokenRegistration {
            user_id,
            device_id,
            platform: platform.parse()?,
            fcm_token,
            apns_token: non_blank(self.apns_token),
            app_version,
        })
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ValidationError> {
    non_blank(value).ok_or(ValidationError::MissingField(field))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CalendarError;

    fn form(year: i32, month: u32, day: u32) -> VerseForm {
        VerseForm {
            book: 23,
            chapter: 40,
            verse: 29,
            reference: None,
            text: "  He gives strength to the weary.  ".into(),
            tag: Some("   ".into()),
            status: None,
            ethiopian_date: DateParts { year, month, day },
        }
    }

    #[test]
    fn test_form_converts_to_gregorian_before_persisting() {
        let draft = form(2016, 1, 1).into_draft().unwrap();
        assert_eq!(draft.display_date.into_parts(), (2023, 9, 12));
        assert_eq!(draft.display_date_key.as_str(), "2023-9-12");
        assert_eq!(draft.reference, "ትንቢተ ኢሳይያስ 40:29");
        assert_eq!(draft.text, "He gives strength to the weary.");
        assert_eq!(draft.tag, None);
        assert_eq!(draft.status, VerseStatus::Active);
    }

    #[test]
    fn test_form_rejects_pagume_six_in_common_year() {
        let err = form(2016, 13, 6).into_draft().unwrap_err();
        assert!(matches!(
            err,
            ValidationError::Date(CalendarError::InvalidDay { .. })
        ));
        assert!(form(2015, 13, 6).into_draft().is_ok());
    }

    #[test]
    fn test_form_keeps_explicit_reference_and_status() {
        let mut f = form(2016, 4, 29);
        f.reference = Some("ኢሳይያስ 40:29".into());
        f.status = Some("Inactive".into());
        f.tag = Some("hope".into());
        let draft = f.into_draft().unwrap();
        assert_eq!(draft.reference, "ኢሳይያስ 40:29");
        assert_eq!(draft.status, VerseStatus::Inactive);
        assert_eq!(draft.tag.as_deref(), Some("hope"));
        assert_eq!(draft.display_date_key.as_str(), "2024-1-8");
    }

    #[test]
    fn test_form_rejects_zero_chapter() {
        let mut f = form(2016, 1, 1);
        f.chapter = 0;
        assert_eq!(f.into_draft().unwrap_err(), ValidationError::NotPositive("chapter"));
    }

    #[test]
    fn test_form_bounds_chapter_by_book() {
        let mut f = form(2016, 1, 1);
        f.chapter = 900;
        assert_eq!(
            f.into_draft().unwrap_err(),
            ValidationError::ChapterOutOfRange { book: 23, chapter: 900, max: 66 }
        );

        let mut f = form(2016, 1, 1);
        f.book = 67;
        assert_eq!(f.into_draft().unwrap_err(), ValidationError::UnknownBook(67));
    }

    fn payload() -> PushTokenPayload {
        PushTokenPayload {
            user_id: Some("user-1".into()),
            fcm_token: Some("fcm-abc".into()),
            apns_token: None,
            platform: Some("IOS".into()),
            device_id: Some("device-1".into()),
            app_version: Some("2.0.1".into()),
        }
    }

    #[test]
    fn test_push_payload_normalises_platform() {
        let reg = payload().validate().unwrap();
        assert_eq!(reg.platform, Platform::Ios);
        assert_eq!(reg.user_id, "user-1");
    }

    #[test]
    fn test_push_payload_requires_fields() {
        let mut p = payload();
        p.app_version = Some("  ".into());
        assert_eq!(
            p.validate().unwrap_err(),
            ValidationError::MissingField("appVersion")
        );

        let mut p = payload();
        p.platform = Some("blackberry".into());
        assert!(matches!(
            p.validate(),
            Err(ValidationError::UnsupportedPlatform(_))
        ));

        assert!(PushTokenPayload::default().validate().is_err());
    }

    #[test]
    fn test_push_payload_keeps_user_id_verbatim() {
        let mut p = payload();
        p.user_id = Some(" user-1".into());
        assert_eq!(p.validate().unwrap().user_id, " user-1");

        let mut p = payload();
        p.user_id = Some("   ".into());
        assert_eq!(p.validate().unwrap_err(), ValidationError::MissingField("userId"));
    }
}
