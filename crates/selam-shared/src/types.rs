use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::GregorianDate;
use crate::error::ValidationError;

// Lookup key for "today's" content: `{year}-{month}-{day}`, never zero-padded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DateKey(String);

impl DateKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<GregorianDate> for DateKey {
    fn from(date: GregorianDate) -> Self {
        Self(format!("{}-{}-{}", date.year(), date.month(), date.day()))
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerseStatus {
    #[default]
    Active,
    Inactive,
}

impl VerseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerseStatus::Active => "active",
            VerseStatus::Inactive => "inactive",
        }
    }
}

impl FromStr for VerseStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(VerseStatus::Active),
            "inactive" => Ok(VerseStatus::Inactive),
            _ => Err(ValidationError::UnknownStatus(s.to_string())),
        }
    }
}

/// A verse scheduled for display on one Gregorian calendar day.
///
/// `book`, `chapter` and `verse` are optional because older records were
/// written without them; the notifier falls back to `1` for each.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyVerse {
    pub id: String,
    pub book: Option<u32>,
    pub chapter: Option<u32>,
    pub verse: Option<u32>,
    /// Human-readable reference, e.g. "ኢሳይያስ 40:29".
    pub reference: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub status: VerseStatus,
    pub display_date: GregorianDate,
    /// Always derived from `display_date`.
    pub display_date_key: DateKey,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
    Web,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Android => "android",
            Platform::Web => "web",
        }
    }
}

impl FromStr for Platform {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ios" => Ok(Platform::Ios),
            "android" => Ok(Platform::Android),
            "web" => Ok(Platform::Web),
            _ => Err(ValidationError::UnsupportedPlatform(s.to_string())),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A device registered to receive push notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushToken {
    pub user_id: String,
    pub device_id: String,
    pub platform: Platform,
    pub fcm_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apns_token: Option<String>,
    pub app_version: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PushToken {
    pub fn doc_id(&self) -> String {
        push_token_doc_id(&self.user_id, &self.device_id)
    }
}

/// One record per (user, device) pair.
pub fn push_token_doc_id(user_id: &str, device_id: &str) -> String {
    format!("{user_id}__{device_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_key_is_unpadded() {
        let key = DateKey::from(GregorianDate::new(2024, 1, 8).unwrap());
        assert_eq!(key.as_str(), "2024-1-8");

        let key = DateKey::from(GregorianDate::new(2023, 12, 25).unwrap());
        assert_eq!(key.to_string(), "2023-12-25");
    }

    #[test]
    fn test_platform_parse_is_case_insensitive() {
        assert_eq!("iOS".parse::<Platform>().unwrap(), Platform::Ios);
        assert_eq!(" ANDROID ".parse::<Platform>().unwrap(), Platform::Android);
        assert_eq!("web".parse::<Platform>().unwrap(), Platform::Web);
        assert!(matches!(
            "symbian".parse::<Platform>(),
            Err(ValidationError::UnsupportedPlatform(_))
        ));
    }

    #[test]
    fn test_verse_status_serde() {
        assert_eq!(serde_json::to_string(&VerseStatus::Inactive).unwrap(), "\"inactive\"");
        assert_eq!("Active".parse::<VerseStatus>().unwrap(), VerseStatus::Active);
        assert!("draft".parse::<VerseStatus>().is_err());
    }

    #[test]
    fn test_push_token_doc_id() {
        assert_eq!(push_token_doc_id("user-1", "device-9"), "user-1__device-9");
    }

    #[test]
    fn test_push_token_wire_format_is_camel_case() {
        let now = Utc::now();
        let token = PushToken {
            user_id: "u".into(),
            device_id: "d".into(),
            platform: Platform::Android,
            fcm_token: "f".into(),
            apns_token: None,
            app_version: "1.2.0".into(),
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&token).unwrap();
        assert_eq!(json["fcmToken"], "f");
        assert_eq!(json["platform"], "android");
        assert!(json.get("apnsToken").is_none());
    }
}
