/// Application name
pub const APP_NAME: &str = "Selam";

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// IANA zone used to decide which calendar day "today" is
pub const DEFAULT_TIME_ZONE: &str = "Africa/Addis_Ababa";

/// Header a scheduler uses to present the cron secret
pub const CRON_SECRET_HEADER: &str = "x-cron-secret";

/// Ceiling imposed by the push gateway's multicast API
pub const MAX_TOKENS_PER_BATCH: usize = 500;

/// Daily verse notification copy
pub const DAILY_VERSE_TITLE: &str = "Daily reminder to read your Bible";
pub const DAILY_VERSE_FALLBACK_REFERENCE: &str = "Daily Verse";
pub const DAILY_VERSE_DATA_TYPE: &str = "daily_verse";

/// Per-chapter verse counts, indexed by book in canonical order
pub const DEFAULT_VERSE_COUNTS_URL: &str =
    "https://raw.githubusercontent.com/bkuhl/bible-verse-counts-per-chapter/master/bible.json";

/// Fallback for book/chapter/verse on legacy records that lack them
pub const DEFAULT_VERSE_COORDINATE: u32 = 1;

/// Ethiopian month names, Meskerem through Pagume
pub const AMHARIC_MONTHS: [&str; 13] = [
    "መስከረም",
    "ጥቅምት",
    "ህዳር",
    "ታኅሳስ",
    "ጥር",
    "የካቲት",
    "መጋቢት",
    "ሚያዝያ",
    "ግንቦት",
    "ሰኔ",
    "ሐምሌ",
    "ነሐሴ",
    "ጳጐሜ",
];
