//! The canonical catalog record and the normalization of loosely-shaped backend records.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// The fixed classification of a file.
///
/// The declaration order is significant: sets of categories iterate in this order,
/// which keeps request construction deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Document,
    Image,
    Video,
    Audio,
    Archive,
    Code,
    Other,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Document,
        Category::Image,
        Category::Video,
        Category::Audio,
        Category::Archive,
        Category::Code,
        Category::Other,
    ];

    /// The wire name, e.g. `DOCUMENT`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Document => "DOCUMENT",
            Category::Image => "IMAGE",
            Category::Video => "VIDEO",
            Category::Audio => "AUDIO",
            Category::Archive => "ARCHIVE",
            Category::Code => "CODE",
            Category::Other => "OTHER",
        }
    }

    /// The human-readable label, e.g. `Document`.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Document => "Document",
            Category::Image => "Image",
            Category::Video => "Video",
            Category::Audio => "Audio",
            Category::Archive => "Archive",
            Category::Code => "Code",
            Category::Other => "Other",
        }
    }

    /// Lenient parse used during normalization: anything unrecognized is `Other`.
    pub fn from_raw(raw: &str) -> Category {
        raw.parse().unwrap_or(Category::Other)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown category: {}", self.0)
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Canonical, immutable metadata of one catalog file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: String,
    pub title: String,
    pub filename: String,
    pub category: Category,
    pub uploaded_at: DateTime<Utc>,
    pub uploaded_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_by_user_id: Option<String>,
    pub file_size: u64,
    pub metadata_text: String,
    pub download_url: String,
}

/// The profile of an authenticated user. Fields beyond `id`, `email` and `name`
/// are carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl FileRecord {
    /// Builds a canonical record from a raw backend record.
    ///
    /// Keys are accepted in camelCase or snake_case; for each field the first present,
    /// non-empty value wins. Relative download URLs are resolved against `api_base_url`.
    /// Normalizing the serialized form of a normalized record yields the same record.
    pub fn from_raw(raw: &Value, api_base_url: &str) -> FileRecord {
        let id = string_field(raw, &["id"]).unwrap_or_else(|| {
            tracing::debug!("Raw file record without an id: {}", raw);
            String::new()
        });

        let download_url = string_field(raw, &["downloadUrl", "download_url"])
            .map(|url| absolutize_url(&url, api_base_url))
            .unwrap_or_default();

        FileRecord {
            id,
            title: string_field(raw, &["title"]).unwrap_or_default(),
            filename: string_field(raw, &["filename", "fileName", "file_name"]).unwrap_or_default(),
            category: string_field(raw, &["category"])
                .map(|c| Category::from_raw(&c))
                .unwrap_or(Category::Other),
            uploaded_at: first_present(raw, &["uploadedAt", "uploaded_at"])
                .and_then(parse_timestamp)
                .unwrap_or_else(Utc::now),
            uploaded_by: string_field(raw, &["uploadedBy", "uploaded_by"])
                .unwrap_or_else(|| "Unknown".to_string()),
            uploaded_by_user_id: string_field(raw, &["uploadedByUserId", "uploaded_by_user_id"]),
            file_size: first_present(raw, &["fileSize", "file_size"])
                .and_then(parse_size)
                .unwrap_or(0),
            metadata_text: string_field(raw, &["metadataText", "metadata_text"]).unwrap_or_default(),
            download_url,
        }
    }
}

/// Returns `url` unchanged when it already carries a scheme, otherwise joins it onto `base`.
pub fn absolutize_url(url: &str, base: &str) -> String {
    if url::Url::parse(url).is_ok() || base.is_empty() {
        return url.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        url.trim_start_matches('/')
    )
}

/// The first key whose value is present and not empty (null and `""` count as absent).
fn first_present<'a>(raw: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| raw.get(*key))
        .find(|value| match value {
            Value::Null => false,
            Value::String(s) => !s.is_empty(),
            _ => true,
        })
}

fn string_field(raw: &Value, keys: &[&str]) -> Option<String> {
    match first_present(raw, keys)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Accepts RFC 3339, ISO-8601 with a compact `+hhmm` offset, zone-less local date-times
/// (read as UTC) and epoch milliseconds.
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let parsed = match value {
        Value::String(s) => parse_timestamp_str(s.trim()),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    };
    if parsed.is_none() {
        tracing::debug!("Unparsable timestamp {}, using the current time", value);
    }
    parsed
}

fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
        .map(|naive| naive.and_utc())
}

fn parse_size(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
