use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_EVENT_TITLE: &str = "No name";

pub type EventId = i64;

/// A recorded interval as persisted by the events service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: EventId,
    pub title: String,
    #[serde(with = "iso8601")]
    pub date_start: DateTime<Utc>,
    #[serde(with = "iso8601")]
    pub date_end: DateTime<Utc>,
}

impl Event {
    pub fn duration_seconds(&self) -> i64 {
        (self.date_end - self.date_start).num_seconds()
    }

    /// Body sent when patching this event: every field except the identity.
    pub fn to_draft(&self) -> EventDraft {
        EventDraft {
            title: self.title.clone(),
            date_start: self.date_start,
            date_end: self.date_end,
        }
    }

    pub fn with_title(&self, title: impl Into<String>) -> Event {
        Event {
            title: title.into(),
            ..self.clone()
        }
    }
}

/// An event that has not been assigned an identity by the server yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    pub title: String,
    #[serde(with = "iso8601")]
    pub date_start: DateTime<Utc>,
    #[serde(with = "iso8601")]
    pub date_end: DateTime<Utc>,
}

impl EventDraft {
    pub fn from_recording(date_start: DateTime<Utc>, date_end: DateTime<Utc>) -> Self {
        Self {
            title: DEFAULT_EVENT_TITLE.to_string(),
            date_start,
            date_end,
        }
    }
}

/// Millisecond precision, `Z` suffix on write; any RFC 3339 offset on read.
pub mod iso8601 {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(value: &DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn parse(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_rfc3339(raw.trim()).map(|value| value.with_timezone(&Utc))
    }

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(|error| {
            serde::de::Error::custom(format!("invalid ISO-8601 timestamp '{raw}': {error}"))
        })
    }
}
