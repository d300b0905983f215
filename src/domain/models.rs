use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

const FGODROP_REPORT_BASE: &str = "https://fgodrop.max747.org/reports/";
const TWITTER_BASE: &str = "https://twitter.com/";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ReportSource {
    Fgodrop,
    Twitter,
    Other(String),
}

impl ReportSource {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Fgodrop => "fgodrop",
            Self::Twitter => "twitter",
            Self::Other(value) => value.as_str(),
        }
    }
}

impl From<String> for ReportSource {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "fgodrop" => Self::Fgodrop,
            "twitter" | "" => Self::Twitter,
            _ => Self::Other(value),
        }
    }
}

impl From<ReportSource> for String {
    fn from(value: ReportSource) -> Self {
        value.as_str().to_string()
    }
}

/// Item drops of a single report, kept in the order the feed listed them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemDrops(Vec<(String, String)>);

impl ItemDrops {
    pub fn new(entries: Vec<(String, String)>) -> Self {
        Self(entries)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `key: value` pairs joined with `, `.
    pub fn summary(&self) -> String {
        self.iter()
            .map(|(key, value)| format!("{key}: {value}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Serialize for ItemDrops {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct ItemDropsVisitor;

impl<'de> Visitor<'de> for ItemDropsVisitor {
    type Value = ItemDrops;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map of item name to drop count")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, serde_json::Value>()? {
            let value = match value {
                serde_json::Value::String(text) => text,
                other => other.to_string(),
            };
            entries.push((key, value));
        }
        Ok(ItemDrops(entries))
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(ItemDrops::default())
    }
}

impl<'de> Deserialize<'de> for ItemDrops {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ItemDropsVisitor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub id: String,
    pub report_id: Option<String>,
    pub tweet_id: Option<u64>,
    pub reporter: String,
    pub reporter_id: String,
    pub reporter_name: String,
    pub chapter: String,
    pub place: String,
    pub run_count: u32,
    pub items: ItemDrops,
    pub note: String,
    pub timestamp: DateTime<Utc>,
    pub freequest: bool,
    pub quest_id: String,
    pub source: ReportSource,
}

impl Report {
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("report.id must not be empty".to_string());
        }
        Ok(())
    }

    pub fn location(&self) -> String {
        format!("{} {}", self.chapter.trim(), self.place.trim())
            .trim()
            .to_string()
    }

    pub fn display_reporter(&self) -> &str {
        let name = self.reporter_name.trim();
        if name.is_empty() {
            self.reporter.trim()
        } else {
            name
        }
    }

    /// Detail page for fgodrop reports, the original post for everything else.
    pub fn permalink(&self) -> Option<String> {
        match self.source {
            ReportSource::Fgodrop => self
                .report_id
                .as_deref()
                .map(|report_id| format!("{FGODROP_REPORT_BASE}{report_id}")),
            _ => self.tweet_id.map(|tweet_id| {
                format!("{TWITTER_BASE}{}/status/{tweet_id}", self.reporter.trim())
            }),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    pub(crate) fn sample_report(id: &str, timestamp: &str, run_count: u32) -> Report {
        Report {
            id: id.to_string(),
            report_id: Some(id.to_string()),
            tweet_id: None,
            reporter: "max747".to_string(),
            reporter_id: "u-1".to_string(),
            reporter_name: String::new(),
            chapter: "冬木".to_string(),
            place: "X-A".to_string(),
            run_count,
            items: ItemDrops::new(vec![
                ("骨".to_string(), "3".to_string()),
                ("証".to_string(), "1".to_string()),
            ]),
            note: String::new(),
            timestamp: fixed_time(timestamp),
            freequest: true,
            quest_id: "0001".to_string(),
            source: ReportSource::Fgodrop,
        }
    }

    #[test]
    fn item_drops_preserve_feed_order() {
        let drops: ItemDrops =
            serde_json::from_str(r#"{"z": "1", "a": 2, "m": "NaN"}"#).expect("parse drops");
        assert_eq!(drops.summary(), "z: 1, a: 2, m: NaN");

        let encoded = serde_json::to_string(&drops).expect("encode drops");
        assert_eq!(encoded, r#"{"z":"1","a":"2","m":"NaN"}"#);
    }

    #[test]
    fn null_items_decode_as_empty() {
        let drops: ItemDrops = serde_json::from_str("null").expect("parse null drops");
        assert!(drops.is_empty());
        assert_eq!(drops.summary(), "");
    }

    #[test]
    fn permalink_depends_on_source() {
        let fgodrop = sample_report("rep-1", "2024-01-01T00:00:00Z", 1);
        assert_eq!(
            fgodrop.permalink().as_deref(),
            Some("https://fgodrop.max747.org/reports/rep-1")
        );

        let mut tweet = sample_report("123", "2024-01-01T00:00:00Z", 1);
        tweet.source = ReportSource::Twitter;
        tweet.report_id = None;
        tweet.tweet_id = Some(123);
        assert_eq!(
            tweet.permalink().as_deref(),
            Some("https://twitter.com/max747/status/123")
        );
    }

    #[test]
    fn display_reporter_prefers_name() {
        let mut report = sample_report("rep-1", "2024-01-01T00:00:00Z", 1);
        assert_eq!(report.display_reporter(), "max747");
        report.reporter_name = "Max".to_string();
        assert_eq!(report.display_reporter(), "Max");
    }

    #[test]
    fn validate_requires_only_a_non_empty_id() {
        let mut report = sample_report("rep-1", "2024-01-01T00:00:00Z", 1);
        assert!(report.validate().is_ok());
        report.report_id = None;
        report.tweet_id = None;
        assert!(report.validate().is_ok());
        assert_eq!(report.permalink(), None);
        report.id = "  ".to_string();
        assert!(report.validate().is_err());
    }

    #[test]
    fn source_parsing_keeps_unknown_values() {
        assert_eq!(ReportSource::from("FGODROP".to_string()), ReportSource::Fgodrop);
        assert_eq!(ReportSource::from(String::new()), ReportSource::Twitter);
        assert_eq!(
            ReportSource::from("mastodon".to_string()),
            ReportSource::Other("mastodon".to_string())
        );
    }
}
