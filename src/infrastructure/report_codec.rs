use crate::domain::models::{ItemDrops, Report, ReportSource};
use crate::infrastructure::error::InfraError;
use chrono::{DateTime, SecondsFormat, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Report object as it appears in the JSON feeds.
#[derive(Debug, Clone, Deserialize)]
struct ReportRecord {
    id: Option<serde_json::Value>,
    report_id: Option<String>,
    tweet_id: Option<serde_json::Value>,
    #[serde(default)]
    reporter: Option<String>,
    reporter_id: Option<String>,
    reporter_name: Option<String>,
    chapter: Option<String>,
    place: Option<String>,
    runcount: u32,
    #[serde(default)]
    items: ItemDrops,
    note: Option<String>,
    #[serde(default)]
    timestamp: serde_json::Value,
    #[serde(default)]
    freequest: bool,
    quest_id: Option<String>,
    source: Option<String>,
}

#[derive(Debug, Serialize)]
struct EncodedReport<'a> {
    id: &'a str,
    report_id: Option<&'a str>,
    tweet_id: Option<u64>,
    reporter: &'a str,
    reporter_id: &'a str,
    reporter_name: &'a str,
    chapter: &'a str,
    place: &'a str,
    runcount: u32,
    items: &'a ItemDrops,
    note: &'a str,
    timestamp: String,
    freequest: bool,
    quest_id: &'a str,
    source: &'a str,
}

pub fn decode_reports(raw: &str) -> Result<Vec<Report>, InfraError> {
    let records: Vec<ReportRecord> = serde_json::from_str(raw)?;
    records.into_iter().map(decode_report).collect()
}

/// Serializes reports back to the feed format with timestamps in `zone`.
pub fn encode_reports(reports: &[Report], zone: &Tz) -> Result<String, InfraError> {
    let encoded: Vec<EncodedReport<'_>> = reports
        .iter()
        .map(|report| EncodedReport {
            id: &report.id,
            report_id: report.report_id.as_deref(),
            tweet_id: report.tweet_id,
            reporter: &report.reporter,
            reporter_id: &report.reporter_id,
            reporter_name: &report.reporter_name,
            chapter: &report.chapter,
            place: &report.place,
            runcount: report.run_count,
            items: &report.items,
            note: &report.note,
            timestamp: report
                .timestamp
                .with_timezone(zone)
                .to_rfc3339_opts(SecondsFormat::AutoSi, false),
            freequest: report.freequest,
            quest_id: &report.quest_id,
            source: report.source.as_str(),
        })
        .collect();
    Ok(serde_json::to_string(&encoded)?)
}

fn decode_report(record: ReportRecord) -> Result<Report, InfraError> {
    let report_id = record
        .report_id
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());
    let tweet_id = record.tweet_id.as_ref().map(parse_tweet_id).transpose()?.flatten();

    let id = record
        .id
        .as_ref()
        .and_then(json_scalar_to_string)
        .or_else(|| report_id.clone())
        .or_else(|| tweet_id.map(|value| value.to_string()))
        .ok_or_else(|| {
            InfraError::InvalidReport("report has neither id, report_id nor tweet_id".to_string())
        })?;

    let timestamp = parse_timestamp(&record.timestamp, &id)?;

    let report = Report {
        id,
        report_id,
        tweet_id,
        reporter: record.reporter.unwrap_or_default(),
        reporter_id: record.reporter_id.unwrap_or_default(),
        reporter_name: record.reporter_name.unwrap_or_default(),
        chapter: record.chapter.unwrap_or_default(),
        place: record.place.unwrap_or_default(),
        run_count: record.runcount,
        items: record.items,
        note: record.note.unwrap_or_default(),
        timestamp,
        freequest: record.freequest,
        quest_id: record.quest_id.unwrap_or_default(),
        source: ReportSource::from(record.source.unwrap_or_default()),
    };
    report.validate().map_err(InfraError::InvalidReport)?;
    Ok(report)
}

fn json_scalar_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(text) => Some(text.trim().to_string()).filter(|text| !text.is_empty()),
        serde_json::Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn parse_tweet_id(value: &serde_json::Value) -> Result<Option<u64>, InfraError> {
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Number(number) => number
            .as_u64()
            .map(Some)
            .ok_or_else(|| InfraError::InvalidReport(format!("invalid tweet_id {number}"))),
        serde_json::Value::String(text) if text.trim().is_empty() => Ok(None),
        serde_json::Value::String(text) => text
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|error| InfraError::InvalidReport(format!("invalid tweet_id '{text}': {error}"))),
        other => Err(InfraError::InvalidReport(format!("invalid tweet_id {other}"))),
    }
}

/// Accepts ISO-8601 strings carrying an offset, or epoch milliseconds.
pub fn parse_timestamp(value: &serde_json::Value, report_id: &str) -> Result<DateTime<Utc>, InfraError> {
    let invalid = || InfraError::InvalidTimestamp {
        report_id: report_id.to_string(),
        value: value.to_string(),
    };

    match value {
        serde_json::Value::String(text) => {
            let text = text.trim();
            if let Ok(millis) = text.parse::<i64>() {
                return from_epoch_millis(millis).ok_or_else(invalid);
            }
            DateTime::parse_from_rfc3339(text)
                .or_else(|_| DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%:z"))
                .map(|parsed| parsed.with_timezone(&Utc))
                .map_err(|_| invalid())
        }
        serde_json::Value::Number(number) => number
            .as_i64()
            .and_then(from_epoch_millis)
            .ok_or_else(invalid),
        _ => Err(invalid()),
    }
}

fn from_epoch_millis(millis: i64) -> Option<DateTime<Utc>> {
    if millis < 0 {
        return None;
    }
    DateTime::from_timestamp_millis(millis)
}
