use crate::domain::aggregation::display_date;
use crate::domain::models::Report;
use chrono::{DateTime, Months, NaiveDate, Utc};
use chrono_tz::Tz;
use std::collections::{BTreeMap, HashMap};

pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";
pub const MONTH_KEY_FORMAT: &str = "%Y-%m";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partitioning {
    ByDate,
    ByMonth,
    ByQuest,
}

impl Partitioning {
    pub fn key(self, report: &Report, zone: &Tz) -> Option<String> {
        match self {
            Self::ByDate => Some(display_date(report, zone).format(DATE_KEY_FORMAT).to_string()),
            Self::ByMonth => Some(display_date(report, zone).format(MONTH_KEY_FORMAT).to_string()),
            Self::ByQuest => {
                let quest_id = report.quest_id.trim();
                if quest_id.is_empty() {
                    None
                } else {
                    Some(quest_id.to_string())
                }
            }
        }
    }
}

pub fn partition(reports: &[Report], rule: Partitioning, zone: &Tz) -> BTreeMap<String, Vec<Report>> {
    let mut partitions: BTreeMap<String, Vec<Report>> = BTreeMap::new();
    for report in reports {
        if let Some(key) = rule.key(report, zone) {
            partitions.entry(key).or_default().push(report.clone());
        }
    }
    for reports in partitions.values_mut() {
        *reports = dedupe_and_sort(std::mem::take(reports));
    }
    partitions
}

/// Drops repeated ids (the later report wins) and orders newest first.
pub fn dedupe_and_sort(reports: Vec<Report>) -> Vec<Report> {
    let mut latest: HashMap<String, Report> = HashMap::with_capacity(reports.len());
    for report in reports {
        latest.insert(report.id.clone(), report);
    }
    let mut unique: Vec<Report> = latest.into_values().collect();
    unique.sort_by(|left, right| {
        right
            .timestamp
            .cmp(&left.timestamp)
            .then_with(|| right.id.cmp(&left.id))
    });
    unique
}

pub fn adjacent_days(key: &str) -> Option<(String, String)> {
    let date = NaiveDate::parse_from_str(key, DATE_KEY_FORMAT).ok()?;
    Some((
        date.pred_opt()?.format(DATE_KEY_FORMAT).to_string(),
        date.succ_opt()?.format(DATE_KEY_FORMAT).to_string(),
    ))
}

pub fn adjacent_months(key: &str) -> Option<(String, String)> {
    let first = NaiveDate::parse_from_str(&format!("{key}-01"), DATE_KEY_FORMAT).ok()?;
    let previous = first.checked_sub_months(Months::new(1))?;
    let next = first.checked_add_months(Months::new(1))?;
    Some((
        previous.format(MONTH_KEY_FORMAT).to_string(),
        next.format(MONTH_KEY_FORMAT).to_string(),
    ))
}

/// One row of the quest index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestListEntry {
    pub quest_id: String,
    pub chapter: String,
    pub place: String,
    pub freequest: bool,
    pub since: DateTime<Utc>,
    pub latest: DateTime<Utc>,
    pub count: usize,
}

impl QuestListEntry {
    pub fn location(&self) -> String {
        format!("{} {}", self.chapter.trim(), self.place.trim())
            .trim()
            .to_string()
    }
}

/// Free quests ordered by id, then event quests newest first by `since`.
/// Names come from each quest's most recent report.
pub fn quest_list(by_quest: &BTreeMap<String, Vec<Report>>) -> Vec<QuestListEntry> {
    let mut free = Vec::new();
    let mut event = Vec::new();
    for (quest_id, reports) in by_quest {
        let Some(newest) = reports.iter().max_by_key(|report| report.timestamp) else {
            continue;
        };
        let since = reports
            .iter()
            .map(|report| report.timestamp)
            .min()
            .unwrap_or(newest.timestamp);
        let entry = QuestListEntry {
            quest_id: quest_id.clone(),
            chapter: newest.chapter.clone(),
            place: newest.place.clone(),
            freequest: newest.freequest,
            since,
            latest: newest.timestamp,
            count: reports.len(),
        };
        if entry.freequest {
            free.push(entry);
        } else {
            event.push(entry);
        }
    }
    event.sort_by(|left, right| {
        right
            .since
            .cmp(&left.since)
            .then_with(|| left.quest_id.cmp(&right.quest_id))
    });
    free.extend(event);
    free
}
