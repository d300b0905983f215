use crate::domain::models::Report;
use chrono::{Datelike, NaiveDate};
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Run-count totals per calendar date in the display time zone.
///
/// Dates without reports are absent; callers decide how an empty day looks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DailyTotals {
    totals: BTreeMap<NaiveDate, u64>,
}

impl DailyTotals {
    pub fn get(&self, date: NaiveDate) -> Option<u64> {
        self.totals.get(&date).copied()
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, u64)> + '_ {
        self.totals.iter().map(|(date, total)| (*date, *total))
    }

    pub fn years(&self) -> BTreeSet<i32> {
        self.totals.keys().map(Datelike::year).collect()
    }

    /// Smallest and largest daily total, `None` when there are no dates.
    pub fn value_range(&self) -> Option<(u64, u64)> {
        let min = self.totals.values().min()?;
        let max = self.totals.values().max()?;
        Some((*min, *max))
    }
}

impl FromIterator<(NaiveDate, u64)> for DailyTotals {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, u64)>>(iter: I) -> Self {
        let mut totals = BTreeMap::new();
        for (date, runs) in iter {
            *totals.entry(date).or_insert(0) += runs;
        }
        Self { totals }
    }
}

pub fn display_date(report: &Report, zone: &Tz) -> NaiveDate {
    report.timestamp.with_timezone(zone).date_naive()
}

pub fn aggregate(reports: &[Report], zone: &Tz) -> DailyTotals {
    reports
        .iter()
        .map(|report| (display_date(report, zone), u64::from(report.run_count)))
        .collect()
}
