//! HTML report pages grouped by day, month and quest.
//!
//! Day and month pages split free-quest reports from event-quest reports and
//! link to their neighbours; quest pages carry the heatmap container and link
//! to the JSON feed the heatmap is drawn from. `quest/index.html` lists every
//! quest, and `latest.html` in the date and month directories repeats the
//! newest page.

use crate::domain::models::Report;
use crate::domain::partition::{
    Partitioning, QuestListEntry, adjacent_days, adjacent_months, partition, quest_list,
};
use crate::infrastructure::command_log::CommandLog;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::report_codec::encode_reports;
use crate::infrastructure::storage::PageStore;
use chrono_tz::Tz;
use std::path::PathBuf;

const DISPLAY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const LATEST_PAGE: &str = "latest.html";
const QUEST_INDEX_PAGE: &str = "index.html";
const NONE_PLACEHOLDER: &str = r#"<p class="none">none</p>"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub relative_path: PathBuf,
    pub contents: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteSummary {
    pub dates: Vec<String>,
    pub months: Vec<String>,
    pub quests: Vec<String>,
    pub files_written: usize,
    pub heatmaps_drawn: usize,
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn inline_css() -> &'static str {
    r#"
body { font-family: system-ui, sans-serif; margin: 0 auto; max-width: 1200px; padding: 1rem; color: #1f2328; }
nav.pager { display: flex; justify-content: space-between; margin: 1rem 0; }
table.reports { border-collapse: collapse; width: 100%; font-size: 0.9rem; }
table.reports th, table.reports td { border-bottom: 1px solid #d0d7de; padding: 0.3rem 0.5rem; text-align: left; }
table.reports td.runs { text-align: right; }
p.none { color: #6e7781; font-style: italic; }
#heatmap { width: 100%; overflow-x: auto; }
"#
}

fn render_document(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="ja">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>{css}</style>
</head>
<body>
{body}
</body>
</html>
"#,
        title = html_escape(title),
        css = inline_css(),
        body = body,
    )
}

fn render_pager(previous: Option<&str>, current: &str, next: Option<&str>) -> String {
    let link = |target: Option<&str>, label: &str| match target {
        Some(key) => format!(
            r#"<a href="{href}.html">{label} {key}</a>"#,
            href = html_escape(key),
            key = html_escape(key),
        ),
        None => String::from("<span></span>"),
    };
    format!(
        r#"<nav class="pager">{previous}<strong>{current}</strong>{next}</nav>"#,
        previous = link(previous, "&larr;"),
        current = html_escape(current),
        next = link(next, "&rarr;"),
    )
}

fn render_table(reports: &[Report], zone: &Tz, show_location: bool) -> String {
    if reports.is_empty() {
        return NONE_PLACEHOLDER.to_string();
    }

    let location_header = if show_location { "<th>Location</th>" } else { "" };
    let mut rows = String::new();
    for report in reports {
        let time = report.timestamp.with_timezone(zone).format(DISPLAY_TIME_FORMAT);
        let link = report
            .permalink()
            .map(|href| format!(r#"<a href="{}">link</a>"#, html_escape(&href)))
            .unwrap_or_default();
        let location = if show_location {
            format!("<td>{}</td>", html_escape(&report.location()))
        } else {
            String::new()
        };
        rows.push_str(&format!(
            r#"<tr><td>{time}</td><td>{reporter}</td>{location}<td class="runs">{runs}</td><td>{drops}</td><td>{link}</td></tr>
"#,
            reporter = html_escape(report.display_reporter()),
            runs = report.run_count,
            drops = html_escape(&report.items.summary()),
        ));
    }

    format!(
        r#"<table class="reports">
<thead><tr><th>Time</th><th>Reporter</th>{location_header}<th>Runs</th><th>Drops</th><th></th></tr></thead>
<tbody>
{rows}</tbody>
</table>"#
    )
}

fn render_split_sections(reports: &[Report], zone: &Tz) -> String {
    let (free, event): (Vec<Report>, Vec<Report>) =
        reports.iter().cloned().partition(|report| report.freequest);
    format!(
        "<section class=\"freequest\">\n<h2>Free quests</h2>\n{}\n</section>\n<section class=\"event\">\n<h2>Event quests</h2>\n{}\n</section>",
        render_table(&free, zone, true),
        render_table(&event, zone, true),
    )
}

pub fn render_date_page(key: &str, reports: &[Report], zone: &Tz, app_name: &str) -> String {
    let neighbours = adjacent_days(key);
    let body = format!(
        "<h1>{title}</h1>\n{pager}\n<p class=\"exports\"><a href=\"{csv}.csv\">CSV</a></p>\n{sections}",
        title = html_escape(&format!("{app_name} {key}")),
        pager = render_pager(
            neighbours.as_ref().map(|(previous, _)| previous.as_str()),
            key,
            neighbours.as_ref().map(|(_, next)| next.as_str()),
        ),
        csv = html_escape(key),
        sections = render_split_sections(reports, zone),
    );
    render_document(&format!("{app_name} {key}"), &body)
}

pub fn render_month_page(key: &str, reports: &[Report], zone: &Tz, app_name: &str) -> String {
    let neighbours = adjacent_months(key);
    let body = format!(
        "<h1>{title}</h1>\n{pager}\n<p class=\"exports\"><a href=\"{csv}.csv\">CSV</a></p>\n{sections}",
        title = html_escape(&format!("{app_name} {key}")),
        pager = render_pager(
            neighbours.as_ref().map(|(previous, _)| previous.as_str()),
            key,
            neighbours.as_ref().map(|(_, next)| next.as_str()),
        ),
        csv = html_escape(key),
        sections = render_split_sections(reports, zone),
    );
    render_document(&format!("{app_name} {key}"), &body)
}

pub fn render_quest_page(quest_id: &str, reports: &[Report], zone: &Tz, app_name: &str) -> String {
    let quest_name = reports
        .first()
        .map(Report::location)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| quest_id.to_string());
    let id = html_escape(quest_id);
    let body = format!(
        r#"<h1>{name}</h1>
<p class="exports"><a href="{id}.json">JSON</a></p>
<div id="heatmap" data-feed="{id}.json"><object type="image/svg+xml" data="{id}.svg"></object></div>
{table}"#,
        name = html_escape(&quest_name),
        table = render_table(reports, zone, false),
    );
    render_document(&format!("{app_name} {quest_name}"), &body)
}

fn render_quest_list_table(entries: &[&QuestListEntry], zone: &Tz) -> String {
    if entries.is_empty() {
        return NONE_PLACEHOLDER.to_string();
    }

    let mut rows = String::new();
    for entry in entries {
        rows.push_str(&format!(
            r#"<tr><td><a href="{id}.html">{id}</a></td><td>{chapter}</td><td>{place}</td><td>{since}</td><td>{latest}</td><td class="runs">{count}</td></tr>
"#,
            id = html_escape(&entry.quest_id),
            chapter = html_escape(&entry.chapter),
            place = html_escape(&entry.place),
            since = entry.since.with_timezone(zone).format(DISPLAY_TIME_FORMAT),
            latest = entry.latest.with_timezone(zone).format(DISPLAY_TIME_FORMAT),
            count = entry.count,
        ));
    }

    format!(
        r#"<table class="reports">
<thead><tr><th>Quest</th><th>Chapter</th><th>Place</th><th>Since</th><th>Latest</th><th>Reports</th></tr></thead>
<tbody>
{rows}</tbody>
</table>"#
    )
}

pub fn render_quest_index(entries: &[QuestListEntry], zone: &Tz, app_name: &str) -> String {
    let (free, event): (Vec<&QuestListEntry>, Vec<&QuestListEntry>) =
        entries.iter().partition(|entry| entry.freequest);
    let body = format!(
        "<h1>{title}</h1>\n<section class=\"freequest\">\n<h2>Free quests</h2>\n{free}\n</section>\n<section class=\"event\">\n<h2>Event quests</h2>\n{event}\n</section>",
        title = html_escape(&format!("{app_name} quests")),
        free = render_quest_list_table(&free, zone),
        event = render_quest_list_table(&event, zone),
    );
    render_document(&format!("{app_name} quests"), &body)
}

/// Renders every day, month and quest page plus the per-quest JSON feeds.
pub fn build_pages(reports: &[Report], zone: &Tz, app_name: &str) -> Result<(Vec<Page>, SiteSummary), InfraError> {
    let mut pages = Vec::new();
    let mut summary = SiteSummary::default();

    for (key, group) in partition(reports, Partitioning::ByDate, zone) {
        pages.push(Page {
            relative_path: PathBuf::from("date").join(format!("{key}.html")),
            contents: render_date_page(&key, &group, zone, app_name),
        });
        summary.dates.push(key);
    }
    push_latest(&mut pages, "date");

    for (key, group) in partition(reports, Partitioning::ByMonth, zone) {
        pages.push(Page {
            relative_path: PathBuf::from("month").join(format!("{key}.html")),
            contents: render_month_page(&key, &group, zone, app_name),
        });
        summary.months.push(key);
    }
    push_latest(&mut pages, "month");

    let by_quest = partition(reports, Partitioning::ByQuest, zone);
    for (key, group) in &by_quest {
        if key.contains(['/', '\\']) || key == ".." {
            return Err(InfraError::InvalidReport(format!("quest id '{key}' is not a valid file name")));
        }
        pages.push(Page {
            relative_path: PathBuf::from("quest").join(format!("{key}.html")),
            contents: render_quest_page(key, group, zone, app_name),
        });
        pages.push(Page {
            relative_path: PathBuf::from("quest").join(format!("{key}.json")),
            contents: encode_reports(group, zone)?,
        });
        summary.quests.push(key.clone());
    }
    if !by_quest.is_empty() {
        pages.push(Page {
            relative_path: PathBuf::from("quest").join(QUEST_INDEX_PAGE),
            contents: render_quest_index(&quest_list(&by_quest), zone, app_name),
        });
    }

    Ok((pages, summary))
}

/// Copies the newest page under `dir` to `<dir>/latest.html`. Pages under one
/// directory are pushed in key order, so the newest is the last one.
fn push_latest(pages: &mut Vec<Page>, dir: &str) {
    let newest = pages
        .iter()
        .rev()
        .find(|page| page.relative_path.starts_with(dir))
        .map(|page| page.contents.clone());
    if let Some(contents) = newest {
        pages.push(Page {
            relative_path: PathBuf::from(dir).join(LATEST_PAGE),
            contents,
        });
    }
}

pub fn write_pages<P: PageStore>(
    store: &P,
    pages: &[Page],
    log: &CommandLog,
) -> Result<usize, InfraError> {
    for page in pages {
        match store.write(&page.relative_path, &page.contents) {
            Ok(path) => log.info("write_pages", &format!("wrote {}", path.display())),
            Err(error) => {
                log.error(
                    "write_pages",
                    &format!("failed writing {}: {error}", page.relative_path.display()),
                );
                return Err(error);
            }
        }
    }
    Ok(pages.len())
}
