//! Calendar heatmap layout and drawing.
//!
//! The layout constants are compatibility policy: cell size grows one pixel
//! per 57px of container width above 600px and stays within 9..=18, and each
//! distinct year gets a fixed 160px band below a 50px margin.

use crate::domain::aggregation::DailyTotals;
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

pub const MIN_CELL_SIZE_PX: u32 = 9;
pub const MAX_CELL_SIZE_PX: u32 = 18;
const BASELINE_WIDTH_PX: i64 = 600;
const WIDTH_PER_CELL_STEP_PX: i64 = 57;
const CHART_MARGIN_PX: u32 = 50;
const YEAR_BAND_PX: u32 = 160;
const LABEL_GUTTER_PX: u32 = 32;
const TOP_MARGIN_PX: u32 = 25;
const EMPTY_CELL_COLOR: &str = "#ededed";
const WEEKS_PER_YEAR_GRID: u32 = 54;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorScale {
    #[serde(rename = "lowColor")]
    pub low: String,
    #[serde(rename = "highColor")]
    pub high: String,
}

impl Default for ColorScale {
    fn default() -> Self {
        Self {
            low: "#d6e685".to_string(),
            high: "#1e6823".to_string(),
        }
    }
}

impl ColorScale {
    pub fn validate(&self) -> Result<(), String> {
        parse_hex_color(&self.low).ok_or_else(|| format!("invalid low color '{}'", self.low))?;
        parse_hex_color(&self.high).ok_or_else(|| format!("invalid high color '{}'", self.high))?;
        Ok(())
    }

    /// Color for `value` placed linearly between `min` and `max`.
    pub fn color_for(&self, value: u64, min: u64, max: u64) -> String {
        let (Some(low), Some(high)) = (parse_hex_color(&self.low), parse_hex_color(&self.high))
        else {
            return self.high.clone();
        };
        if max <= min {
            return format_hex_color(high);
        }
        let ratio = (value.clamp(min, max) - min) as f64 / (max - min) as f64;
        let channel = |from: u8, to: u8| -> u8 {
            (f64::from(from) + (f64::from(to) - f64::from(from)) * ratio).round() as u8
        };
        format_hex_color([
            channel(low[0], high[0]),
            channel(low[1], high[1]),
            channel(low[2], high[2]),
        ])
    }
}

fn parse_hex_color(value: &str) -> Option<[u8; 3]> {
    let hex = value.trim().strip_prefix('#')?;
    if hex.len() != 6 || !hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
    Some([channel(0..2)?, channel(2..4)?, channel(4..6)?])
}

fn format_hex_color(rgb: [u8; 3]) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2])
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayoutParameters {
    pub cell_size_px: u32,
    pub chart_height_px: u32,
    pub color_scale: ColorScale,
    pub viewport_width_px: i64,
}

pub fn cell_size_px(viewport_width_px: i64) -> u32 {
    let steps = viewport_width_px
        .saturating_sub(BASELINE_WIDTH_PX)
        .div_euclid(WIDTH_PER_CELL_STEP_PX);
    let size = i64::from(MIN_CELL_SIZE_PX)
        .saturating_add(steps)
        .clamp(i64::from(MIN_CELL_SIZE_PX), i64::from(MAX_CELL_SIZE_PX));
    size as u32
}

pub fn chart_height_px(year_count: usize) -> u32 {
    let years = u32::try_from(year_count).unwrap_or(u32::MAX);
    CHART_MARGIN_PX.saturating_add(years.saturating_mul(YEAR_BAND_PX))
}

pub fn compute_layout(
    totals: &DailyTotals,
    viewport_width_px: i64,
    color_scale: &ColorScale,
) -> LayoutParameters {
    LayoutParameters {
        cell_size_px: cell_size_px(viewport_width_px),
        chart_height_px: chart_height_px(totals.years().len()),
        color_scale: color_scale.clone(),
        viewport_width_px,
    }
}

/// Week column of `date` within its year's grid, weeks starting on Sunday.
fn week_column(date: NaiveDate) -> u32 {
    let first = NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date);
    (date.ordinal0() + first.weekday().num_days_from_sunday()) / 7
}

pub fn paint_svg(totals: &DailyTotals, layout: &LayoutParameters) -> String {
    let cell = layout.cell_size_px;
    let width = LABEL_GUTTER_PX + WEEKS_PER_YEAR_GRID * cell;
    let height = layout.chart_height_px;
    let (min, max) = totals.value_range().unwrap_or((0, 0));

    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" class="heatmap" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
    );

    for (band, year) in totals.years().into_iter().enumerate() {
        let top = TOP_MARGIN_PX + band as u32 * YEAR_BAND_PX;
        let _ = write!(
            svg,
            r#"<text class="year" x="0" y="{}" font-size="12">{year}</text>"#,
            top.saturating_sub(6)
        );
        for (row, label) in [(Weekday::Mon, "Mon"), (Weekday::Wed, "Wed"), (Weekday::Fri, "Fri")] {
            let y = top + row.num_days_from_sunday() * cell + cell - 1;
            let _ = write!(
                svg,
                r#"<text class="weekday" x="0" y="{y}" font-size="9">{label}</text>"#
            );
        }

        let Some(first) = NaiveDate::from_ymd_opt(year, 1, 1) else {
            continue;
        };
        for date in first.iter_days().take_while(|date| date.year() == year) {
            let x = LABEL_GUTTER_PX + week_column(date) * cell;
            let y = top + date.weekday().num_days_from_sunday() * cell;
            let size = cell.saturating_sub(1).max(1);
            let iso = date.format("%Y-%m-%d");
            match totals.get(date) {
                Some(total) => {
                    let fill = layout.color_scale.color_for(total, min, max);
                    let _ = write!(
                        svg,
                        r#"<rect x="{x}" y="{y}" width="{size}" height="{size}" fill="{fill}" data-date="{iso}" data-runs="{total}"><title>{iso}: {total}</title></rect>"#
                    );
                }
                None => {
                    let _ = write!(
                        svg,
                        r#"<rect x="{x}" y="{y}" width="{size}" height="{size}" fill="{EMPTY_CELL_COLOR}" data-date="{iso}"/>"#
                    );
                }
            }
        }
    }

    svg.push_str("</svg>");
    svg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregation::aggregate;
    use crate::domain::models::tests::sample_report;
    use chrono_tz::Asia::Tokyo;
    use proptest::prelude::*;

    #[test]
    fn cell_size_matches_reference_widths() {
        assert_eq!(cell_size_px(0), 9);
        assert_eq!(cell_size_px(600), 9);
        assert_eq!(cell_size_px(1000), 16);
        assert_eq!(cell_size_px(1113), 18);
        assert_eq!(cell_size_px(2000), 18);
    }

    #[test]
    fn cell_size_floors_for_hidden_containers() {
        assert_eq!(cell_size_px(-250), 9);
        assert_eq!(cell_size_px(i64::MIN / 2), 9);
        assert_eq!(cell_size_px(i64::MIN), 9);
        assert_eq!(cell_size_px(i64::MAX), 18);
        assert_eq!(cell_size_px(656), 9);
        assert_eq!(cell_size_px(657), 10);
    }

    #[test]
    fn chart_height_grows_per_year() {
        assert_eq!(chart_height_px(0), 50);
        assert_eq!(chart_height_px(1), 210);
        assert_eq!(chart_height_px(3), 530);
    }

    #[test]
    fn empty_totals_produce_minimal_layout() {
        let layout = compute_layout(&DailyTotals::default(), 800, &ColorScale::default());
        assert_eq!(layout.chart_height_px, 50);
        assert_eq!(layout.cell_size_px, 12);

        let svg = paint_svg(&DailyTotals::default(), &layout);
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(r#"height="50""#));
        assert!(!svg.contains("<rect"));
    }

    #[test]
    fn layout_counts_distinct_years() {
        let reports = vec![
            sample_report("a", "2021-05-01T00:00:00Z", 1),
            sample_report("b", "2021-06-01T00:00:00Z", 1),
            sample_report("c", "2023-06-01T00:00:00Z", 1),
        ];
        let totals = aggregate(&reports, &Tokyo);
        let layout = compute_layout(&totals, 1200, &ColorScale::default());
        assert_eq!(layout.chart_height_px, 370);
        assert_eq!(layout.cell_size_px, 18);
    }

    #[test]
    fn color_scale_interpolates_between_stops() {
        let scale = ColorScale {
            low: "#000000".to_string(),
            high: "#ff8040".to_string(),
        };
        assert_eq!(scale.color_for(0, 0, 10), "#000000");
        assert_eq!(scale.color_for(10, 0, 10), "#ff8040");
        assert_eq!(scale.color_for(5, 0, 10), "#804020");
        assert_eq!(scale.color_for(3, 3, 3), "#ff8040");
    }

    #[test]
    fn color_scale_validation_rejects_bad_hex() {
        assert!(ColorScale::default().validate().is_ok());
        let scale = ColorScale {
            low: "red".to_string(),
            high: "#12345".to_string(),
        };
        assert!(scale.validate().is_err());
    }

    #[test]
    fn painted_grid_covers_every_day_of_present_years() {
        let reports = vec![
            sample_report("a", "2024-02-10T03:00:00Z", 4),
            sample_report("b", "2024-02-11T03:00:00Z", 8),
        ];
        let totals = aggregate(&reports, &Tokyo);
        let layout = compute_layout(&totals, 1000, &ColorScale::default());
        let svg = paint_svg(&totals, &layout);

        // 2024 is a leap year.
        assert_eq!(svg.matches("<rect").count(), 366);
        assert!(svg.contains(r#"data-date="2024-02-10" data-runs="4""#));
        assert!(svg.contains(r##"fill="#d6e685" data-date="2024-02-10""##));
        assert!(svg.contains(r##"fill="#1e6823" data-date="2024-02-11""##));
        assert!(svg.contains(">2024</text>"));
    }

    #[test]
    fn week_columns_start_on_sunday() {
        // 2023-01-01 is a Sunday.
        let date = |value: &str| NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("date");
        assert_eq!(week_column(date("2023-01-01")), 0);
        assert_eq!(week_column(date("2023-01-07")), 0);
        assert_eq!(week_column(date("2023-01-08")), 1);
        // 2022-01-01 is a Saturday.
        assert_eq!(week_column(date("2022-01-01")), 0);
        assert_eq!(week_column(date("2022-01-02")), 1);
        assert!(week_column(date("2022-12-31")) < WEEKS_PER_YEAR_GRID);
    }

    // Cell size stays inside its clamp and never shrinks as width grows.
    proptest! {
        #[test]
        fn cell_size_is_clamped_and_monotonic(width in any::<i64>(), extra in 0i64..2_000i64) {
            let size = cell_size_px(width);
            prop_assert!((MIN_CELL_SIZE_PX..=MAX_CELL_SIZE_PX).contains(&size));
            prop_assert!(cell_size_px(width.saturating_add(extra)) >= size);
        }
    }
}
