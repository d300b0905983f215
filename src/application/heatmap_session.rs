use crate::domain::aggregation::{DailyTotals, aggregate};
use crate::domain::heatmap::{ColorScale, LayoutParameters, compute_layout, paint_svg};
use crate::domain::models::Report;
use crate::infrastructure::command_log::CommandLog;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::feed_client::ReportFeedClient;
use chrono_tz::Tz;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::time::{Duration as TokioDuration, sleep};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeatmapFrame {
    pub layout: LayoutParameters,
    pub totals: Arc<DailyTotals>,
    pub svg: String,
}

/// What a page script needs to redraw the heatmap client-side.
#[derive(Debug, Serialize)]
struct HeatmapSnapshot<'a> {
    layout: &'a LayoutParameters,
    totals: &'a DailyTotals,
}

/// The container the heatmap is painted into.
pub trait HeatmapSurface: Send + Sync {
    fn container_width(&self) -> i64;
    fn paint(&self, frame: &HeatmapFrame) -> Result<(), InfraError>;
}

/// Writes each painted frame to an SVG file, with the layout and daily totals
/// next to it as `<name>.heatmap.json`.
#[derive(Debug)]
pub struct SvgFileSurface {
    path: PathBuf,
    width: AtomicI64,
}

impl SvgFileSurface {
    pub fn new(path: impl Into<PathBuf>, width: i64) -> Self {
        Self {
            path: path.into(),
            width: AtomicI64::new(width),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.path.with_extension("heatmap.json")
    }

    pub fn set_container_width(&self, width: i64) {
        self.width.store(width, Ordering::SeqCst);
    }
}

impl HeatmapSurface for SvgFileSurface {
    fn container_width(&self) -> i64 {
        self.width.load(Ordering::SeqCst)
    }

    fn paint(&self, frame: &HeatmapFrame) -> Result<(), InfraError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, &frame.svg)?;
        let snapshot = HeatmapSnapshot {
            layout: &frame.layout,
            totals: &frame.totals,
        };
        fs::write(self.snapshot_path(), serde_json::to_string(&snapshot)?)?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u8,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
        }
    }
}

#[derive(Debug, Default)]
struct SessionState {
    last_width: Option<i64>,
    aggregate: Option<Arc<DailyTotals>>,
}

/// One heatmap on one page: the fetched aggregate, the width it was last
/// drawn at, and the surface it is drawn on.
pub struct HeatmapSession<S>
where
    S: HeatmapSurface,
{
    surface: Arc<S>,
    zone: Tz,
    color_scale: ColorScale,
    retry_policy: RetryPolicy,
    log: Arc<CommandLog>,
    state: Mutex<SessionState>,
}

impl<S> HeatmapSession<S>
where
    S: HeatmapSurface,
{
    pub fn new(surface: Arc<S>, zone: Tz, color_scale: ColorScale, log: Arc<CommandLog>) -> Self {
        Self {
            surface,
            zone,
            color_scale,
            retry_policy: RetryPolicy::default(),
            log,
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn surface(&self) -> &Arc<S> {
        &self.surface
    }

    /// Fetches the quest feed, aggregates it and draws the first frame.
    pub async fn load<C>(&self, client: &C, quest_id: &str) -> Result<Option<LayoutParameters>, InfraError>
    where
        C: ReportFeedClient + ?Sized,
    {
        let reports = self.fetch_with_retry(client, quest_id).await?;
        let totals = aggregate(&reports, &self.zone);
        self.log.info(
            "heatmap_load",
            &format!(
                "quest_id={quest_id} reports={} days={} years={}",
                reports.len(),
                totals.len(),
                totals.years().len()
            ),
        );
        self.install_aggregate(Arc::new(totals));
        Ok(self.redraw())
    }

    pub fn install_aggregate(&self, totals: Arc<DailyTotals>) {
        if let Some(mut state) = self.lock_state() {
            state.aggregate = Some(totals);
        }
    }

    pub fn aggregate(&self) -> Option<Arc<DailyTotals>> {
        self.lock_state().and_then(|state| state.aggregate.clone())
    }

    pub fn last_width(&self) -> Option<i64> {
        self.lock_state().and_then(|state| state.last_width)
    }

    /// Draws at the current container width. Without an aggregate this only
    /// logs, since viewport events can arrive before the feed does.
    pub fn redraw(&self) -> Option<LayoutParameters> {
        let Some(totals) = self.aggregate() else {
            self.log.warn("heatmap_redraw", "no aggregate loaded yet; nothing to draw");
            return None;
        };

        let width = self.surface.container_width();
        let layout = compute_layout(&totals, width, &self.color_scale);
        let frame = HeatmapFrame {
            svg: paint_svg(&totals, &layout),
            layout: layout.clone(),
            totals: Arc::clone(&totals),
        };
        if let Err(error) = self.surface.paint(&frame) {
            self.log.error("heatmap_redraw", &format!("paint failed at width={width}: {error}"));
            return None;
        }

        if let Some(mut state) = self.lock_state() {
            state.last_width = Some(width);
        }
        Some(layout)
    }

    pub fn redraw_if_width_changed(&self) -> Option<LayoutParameters> {
        let width = self.surface.container_width();
        if self.last_width() == Some(width) {
            self.log.info("heatmap_redraw", &format!("width unchanged at {width}; skipped"));
            return None;
        }
        self.redraw()
    }

    fn lock_state(&self) -> Option<MutexGuard<'_, SessionState>> {
        match self.state.lock() {
            Ok(state) => Some(state),
            Err(error) => {
                self.log.error("heatmap_session", &format!("session state lock poisoned: {error}"));
                None
            }
        }
    }

    async fn fetch_with_retry<C>(&self, client: &C, quest_id: &str) -> Result<Vec<Report>, InfraError>
    where
        C: ReportFeedClient + ?Sized,
    {
        let max_attempts = self.retry_policy.max_attempts.max(1);
        let mut attempt: u8 = 0;

        loop {
            match client.fetch_quest_reports(quest_id).await {
                Ok(reports) => return Ok(reports),
                Err(error) if should_retry(&error) && attempt + 1 < max_attempts => {
                    let delay = self
                        .retry_policy
                        .base_delay_ms
                        .saturating_mul(2u64.saturating_pow(attempt as u32));
                    self.log.warn(
                        "heatmap_load",
                        &format!("quest_id={quest_id} attempt={} failed: {error}", attempt + 1),
                    );
                    sleep(TokioDuration::from_millis(delay)).await;
                    attempt = attempt.saturating_add(1);
                }
                Err(error) => {
                    self.log.error("heatmap_load", &format!("quest_id={quest_id}: {error}"));
                    return Err(error);
                }
            }
        }
    }
}

fn should_retry(error: &InfraError) -> bool {
    match error {
        InfraError::Feed(message) => message.to_ascii_lowercase().contains("network error"),
        _ => false,
    }
}
