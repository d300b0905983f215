use crate::application::heatmap_session::{HeatmapSession, HeatmapSurface};
use crate::infrastructure::config::HeatmapConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewportEvent {
    Resize,
    OrientationChange,
}

/// At most one pending unit of work; scheduling again cancels the previous one.
#[derive(Debug, Default)]
pub struct DebouncedTask {
    handle: Option<JoinHandle<()>>,
}

impl DebouncedTask {
    pub fn schedule<F>(&mut self, delay: Duration, work: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();
        self.handle = Some(tokio::spawn(async move {
            sleep(delay).await;
            work();
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Waits for the pending work, if any, to run.
    pub async fn settle(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for DebouncedTask {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Coalesces bursts of viewport events into one redraw per event stream.
/// Resize and orientation change debounce independently, so a burst on one
/// never cancels the redraw queued by the other.
pub struct RedrawScheduler<S>
where
    S: HeatmapSurface + 'static,
{
    session: Arc<HeatmapSession<S>>,
    settle_delay: Duration,
    resize: DebouncedTask,
    orientation: DebouncedTask,
}

impl<S> RedrawScheduler<S>
where
    S: HeatmapSurface + 'static,
{
    pub fn new(session: Arc<HeatmapSession<S>>, settle_delay: Duration) -> Self {
        Self {
            session,
            settle_delay,
            resize: DebouncedTask::default(),
            orientation: DebouncedTask::default(),
        }
    }

    /// Uses `heatmap.settleDelayMs` from `config/app.json`.
    pub fn from_config(session: Arc<HeatmapSession<S>>, config: &HeatmapConfig) -> Self {
        Self::new(session, config.settle_delay)
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    pub fn notify(&mut self, event: ViewportEvent) {
        let session = Arc::clone(&self.session);
        let task = match event {
            ViewportEvent::Resize => &mut self.resize,
            ViewportEvent::OrientationChange => &mut self.orientation,
        };
        // Width is read when the task fires, not when the event arrives.
        task.schedule(self.settle_delay, move || {
            session.redraw_if_width_changed();
        });
    }

    pub fn is_pending(&self) -> bool {
        self.resize.is_pending() || self.orientation.is_pending()
    }

    pub async fn settle(&mut self) {
        self.resize.settle().await;
        self.orientation.settle().await;
    }

    /// Consumes events until the sender side closes, then lets queued redraws run.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<ViewportEvent>) {
        while let Some(event) = events.recv().await {
            self.notify(event);
        }
        self.settle().await;
    }
}
