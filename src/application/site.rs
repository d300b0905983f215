use crate::application::bootstrap::bootstrap_workspace_with_lookup;
use crate::application::heatmap_session::{HeatmapSession, SvgFileSurface};
use crate::application::report_pages::{SiteSummary, build_pages, write_pages};
use crate::infrastructure::command_log::CommandLog;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::feed_client::{FileReportFeedClient, ReportFeedClient, ReqwestReportFeedClient};
use crate::infrastructure::storage::{FilesystemPageStore, read_input_reports};
use std::path::Path;
use std::sync::Arc;

pub async fn generate_site(workspace_root: &Path) -> Result<SiteSummary, InfraError> {
    generate_site_with_lookup(workspace_root, |key| std::env::var(key).ok()).await
}

/// Writes every report page and quest feed, then draws one heatmap per quest
/// from the feeds just written (or from `feedBaseUrl` when configured).
pub async fn generate_site_with_lookup<F>(workspace_root: &Path, lookup: F) -> Result<SiteSummary, InfraError>
where
    F: Fn(&str) -> Option<String>,
{
    let bootstrap = bootstrap_workspace_with_lookup(workspace_root, lookup)?;
    let log = Arc::new(CommandLog::new(&bootstrap.logs_dir));
    let config = bootstrap.config;
    log.info(
        "generate_site",
        &format!(
            "workspace={} timezone={}",
            bootstrap.workspace_root.display(),
            config.timezone.name()
        ),
    );

    let reports = read_input_reports(&config.input_dir).inspect_err(|error| {
        log.error("generate_site", &format!("failed reading input: {error}"));
    })?;
    let (pages, mut summary) = build_pages(&reports, &config.timezone, &config.app_name)?;
    let store = FilesystemPageStore::new(&config.output_dir);
    summary.files_written = write_pages(&store, &pages, &log)?;

    let client: Box<dyn ReportFeedClient> = match &config.feed_base_url {
        Some(base_url) => Box::new(ReqwestReportFeedClient::new(base_url.clone())),
        None => Box::new(FileReportFeedClient::new(store.root())),
    };

    for quest_id in &summary.quests {
        let surface = Arc::new(SvgFileSurface::new(
            store.root().join("quest").join(format!("{quest_id}.svg")),
            config.heatmap.default_width_px,
        ));
        let session = HeatmapSession::new(
            surface,
            config.timezone,
            config.heatmap.color_scale.clone(),
            Arc::clone(&log),
        );
        match session.load(client.as_ref(), quest_id).await {
            Ok(Some(_)) => summary.heatmaps_drawn += 1,
            Ok(None) => {}
            Err(error) => log.error(
                "generate_site",
                &format!("heatmap for quest {quest_id} skipped: {error}"),
            ),
        }
    }

    log.info(
        "generate_site",
        &format!(
            "reports={} files={} heatmaps={}",
            reports.len(),
            summary.files_written,
            summary.heatmaps_drawn
        ),
    );
    Ok(summary)
}
