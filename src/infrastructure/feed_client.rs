use crate::domain::models::Report;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::report_codec::decode_reports;
use async_trait::async_trait;
use reqwest::Client;
use std::path::PathBuf;
use url::Url;

const QUEST_DIR: &str = "quest";

#[async_trait]
pub trait ReportFeedClient: Send + Sync {
    async fn fetch_quest_reports(&self, quest_id: &str) -> Result<Vec<Report>, InfraError>;
}

fn ensure_quest_id(quest_id: &str) -> Result<&str, InfraError> {
    let quest_id = quest_id.trim();
    if quest_id.is_empty() || quest_id.contains(['/', '\\']) || quest_id == ".." {
        return Err(InfraError::Feed(format!("invalid quest id '{quest_id}'")));
    }
    Ok(quest_id)
}

#[derive(Debug, Clone)]
pub struct ReqwestReportFeedClient {
    client: Client,
    base_url: Url,
}

impl ReqwestReportFeedClient {
    pub fn new(base_url: Url) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    pub fn quest_feed_url(&self, quest_id: &str) -> Result<Url, InfraError> {
        let quest_id = ensure_quest_id(quest_id)?;
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| InfraError::Feed("feed base URL cannot be a base".to_string()))?;
            segments.pop_if_empty();
            segments.push(QUEST_DIR);
            segments.push(&format!("{quest_id}.json"));
        }
        Ok(url)
    }
}

#[async_trait]
impl ReportFeedClient for ReqwestReportFeedClient {
    async fn fetch_quest_reports(&self, quest_id: &str) -> Result<Vec<Report>, InfraError> {
        let endpoint = self.quest_feed_url(quest_id)?;
        let response = self
            .client
            .get(endpoint.clone())
            .send()
            .await
            .map_err(|error| InfraError::Feed(format!("network error while fetching {endpoint}: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| InfraError::Feed(format!("failed reading feed response: {error}")))?;

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(InfraError::NotFound(endpoint.to_string()));
        }
        if !status.is_success() {
            let message = if body.trim().is_empty() {
                format!("feed http {} from {endpoint}", status.as_u16())
            } else {
                format!("feed http {} from {endpoint}; body={body}", status.as_u16())
            };
            return Err(InfraError::Feed(message));
        }

        decode_reports(&body)
    }
}

/// Reads quest feeds that were written next to the quest pages.
#[derive(Debug, Clone)]
pub struct FileReportFeedClient {
    root: PathBuf,
}

impl FileReportFeedClient {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn quest_feed_path(&self, quest_id: &str) -> Result<PathBuf, InfraError> {
        let quest_id = ensure_quest_id(quest_id)?;
        Ok(self.root.join(QUEST_DIR).join(format!("{quest_id}.json")))
    }
}

#[async_trait]
impl ReportFeedClient for FileReportFeedClient {
    async fn fetch_quest_reports(&self, quest_id: &str) -> Result<Vec<Report>, InfraError> {
        let path = self.quest_feed_path(quest_id)?;
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Err(InfraError::NotFound(path.display().to_string()));
            }
            Err(error) => return Err(InfraError::Io(error)),
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        decode_reports(&raw)
    }
}
