//! Plugin marketplace sink (Ore v2 API)

use crate::core::version::ReleaseLevel;
use crate::publish::credentials::Credential;
use crate::publish::{
    check_status, http_client, PublishError, PublishRequest, PublishSink, DEFAULT_HTTP_TIMEOUT_SECS,
};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Metadata part of a version upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginInfo {
    pub create_forum_post: bool,
    pub description: String,
    pub tags: BTreeMap<String, String>,
}

impl PluginInfo {
    pub fn new(notes: &str, level: ReleaseLevel) -> Self {
        let mut tags = BTreeMap::new();
        tags.insert("Channel".to_string(), level.tag().to_string());
        Self {
            create_forum_post: level == ReleaseLevel::Release,
            description: notes.to_string(),
            tags,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    session: String,
}

#[derive(Debug, Deserialize)]
struct VersionResponse {
    name: Option<String>,
}

/// Uploads a new project version to an Ore-style marketplace
pub struct MarketplaceSink {
    url: String,
    project_id: String,
    client: reqwest::Client,
}

impl MarketplaceSink {
    pub fn new(url: impl Into<String>, project_id: impl Into<String>) -> Result<Self, PublishError> {
        Ok(Self {
            url: url.into().trim_end_matches('/').to_string(),
            project_id: project_id.into(),
            client: http_client(DEFAULT_HTTP_TIMEOUT_SECS)?,
        })
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Result<Self, PublishError> {
        self.client = http_client(timeout_secs)?;
        Ok(self)
    }

    pub fn authenticate_url(&self) -> String {
        format!("{}/api/v2/authenticate", self.url)
    }

    pub fn versions_url(&self) -> String {
        format!("{}/api/v2/projects/{}/versions", self.url, self.project_id)
    }

    async fn open_session(&self, api_key: &str) -> Result<String, PublishError> {
        let response = self
            .client
            .post(self.authenticate_url())
            .header(reqwest::header::AUTHORIZATION, format!("OreApi apikey=\"{}\"", api_key))
            .send()
            .await?;
        let session: SessionResponse = check_status(response).await?.json().await?;
        Ok(session.session)
    }
}

#[async_trait]
impl PublishSink for MarketplaceSink {
    fn kind(&self) -> &'static str {
        "marketplace"
    }

    fn endpoint(&self) -> String {
        self.versions_url()
    }

    async fn publish(&self, request: &PublishRequest, credential: &Credential) -> Result<String, PublishError> {
        let session = self.open_session(&credential.secret).await?;
        debug!("Opened marketplace session for project {}", self.project_id);

        let info = serde_json::to_string(&PluginInfo::new(&request.notes, request.level))
            .map_err(|e| PublishError::InvalidRequest(e.to_string()))?;
        let file = Part::bytes(request.artifact.to_vec())
            .file_name(request.file_name.clone())
            .mime_str("application/gzip")?;
        let form = Form::new().text("plugin-info", info).part("plugin-file", file);

        let response = self
            .client
            .post(self.versions_url())
            .header(reqwest::header::AUTHORIZATION, format!("OreApi session=\"{}\"", session))
            .multipart(form)
            .send()
            .await?;
        let created: VersionResponse = check_status(response).await?.json().await?;

        let name = created.name.unwrap_or_else(|| request.version_string.clone());
        info!("Published {} version {}", self.project_id, name);
        Ok(format!("{}@{}", self.project_id, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plugin_info_carries_notes_and_channel() {
        let info = PluginInfo::new("# 2.0.0-beta-3\n", ReleaseLevel::Beta);
        let json: serde_json::Value = serde_json::to_value(&info).unwrap();
        assert_eq!(json["description"], "# 2.0.0-beta-3\n");
        assert_eq!(json["tags"]["Channel"], "beta");
        assert_eq!(json["create_forum_post"], false);
    }

    #[test]
    fn test_urls() {
        let sink = MarketplaceSink::new("https://ore.example.org/", "nucleus").unwrap();
        assert_eq!(sink.authenticate_url(), "https://ore.example.org/api/v2/authenticate");
        assert_eq!(sink.versions_url(), "https://ore.example.org/api/v2/projects/nucleus/versions");
        assert_eq!(sink.endpoint(), sink.versions_url());
    }
}
