//! Maven-layout HTTP repository sink

use crate::publish::credentials::Credential;
use crate::publish::{
    check_status, http_client, PublishError, PublishRequest, PublishSink, DEFAULT_HTTP_TIMEOUT_SECS,
};
use async_trait::async_trait;
use tracing::{debug, info};

/// Group, artifact and version of a published artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coordinate {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

impl Coordinate {
    /// Directory of this version under the repository root
    pub fn base_url(&self, repository: &str) -> String {
        format!(
            "{}/{}/{}/{}/",
            repository.trim_end_matches('/'),
            self.group_id.replace('.', "/"),
            self.artifact_id,
            self.version
        )
    }

    pub fn file_name(&self, extension: &str) -> String {
        format!("{}-{}.{}", self.artifact_id, self.version, extension)
    }

    /// Minimal POM describing the artifact with no dependencies
    pub fn pom(&self, description: &str) -> String {
        format!(
            concat!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
                "<project xmlns=\"http://maven.apache.org/POM/4.0.0\">\n",
                "  <modelVersion>4.0.0</modelVersion>\n",
                "  <groupId>{}</groupId>\n",
                "  <artifactId>{}</artifactId>\n",
                "  <version>{}</version>\n",
                "  <packaging>tar.gz</packaging>\n",
                "  <description>{}</description>\n",
                "</project>\n"
            ),
            xml_escape(&self.group_id),
            xml_escape(&self.artifact_id),
            xml_escape(&self.version),
            xml_escape(description)
        )
    }
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Uploads the artifact and a POM with HTTP PUT and basic auth
pub struct MavenRepositorySink {
    url: String,
    group_id: String,
    artifact_id: String,
    client: reqwest::Client,
}

impl MavenRepositorySink {
    pub fn new(
        url: impl Into<String>,
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
    ) -> Result<Self, PublishError> {
        Ok(Self {
            url: url.into(),
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            client: http_client(DEFAULT_HTTP_TIMEOUT_SECS)?,
        })
    }

    /// Replace the request timeout
    pub fn with_timeout(mut self, timeout_secs: u64) -> Result<Self, PublishError> {
        self.client = http_client(timeout_secs)?;
        Ok(self)
    }

    pub fn coordinate(&self, version: &str) -> Coordinate {
        Coordinate {
            group_id: self.group_id.clone(),
            artifact_id: self.artifact_id.clone(),
            version: version.to_string(),
        }
    }

    async fn put(&self, url: &str, username: &str, secret: &str, body: Vec<u8>) -> Result<(), PublishError> {
        debug!("PUT {} ({} bytes)", url, body.len());
        let response = self
            .client
            .put(url)
            .basic_auth(username, Some(secret))
            .body(body)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

#[async_trait]
impl PublishSink for MavenRepositorySink {
    fn kind(&self) -> &'static str {
        "maven"
    }

    fn endpoint(&self) -> String {
        self.url.clone()
    }

    async fn publish(&self, request: &PublishRequest, credential: &Credential) -> Result<String, PublishError> {
        let username = credential
            .username
            .as_deref()
            .ok_or_else(|| PublishError::InvalidRequest("maven repositories need a username".into()))?;

        let coordinate = self.coordinate(&request.version_string);
        let base = coordinate.base_url(&self.url);

        let artifact_url = format!("{}{}", base, coordinate.file_name("tar.gz"));
        self.put(&artifact_url, username, &credential.secret, request.artifact.to_vec())
            .await?;

        let summary = request.notes.lines().next().unwrap_or_default();
        let pom_url = format!("{}{}", base, coordinate.file_name("pom"));
        self.put(&pom_url, username, &credential.secret, coordinate.pom(summary).into_bytes())
            .await?;

        info!("Uploaded {} to {}", artifact_url, self.url);
        Ok(artifact_url)
    }
}
