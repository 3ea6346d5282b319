//! Publishing finished artifacts to external destinations
//!
//! Every target is handled independently: a gate decides whether the build
//! goes there at all, then credentials are looked up, then the sink is called.
//! One target failing never stops the others.

pub mod credentials;
pub mod gate;
pub mod marketplace;
pub mod maven;

pub use credentials::{Credential, CredentialProvider, KeyedCredentials};
pub use gate::PublishGate;
pub use marketplace::MarketplaceSink;
pub use maven::{Coordinate, MavenRepositorySink};

use crate::core::error::ReleaseError;
use crate::core::version::ReleaseLevel;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Sink-level failures
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("remote rejected the upload with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid publish request: {0}")]
    InvalidRequest(String),
}

/// Everything a sink needs to publish one build
#[derive(Debug, Clone)]
pub struct PublishRequest {
    pub version_string: String,
    pub level: ReleaseLevel,
    /// Rendered release notes
    pub notes: String,
    pub file_name: String,
    pub artifact: Arc<Vec<u8>>,
}

impl PublishRequest {
    pub fn new(
        version_string: impl Into<String>,
        level: ReleaseLevel,
        notes: impl Into<String>,
        file_name: impl Into<String>,
        artifact: impl Into<Arc<Vec<u8>>>,
    ) -> Self {
        Self {
            version_string: version_string.into(),
            level,
            notes: notes.into(),
            file_name: file_name.into(),
            artifact: artifact.into(),
        }
    }
}

/// A destination that accepts artifacts
#[async_trait]
pub trait PublishSink: Send + Sync {
    /// Short kind name for listings
    fn kind(&self) -> &'static str;

    fn endpoint(&self) -> String;

    /// Upload the build, returning the remote acknowledgement
    async fn publish(&self, request: &PublishRequest, credential: &Credential) -> Result<String, PublishError>;
}

/// A named destination with its admission rules and credential sources
#[derive(Clone)]
pub struct PublishTarget {
    pub name: String,
    pub gate: PublishGate,
    /// Consulted in order; the first usable one wins
    pub credentials: Vec<Arc<dyn CredentialProvider>>,
    pub sink: Arc<dyn PublishSink>,
}

impl PublishTarget {
    pub fn new(name: impl Into<String>, sink: Arc<dyn PublishSink>) -> Self {
        Self {
            name: name.into(),
            gate: PublishGate::open(),
            credentials: Vec::new(),
            sink,
        }
    }

    pub fn with_gate(mut self, gate: PublishGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_credentials(mut self, provider: Arc<dyn CredentialProvider>) -> Self {
        self.credentials.push(provider);
        self
    }
}

impl std::fmt::Debug for PublishTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublishTarget")
            .field("name", &self.name)
            .field("gate", &self.gate)
            .field("credentials", &self.credentials)
            .field("sink", &self.sink.kind())
            .finish()
    }
}

/// What happened at one target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PublishOutcome {
    Published { acknowledgement: String },
    Skipped { reason: String },
    CredentialMissing,
    Failed { cause: String },
}

impl PublishOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, PublishOutcome::CredentialMissing | PublishOutcome::Failed { .. })
    }

    /// Turn target-level failures into errors for the owning task
    pub fn into_result(self, target: &str) -> Result<PublishOutcome, ReleaseError> {
        match self {
            PublishOutcome::CredentialMissing => Err(ReleaseError::CredentialMissing {
                target: target.to_string(),
            }),
            PublishOutcome::Failed { cause } => Err(ReleaseError::PublishFailed {
                target: target.to_string(),
                cause,
            }),
            other => Ok(other),
        }
    }
}

/// Runs the gate, credential and sink steps per target
#[derive(Debug, Clone, Default)]
pub struct Publisher {
    disabled: bool,
}

impl Publisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A publisher that skips every target without contacting it
    pub fn disabled() -> Self {
        Self { disabled: true }
    }

    pub async fn publish_one(&self, request: &PublishRequest, target: &PublishTarget) -> PublishOutcome {
        if self.disabled {
            return PublishOutcome::Skipped {
                reason: "publishing disabled".to_string(),
            };
        }

        if let Err(reason) = target.gate.admit(request.level, &request.version_string) {
            info!("Skipping publish target '{}': {}", target.name, reason);
            return PublishOutcome::Skipped { reason };
        }

        let Some((source, credential)) = credentials::resolve(&target.credentials) else {
            warn!("No usable credentials for publish target '{}'", target.name);
            return PublishOutcome::CredentialMissing;
        };
        info!(
            "Publishing {} to '{}' ({}) using {}",
            request.file_name,
            target.name,
            target.sink.endpoint(),
            source
        );

        match target.sink.publish(request, &credential).await {
            Ok(acknowledgement) => PublishOutcome::Published { acknowledgement },
            Err(e) => {
                warn!("Publishing to '{}' failed: {}", target.name, e);
                PublishOutcome::Failed {
                    cause: format!("{}: {}", target.name, e),
                }
            }
        }
    }

    /// Publish to every target in order; outcomes line up with `targets`
    pub async fn publish(&self, request: &PublishRequest, targets: &[PublishTarget]) -> Vec<PublishOutcome> {
        let mut outcomes = Vec::with_capacity(targets.len());
        for target in targets {
            outcomes.push(self.publish_one(request, target).await);
        }
        outcomes
    }
}

/// Whole-request timeout used when a target does not set its own
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 120;

/// Client with a request timeout so an unresponsive remote fails the target
pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::Client, PublishError> {
    let timeout = Duration::from_secs(timeout_secs.max(1));
    Ok(reqwest::Client::builder()
        .user_agent(concat!("release-pipeline/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(timeout.min(Duration::from_secs(30)))
        .timeout(timeout)
        .build()?)
}

/// Map non-2xx responses to `Rejected`
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, PublishError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(PublishError::Rejected {
        status: status.as_u16(),
        body,
    })
}
