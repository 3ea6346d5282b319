//! Credential lookup over ordered property sources

use crate::core::properties::Properties;
use std::fmt;
use std::sync::Arc;

/// A username (optional for token-style APIs) and a secret
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub username: Option<String>,
    pub secret: String,
}

// Keep secrets out of logs
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("secret", &"***")
            .finish()
    }
}

/// A place credentials may come from
pub trait CredentialProvider: Send + Sync + fmt::Debug {
    /// Short description for diagnostics, e.g. `env:NUCLEUS_ORE_APIKEY`
    fn describe(&self) -> String;

    /// The credential, or `None` when this source has nothing usable
    fn lookup(&self) -> Option<Credential>;
}

/// Reads a credential from a property set under fixed keys
#[derive(Debug, Clone)]
pub struct KeyedCredentials {
    source_name: String,
    source: Arc<Properties>,
    username_key: Option<String>,
    secret_key: String,
}

impl KeyedCredentials {
    pub fn new(
        source_name: impl Into<String>,
        source: Arc<Properties>,
        username_key: Option<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            source_name: source_name.into(),
            source,
            username_key,
            secret_key: secret_key.into(),
        }
    }
}

impl CredentialProvider for KeyedCredentials {
    fn describe(&self) -> String {
        match &self.username_key {
            Some(user) => format!("{}:{}/{}", self.source_name, user, self.secret_key),
            None => format!("{}:{}", self.source_name, self.secret_key),
        }
    }

    fn lookup(&self) -> Option<Credential> {
        let secret = self.source.get(&self.secret_key)?;
        let username = match &self.username_key {
            // A configured username key must resolve too
            Some(key) => Some(self.source.get(key)?.to_string()),
            None => None,
        };
        Some(Credential {
            username,
            secret: secret.to_string(),
        })
    }
}

/// First usable credential from an ordered provider list
pub fn resolve(providers: &[Arc<dyn CredentialProvider>]) -> Option<(String, Credential)> {
    providers
        .iter()
        .find_map(|p| p.lookup().map(|credential| (p.describe(), credential)))
}
