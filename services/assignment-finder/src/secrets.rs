//! Secret retrieval for the notifier credential.
//!
//! The bearer token is fetched once before serving and then only read.
//! Lookup order for [`LocalSecretProvider`]:
//! 1. env var `SECRET_<REGION>_<NAME>` (uppercased, other characters -> `_`)
//! 2. file `<secrets_dir>/<region>/<name>`

use std::fmt;
use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("secret '{name}' not found in region '{region}'")]
    NotFound { name: String, region: String },
    #[error("invalid secret request: {0}")]
    InvalidRequest(String),
    #[error("failed to read secret file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("secret '{0}' is binary and not valid UTF-8")]
    InvalidEncoding(String),
}

impl SecretError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, SecretError::NotFound { .. })
    }
}

/// Secret payload; providers may hold either form.
#[derive(Clone, PartialEq, Eq)]
pub enum SecretValue {
    Text(String),
    Binary(Vec<u8>),
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretValue::Text(_) => f.write_str("SecretValue::Text(<redacted>)"),
            SecretValue::Binary(b) => write!(f, "SecretValue::Binary(<{} bytes>)", b.len()),
        }
    }
}

#[async_trait]
pub trait SecretProvider: Send + Sync {
    async fn get_secret(&self, name: &str, region: &str) -> Result<SecretValue, SecretError>;
}

/// Resolves secrets from the environment, then from mounted files.
#[derive(Debug, Clone)]
pub struct LocalSecretProvider {
    secrets_dir: PathBuf,
}

impl LocalSecretProvider {
    pub fn new(secrets_dir: impl Into<PathBuf>) -> Self {
        Self {
            secrets_dir: secrets_dir.into(),
        }
    }

    /// Env var consulted for a secret.
    pub fn env_key(name: &str, region: &str) -> String {
        let normalize = |s: &str| {
            s.chars()
                .map(|c| {
                    if c.is_ascii_alphanumeric() {
                        c.to_ascii_uppercase()
                    } else {
                        '_'
                    }
                })
                .collect::<String>()
        };
        format!("SECRET_{}_{}", normalize(region), normalize(name))
    }
}

fn validate_component(kind: &str, value: &str) -> Result<(), SecretError> {
    if value.is_empty() {
        return Err(SecretError::InvalidRequest(format!("{kind} is empty")));
    }
    if value.contains(['/', '\\']) || value == "." || value == ".." {
        return Err(SecretError::InvalidRequest(format!(
            "{kind} '{value}' is not a plain name"
        )));
    }
    Ok(())
}

#[async_trait]
impl SecretProvider for LocalSecretProvider {
    async fn get_secret(&self, name: &str, region: &str) -> Result<SecretValue, SecretError> {
        validate_component("secret name", name)?;
        validate_component("region", region)?;

        if let Ok(value) = std::env::var(Self::env_key(name, region)) {
            return Ok(SecretValue::Text(value));
        }

        let path = self.secrets_dir.join(region).join(name);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(match String::from_utf8(bytes) {
                Ok(text) => SecretValue::Text(text),
                Err(e) => SecretValue::Binary(e.into_bytes()),
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(SecretError::NotFound {
                name: name.to_string(),
                region: region.to_string(),
            }),
            Err(source) => Err(SecretError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }
}

/// Bearer token for the notification channel. Empty means delivery is
/// disabled.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("BearerToken(<empty>)")
        } else {
            f.write_str("BearerToken(<redacted>)")
        }
    }
}

/// Fetch the notifier token.
///
/// A missing secret degrades to an empty token; any other failure is
/// returned and should abort startup.
pub async fn load_bearer_token(
    provider: &dyn SecretProvider,
    name: &str,
    region: &str,
) -> Result<BearerToken, SecretError> {
    match provider.get_secret(name, region).await {
        Ok(SecretValue::Text(text)) => {
            info!(secret = name, region, "Loaded notifier credential");
            Ok(BearerToken::new(text.trim()))
        }
        Ok(SecretValue::Binary(bytes)) => {
            let text = String::from_utf8(bytes)
                .map_err(|_| SecretError::InvalidEncoding(name.to_string()))?;
            info!(secret = name, region, "Loaded notifier credential");
            Ok(BearerToken::new(text.trim()))
        }
        Err(e) if e.is_not_found() => {
            warn!(
                secret = name,
                region,
                "The requested secret was not found; notifications are disabled"
            );
            Ok(BearerToken::default())
        }
        Err(e) => Err(e),
    }
}
