use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_environment() -> String {
    "dev".to_string()
}

/// Connection and behaviour settings for the sync pipeline.
///
/// Stored as `sync.json` (snake_case keys) or read from `FLAPJACK_SYNC_*`
/// environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub application_id: String,
    pub api_key: String,
    /// Base URL of a self-hosted flapjack server. When unset the client talks
    /// to the hosted `{application_id}-dsn` endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_name_prefix: Option<String>,
    #[serde(default)]
    pub catch_and_log_exceptions: bool,
    #[serde(default = "default_environment")]
    pub environment: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            application_id: String::new(),
            api_key: String::new(),
            host: None,
            connection_timeout_secs: None,
            index_name_prefix: None,
            catch_and_log_exceptions: false,
            environment: default_environment(),
        }
    }
}

impl SyncConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SyncConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read `FLAPJACK_SYNC_APP_ID`, `FLAPJACK_SYNC_API_KEY`,
    /// `FLAPJACK_SYNC_HOST`, `FLAPJACK_SYNC_TIMEOUT_SECS`,
    /// `FLAPJACK_SYNC_INDEX_PREFIX`, `FLAPJACK_SYNC_CATCH_ERRORS` and
    /// `FLAPJACK_SYNC_ENV`.
    pub fn from_env() -> Result<Self> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        let connection_timeout_secs = match var("FLAPJACK_SYNC_TIMEOUT_SECS") {
            Some(raw) => Some(raw.parse::<u64>().map_err(|_| {
                SyncError::Config(format!("FLAPJACK_SYNC_TIMEOUT_SECS is not a number: {}", raw))
            })?),
            None => None,
        };

        let catch_and_log_exceptions = var("FLAPJACK_SYNC_CATCH_ERRORS")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let config = SyncConfig {
            application_id: var("FLAPJACK_SYNC_APP_ID").unwrap_or_default(),
            api_key: var("FLAPJACK_SYNC_API_KEY").unwrap_or_default(),
            host: var("FLAPJACK_SYNC_HOST"),
            connection_timeout_secs,
            index_name_prefix: var("FLAPJACK_SYNC_INDEX_PREFIX"),
            catch_and_log_exceptions,
            environment: var("FLAPJACK_SYNC_ENV").unwrap_or_else(default_environment),
        };
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise from the environment.
    pub fn load_or_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let config = Self::load(path)?;
            tracing::info!(
                "[SYNC] loaded config from {}: app={}, env={}",
                path.display(),
                config.application_id,
                config.environment
            );
            Ok(config)
        } else {
            tracing::info!(
                "[SYNC] no config at {}, reading FLAPJACK_SYNC_* variables",
                path.display()
            );
            Self::from_env()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.application_id.trim().is_empty() {
            return Err(SyncError::Config("application_id is required".to_string()));
        }
        if self.api_key.trim().is_empty() {
            return Err(SyncError::Config("api_key is required".to_string()));
        }
        if self.connection_timeout_secs == Some(0) {
            return Err(SyncError::Config(
                "connection_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
