//! Environment-driven configuration for the client and the store server.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

use crate::api::SecurityConfig;

/// Default URL for local development.
pub const DEFAULT_URL: &str = "http://localhost:17020/api/v1";
pub const DEFAULT_PORT: u16 = 17020;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// How to reach the agent store.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Applies to every request; a timeout surfaces as a network error.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_URL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Load from `AGENT_STUDIO_URL`, `AGENT_STUDIO_API_KEY` and
    /// `AGENT_STUDIO_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("AGENT_STUDIO_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
        let api_key = std::env::var("AGENT_STUDIO_API_KEY").ok();
        let timeout = std::env::var("AGENT_STUDIO_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        Self {
            base_url,
            api_key,
            timeout,
        }
    }
}

/// Settings for the agent store server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Holds the SQLite database and the attachment tree.
    pub data_dir: PathBuf,
    pub security: SecurityConfig,
}

impl ServerConfig {
    /// Load from `AGENT_STUDIO_PORT`, `AGENT_STUDIO_DATA_DIR` and the
    /// security variables (which include the upload limit).
    pub fn from_env() -> Result<Self> {
        let port = std::env::var("AGENT_STUDIO_PORT")
            .ok()
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        let data_dir = match std::env::var("AGENT_STUDIO_DATA_DIR") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => default_data_dir()?,
        };

        Ok(Self {
            port,
            data_dir,
            security: SecurityConfig::from_env(),
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("agents.db")
    }

    pub fn attachments_dir(&self) -> PathBuf {
        self.data_dir.join("agents")
    }
}

fn default_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "agent-studio")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
    Ok(dirs.data_dir().to_path_buf())
}
