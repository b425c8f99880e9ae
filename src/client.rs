//! HTTP client for the agent store API.
//!
//! Configuration comes from [`ClientConfig`](crate::config::ClientConfig):
//! - `AGENT_STUDIO_URL` - Base URL (default: `http://localhost:17020/api/v1`)
//! - `AGENT_STUDIO_API_KEY` - API key for authentication (optional for local)
//! - `AGENT_STUDIO_TIMEOUT_SECS` - Per-request timeout

use async_trait::async_trait;
use reqwest::{multipart, Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::ClientConfig;
use crate::models::{csv, Agent, AgentForm, AgentSummary};
use crate::store::{AgentStore, StoreError};

/// HTTP client for the agent store API.
#[derive(Debug, Clone)]
pub struct AgentClient {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

/// Agent responses come either bare or wrapped as `{"agent": {...}}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum AgentPayload {
    Wrapped { agent: Agent },
    Bare(Agent),
}

impl From<AgentPayload> for Agent {
    fn from(payload: AgentPayload) -> Self {
        match payload {
            AgentPayload::Wrapped { agent } => agent,
            AgentPayload::Bare(agent) => agent,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListPayload {
    Wrapped { list: Vec<AgentSummary> },
    Bare(Vec<AgentSummary>),
}

impl AgentClient {
    /// Create client from environment variables.
    pub fn from_env() -> Result<Self, StoreError> {
        Self::with_config(&ClientConfig::from_env())
    }

    /// Create with explicit configuration.
    pub fn with_config(config: &ClientConfig) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            client,
        })
    }

    /// Create with a base URL and optional API key, default timeout.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self, StoreError> {
        Self::with_config(&ClientConfig {
            base_url: base_url.into(),
            api_key,
            ..ClientConfig::default()
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a request with optional auth header.
    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.client.request(method, &url);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }
        req
    }

    /// Handle response, converting HTTP errors to StoreError.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, StoreError> {
        let status = response.status();
        let body = response.text().await?;
        if status.is_success() {
            serde_json::from_str(&body).map_err(|e| {
                tracing::warn!("Unexpected response shape: {}", e);
                StoreError::Malformed(format!("Unexpected response from agent store: {}", e))
            })
        } else {
            Err(status_error(status, &body))
        }
    }

    /// Handle response that carries no payload we need.
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<(), StoreError> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(status_error(status, &body))
        }
    }

    // ============================================================
    // Agent Operations
    // ============================================================

    /// Check the store is reachable.
    pub async fn health(&self) -> Result<(), StoreError> {
        let response = self.request(reqwest::Method::GET, "/health").send().await?;
        self.handle_empty_response(response).await
    }

    /// List all agents.
    pub async fn list_agents(&self) -> Result<Vec<AgentSummary>, StoreError> {
        let response = self.request(reqwest::Method::GET, "/agents").send().await?;
        let payload: ListPayload = self.handle_response(response).await?;
        Ok(match payload {
            ListPayload::Wrapped { list } => list,
            ListPayload::Bare(list) => list,
        })
    }

    /// Get an agent by name.
    pub async fn get_agent(&self, name: &str) -> Result<Agent, StoreError> {
        let response = self
            .request(reqwest::Method::GET, &agent_path(name))
            .send()
            .await?;
        let payload: AgentPayload = self.handle_response(response).await?;
        Ok(payload.into())
    }

    /// Create an agent.
    pub async fn create_agent(&self, form: &AgentForm) -> Result<Agent, StoreError> {
        let response = self
            .request(reqwest::Method::POST, "/agents")
            .multipart(multipart_form(form)?)
            .send()
            .await?;
        let payload: AgentPayload = self.handle_response(response).await?;
        Ok(payload.into())
    }

    /// Update an agent.
    pub async fn update_agent(&self, name: &str, form: &AgentForm) -> Result<Agent, StoreError> {
        let response = self
            .request(reqwest::Method::PUT, &agent_path(name))
            .multipart(multipart_form(form)?)
            .send()
            .await?;
        let payload: AgentPayload = self.handle_response(response).await?;
        Ok(payload.into())
    }

    /// Delete an agent and its attachments.
    pub async fn delete_agent(&self, name: &str) -> Result<(), StoreError> {
        let response = self
            .request(reqwest::Method::DELETE, &agent_path(name))
            .send()
            .await?;
        self.handle_empty_response(response).await
    }

    /// Tell the store that attachment processing finished.
    pub async fn mark_processing_complete(&self, name: &str) -> Result<Agent, StoreError> {
        let response = self
            .request(
                reqwest::Method::POST,
                &format!("{}/processing-complete", agent_path(name)),
            )
            .send()
            .await?;
        let payload: AgentPayload = self.handle_response(response).await?;
        Ok(payload.into())
    }
}

#[async_trait]
impl AgentStore for AgentClient {
    async fn fetch(&self, name: &str) -> Result<Agent, StoreError> {
        self.get_agent(name).await
    }

    async fn create(&self, form: &AgentForm) -> Result<Agent, StoreError> {
        self.create_agent(form).await
    }

    async fn update(&self, name: &str, form: &AgentForm) -> Result<Agent, StoreError> {
        self.update_agent(name, form).await
    }
}

fn agent_path(name: &str) -> String {
    // Agent names are restricted to [A-Za-z0-9_-], so no escaping is needed.
    format!("/agents/{}", name)
}

fn multipart_form(form: &AgentForm) -> Result<multipart::Form, StoreError> {
    let mut body = multipart::Form::new()
        .text("name", form.name.clone())
        .text("instructions", form.instructions.clone())
        .text("welcome_message", form.welcome_message.clone())
        .text("suggested_prompts", csv::join(&form.suggested_prompts))
        .text("deleted_files", csv::join(&form.deleted_files));
    for file in &form.new_files {
        let part = multipart::Part::bytes(file.data.clone())
            .file_name(file.name.clone())
            .mime_str("application/octet-stream")?;
        body = body.part("new_files", part);
    }
    Ok(body)
}

fn status_error(status: StatusCode, body: &str) -> StoreError {
    let message = extract_message(status, body);
    match status {
        StatusCode::NOT_FOUND => StoreError::NotFound(message),
        StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
            StoreError::BadRequest(message)
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::Unauthorized,
        _ => StoreError::Server(message),
    }
}

/// Pull the human-readable message out of an error body.
///
/// JSON bodies carrying `detail`, `error` or `message` yield that string;
/// anything else is used as plain text. An empty body falls back to the
/// status reason.
fn extract_message(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["detail", "error", "message"] {
            if let Some(serde_json::Value::String(msg)) = map.get(key) {
                return msg.clone();
            }
        }
    }
    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string()
    } else {
        body.to_string()
    }
}
