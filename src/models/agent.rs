use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::attachment::Attachment;
use super::csv;

/// A configurable chat agent as held by the agent store.
///
/// `name` is the identity: it is chosen during creation and never changes
/// afterwards. `status` and `processing_state` are owned by the store and
/// are read-only to an edit session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default, deserialize_with = "csv::text::deserialize")]
    pub instructions: String,
    #[serde(default, deserialize_with = "csv::text::deserialize")]
    pub welcome_message: String,
    /// Ordered prompt suggestions, comma-delimited on the wire.
    #[serde(default, with = "csv::list")]
    pub suggested_prompts: Vec<String>,
    /// Committed attachment names in store order, comma-delimited on the wire.
    #[serde(default, with = "csv::list")]
    pub files: Vec<String>,
    #[serde(default, deserialize_with = "csv::text::deserialize")]
    pub status: String,
    #[serde(default, alias = "embeddings_status")]
    pub processing_state: ProcessingState,
    pub created_on: i64,
    #[serde(default)]
    pub updated_on: i64,
}

impl Agent {
    /// True once the store has accepted the agent (it has a name).
    pub fn has_identity(&self) -> bool {
        !self.name.is_empty()
    }

    pub fn is_processing(&self) -> bool {
        self.processing_state.is_processing()
    }
}

/// Whether the store is still processing the agent's attachments.
///
/// On the wire this is an empty string when idle and `"I"` while processing.
/// Any other non-empty value is treated as processing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProcessingState {
    #[default]
    Idle,
    InProgress,
}

impl ProcessingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "",
            Self::InProgress => "I",
        }
    }

    pub fn from_str(s: &str) -> Self {
        if s.trim().is_empty() {
            Self::Idle
        } else {
            Self::InProgress
        }
    }

    pub fn is_processing(&self) -> bool {
        matches!(self, Self::InProgress)
    }
}

impl Serialize for ProcessingState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ProcessingState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        Ok(Self::from_str(&raw))
    }
}

/// Agent listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSummary {
    pub id: i64,
    pub name: String,
    #[serde(default, deserialize_with = "csv::text::deserialize")]
    pub status: String,
    #[serde(default, alias = "embeddings_status")]
    pub processing_state: ProcessingState,
    pub created_on: i64,
    #[serde(default)]
    pub updated_on: i64,
}

/// Payload for creating or updating an agent.
///
/// Scalar fields always carry the full draft value, never a partial patch.
/// On update `name` is informational only; the path identifies the agent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentForm {
    pub name: String,
    pub instructions: String,
    pub welcome_message: String,
    pub suggested_prompts: Vec<String>,
    /// Attachments to upload, in arrival order.
    pub new_files: Vec<Attachment>,
    /// Committed attachment names to remove, in committed order.
    pub deleted_files: Vec<String>,
}

impl AgentForm {
    /// True when the form adds or removes attachments.
    pub fn changes_files(&self) -> bool {
        !self.new_files.is_empty() || !self.deleted_files.is_empty()
    }
}

/// Input for inserting a new agent row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateAgentInput {
    pub name: String,
    pub instructions: String,
    pub welcome_message: String,
    pub suggested_prompts: Vec<String>,
    pub files: Vec<String>,
    pub processing_state: ProcessingState,
}

/// Input for replacing an agent's editable fields. The name is not part of
/// it; agents are never renamed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateAgentInput {
    pub instructions: String,
    pub welcome_message: String,
    pub suggested_prompts: Vec<String>,
    pub files: Vec<String>,
    /// `None` keeps the current processing state.
    pub processing_state: Option<ProcessingState>,
}

/// Check that an agent name is non-empty and uses only ASCII letters,
/// digits, hyphen and underscore.
pub fn validate_agent_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Agent name cannot be blank".to_string());
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(format!(
            "Agent name may only contain letters, digits, '-' and '_' (found {:?})",
            bad
        ));
    }
    Ok(())
}
