//! In-progress field values, kept apart from the committed snapshot.

use crate::models::Agent;

use super::error::SessionError;
use super::navigator::FieldKey;

/// A scalar draft value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::List(_) => "list",
        }
    }
}

/// Every scalar editable field. All fields are always present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftValues {
    pub name: String,
    pub instructions: String,
    pub welcome_message: String,
    pub suggested_prompts: Vec<String>,
}

impl DraftValues {
    pub fn from_agent(agent: &Agent) -> Self {
        Self {
            name: agent.name.clone(),
            instructions: agent.instructions.clone(),
            welcome_message: agent.welcome_message.clone(),
            suggested_prompts: agent.suggested_prompts.clone(),
        }
    }

    /// The value of a scalar field; `None` for `files`, which lives in the
    /// attachment set.
    pub fn get(&self, field: FieldKey) -> Option<FieldValue> {
        match field {
            FieldKey::Name => Some(FieldValue::Text(self.name.clone())),
            FieldKey::Instructions => Some(FieldValue::Text(self.instructions.clone())),
            FieldKey::WelcomeMessage => Some(FieldValue::Text(self.welcome_message.clone())),
            FieldKey::SuggestedPrompts => Some(FieldValue::List(self.suggested_prompts.clone())),
            FieldKey::Files => None,
        }
    }

    fn differs_at(&self, other: &Self, field: FieldKey) -> bool {
        match field {
            FieldKey::Name => self.name != other.name,
            FieldKey::Instructions => self.instructions != other.instructions,
            FieldKey::WelcomeMessage => self.welcome_message != other.welcome_message,
            FieldKey::SuggestedPrompts => self.suggested_prompts != other.suggested_prompts,
            FieldKey::Files => false,
        }
    }
}

const SCALAR_FIELDS: [FieldKey; 4] = [
    FieldKey::Name,
    FieldKey::Instructions,
    FieldKey::WelcomeMessage,
    FieldKey::SuggestedPrompts,
];

/// Draft values plus the committed values they are compared against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftStore {
    committed: DraftValues,
    values: DraftValues,
}

impl DraftStore {
    pub fn new(snapshot: &Agent) -> Self {
        let committed = DraftValues::from_agent(snapshot);
        Self {
            values: committed.clone(),
            committed,
        }
    }

    /// Replace both the committed values and the draft with `snapshot`.
    pub fn seed(&mut self, snapshot: &Agent) {
        *self = Self::new(snapshot);
    }

    /// Discard every draft edit.
    pub fn reset(&mut self) {
        self.values = self.committed.clone();
    }

    pub fn values(&self) -> &DraftValues {
        &self.values
    }

    pub fn committed(&self) -> &DraftValues {
        &self.committed
    }

    pub fn get(&self, field: FieldKey) -> Option<FieldValue> {
        self.values.get(field)
    }

    /// Update one field's draft value.
    ///
    /// List items are trimmed and empty items dropped. Returns whether the
    /// field now differs from its committed value.
    pub fn set(&mut self, field: FieldKey, value: FieldValue) -> Result<bool, SessionError> {
        match (field, value) {
            (FieldKey::Name, FieldValue::Text(text)) => self.values.name = text,
            (FieldKey::Instructions, FieldValue::Text(text)) => self.values.instructions = text,
            (FieldKey::WelcomeMessage, FieldValue::Text(text)) => {
                self.values.welcome_message = text
            }
            (FieldKey::SuggestedPrompts, FieldValue::List(items)) => {
                self.values.suggested_prompts = items
                    .iter()
                    .map(|item| item.trim())
                    .filter(|item| !item.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            (FieldKey::Files, _) => {
                return Err(SessionError::Validation(
                    "files are edited through the attachment set".to_string(),
                ))
            }
            (field, value) => {
                return Err(SessionError::Validation(format!(
                    "{} does not accept a {} value",
                    field,
                    value.kind()
                )))
            }
        }
        Ok(self.values.differs_at(&self.committed, field))
    }

    /// True if any scalar field differs from its committed value.
    pub fn differs(&self) -> bool {
        self.values != self.committed
    }

    /// Scalar fields whose draft differs from the committed value.
    pub fn changed_fields(&self) -> Vec<FieldKey> {
        SCALAR_FIELDS
            .into_iter()
            .filter(|field| self.values.differs_at(&self.committed, *field))
            .collect()
    }
}
