//! Editable-field order and wizard navigation.

use serde::{Deserialize, Serialize};

/// An editable agent field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKey {
    Name,
    Instructions,
    WelcomeMessage,
    SuggestedPrompts,
    Files,
}

impl FieldKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Instructions => "instructions",
            Self::WelcomeMessage => "welcome_message",
            Self::SuggestedPrompts => "suggested_prompts",
            Self::Files => "files",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "name" => Some(Self::Name),
            "instructions" => Some(Self::Instructions),
            "welcome_message" => Some(Self::WelcomeMessage),
            "suggested_prompts" => Some(Self::SuggestedPrompts),
            "files" => Some(Self::Files),
            _ => None,
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Name => "Agent Name",
            Self::Instructions => "Instructions",
            Self::WelcomeMessage => "Welcome Message",
            Self::SuggestedPrompts => "Suggested Prompts",
            Self::Files => "Files",
        }
    }
}

impl std::fmt::Display for FieldKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const CREATE_ORDER: &[FieldKey] = &[
    FieldKey::Name,
    FieldKey::Instructions,
    FieldKey::WelcomeMessage,
    FieldKey::SuggestedPrompts,
    FieldKey::Files,
];

/// The editable fields in wizard order.
///
/// `name` leads the sequence only while the agent has no identity yet; once
/// created it is immutable and left out.
pub fn fields(has_identity: bool) -> &'static [FieldKey] {
    if has_identity {
        &CREATE_ORDER[1..]
    } else {
        CREATE_ORDER
    }
}

/// The field before `field`, or `None` if it is first or not in `fields`.
pub fn prev(field: FieldKey, fields: &[FieldKey]) -> Option<FieldKey> {
    let index = fields.iter().position(|f| *f == field)?;
    index.checked_sub(1).map(|i| fields[i])
}

/// The field after `field`, or `None` if it is last or not in `fields`.
pub fn next(field: FieldKey, fields: &[FieldKey]) -> Option<FieldKey> {
    let index = fields.iter().position(|f| *f == field)?;
    fields.get(index + 1).copied()
}
