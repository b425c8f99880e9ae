//! Turning a draft plus attachment diff into one create-or-update call.

use crate::models::{csv, Agent, AgentForm};
use crate::store::{AgentStore, StoreError};

use super::attachments::AttachmentDiff;
use super::draft::DraftValues;

/// Which store operation a commit performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitTarget {
    /// The agent has no identity yet.
    Create,
    /// Update the agent with this (immutable) name.
    Update(String),
}

impl CommitTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update(_) => "update",
        }
    }
}

/// A fully built commit, ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRequest {
    pub target: CommitTarget,
    pub form: AgentForm,
}

impl CommitRequest {
    /// Build the payload from every scalar draft value plus the attachment
    /// diff. The target follows the committed snapshot's identity.
    pub fn build(draft: &DraftValues, diff: AttachmentDiff, snapshot: &Agent) -> Self {
        let target = if snapshot.has_identity() {
            CommitTarget::Update(snapshot.name.clone())
        } else {
            CommitTarget::Create
        };
        // The name never changes after creation, whatever the draft holds.
        let name = match &target {
            CommitTarget::Create => draft.name.clone(),
            CommitTarget::Update(name) => name.clone(),
        };

        Self {
            target,
            form: AgentForm {
                name,
                instructions: draft.instructions.clone(),
                welcome_message: draft.welcome_message.clone(),
                suggested_prompts: draft.suggested_prompts.clone(),
                new_files: diff.staged,
                deleted_files: csv::split(&diff.deleted),
            },
        }
    }

    /// Send the request. This is the only suspension point of a commit.
    pub async fn send<S: AgentStore + ?Sized>(&self, store: &S) -> Result<Agent, StoreError> {
        match &self.target {
            CommitTarget::Create => store.create(&self.form).await,
            CommitTarget::Update(name) => store.update(name, &self.form).await,
        }
    }
}
