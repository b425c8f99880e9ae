//! The edit-session engine.
//!
//! An [`EditSession`] holds the committed snapshot of one agent, the draft
//! value of every editable field and the attachment diff. Fields are edited
//! one step at a time; each step either chains to another field (the
//! wizard's previous/next arrows) or returns to viewing. Nothing reaches
//! the store until [`EditSession::commit`], which sends every change as one
//! create-or-update request.
//!
//! ```text
//! Viewing --open(f)--> Editing(f) --submit(v, Some(g))--> Editing(g)
//!                          |                                   |
//!                          +---------submit(v, None)-----------+--> Viewing
//! Viewing | Editing(f) --begin_commit--> Saving --finish_commit--> Viewing (ok)
//!                                                              \-> prior state (err)
//! ```

mod attachments;
mod commit;
mod draft;
mod error;
pub mod navigator;
mod view;

pub use attachments::*;
pub use commit::*;
pub use draft::*;
pub use error::SessionError;
pub use navigator::FieldKey;
pub use view::*;

use crate::models::{csv, validate_agent_name, Agent, Attachment};
use crate::store::{AgentStore, StoreError};

/// Capabilities of whoever drives the session.
///
/// Passed in explicitly at construction instead of being read from ambient
/// login state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    can_write: bool,
}

impl AuthContext {
    /// May open fields and commit.
    pub fn admin() -> Self {
        Self { can_write: true }
    }

    /// May only view.
    pub fn read_only() -> Self {
        Self { can_write: false }
    }

    pub fn can_write(&self) -> bool {
        self.can_write
    }
}

/// Where the session is in its edit cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No field is open.
    Viewing,
    /// One field is open for modification.
    Editing(FieldKey),
    /// A commit is in flight. `prior` is the field that was open when it
    /// started, restored if the commit fails.
    Saving { prior: Option<FieldKey> },
}

/// The value submitted by one edit step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepValue {
    Field(FieldValue),
    Files(AttachmentDiff),
}

impl StepValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Field(FieldValue::Text(value.into()))
    }

    pub fn prompts<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Field(FieldValue::List(items.into_iter().map(Into::into).collect()))
    }

    pub fn files(staged: Vec<Attachment>, deleted: impl Into<String>) -> Self {
        Self::Files(AttachmentDiff {
            staged,
            deleted: deleted.into(),
        })
    }
}

/// Outcome of a submitted step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// The field the value was written to.
    pub field: FieldKey,
    /// Whether the field now differs from its committed value.
    pub pending: bool,
    /// The state the session moved to.
    pub next: SessionState,
}

/// An in-progress edit of one agent.
#[derive(Debug, Clone)]
pub struct EditSession {
    auth: AuthContext,
    snapshot: Agent,
    draft: DraftStore,
    attachments: AttachmentSet,
    state: SessionState,
}

impl EditSession {
    /// Start the creation flow for a new agent.
    pub fn new(auth: AuthContext) -> Self {
        Self::from_snapshot(auth, Agent::default())
    }

    /// Start editing an agent the caller already holds.
    pub fn from_snapshot(auth: AuthContext, snapshot: Agent) -> Self {
        Self {
            auth,
            draft: DraftStore::new(&snapshot),
            attachments: AttachmentSet::new(snapshot.files.clone()),
            snapshot,
            state: SessionState::Viewing,
        }
    }

    /// Fetch an agent from the store and start editing it.
    pub async fn load<S: AgentStore + ?Sized>(
        auth: AuthContext,
        store: &S,
        name: &str,
    ) -> Result<Self, SessionError> {
        let snapshot = store.fetch(name).await?;
        tracing::debug!("Loaded agent {} for editing", snapshot.name);
        Ok(Self::from_snapshot(auth, snapshot))
    }

    // ============================================================
    // State
    // ============================================================

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn current_field(&self) -> Option<FieldKey> {
        match self.state {
            SessionState::Editing(field) => Some(field),
            _ => None,
        }
    }

    pub fn is_saving(&self) -> bool {
        matches!(self.state, SessionState::Saving { .. })
    }

    /// The last snapshot accepted by the store.
    pub fn snapshot(&self) -> &Agent {
        &self.snapshot
    }

    pub fn has_identity(&self) -> bool {
        self.snapshot.has_identity()
    }

    pub fn draft(&self) -> &DraftValues {
        self.draft.values()
    }

    pub fn attachments(&self) -> &AttachmentSet {
        &self.attachments
    }

    /// True if any field or the attachment set differs from the snapshot.
    pub fn is_dirty(&self) -> bool {
        self.draft.differs() || self.attachments.has_changes()
    }

    /// Fields holding uncommitted changes, in wizard order.
    pub fn changed_fields(&self) -> Vec<FieldKey> {
        let mut changed = self.draft.changed_fields();
        if self.attachments.has_changes() {
            changed.push(FieldKey::Files);
        }
        changed
    }

    // ============================================================
    // Navigation
    // ============================================================

    /// The editable fields in wizard order.
    pub fn fields(&self) -> &'static [FieldKey] {
        navigator::fields(self.has_identity())
    }

    /// The field before the open one.
    pub fn prev_field(&self) -> Option<FieldKey> {
        navigator::prev(self.current_field()?, self.fields())
    }

    /// The field after the open one.
    pub fn next_field(&self) -> Option<FieldKey> {
        navigator::next(self.current_field()?, self.fields())
    }

    /// Whether `field` may be opened right now.
    ///
    /// The name is editable only before creation. Other fields are locked
    /// while the store is still processing the agent's attachments. This is
    /// advisory: [`open`](Self::open) does not check the processing state.
    pub fn can_edit(&self, field: FieldKey) -> bool {
        if !self.auth.can_write() || self.is_saving() {
            return false;
        }
        match field {
            FieldKey::Name => !self.has_identity(),
            _ => !self.snapshot.is_processing(),
        }
    }

    // ============================================================
    // Edit steps
    // ============================================================

    /// Open `field` for editing and return its current draft value to seed
    /// the editor with.
    pub fn open(&mut self, field: FieldKey) -> Result<StepValue, SessionError> {
        if self.is_saving() {
            return Err(SessionError::CommitInFlight);
        }
        if !self.auth.can_write() {
            return Err(SessionError::Unauthorized);
        }
        if !self.fields().contains(&field) {
            return Err(SessionError::NotEditable(field));
        }

        self.state = SessionState::Editing(field);
        tracing::debug!("Editing {}", field);
        Ok(self.editor_value(field))
    }

    /// The value an editor for `field` starts from.
    pub fn editor_value(&self, field: FieldKey) -> StepValue {
        match self.draft.get(field) {
            Some(value) => StepValue::Field(value),
            None => StepValue::Files(self.attachments.serialize()),
        }
    }

    /// Write `value` to the open field, then move to `target` (another
    /// field) or back to viewing when `target` is `None`.
    ///
    /// A validation failure leaves the field open and the draft untouched.
    pub fn submit(
        &mut self,
        value: StepValue,
        target: Option<FieldKey>,
    ) -> Result<Step, SessionError> {
        let field = match self.state {
            SessionState::Editing(field) => field,
            SessionState::Saving { .. } => return Err(SessionError::CommitInFlight),
            SessionState::Viewing => return Err(SessionError::NotEditing),
        };
        if let Some(target) = target {
            if !self.fields().contains(&target) {
                return Err(SessionError::NotEditable(target));
            }
        }
        validate_step(field, &value)?;

        let pending = match (field, value) {
            (FieldKey::Files, StepValue::Files(diff)) => {
                self.attachments.apply(diff);
                self.attachments.has_changes()
            }
            (FieldKey::Files, StepValue::Field(_)) => {
                return Err(SessionError::Validation(
                    "files expects staged attachments and deletion marks".to_string(),
                ))
            }
            (field, StepValue::Field(value)) => self.draft.set(field, value)?,
            (field, StepValue::Files(_)) => {
                return Err(SessionError::Validation(format!(
                    "{} does not accept attachments",
                    field
                )))
            }
        };

        self.state = match target {
            Some(target) => SessionState::Editing(target),
            None => SessionState::Viewing,
        };
        tracing::debug!(
            "Stored {} (pending: {}), now {:?}",
            field,
            pending,
            self.state
        );

        Ok(Step {
            field,
            pending,
            next: self.state,
        })
    }

    /// Apply one value per field as a chain of edit steps: open the first
    /// field, then submit each value with the next field as its target and
    /// the last one back to viewing.
    ///
    /// Every field is checked with [`can_edit`](Self::can_edit) before the
    /// first step, so a locked field leaves the session untouched. A value
    /// that fails validation stops the chain with earlier steps applied.
    pub fn run_steps(&mut self, steps: Vec<(FieldKey, StepValue)>) -> Result<(), SessionError> {
        for (field, _) in &steps {
            if !self.can_edit(*field) {
                return Err(self.edit_refusal(*field));
            }
        }

        let targets: Vec<Option<FieldKey>> = steps
            .iter()
            .skip(1)
            .map(|(field, _)| Some(*field))
            .chain(std::iter::once(None))
            .collect();

        if let Some((first, _)) = steps.first() {
            self.open(*first)?;
        }
        for ((_, value), target) in steps.into_iter().zip(targets) {
            self.submit(value, target)?;
        }
        Ok(())
    }

    fn edit_refusal(&self, field: FieldKey) -> SessionError {
        if self.is_saving() {
            SessionError::CommitInFlight
        } else if !self.auth.can_write() {
            SessionError::Unauthorized
        } else if field != FieldKey::Name && self.snapshot.is_processing() {
            SessionError::Locked(field)
        } else {
            SessionError::NotEditable(field)
        }
    }

    /// Close the open field without storing anything.
    pub fn cancel(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Saving { .. } => Err(SessionError::CommitInFlight),
            _ => {
                self.state = SessionState::Viewing;
                Ok(())
            }
        }
    }

    /// Throw away every uncommitted change.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        if self.is_saving() {
            return Err(SessionError::CommitInFlight);
        }
        self.draft.reset();
        self.attachments.reset();
        self.state = SessionState::Viewing;
        tracing::debug!("Reset draft of {}", self.snapshot.name);
        Ok(())
    }

    // ============================================================
    // Commit
    // ============================================================

    /// Build the commit request and enter `Saving`.
    ///
    /// While saving, no field can be opened or submitted.
    pub fn begin_commit(&mut self) -> Result<CommitRequest, SessionError> {
        let prior = match self.state {
            SessionState::Saving { .. } => return Err(SessionError::CommitInFlight),
            SessionState::Editing(field) => Some(field),
            SessionState::Viewing => None,
        };
        if !self.auth.can_write() {
            return Err(SessionError::Unauthorized);
        }
        if !self.has_identity() {
            validate_agent_name(&self.draft.values().name).map_err(SessionError::Validation)?;
        }

        let request =
            CommitRequest::build(self.draft.values(), self.attachments.serialize(), &self.snapshot);
        self.state = SessionState::Saving { prior };
        tracing::info!(
            "Saving agent {} ({})",
            request.form.name,
            request.target.as_str()
        );
        Ok(request)
    }

    /// Apply the store's answer to a request from
    /// [`begin_commit`](Self::begin_commit).
    ///
    /// On success the returned agent becomes the snapshot, the draft is
    /// re-seeded from it and all staging is cleared. On failure nothing but
    /// the state changes: the session returns to where it was before saving.
    pub fn finish_commit(&mut self, result: Result<Agent, StoreError>) -> Result<&Agent, SessionError> {
        let SessionState::Saving { prior } = self.state else {
            return Err(SessionError::NotSaving);
        };

        match result {
            Ok(agent) => {
                tracing::info!("Saved agent {}", agent.name);
                self.draft.seed(&agent);
                self.attachments.rebase(agent.files.clone());
                self.snapshot = agent;
                self.state = SessionState::Viewing;
                Ok(&self.snapshot)
            }
            Err(err) => {
                tracing::warn!("Saving agent failed: {}", err);
                self.state = match prior {
                    Some(field) => SessionState::Editing(field),
                    None => SessionState::Viewing,
                };
                Err(err.into())
            }
        }
    }

    /// Send every change to `store` as one create-or-update request.
    pub async fn commit<S: AgentStore + ?Sized>(&mut self, store: &S) -> Result<&Agent, SessionError> {
        let request = self.begin_commit()?;
        let result = request.send(store).await;
        self.finish_commit(result)
    }

    // ============================================================
    // Display
    // ============================================================

    /// Text and style for `field` under the shared three-way rule.
    pub fn field_view(&self, field: FieldKey, placeholder: &str) -> FieldView {
        let committed = self.draft.committed();
        let draft = self.draft.values();
        let (committed_text, draft_text) = match field {
            FieldKey::Name => (committed.name.clone(), draft.name.clone()),
            FieldKey::Instructions => (committed.instructions.clone(), draft.instructions.clone()),
            FieldKey::WelcomeMessage => {
                (committed.welcome_message.clone(), draft.welcome_message.clone())
            }
            FieldKey::SuggestedPrompts => (
                csv::join(&committed.suggested_prompts),
                csv::join(&draft.suggested_prompts),
            ),
            FieldKey::Files => {
                let kept = self
                    .attachments
                    .original()
                    .iter()
                    .filter(|name| !self.attachments.is_marked(name))
                    .map(String::as_str);
                let effective: Vec<&str> =
                    kept.chain(self.attachments.staged_names()).collect();
                (csv::join(self.attachments.original()), csv::join(&effective))
            }
        };

        let (text, style) = view(&committed_text, &draft_text, placeholder);
        FieldView {
            text: text.to_string(),
            style,
        }
    }

    /// The numbered attachment listing.
    pub fn attachment_entries(&self) -> Vec<AttachmentEntry> {
        self.attachments.entries()
    }
}

fn validate_step(field: FieldKey, value: &StepValue) -> Result<(), SessionError> {
    match (field, value) {
        (FieldKey::Name, StepValue::Field(FieldValue::Text(name))) => {
            validate_agent_name(name).map_err(SessionError::Validation)
        }
        (FieldKey::SuggestedPrompts, StepValue::Field(FieldValue::List(items))) => {
            if items.iter().any(|item| item.contains(',')) {
                return Err(SessionError::Validation(
                    "Suggested prompts cannot contain commas".to_string(),
                ));
            }
            Ok(())
        }
        (FieldKey::Files, StepValue::Files(diff)) => {
            match diff
                .staged
                .iter()
                .find(|a| a.name.trim().is_empty() || a.name.trim() != a.name || a.name.contains(','))
            {
                Some(bad) => Err(SessionError::Validation(format!(
                    "Invalid attachment name {:?}",
                    bad.name
                ))),
                None => Ok(()),
            }
        }
        _ => Ok(()),
    }
}
