//! In-memory agent store shared by the session specs.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use agent_studio::models::{Agent, AgentForm, ProcessingState};
use agent_studio::store::{AgentStore, StoreError};
use async_trait::async_trait;

#[derive(Default)]
pub struct FakeStore {
    agents: Mutex<HashMap<String, Agent>>,
    reject_next: Mutex<Option<String>>,
    calls: Mutex<Vec<String>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_agent(agent: Agent) -> Self {
        let store = Self::new();
        store.insert(agent);
        store
    }

    pub fn insert(&self, agent: Agent) {
        self.agents
            .lock()
            .unwrap()
            .insert(agent.name.clone(), agent);
    }

    pub fn get(&self, name: &str) -> Option<Agent> {
        self.agents.lock().unwrap().get(name).cloned()
    }

    /// Make the next create or update fail with `message`.
    pub fn reject_next(&self, message: &str) {
        *self.reject_next.lock().unwrap() = Some(message.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn take_rejection(&self) -> Result<(), StoreError> {
        match self.reject_next.lock().unwrap().take() {
            Some(message) => Err(StoreError::BadRequest(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AgentStore for FakeStore {
    async fn fetch(&self, name: &str) -> Result<Agent, StoreError> {
        self.calls.lock().unwrap().push(format!("fetch {}", name));
        self.get(name)
            .ok_or_else(|| StoreError::NotFound("Agent not found".to_string()))
    }

    async fn create(&self, form: &AgentForm) -> Result<Agent, StoreError> {
        self.calls.lock().unwrap().push(format!("create {}", form.name));
        self.take_rejection()?;
        if self.get(&form.name).is_some() {
            return Err(StoreError::BadRequest(
                "Agent with this name already exists".to_string(),
            ));
        }

        let files: Vec<String> = form.new_files.iter().map(|f| f.name.clone()).collect();
        let agent = Agent {
            id: self.agents.lock().unwrap().len() as i64 + 1,
            name: form.name.clone(),
            instructions: form.instructions.clone(),
            welcome_message: form.welcome_message.clone(),
            suggested_prompts: form.suggested_prompts.clone(),
            processing_state: if files.is_empty() {
                ProcessingState::Idle
            } else {
                ProcessingState::InProgress
            },
            files,
            status: String::new(),
            created_on: 1_700_000_000,
            updated_on: 1_700_000_000,
        };
        self.insert(agent.clone());
        Ok(agent)
    }

    async fn update(&self, name: &str, form: &AgentForm) -> Result<Agent, StoreError> {
        self.calls.lock().unwrap().push(format!("update {}", name));
        self.take_rejection()?;
        let existing = self
            .get(name)
            .ok_or_else(|| StoreError::NotFound("Agent not found".to_string()))?;

        let mut files: Vec<String> = existing
            .files
            .iter()
            .filter(|f| !form.deleted_files.contains(f))
            .cloned()
            .collect();
        files.extend(form.new_files.iter().map(|f| f.name.clone()));

        let agent = Agent {
            instructions: form.instructions.clone(),
            welcome_message: form.welcome_message.clone(),
            suggested_prompts: form.suggested_prompts.clone(),
            processing_state: if form.changes_files() {
                ProcessingState::InProgress
            } else {
                existing.processing_state
            },
            files,
            updated_on: existing.updated_on + 1,
            ..existing
        };
        self.insert(agent.clone());
        Ok(agent)
    }
}

pub fn agent(name: &str) -> Agent {
    Agent {
        id: 1,
        name: name.to_string(),
        instructions: "Answer policy questions".to_string(),
        welcome_message: "Hi there".to_string(),
        suggested_prompts: vec!["What is covered?".to_string()],
        files: vec!["a.txt".to_string(), "b.txt".to_string()],
        created_on: 1_700_000_000,
        updated_on: 1_700_000_000,
        ..Agent::default()
    }
}
