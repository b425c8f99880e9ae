mod files;
mod schema;

pub use files::{validate_file_name, AttachmentDir, FileChanges};

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row};

use crate::models::*;

const AGENT_COLUMNS: &str = "id, name, instructions, welcome_message, suggested_prompts, files, \
     status, processing_state, created_on, updated_on";

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // Agent operations
    // ============================================================

    pub fn list_agents(&self) -> Result<Vec<AgentSummary>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, name, status, processing_state, created_on, updated_on
             FROM agents ORDER BY name",
        )?;

        let agents = stmt
            .query_map([], |row| {
                Ok(AgentSummary {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    status: row.get(2)?,
                    processing_state: ProcessingState::from_str(&row.get::<_, String>(3)?),
                    created_on: row.get(4)?,
                    updated_on: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(agents)
    }

    pub fn get_agent(&self, name: &str) -> Result<Option<Agent>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        Self::select_agent(&conn, name)
    }

    pub fn agent_exists(&self, name: &str) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let count: i64 = conn.query_row(
            "SELECT COUNT(1) FROM agents WHERE name = ?",
            [name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Insert a new agent. Returns `None` if the name is already taken.
    pub fn create_agent(&self, input: CreateAgentInput) -> Result<Option<Agent>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now().timestamp();

        let inserted = conn.execute(
            "INSERT INTO agents (name, instructions, welcome_message, suggested_prompts, files,
                                 status, processing_state, created_on, updated_on)
             VALUES (?, ?, ?, ?, ?, '', ?, ?, ?)",
            (
                &input.name,
                &input.instructions,
                &input.welcome_message,
                csv::join(&input.suggested_prompts),
                csv::join(&input.files),
                input.processing_state.as_str(),
                now,
                now,
            ),
        );
        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        Ok(Some(Agent {
            id: conn.last_insert_rowid(),
            name: input.name,
            instructions: input.instructions,
            welcome_message: input.welcome_message,
            suggested_prompts: input.suggested_prompts,
            files: input.files,
            status: String::new(),
            processing_state: input.processing_state,
            created_on: now,
            updated_on: now,
        }))
    }

    pub fn update_agent(&self, name: &str, input: UpdateAgentInput) -> Result<Option<Agent>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let Some(existing) = Self::select_agent(&conn, name)? else {
            return Ok(None);
        };

        let now = Utc::now().timestamp();
        let processing_state = input.processing_state.unwrap_or(existing.processing_state);

        conn.execute(
            "UPDATE agents
             SET instructions = ?, welcome_message = ?, suggested_prompts = ?, files = ?,
                 processing_state = ?, updated_on = ?
             WHERE name = ?",
            (
                &input.instructions,
                &input.welcome_message,
                csv::join(&input.suggested_prompts),
                csv::join(&input.files),
                processing_state.as_str(),
                now,
                name,
            ),
        )?;

        Ok(Some(Agent {
            instructions: input.instructions,
            welcome_message: input.welcome_message,
            suggested_prompts: input.suggested_prompts,
            files: input.files,
            processing_state,
            updated_on: now,
            ..existing
        }))
    }

    pub fn set_processing_state(
        &self,
        name: &str,
        state: ProcessingState,
    ) -> Result<Option<Agent>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now().timestamp();
        let changed = conn.execute(
            "UPDATE agents SET processing_state = ?, updated_on = ? WHERE name = ?",
            (state.as_str(), now, name),
        )?;
        if changed == 0 {
            return Ok(None);
        }
        Self::select_agent(&conn, name)
    }

    pub fn delete_agent(&self, name: &str) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let changed = conn.execute("DELETE FROM agents WHERE name = ?", [name])?;
        Ok(changed > 0)
    }

    fn select_agent(conn: &Connection, name: &str) -> Result<Option<Agent>> {
        let agent = conn
            .query_row(
                &format!("SELECT {} FROM agents WHERE name = ?", AGENT_COLUMNS),
                [name],
                row_to_agent,
            )
            .optional()?;
        Ok(agent)
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn row_to_agent(row: &Row<'_>) -> rusqlite::Result<Agent> {
    Ok(Agent {
        id: row.get(0)?,
        name: row.get(1)?,
        instructions: row.get(2)?,
        welcome_message: row.get(3)?,
        suggested_prompts: csv::split(&row.get::<_, String>(4)?),
        files: csv::split(&row.get::<_, String>(5)?),
        status: row.get(6)?,
        processing_state: ProcessingState::from_str(&row.get::<_, String>(7)?),
        created_on: row.get(8)?,
        updated_on: row.get(9)?,
    })
}
