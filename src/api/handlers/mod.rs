use axum::{
    extract::{multipart::Field, Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use super::AppState;
use crate::db::validate_file_name;
use crate::models::*;

type ApiError = (StatusCode, String);

// ============================================================
// Error Handling
// ============================================================

/// Log an internal error and return a sanitized response to the client.
fn internal_error(e: impl std::fmt::Display) -> ApiError {
    tracing::error!("Internal error: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

fn bad_request(msg: impl Into<String>) -> ApiError {
    let msg = msg.into();
    tracing::warn!("Validation error: {}", msg);
    (StatusCode::BAD_REQUEST, msg)
}

fn duplicate_name() -> ApiError {
    bad_request("Agent with this name already exists")
}

fn agent_not_found() -> ApiError {
    (StatusCode::NOT_FOUND, "Agent not found".to_string())
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Agents
// ============================================================

pub async fn list_agents(
    State(state): State<AppState>,
) -> Result<Json<Vec<AgentSummary>>, ApiError> {
    state.db.list_agents().map(Json).map_err(internal_error)
}

pub async fn get_agent(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Agent>, ApiError> {
    state
        .db
        .get_agent(&name)
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(agent_not_found)
}

pub async fn create_agent(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Agent>), ApiError> {
    let form = read_form(multipart).await?;
    validate_agent_name(&form.name).map_err(bad_request)?;
    validate_new_files(&form.new_files)?;

    if state.db.agent_exists(&form.name).map_err(internal_error)? {
        return Err(duplicate_name());
    }

    // Claim the name before touching its attachment directory.
    let agent = state
        .db
        .create_agent(CreateAgentInput {
            name: form.name.clone(),
            instructions: form.instructions,
            welcome_message: form.welcome_message,
            suggested_prompts: form.suggested_prompts,
            files: Vec::new(),
            processing_state: ProcessingState::Idle,
        })
        .map_err(internal_error)?
        .ok_or_else(duplicate_name)?;

    if form.new_files.is_empty() {
        tracing::info!("Created agent {}", agent.name);
        return Ok((StatusCode::CREATED, Json(agent)));
    }

    let stored = state
        .attachments
        .stage(&agent.name, &[], &form.new_files, &[])
        .and_then(|changes| {
            let updated = state.db.update_agent(
                &agent.name,
                UpdateAgentInput {
                    instructions: agent.instructions.clone(),
                    welcome_message: agent.welcome_message.clone(),
                    suggested_prompts: agent.suggested_prompts.clone(),
                    files: changes.files.clone(),
                    processing_state: Some(ProcessingState::InProgress),
                },
            );
            if !matches!(updated, Ok(Some(_))) {
                state.attachments.rollback(&agent.name, &changes);
            }
            updated
        });

    match stored {
        Ok(Some(agent)) => {
            tracing::info!("Created agent {}", agent.name);
            Ok((StatusCode::CREATED, Json(agent)))
        }
        Ok(None) => Err(internal_error(format!(
            "Agent {} disappeared while storing attachments",
            agent.name
        ))),
        Err(e) => {
            // The row is ours; drop it so the create fails as a whole.
            if let Err(cleanup) = state.db.delete_agent(&agent.name) {
                tracing::warn!("Failed to remove agent {}: {}", agent.name, cleanup);
            }
            Err(internal_error(e))
        }
    }
}

pub async fn update_agent(
    State(state): State<AppState>,
    Path(name): Path<String>,
    multipart: Multipart,
) -> Result<Json<Agent>, ApiError> {
    let form = read_form(multipart).await?;
    validate_new_files(&form.new_files)?;

    let existing = state
        .db
        .get_agent(&name)
        .map_err(internal_error)?
        .ok_or_else(agent_not_found)?;

    let changes = state
        .attachments
        .stage(&name, &existing.files, &form.new_files, &form.deleted_files)
        .map_err(internal_error)?;
    let files_changed = !changes.is_empty();

    let updated = state.db.update_agent(
        &name,
        UpdateAgentInput {
            instructions: form.instructions,
            welcome_message: form.welcome_message,
            suggested_prompts: form.suggested_prompts,
            files: changes.files.clone(),
            processing_state: files_changed.then_some(ProcessingState::InProgress),
        },
    );

    match updated {
        Ok(Some(agent)) => {
            state.attachments.commit(&name, &changes);
            tracing::info!("Updated agent {}", agent.name);
            Ok(Json(agent))
        }
        Ok(None) => {
            state.attachments.rollback(&name, &changes);
            Err(agent_not_found())
        }
        Err(e) => {
            state.attachments.rollback(&name, &changes);
            Err(internal_error(e))
        }
    }
}

pub async fn delete_agent(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    if !state.db.delete_agent(&name).map_err(internal_error)? {
        return Err(agent_not_found());
    }
    state.attachments.remove_all(&name).map_err(internal_error)?;
    tracing::info!("Deleted agent {}", name);
    Ok(StatusCode::NO_CONTENT)
}

/// Called by the attachment processor once it has finished with an agent.
pub async fn processing_complete(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Agent>, ApiError> {
    state
        .db
        .set_processing_state(&name, ProcessingState::Idle)
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(agent_not_found)
}

// ============================================================
// Multipart form
// ============================================================

async fn read_form(mut multipart: Multipart) -> Result<AgentForm, ApiError> {
    let mut form = AgentForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(e.body_text()))?
    {
        let Some(key) = field.name().map(str::to_string) else {
            continue;
        };

        match key.as_str() {
            "name" => form.name = read_text(field).await?.trim().to_string(),
            "instructions" => form.instructions = read_text(field).await?,
            "welcome_message" => form.welcome_message = read_text(field).await?,
            "suggested_prompts" => form.suggested_prompts = csv::split(&read_text(field).await?),
            "deleted_files" => form.deleted_files = csv::split(&read_text(field).await?),
            "new_files" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| bad_request(e.body_text()))?;
                // Browsers send an empty, unnamed part when no file was chosen.
                if file_name.is_empty() && data.is_empty() {
                    continue;
                }
                form.new_files.push(Attachment::new(file_name, data.to_vec()));
            }
            other => tracing::debug!("Ignoring form field {}", other),
        }
    }

    Ok(form)
}

async fn read_text(field: Field<'_>) -> Result<String, ApiError> {
    field.text().await.map_err(|e| bad_request(e.body_text()))
}

fn validate_new_files(files: &[Attachment]) -> Result<(), ApiError> {
    for file in files {
        validate_file_name(&file.name).map_err(bad_request)?;
    }
    Ok(())
}
