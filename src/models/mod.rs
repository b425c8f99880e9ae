//! Domain models for Agent Studio.
//!
//! # Core Concepts
//!
//! - [`Agent`]: A configurable chat agent, identified by its `name`. The name is
//!   fixed once the agent has been created; every other editable field changes
//!   only through a committed create or update.
//! - [`AgentSummary`]: Lightweight projection used by agent listings.
//! - [`Attachment`]: A named blob staged for upload alongside an agent.
//! - [`AgentForm`]: The create/update payload sent to the agent store.
//!
//! Comma-delimited wire values (`suggested_prompts`, `files`, `deleted_files`)
//! are held as ordered lists in memory and converted only at the serde
//! boundary, see [`csv`].

mod agent;
mod attachment;
pub mod csv;

pub use agent::*;
pub use attachment::*;
