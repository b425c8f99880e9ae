//! Edit sessions for configurable chat agents, plus the HTTP store they
//! commit to.
//!
//! - [`session`]: field navigation, drafts, attachment diffs and commits
//! - [`client`]: the HTTP implementation of [`store::AgentStore`]
//! - [`api`] and [`db`]: a reference agent store server

pub mod api;
pub mod client;
pub mod config;
pub mod db;
pub mod models;
pub mod session;
pub mod store;
