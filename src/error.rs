//! Error types for the tutorial engine.
//!
//! The state machine itself never fails: invalid transitions are ignored.
//! Errors only arise at the edges, when loading content tables, reading
//! configuration, or talking to the settings store.

use crate::tutorial::model::Persona;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Settings store errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Problems with a persona content table.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("Failed to parse content table: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("No script defined for persona {persona}")]
    MissingPersona { persona: Persona },

    #[error("Script for persona {persona} is defined more than once")]
    DuplicatePersona { persona: Persona },

    #[error("Script for persona {persona} has no steps")]
    EmptyScript { persona: Persona },

    #[error("Step {index} of {persona} has an empty navigation target")]
    BlankNavigationTarget { persona: Persona, index: usize },
}
