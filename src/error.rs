//! Structured error handling for the tasking core.
//!
//! Expected domain conditions (a no-op transition, an unresolvable area, an
//! image with incomplete tasks) are modelled as result values on the
//! operations that produce them, never as errors. `TaskingError` is reserved
//! for genuine failures: lost connections, malformed input payloads,
//! misconfiguration, and corrupt status strings in the database.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskingError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("identity provider error: {0}")]
    IdentityProvider(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid task status in database: {0}")]
    InvalidStatus(String),
}

pub type Result<T> = std::result::Result<T, TaskingError>;
