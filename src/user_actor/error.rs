use thiserror::Error;

use crate::actor_framework::FrameworkError;
use crate::domain::CartError;

/// Errors that can occur during user operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum UserError {
    #[error("User not found: {0}")]
    NotFound(String),
    #[error("User validation error: {0}")]
    ValidationError(String),
    #[error(transparent)]
    Cart(#[from] CartError),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<FrameworkError> for UserError {
    fn from(e: FrameworkError) -> Self {
        match e {
            FrameworkError::NotFound(id) => UserError::NotFound(id),
            FrameworkError::Rejected(reason) => UserError::ValidationError(reason),
            e @ (FrameworkError::ActorClosed | FrameworkError::ActorDropped) => {
                UserError::ActorCommunicationError(e.to_string())
            }
        }
    }
}
