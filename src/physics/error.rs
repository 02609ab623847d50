use thiserror::Error;

use crate::physics::BodyId;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PhysicsError {
    #[error("Physics computation error: {0}")]
    ComputationError(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Body '{0}' already exists")]
    DuplicateBody(BodyId),

    #[error("Body '{0}' not found")]
    UnknownBody(BodyId),

    #[error("Physics engine not initialized")]
    NotInitialized,
}
