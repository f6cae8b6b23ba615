use thiserror::Error;

/// Failure taxonomy for every service desk operation.
///
/// Each variant is scoped to the single operation that produced it; nothing in
/// the crate treats one of these as fatal to the process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceDeskError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Invalid transition from {from} on {event}: {reason}")]
    InvalidTransition {
        from: String,
        event: String,
        reason: String,
    },

    #[error("A rejection reason is required")]
    MissingReason,

    #[error("Service request {request_id} is already assigned")]
    AlreadyAssigned { request_id: i64 },

    #[error("Permission denied: {reason}")]
    PermissionDenied { reason: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Constraint violation: {constraint}")]
    ConstraintViolation { constraint: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ServiceDeskError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn permission_denied(reason: impl Into<String>) -> Self {
        Self::PermissionDenied {
            reason: reason.into(),
        }
    }

    /// True for failures the actor can recover from by retrying a different action.
    pub fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidTransition { .. }
                | Self::MissingReason
                | Self::AlreadyAssigned { .. }
                | Self::PermissionDenied { .. }
                | Self::Validation(_)
        )
    }
}

impl From<sqlx::Error> for ServiceDeskError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err)
                if db_err.is_unique_violation() || db_err.is_foreign_key_violation() =>
            {
                Self::ConstraintViolation {
                    constraint: db_err
                        .constraint()
                        .map(str::to_string)
                        .unwrap_or_else(|| db_err.message().to_string()),
                }
            }
            _ => Self::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ServiceDeskError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ServiceDeskError>;
