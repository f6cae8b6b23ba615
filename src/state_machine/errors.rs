use crate::error::ServiceDeskError;
use thiserror::Error;

/// Reasons a guard refuses a transition
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuardError {
    #[error("{event} is not a valid transition from {from}")]
    NotInTable { from: String, event: String },

    #[error("Actor {actor_id} ({role}) may not {event} a request in {from}")]
    Unauthorized {
        actor_id: i64,
        role: String,
        event: String,
        from: String,
    },

    #[error("Rejection requires a non-empty reason")]
    MissingReason,

    #[error("Request {request_id} already has an assignee")]
    AlreadyAssigned { request_id: i64 },
}

/// Result type alias for guard checks
pub type GuardResult<T> = Result<T, GuardError>;

impl From<GuardError> for ServiceDeskError {
    fn from(err: GuardError) -> Self {
        match err {
            GuardError::MissingReason => ServiceDeskError::MissingReason,
            GuardError::AlreadyAssigned { request_id } => {
                ServiceDeskError::AlreadyAssigned { request_id }
            }
            GuardError::NotInTable { ref from, ref event }
            | GuardError::Unauthorized {
                ref from, ref event, ..
            } => ServiceDeskError::InvalidTransition {
                from: from.clone(),
                event: event.clone(),
                reason: err.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_errors_map_onto_taxonomy() {
        let err: ServiceDeskError = GuardError::MissingReason.into();
        assert_eq!(err, ServiceDeskError::MissingReason);

        let err: ServiceDeskError = GuardError::AlreadyAssigned { request_id: 4 }.into();
        assert_eq!(err, ServiceDeskError::AlreadyAssigned { request_id: 4 });

        let err: ServiceDeskError = GuardError::Unauthorized {
            actor_id: 9,
            role: "staff".to_string(),
            event: "accept".to_string(),
            from: "Assigned".to_string(),
        }
        .into();
        match err {
            ServiceDeskError::InvalidTransition { from, event, reason } => {
                assert_eq!(from, "Assigned");
                assert_eq!(event, "accept");
                assert!(reason.contains("Actor 9 (staff)"));
            }
            other => panic!("Expected InvalidTransition, got {other:?}"),
        }
    }
}
