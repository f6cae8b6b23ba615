use super::errors::{GuardError, GuardResult};
use super::events::RequestEvent;
use super::states::RequestStatus;
use crate::models::{Actor, ActorRole, ServiceRequest};

/// Pure authorization check: may `actor` trigger `event` on `request`?
///
/// Status preconditions are not considered here; they belong to the
/// transition table.
pub fn authorize(actor: &Actor, request: &ServiceRequest, event: &RequestEvent) -> bool {
    match event {
        RequestEvent::Assign { .. } => actor.is(ActorRole::Admin),
        RequestEvent::Accept
        | RequestEvent::Reject { .. }
        | RequestEvent::Start
        | RequestEvent::MarkComplete => {
            actor.is(ActorRole::Technician) && request.is_assigned_to(actor.actor_id)
        }
        RequestEvent::ConfirmCompletion => {
            actor.is(ActorRole::Staff) && request.is_owned_by(actor.actor_id)
        }
    }
}

/// Guard conditions for service request transitions
#[derive(Debug)]
pub struct TransitionGuard;

impl TransitionGuard {
    /// The closed transition table. Anything not listed is invalid.
    pub fn target_state(from: RequestStatus, event: &RequestEvent) -> GuardResult<RequestStatus> {
        use RequestStatus::*;

        let target = match (from, event) {
            (New, RequestEvent::Assign { .. }) => Assigned,
            (Assigned, RequestEvent::Accept) => Accepted,
            (Assigned, RequestEvent::Reject { .. }) => Rejected,
            (Accepted, RequestEvent::Start) => InProgress,
            (InProgress, RequestEvent::MarkComplete) => AwaitingConfirmation,
            (AwaitingConfirmation, RequestEvent::ConfirmCompletion) => Completed,
            (from, event) => {
                return Err(GuardError::NotInTable {
                    from: from.to_string(),
                    event: event.event_type().to_string(),
                })
            }
        };

        Ok(target)
    }

    /// Run every precondition for `event` and return the target state.
    ///
    /// Order: actor authorization, the assignment guard, the transition table,
    /// then the rejection reason.
    pub fn check(
        actor: &Actor,
        request: &ServiceRequest,
        event: &RequestEvent,
    ) -> GuardResult<RequestStatus> {
        if !authorize(actor, request, event) {
            return Err(GuardError::Unauthorized {
                actor_id: actor.actor_id,
                role: actor.role.to_string(),
                event: event.event_type().to_string(),
                from: request.status.to_string(),
            });
        }

        if matches!(event, RequestEvent::Assign { .. }) && request.is_assigned() {
            return Err(GuardError::AlreadyAssigned {
                request_id: request.service_request_id,
            });
        }

        let target = Self::target_state(request.status, event)?;

        if matches!(event, RequestEvent::Reject { .. }) && event.rejection_reason().is_none() {
            return Err(GuardError::MissingReason);
        }

        Ok(target)
    }
}
