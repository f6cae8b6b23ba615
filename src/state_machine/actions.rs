use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::events::RequestEvent;
use super::states::RequestStatus;
use crate::constants::events;
use crate::events::EventPublisher;
use crate::models::{Actor, ServiceRequest};

/// Values a request row held when the transition was validated. The store
/// only applies a patch while the row still matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionExpectation {
    pub status: RequestStatus,
    pub assigned_to: Option<i64>,
}

impl TransitionExpectation {
    pub fn of(request: &ServiceRequest) -> Self {
        Self {
            status: request.status,
            assigned_to: request.assigned_to,
        }
    }

    pub fn matches(&self, request: &ServiceRequest) -> bool {
        self.status == request.status && self.assigned_to == request.assigned_to
    }
}

/// Complete set of lifecycle-owned columns after a transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPatch {
    pub status: RequestStatus,
    pub assigned_to: Option<i64>,
    pub rejection_reason: Option<String>,
    pub rejected_at: Option<NaiveDateTime>,
    pub completed_at: Option<NaiveDateTime>,
}

impl RequestPatch {
    /// Apply the patch to an in-memory copy of the row
    pub fn apply_to(&self, request: &mut ServiceRequest, now: NaiveDateTime) {
        request.status = self.status;
        request.assigned_to = self.assigned_to;
        request.rejection_reason = self.rejection_reason.clone();
        request.rejected_at = self.rejected_at;
        request.completed_at = self.completed_at;
        request.updated_at = now;
    }
}

/// Side effects attached to each edge of the transition table
pub struct TransitionEffects;

impl TransitionEffects {
    /// Compute the new lifecycle columns for an already-validated transition.
    ///
    /// - assign: set the assignee, clear any rejection data
    /// - reject: record the trimmed reason and stamp `rejected_at`
    /// - mark complete: stamp `completed_at` (the only edge that does)
    pub fn for_event(
        request: &ServiceRequest,
        event: &RequestEvent,
        target: RequestStatus,
        now: NaiveDateTime,
    ) -> RequestPatch {
        let mut patch = RequestPatch {
            status: target,
            assigned_to: request.assigned_to,
            rejection_reason: request.rejection_reason.clone(),
            rejected_at: request.rejected_at,
            completed_at: request.completed_at,
        };

        match event {
            RequestEvent::Assign { technician_id } => {
                patch.assigned_to = Some(*technician_id);
                patch.rejection_reason = None;
                patch.rejected_at = None;
            }
            RequestEvent::Reject { .. } => {
                patch.rejection_reason = event.rejection_reason().map(str::to_string);
                patch.rejected_at = Some(now);
            }
            RequestEvent::MarkComplete => {
                patch.completed_at = Some(now);
            }
            RequestEvent::Accept | RequestEvent::Start | RequestEvent::ConfirmCompletion => {}
        }

        patch
    }
}

/// Lifecycle event name published when a request enters `to`
pub fn lifecycle_event_name(to: RequestStatus) -> Option<&'static str> {
    match to {
        RequestStatus::New => None,
        RequestStatus::Assigned => Some(events::REQUEST_ASSIGNED),
        RequestStatus::Accepted => Some(events::REQUEST_ACCEPTED),
        RequestStatus::Rejected => Some(events::REQUEST_REJECTED),
        RequestStatus::InProgress => Some(events::REQUEST_STARTED),
        RequestStatus::AwaitingConfirmation => Some(events::REQUEST_AWAITING_CONFIRMATION),
        RequestStatus::Completed => Some(events::REQUEST_COMPLETED),
    }
}

/// Build the JSON context carried by a lifecycle event
pub fn build_event_context(
    request: &ServiceRequest,
    from: RequestStatus,
    actor: &Actor,
    event: &RequestEvent,
) -> Value {
    serde_json::json!({
        "service_request_id": request.service_request_id,
        "from_state": from,
        "to_state": request.status,
        "event": event.event_type(),
        "actor_id": actor.actor_id,
        "actor_role": actor.role,
        "created_by": request.created_by,
        "assigned_to": request.assigned_to,
        "rejection_reason": request.rejection_reason,
    })
}

/// Action to publish lifecycle events when state transitions occur.
///
/// Notification consumers are fire-and-forget: a publishing failure is logged
/// and never undoes or fails the transition.
#[derive(Debug, Clone)]
pub struct PublishTransitionEventAction {
    event_publisher: EventPublisher,
}

impl PublishTransitionEventAction {
    pub fn new(event_publisher: EventPublisher) -> Self {
        Self { event_publisher }
    }

    pub async fn execute(
        &self,
        request: &ServiceRequest,
        from: RequestStatus,
        actor: &Actor,
        event: &RequestEvent,
    ) {
        let Some(event_name) = lifecycle_event_name(request.status) else {
            return;
        };

        let context = build_event_context(request, from, actor, event);
        if let Err(err) = self.event_publisher.publish(event_name, context).await {
            tracing::warn!(
                service_request_id = request.service_request_id,
                event_name = event_name,
                error = %err,
                "Failed to publish lifecycle event"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn request(status: RequestStatus, assigned_to: Option<i64>) -> ServiceRequest {
        let created = Utc::now().naive_utc() - Duration::hours(2);
        ServiceRequest {
            service_request_id: 3,
            title: "No network".to_string(),
            description: "Port dead in lab".to_string(),
            location_id: None,
            category_id: 2,
            priority_id: Some(1),
            attachment: None,
            created_by: 10,
            assigned_to,
            status,
            rejection_reason: None,
            rejected_at: None,
            completed_at: None,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_assign_sets_assignee_and_clears_rejection() {
        let mut fresh = request(RequestStatus::New, None);
        fresh.rejection_reason = Some("old".to_string());
        let now = Utc::now().naive_utc();

        let patch = TransitionEffects::for_event(
            &fresh,
            &RequestEvent::assign_to(20),
            RequestStatus::Assigned,
            now,
        );
        assert_eq!(patch.assigned_to, Some(20));
        assert_eq!(patch.rejection_reason, None);
        assert_eq!(patch.completed_at, None);
    }

    #[test]
    fn test_completion_stamp_only_on_mark_complete() {
        let now = Utc::now().naive_utc();
        let accepted = request(RequestStatus::Accepted, Some(20));
        let patch = TransitionEffects::for_event(
            &accepted,
            &RequestEvent::Start,
            RequestStatus::InProgress,
            now,
        );
        assert_eq!(patch.completed_at, None);

        let in_progress = request(RequestStatus::InProgress, Some(20));
        let patch = TransitionEffects::for_event(
            &in_progress,
            &RequestEvent::MarkComplete,
            RequestStatus::AwaitingConfirmation,
            now,
        );
        assert_eq!(patch.completed_at, Some(now));
    }

    #[test]
    fn test_reject_records_reason() {
        let now = Utc::now().naive_utc();
        let assigned = request(RequestStatus::Assigned, Some(20));
        let patch = TransitionEffects::for_event(
            &assigned,
            &RequestEvent::reject_with_reason(" wrong category "),
            RequestStatus::Rejected,
            now,
        );
        assert_eq!(patch.rejection_reason.as_deref(), Some("wrong category"));
        assert_eq!(patch.rejected_at, Some(now));
        assert_eq!(patch.assigned_to, Some(20));
    }

    #[test]
    fn test_patch_application_and_expectation() {
        let now = Utc::now().naive_utc();
        let mut row = request(RequestStatus::New, None);
        let expectation = TransitionExpectation::of(&row);
        assert!(expectation.matches(&row));

        let patch = TransitionEffects::for_event(
            &row,
            &RequestEvent::assign_to(20),
            RequestStatus::Assigned,
            now,
        );
        patch.apply_to(&mut row, now);

        assert_eq!(row.status, RequestStatus::Assigned);
        assert_eq!(row.updated_at, now);
        assert!(!expectation.matches(&row));
        assert!(row.check_invariants().is_ok());
    }

    #[test]
    fn test_event_names() {
        assert_eq!(lifecycle_event_name(RequestStatus::New), None);
        assert_eq!(
            lifecycle_event_name(RequestStatus::AwaitingConfirmation),
            Some("request.awaiting_confirmation")
        );
    }

    #[tokio::test]
    async fn test_publish_action_delivers_context() {
        let publisher = EventPublisher::new(8);
        let mut receiver = publisher.subscribe();
        let action = PublishTransitionEventAction::new(publisher);

        let accepted = request(RequestStatus::Accepted, Some(20));
        action
            .execute(
                &accepted,
                RequestStatus::Assigned,
                &Actor::technician(20),
                &RequestEvent::Accept,
            )
            .await;

        let published = receiver.recv().await.unwrap();
        assert_eq!(published.name, "request.accepted");
        assert_eq!(published.context["from_state"], "Assigned");
        assert_eq!(published.context["to_state"], "Accepted");
        assert_eq!(published.context["actor_role"], "technician");
    }
}
