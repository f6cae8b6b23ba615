use chrono::{NaiveDateTime, Utc};
use std::sync::Arc;

use super::{
    actions::{PublishTransitionEventAction, TransitionEffects, TransitionExpectation},
    events::RequestEvent,
    guards::TransitionGuard,
};
use crate::database::ServiceDeskStore;
use crate::error::{Result, ServiceDeskError};
use crate::events::EventPublisher;
use crate::logging::{log_error, log_request_operation};
use crate::models::{Actor, ServiceRequest};

/// Lifecycle engine for service requests.
///
/// Every status change goes through [`RequestStateMachine::transition`]: the
/// request is loaded, checked against the guards, and written with a
/// compare-and-set so two concurrent callers can never both succeed from the
/// same starting row.
#[derive(Clone)]
pub struct RequestStateMachine {
    store: Arc<dyn ServiceDeskStore>,
    publish_action: PublishTransitionEventAction,
}

impl std::fmt::Debug for RequestStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestStateMachine")
            .field("publish_action", &self.publish_action)
            .finish_non_exhaustive()
    }
}

impl RequestStateMachine {
    pub fn new(store: Arc<dyn ServiceDeskStore>, event_publisher: EventPublisher) -> Self {
        Self {
            store,
            publish_action: PublishTransitionEventAction::new(event_publisher),
        }
    }

    /// Apply `event` to the request on behalf of `actor`
    pub async fn transition(
        &self,
        actor: &Actor,
        service_request_id: i64,
        event: RequestEvent,
    ) -> Result<ServiceRequest> {
        self.transition_at(actor, service_request_id, event, Utc::now().naive_utc()).await
    }

    /// Same as [`transition`](Self::transition) with an explicit clock reading
    pub async fn transition_at(
        &self,
        actor: &Actor,
        service_request_id: i64,
        event: RequestEvent,
        now: NaiveDateTime,
    ) -> Result<ServiceRequest> {
        let request = self.load(service_request_id).await?;
        let from_state = request.status;

        let target_state = TransitionGuard::check(actor, &request, &event).inspect_err(|err| {
            tracing::debug!(
                service_request_id = service_request_id,
                actor_id = actor.actor_id,
                event = event.event_type(),
                from_state = %from_state,
                error = %err,
                "Transition refused by guard"
            );
        })?;

        if let RequestEvent::Assign { technician_id } = &event {
            self.check_technician(&request, *technician_id).await?;
        }

        let patch = TransitionEffects::for_event(&request, &event, target_state, now);
        let expected = TransitionExpectation::of(&request);

        let applied = self
            .store
            .apply_transition(service_request_id, expected, &patch, now)
            .await
            .inspect_err(|err| {
                log_error(
                    "state_machine",
                    event.event_type(),
                    &err.to_string(),
                    Some(&format!("service_request_id={service_request_id}")),
                );
            })?;

        let updated = match applied {
            Some(updated) => updated,
            None => return Err(self.lost_race_error(actor, service_request_id, &event).await),
        };

        log_request_operation(
            event.event_type(),
            Some(service_request_id),
            Some(actor.actor_id),
            updated.status.as_str(),
            Some(&format!("{from_state} -> {}", updated.status)),
        );

        self.publish_action
            .execute(&updated, from_state, actor, &event)
            .await;

        Ok(updated)
    }

    async fn load(&self, service_request_id: i64) -> Result<ServiceRequest> {
        self.store
            .find_request(service_request_id)
            .await?
            .ok_or_else(|| ServiceDeskError::not_found("service request", service_request_id))
    }

    /// The assignee must have a technician profile. Assigning outside their
    /// expertise is allowed but logged.
    async fn check_technician(&self, request: &ServiceRequest, technician_id: i64) -> Result<()> {
        let profile = self
            .store
            .find_technician_by_user(technician_id)
            .await?
            .ok_or_else(|| ServiceDeskError::not_found("technician profile", technician_id))?;

        if !profile.has_expertise(request.category_id) {
            tracing::warn!(
                service_request_id = request.service_request_id,
                technician_id = technician_id,
                category_id = request.category_id,
                "Assigning technician outside their expertise"
            );
        }

        Ok(())
    }

    /// Explain why a compare-and-set did not apply by re-checking the
    /// current row.
    async fn lost_race_error(
        &self,
        actor: &Actor,
        service_request_id: i64,
        event: &RequestEvent,
    ) -> ServiceDeskError {
        let current = match self.load(service_request_id).await {
            Ok(current) => current,
            Err(err) => return err,
        };

        tracing::info!(
            service_request_id = service_request_id,
            event = event.event_type(),
            current_state = %current.status,
            "Transition lost a concurrent update"
        );

        match TransitionGuard::check(actor, &current, event) {
            Err(guard_err) => guard_err.into(),
            Ok(_) => ServiceDeskError::InvalidTransition {
                from: current.status.to_string(),
                event: event.event_type().to_string(),
                reason: "request changed while the transition was applied".to_string(),
            },
        }
    }

    /// Whether `actor` could currently trigger `event` on the request
    pub async fn can_transition(
        &self,
        actor: &Actor,
        service_request_id: i64,
        event: &RequestEvent,
    ) -> Result<bool> {
        let request = self.load(service_request_id).await?;
        Ok(TransitionGuard::check(actor, &request, event).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{DirectoryStore, InMemoryServiceDeskStore, RequestStore};
    use crate::models::{NewLocation, NewServiceRequest, NewTechnicianProfile};
    use crate::state_machine::RequestStatus;

    const STAFF: i64 = 10;
    const TECH: i64 = 20;

    async fn setup() -> (Arc<InMemoryServiceDeskStore>, RequestStateMachine, i64) {
        let store = Arc::new(InMemoryServiceDeskStore::new());
        let category = store.create_category("IT").await.unwrap();
        store
            .create_technician_profile(&NewTechnicianProfile::new(TECH, vec![category.category_id]))
            .await
            .unwrap();
        let location = store
            .get_or_create_location(&NewLocation::new("Library", "1", "Print room"))
            .await
            .unwrap();
        let new_request = NewServiceRequest::new(
            "Printer jam",
            "Tray 2 jams",
            category.category_id,
            NewLocation::new("Library", "1", "Print room"),
        );
        let request = store
            .insert_request(STAFF, &new_request, location.location_id, Utc::now().naive_utc())
            .await
            .unwrap();

        let machine = RequestStateMachine::new(store.clone(), EventPublisher::default());
        (store, machine, request.service_request_id)
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let (_store, machine, id) = setup().await;

        let steps = [
            (Actor::admin(1), RequestEvent::assign_to(TECH), RequestStatus::Assigned),
            (Actor::technician(TECH), RequestEvent::Accept, RequestStatus::Accepted),
            (Actor::technician(TECH), RequestEvent::Start, RequestStatus::InProgress),
            (
                Actor::technician(TECH),
                RequestEvent::MarkComplete,
                RequestStatus::AwaitingConfirmation,
            ),
            (
                Actor::staff(STAFF),
                RequestEvent::ConfirmCompletion,
                RequestStatus::Completed,
            ),
        ];

        for (actor, event, expected) in steps {
            let updated = machine.transition(&actor, id, event).await.unwrap();
            assert_eq!(updated.status, expected);
            assert!(updated.check_invariants().is_ok());
        }
    }

    #[tokio::test]
    async fn test_missing_request_is_not_found() {
        let (_store, machine, _id) = setup().await;
        let err = machine
            .transition(&Actor::admin(1), 999, RequestEvent::assign_to(TECH))
            .await
            .unwrap_err();
        assert_eq!(err, ServiceDeskError::not_found("service request", 999));
    }

    #[tokio::test]
    async fn test_assign_requires_technician_profile() {
        let (store, machine, id) = setup().await;
        let err = machine
            .transition(&Actor::admin(1), id, RequestEvent::assign_to(99))
            .await
            .unwrap_err();
        assert_eq!(err, ServiceDeskError::not_found("technician profile", 99));

        let unchanged = store.find_request(id).await.unwrap().unwrap();
        assert_eq!(unchanged.status, RequestStatus::New);
    }

    #[tokio::test]
    async fn test_can_transition_reflects_guards() {
        let (_store, machine, id) = setup().await;
        assert!(machine
            .can_transition(&Actor::admin(1), id, &RequestEvent::assign_to(TECH))
            .await
            .unwrap());
        assert!(!machine
            .can_transition(&Actor::technician(TECH), id, &RequestEvent::Accept)
            .await
            .unwrap());
    }
}
