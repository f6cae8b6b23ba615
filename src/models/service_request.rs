use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::reference::NewLocation;
use crate::constants::system::MAX_TITLE_LENGTH;
use crate::error::{Result, ServiceDeskError};
use crate::state_machine::RequestStatus;

/// A unit of facilities/IT work.
/// Maps to the `service_requests` table.
///
/// `status`, `assigned_to`, `rejection_reason`, `rejected_at` and `completed_at`
/// are only ever written by the lifecycle engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ServiceRequest {
    pub service_request_id: i64,
    pub title: String,
    pub description: String,
    pub location_id: Option<i64>,
    pub category_id: i64,
    pub priority_id: Option<i64>,
    /// Opaque reference to an uploaded file; storage is handled elsewhere
    pub attachment: Option<String>,
    pub created_by: i64,
    pub assigned_to: Option<i64>,
    #[sqlx(try_from = "String")]
    pub status: RequestStatus,
    pub rejection_reason: Option<String>,
    pub rejected_at: Option<NaiveDateTime>,
    pub completed_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl ServiceRequest {
    pub fn is_assigned(&self) -> bool {
        self.assigned_to.is_some()
    }

    pub fn is_owned_by(&self, actor_id: i64) -> bool {
        self.created_by == actor_id
    }

    pub fn is_assigned_to(&self, actor_id: i64) -> bool {
        self.assigned_to == Some(actor_id)
    }

    /// Owner edits and deletion are only allowed before triage
    pub fn is_editable(&self) -> bool {
        self.status == RequestStatus::New && self.assigned_to.is_none()
    }

    /// Check the row-level invariants that must hold after every transition:
    /// only `New` may lack an assignee, and a rejection reason is present
    /// exactly when the request is rejected.
    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        if self.status.requires_assignee() != self.assigned_to.is_some() {
            return Err(format!(
                "request {} has status {} with assignee {:?}",
                self.service_request_id, self.status, self.assigned_to
            ));
        }

        let has_reason = self
            .rejection_reason
            .as_deref()
            .is_some_and(|reason| !reason.trim().is_empty());
        if has_reason != (self.status == RequestStatus::Rejected) {
            return Err(format!(
                "request {} has status {} with rejection reason {:?}",
                self.service_request_id, self.status, self.rejection_reason
            ));
        }

        Ok(())
    }
}

/// Fields supplied by staff when submitting a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewServiceRequest {
    pub title: String,
    pub description: String,
    pub category_id: i64,
    pub priority_id: Option<i64>,
    pub location: NewLocation,
    pub attachment: Option<String>,
}

impl NewServiceRequest {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        category_id: i64,
        location: NewLocation,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            category_id,
            priority_id: None,
            location,
            attachment: None,
        }
    }

    pub fn with_priority(mut self, priority_id: i64) -> Self {
        self.priority_id = Some(priority_id);
        self
    }

    pub fn with_attachment(mut self, attachment: impl Into<String>) -> Self {
        self.attachment = Some(attachment.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_text_fields(&self.title, &self.description)?;
        self.location.validate()
    }
}

/// Owner edits to a request that is still `New`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRequestUpdate {
    pub title: String,
    pub description: String,
    pub category_id: i64,
    pub priority_id: Option<i64>,
    pub location: NewLocation,
    pub attachment: Option<String>,
}

impl ServiceRequestUpdate {
    pub fn validate(&self) -> Result<()> {
        validate_text_fields(&self.title, &self.description)?;
        self.location.validate()
    }
}

impl From<NewServiceRequest> for ServiceRequestUpdate {
    fn from(new_request: NewServiceRequest) -> Self {
        Self {
            title: new_request.title,
            description: new_request.description,
            category_id: new_request.category_id,
            priority_id: new_request.priority_id,
            location: new_request.location,
            attachment: new_request.attachment,
        }
    }
}

fn validate_text_fields(title: &str, description: &str) -> Result<()> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ServiceDeskError::Validation("title must not be empty".into()));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(ServiceDeskError::Validation(format!(
            "title must be at most {MAX_TITLE_LENGTH} characters"
        )));
    }
    if description.trim().is_empty() {
        return Err(ServiceDeskError::Validation(
            "description must not be empty".into(),
        ));
    }
    Ok(())
}

/// A request joined with the resolution time of its priority, the row shape
/// every list view is sorted on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct RequestListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub request: ServiceRequest,
    pub priority_resolution_hours: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_request(status: RequestStatus, assigned_to: Option<i64>) -> ServiceRequest {
        let now = Utc::now().naive_utc();
        ServiceRequest {
            service_request_id: 1,
            title: "Projector flickers".to_string(),
            description: "Room 204 projector flickers every few seconds".to_string(),
            location_id: None,
            category_id: 1,
            priority_id: None,
            attachment: None,
            created_by: 10,
            assigned_to,
            status,
            rejection_reason: None,
            rejected_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_invariants_hold_for_new_request() {
        assert!(sample_request(RequestStatus::New, None).check_invariants().is_ok());
    }

    #[test]
    fn test_invariants_reject_unassigned_progress() {
        assert!(sample_request(RequestStatus::Assigned, None)
            .check_invariants()
            .is_err());
        assert!(sample_request(RequestStatus::New, Some(3))
            .check_invariants()
            .is_err());
    }

    #[test]
    fn test_invariants_tie_reason_to_rejection() {
        let mut rejected = sample_request(RequestStatus::Rejected, Some(3));
        assert!(rejected.check_invariants().is_err());

        rejected.rejection_reason = Some("wrong category".to_string());
        assert!(rejected.check_invariants().is_ok());

        let mut accepted = sample_request(RequestStatus::Accepted, Some(3));
        accepted.rejection_reason = Some("stale".to_string());
        assert!(accepted.check_invariants().is_err());
    }

    #[test]
    fn test_editable_only_before_triage() {
        assert!(sample_request(RequestStatus::New, None).is_editable());
        assert!(!sample_request(RequestStatus::Assigned, Some(3)).is_editable());
    }

    fn kitchen() -> NewLocation {
        NewLocation::new("Block A", "Ground", "Kitchen")
    }

    #[test]
    fn test_new_request_validation() {
        assert!(NewServiceRequest::new("Leaking tap", "Kitchen tap drips", 1, kitchen())
            .validate()
            .is_ok());
        assert!(matches!(
            NewServiceRequest::new("   ", "Kitchen tap drips", 1, kitchen()).validate(),
            Err(ServiceDeskError::Validation(_))
        ));
        assert!(NewServiceRequest::new("Leaking tap", "", 1, kitchen())
            .validate()
            .is_err());
        assert!(NewServiceRequest::new("x".repeat(201), "too long", 1, kitchen())
            .validate()
            .is_err());
    }

    #[test]
    fn test_location_is_validated_on_submit_and_edit() {
        let blank_room = NewLocation::new("Block A", "Ground", " ");
        let new_request = NewServiceRequest::new("Leaking tap", "Kitchen tap drips", 1, blank_room);
        assert!(matches!(
            new_request.validate(),
            Err(ServiceDeskError::Validation(_))
        ));
        assert!(matches!(
            ServiceRequestUpdate::from(new_request).validate(),
            Err(ServiceDeskError::Validation(_))
        ));
    }
}
