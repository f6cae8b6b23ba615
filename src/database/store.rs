use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::Result;
use crate::models::{
    Location, NewLocation, NewServiceRequest, NewTechnicianProfile, PriorityLevel,
    RequestListing, ServiceCategory, ServiceRequest, ServiceRequestUpdate, SupportDepartment,
    TechnicianProfile,
};
use crate::state_machine::{RequestPatch, RequestStatus, TransitionExpectation};

/// Filter over service requests. Unset fields match everything; an empty
/// status list matches every status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestQuery {
    pub created_by: Option<i64>,
    pub assigned_to: Option<i64>,
    pub statuses: Vec<RequestStatus>,
    pub priority_id: Option<i64>,
    pub category_id: Option<i64>,
    /// Inclusive lower bound on `created_at`
    pub created_from: Option<NaiveDateTime>,
    /// Exclusive upper bound on `created_at`
    pub created_until: Option<NaiveDateTime>,
}

impl RequestQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn created_by(mut self, actor_id: i64) -> Self {
        self.created_by = Some(actor_id);
        self
    }

    pub fn assigned_to(mut self, actor_id: i64) -> Self {
        self.assigned_to = Some(actor_id);
        self
    }

    pub fn with_status(mut self, status: RequestStatus) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn with_statuses(mut self, statuses: &[RequestStatus]) -> Self {
        self.statuses.extend_from_slice(statuses);
        self
    }

    pub fn with_priority(mut self, priority_id: i64) -> Self {
        self.priority_id = Some(priority_id);
        self
    }

    pub fn with_category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn created_between(
        mut self,
        from: Option<NaiveDateTime>,
        until: Option<NaiveDateTime>,
    ) -> Self {
        self.created_from = from;
        self.created_until = until;
        self
    }

    /// Evaluate the filter against a single row
    pub fn matches(&self, request: &ServiceRequest) -> bool {
        self.created_by.map_or(true, |id| request.created_by == id)
            && self.assigned_to.map_or(true, |id| request.assigned_to == Some(id))
            && (self.statuses.is_empty() || self.statuses.contains(&request.status))
            && self.priority_id.map_or(true, |id| request.priority_id == Some(id))
            && self.category_id.map_or(true, |id| request.category_id == id)
            && self.created_from.map_or(true, |from| request.created_at >= from)
            && self.created_until.map_or(true, |until| request.created_at < until)
    }
}

/// Persistence contract for service request rows
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Insert a `New`, unassigned request owned by `created_by`
    async fn insert_request(
        &self,
        created_by: i64,
        new_request: &NewServiceRequest,
        location_id: i64,
        now: NaiveDateTime,
    ) -> Result<ServiceRequest>;

    async fn find_request(&self, service_request_id: i64) -> Result<Option<ServiceRequest>>;

    /// Owner edit, applied only while the row is owned by `owner`, `New` and
    /// unassigned. Returns `None` when the guard did not match.
    async fn update_request_details(
        &self,
        service_request_id: i64,
        owner: i64,
        update: &ServiceRequestUpdate,
        location_id: i64,
        now: NaiveDateTime,
    ) -> Result<Option<ServiceRequest>>;

    /// Owner deletion under the same guard as edits. Returns whether a row was removed.
    async fn delete_request(&self, service_request_id: i64, owner: i64) -> Result<bool>;

    /// Atomically apply `patch` if the row still matches `expected`.
    ///
    /// Returns the updated row, or `None` when the row is missing or has
    /// changed since it was read; in that case nothing is written.
    async fn apply_transition(
        &self,
        service_request_id: i64,
        expected: TransitionExpectation,
        patch: &RequestPatch,
        now: NaiveDateTime,
    ) -> Result<Option<ServiceRequest>>;

    /// Rows matching `query`, joined with their priority's resolution time
    async fn list_requests(&self, query: &RequestQuery) -> Result<Vec<RequestListing>>;

    /// Live count of Assigned/In Progress requests per technician user id.
    /// Every requested id is present in the result, zero if idle.
    async fn active_request_counts(&self, user_ids: &[i64]) -> Result<HashMap<i64, i64>>;
}

/// Persistence contract for technician profiles and reference data
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn create_category(&self, name: &str) -> Result<ServiceCategory>;
    async fn find_category(&self, category_id: i64) -> Result<Option<ServiceCategory>>;
    async fn list_categories(&self) -> Result<Vec<ServiceCategory>>;

    async fn create_priority(
        &self,
        name: &str,
        color: &str,
        resolution_time_hours: i32,
    ) -> Result<PriorityLevel>;
    async fn find_priority(&self, priority_id: i64) -> Result<Option<PriorityLevel>>;
    async fn list_priorities(&self) -> Result<Vec<PriorityLevel>>;

    async fn create_department(&self, name: &str) -> Result<SupportDepartment>;
    async fn list_departments(&self) -> Result<Vec<SupportDepartment>>;

    /// Return the location with this exact triple, creating it if needed
    async fn get_or_create_location(&self, location: &NewLocation) -> Result<Location>;
    async fn find_location(&self, location_id: i64) -> Result<Option<Location>>;

    async fn create_technician_profile(
        &self,
        profile: &NewTechnicianProfile,
    ) -> Result<TechnicianProfile>;
    async fn find_technician_by_user(&self, user_id: i64) -> Result<Option<TechnicianProfile>>;
    async fn list_technicians(&self) -> Result<Vec<TechnicianProfile>>;
    /// Profiles whose expertise includes `category_id`, regardless of department
    async fn technicians_with_expertise(&self, category_id: i64)
        -> Result<Vec<TechnicianProfile>>;
}

/// A backend providing both contracts
pub trait ServiceDeskStore: RequestStore + DirectoryStore {}

impl<T: RequestStore + DirectoryStore> ServiceDeskStore for T {}
