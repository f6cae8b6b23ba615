use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use super::assignment_policy::{AssignmentPolicy, TechnicianCandidate};
use super::ordering_policy::sort_requests;
use crate::constants::{events, status_groups, system::DASHBOARD_RECENT_LIMIT};
use crate::database::{RequestQuery, ServiceDeskStore};
use crate::error::{Result, ServiceDeskError};
use crate::events::EventPublisher;
use crate::logging::log_request_operation;
use crate::models::{
    Actor, ActorRole, NewLocation, NewServiceRequest, RequestListing, ServiceRequest,
    ServiceRequestUpdate,
};
use crate::pagination::{Page, Pagination};
use crate::state_machine::{RequestEvent, RequestStateMachine, RequestStatus};

/// Filters on the admin "all requests" list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminRequestFilter {
    pub status: Option<RequestStatus>,
    pub priority_id: Option<i64>,
}

/// Per-status lists on the technician side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TechnicianView {
    /// Everything still open: Assigned, Accepted and In Progress
    Assigned,
    Accepted,
    InProgress,
    AwaitingConfirmation,
    Completed,
    Rejected,
}

impl TechnicianView {
    pub fn statuses(&self) -> &'static [RequestStatus] {
        match self {
            Self::Assigned => status_groups::TECHNICIAN_OPEN,
            Self::Accepted => &[RequestStatus::Accepted],
            Self::InProgress => &[RequestStatus::InProgress],
            Self::AwaitingConfirmation => &[RequestStatus::AwaitingConfirmation],
            Self::Completed => &[RequestStatus::Completed],
            Self::Rejected => &[RequestStatus::Rejected],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: RequestStatus,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category_id: i64,
    pub name: String,
    pub count: usize,
}

/// Summary shown on the admin, staff and technician landing pages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dashboard {
    pub total: usize,
    /// One entry per status, zero counts included
    pub status_counts: Vec<StatusCount>,
    /// One entry per category, zero counts included
    pub category_counts: Vec<CategoryCount>,
    /// Most recently created requests, newest first
    pub recent: Vec<ServiceRequest>,
}

impl Dashboard {
    pub fn count_for(&self, status: RequestStatus) -> usize {
        self.status_counts
            .iter()
            .find(|entry| entry.status == status)
            .map_or(0, |entry| entry.count)
    }
}

/// Role-scoped operations on service requests.
///
/// Owner CRUD happens here; every status change is delegated to the
/// [`RequestStateMachine`].
#[derive(Clone)]
pub struct ServiceRequestService {
    store: Arc<dyn ServiceDeskStore>,
    state_machine: RequestStateMachine,
    assignment_policy: AssignmentPolicy,
    event_publisher: EventPublisher,
    per_page: u32,
}

impl ServiceRequestService {
    pub fn new(
        store: Arc<dyn ServiceDeskStore>,
        event_publisher: EventPublisher,
        per_page: u32,
    ) -> Self {
        Self {
            state_machine: RequestStateMachine::new(store.clone(), event_publisher.clone()),
            assignment_policy: AssignmentPolicy::new(store.clone()),
            store,
            event_publisher,
            per_page,
        }
    }

    pub fn state_machine(&self) -> &RequestStateMachine {
        &self.state_machine
    }

    pub fn assignment_policy(&self) -> &AssignmentPolicy {
        &self.assignment_policy
    }

    fn pagination(&self, page: u32) -> Pagination {
        Pagination::new(page, self.per_page)
    }

    // ---------------------------------------------------------------
    // Owner operations
    // ---------------------------------------------------------------

    /// Staff submit a new request. It starts `New` and unassigned.
    pub async fn submit(
        &self,
        actor: &Actor,
        new_request: NewServiceRequest,
    ) -> Result<ServiceRequest> {
        require_role(actor, ActorRole::Staff, "only staff may submit requests")?;
        new_request.validate()?;
        self.check_references(new_request.category_id, new_request.priority_id).await?;

        let now = now();
        let location_id = self.resolve_location(&new_request.location).await?;
        let request = self
            .store
            .insert_request(actor.actor_id, &new_request, location_id, now)
            .await?;

        log_request_operation(
            "submit",
            Some(request.service_request_id),
            Some(actor.actor_id),
            request.status.as_str(),
            None,
        );

        if let Err(err) = self
            .event_publisher
            .publish_payload(events::REQUEST_SUBMITTED, &request)
            .await
        {
            tracing::warn!(error = %err, "Failed to publish submission event");
        }

        Ok(request)
    }

    /// Creator edits the request while it is still `New` and unassigned
    pub async fn edit(
        &self,
        actor: &Actor,
        service_request_id: i64,
        update: ServiceRequestUpdate,
    ) -> Result<ServiceRequest> {
        let request = self.request_for_actor(actor, service_request_id).await?;
        require_owner_editable(actor, &request)?;
        update.validate()?;
        self.check_references(update.category_id, update.priority_id).await?;

        let location_id = self.resolve_location(&update.location).await?;
        let updated = self
            .store
            .update_request_details(
                service_request_id,
                actor.actor_id,
                &update,
                location_id,
                now(),
            )
            .await?
            .ok_or_else(|| ServiceDeskError::permission_denied("request is no longer editable"))?;

        log_request_operation(
            "edit",
            Some(service_request_id),
            Some(actor.actor_id),
            updated.status.as_str(),
            None,
        );
        Ok(updated)
    }

    /// Creator deletes the request while it is still `New` and unassigned
    pub async fn delete(&self, actor: &Actor, service_request_id: i64) -> Result<()> {
        let request = self.request_for_actor(actor, service_request_id).await?;
        require_owner_editable(actor, &request)?;

        if !self
            .store
            .delete_request(service_request_id, actor.actor_id)
            .await?
        {
            return Err(ServiceDeskError::permission_denied("request is no longer editable"));
        }

        log_request_operation(
            "delete",
            Some(service_request_id),
            Some(actor.actor_id),
            "deleted",
            None,
        );
        Ok(())
    }

    /// Detail view. Staff see their own requests, technicians the ones
    /// assigned to them, admins and managers everything. Anything else is
    /// reported as not found.
    pub async fn request_for_actor(
        &self,
        actor: &Actor,
        service_request_id: i64,
    ) -> Result<ServiceRequest> {
        let not_found = || ServiceDeskError::not_found("service request", service_request_id);
        let request = self
            .store
            .find_request(service_request_id)
            .await?
            .ok_or_else(not_found)?;

        let visible = match actor.role {
            ActorRole::Staff => request.is_owned_by(actor.actor_id),
            ActorRole::Technician => request.is_assigned_to(actor.actor_id),
            ActorRole::Admin | ActorRole::Manager => true,
        };

        if visible {
            Ok(request)
        } else {
            debug!(
                service_request_id = service_request_id,
                actor_id = actor.actor_id,
                role = %actor.role,
                "Request hidden from actor"
            );
            Err(not_found())
        }
    }

    // ---------------------------------------------------------------
    // Lists
    // ---------------------------------------------------------------

    /// The staff member's own requests
    pub async fn staff_requests(&self, actor: &Actor, page: u32) -> Result<Page<RequestListing>> {
        require_role(actor, ActorRole::Staff, "only staff have their own request list")?;
        self.ordered_page(RequestQuery::all().created_by(actor.actor_id), page).await
    }

    /// Organisation-wide list with optional status and priority filters
    pub async fn all_requests(
        &self,
        actor: &Actor,
        filter: AdminRequestFilter,
        page: u32,
    ) -> Result<Page<RequestListing>> {
        require_all_requests_access(actor)?;

        let mut query = RequestQuery::all();
        if let Some(status) = filter.status {
            query = query.with_status(status);
        }
        if let Some(priority_id) = filter.priority_id {
            query = query.with_priority(priority_id);
        }
        self.ordered_page(query, page).await
    }

    /// Admin pending/in-progress/completed lists
    pub async fn requests_by_status(
        &self,
        actor: &Actor,
        status: RequestStatus,
        page: u32,
    ) -> Result<Page<RequestListing>> {
        require_all_requests_access(actor)?;
        self.ordered_page(RequestQuery::all().with_status(status), page).await
    }

    /// Requests assigned to the technician, narrowed by `view`
    pub async fn technician_requests(
        &self,
        actor: &Actor,
        view: TechnicianView,
        page: u32,
    ) -> Result<Page<RequestListing>> {
        require_role(
            actor,
            ActorRole::Technician,
            "only technicians have assigned requests",
        )?;
        let query = RequestQuery::all()
            .assigned_to(actor.actor_id)
            .with_statuses(view.statuses());
        self.ordered_page(query, page).await
    }

    /// Admin technician list with live workloads
    pub async fn technician_list(
        &self,
        actor: &Actor,
        page: u32,
    ) -> Result<Page<TechnicianCandidate>> {
        require_role(actor, ActorRole::Admin, "only admins manage technicians")?;
        let workloads = self.assignment_policy.technician_workloads().await?;
        Ok(self.pagination(page).paginate(workloads))
    }

    async fn ordered_page(&self, query: RequestQuery, page: u32) -> Result<Page<RequestListing>> {
        let mut listings = self.store.list_requests(&query).await?;
        sort_requests(&mut listings);
        Ok(self.pagination(page).paginate(listings))
    }

    // ---------------------------------------------------------------
    // Dashboards
    // ---------------------------------------------------------------

    /// Organisation-wide totals for admins
    pub async fn admin_dashboard(&self, actor: &Actor) -> Result<Dashboard> {
        require_role(actor, ActorRole::Admin, "admin dashboard requires the admin role")?;
        self.dashboard(RequestQuery::all()).await
    }

    pub async fn staff_dashboard(&self, actor: &Actor) -> Result<Dashboard> {
        require_role(actor, ActorRole::Staff, "staff dashboard requires the staff role")?;
        self.dashboard(RequestQuery::all().created_by(actor.actor_id)).await
    }

    pub async fn technician_dashboard(&self, actor: &Actor) -> Result<Dashboard> {
        require_role(
            actor,
            ActorRole::Technician,
            "technician dashboard requires the technician role",
        )?;
        self.dashboard(RequestQuery::all().assigned_to(actor.actor_id)).await
    }

    async fn dashboard(&self, query: RequestQuery) -> Result<Dashboard> {
        let requests: Vec<ServiceRequest> = self
            .store
            .list_requests(&query)
            .await?
            .into_iter()
            .map(|listing| listing.request)
            .collect();
        let categories = self.store.list_categories().await?;

        let status_counts = RequestStatus::ALL
            .iter()
            .map(|status| StatusCount {
                status: *status,
                count: requests.iter().filter(|r| r.status == *status).count(),
            })
            .collect();

        let category_counts = categories
            .into_iter()
            .map(|category| CategoryCount {
                count: requests
                    .iter()
                    .filter(|r| r.category_id == category.category_id)
                    .count(),
                category_id: category.category_id,
                name: category.name,
            })
            .collect();

        let mut recent = requests.clone();
        recent.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.service_request_id.cmp(&a.service_request_id))
        });
        recent.truncate(DASHBOARD_RECENT_LIMIT);

        Ok(Dashboard {
            total: requests.len(),
            status_counts,
            category_counts,
            recent,
        })
    }

    // ---------------------------------------------------------------
    // Lifecycle entry points
    // ---------------------------------------------------------------

    pub async fn assign(
        &self,
        actor: &Actor,
        service_request_id: i64,
        technician_id: i64,
    ) -> Result<ServiceRequest> {
        self.state_machine
            .transition(actor, service_request_id, RequestEvent::assign_to(technician_id))
            .await
    }

    pub async fn accept(&self, actor: &Actor, service_request_id: i64) -> Result<ServiceRequest> {
        self.state_machine
            .transition(actor, service_request_id, RequestEvent::Accept)
            .await
    }

    pub async fn reject(
        &self,
        actor: &Actor,
        service_request_id: i64,
        reason: impl Into<String>,
    ) -> Result<ServiceRequest> {
        self.state_machine
            .transition(actor, service_request_id, RequestEvent::reject_with_reason(reason))
            .await
    }

    pub async fn start(&self, actor: &Actor, service_request_id: i64) -> Result<ServiceRequest> {
        self.state_machine
            .transition(actor, service_request_id, RequestEvent::Start)
            .await
    }

    pub async fn mark_complete(
        &self,
        actor: &Actor,
        service_request_id: i64,
    ) -> Result<ServiceRequest> {
        self.state_machine
            .transition(actor, service_request_id, RequestEvent::MarkComplete)
            .await
    }

    pub async fn confirm_completion(
        &self,
        actor: &Actor,
        service_request_id: i64,
    ) -> Result<ServiceRequest> {
        self.state_machine
            .transition(actor, service_request_id, RequestEvent::ConfirmCompletion)
            .await
    }

    // ---------------------------------------------------------------
    // Helpers
    // ---------------------------------------------------------------

    async fn check_references(&self, category_id: i64, priority_id: Option<i64>) -> Result<()> {
        if self.store.find_category(category_id).await?.is_none() {
            return Err(ServiceDeskError::not_found("category", category_id));
        }
        if let Some(priority_id) = priority_id {
            if self.store.find_priority(priority_id).await?.is_none() {
                return Err(ServiceDeskError::not_found("priority", priority_id));
            }
        }
        Ok(())
    }

    async fn resolve_location(&self, location: &NewLocation) -> Result<i64> {
        let location = self
            .store
            .get_or_create_location(&location.trimmed())
            .await?;
        info!(
            location_id = location.location_id,
            location = %location,
            "Resolved request location"
        );
        Ok(location.location_id)
    }
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

fn require_role(actor: &Actor, role: ActorRole, reason: &str) -> Result<()> {
    if actor.is(role) {
        Ok(())
    } else {
        Err(ServiceDeskError::permission_denied(reason))
    }
}

fn require_all_requests_access(actor: &Actor) -> Result<()> {
    if actor.role.sees_all_requests() {
        Ok(())
    } else {
        Err(ServiceDeskError::permission_denied(
            "only admins and managers see all requests",
        ))
    }
}

fn require_owner_editable(actor: &Actor, request: &ServiceRequest) -> Result<()> {
    if !actor.is(ActorRole::Staff) || !request.is_owned_by(actor.actor_id) {
        return Err(ServiceDeskError::permission_denied(
            "only the creator may change a request",
        ));
    }
    if !request.is_editable() {
        return Err(ServiceDeskError::permission_denied(
            "request can only be changed while New and unassigned",
        ));
    }
    Ok(())
}
