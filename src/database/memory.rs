//! In-process store backed by a single `parking_lot::RwLock`.
//!
//! Mirrors the PostgreSQL schema's constraints (unique department names,
//! one profile per technician, foreign keys on request inserts) so service
//! code sees the same failures against either backend.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

use super::store::{DirectoryStore, RequestQuery, RequestStore};
use crate::constants::status_groups;
use crate::error::{Result, ServiceDeskError};
use crate::models::{
    Location, NewLocation, NewServiceRequest, NewTechnicianProfile, PriorityLevel,
    RequestListing, ServiceCategory, ServiceRequest, ServiceRequestUpdate, SupportDepartment,
    TechnicianProfile,
};
use crate::state_machine::{RequestPatch, RequestStatus, TransitionExpectation};

#[derive(Debug, Default)]
struct Tables {
    requests: BTreeMap<i64, ServiceRequest>,
    categories: BTreeMap<i64, ServiceCategory>,
    priorities: BTreeMap<i64, PriorityLevel>,
    departments: BTreeMap<i64, SupportDepartment>,
    locations: BTreeMap<i64, Location>,
    technicians: BTreeMap<i64, TechnicianProfile>,
    sequences: HashMap<&'static str, i64>,
}

impl Tables {
    fn next_id(&mut self, table: &'static str) -> i64 {
        let id = self.sequences.entry(table).or_insert(0);
        *id += 1;
        *id
    }

    fn check_request_references(
        &self,
        category_id: i64,
        priority_id: Option<i64>,
        location_id: i64,
    ) -> Result<()> {
        if !self.categories.contains_key(&category_id) {
            return Err(constraint("service_requests_category_id_fkey"));
        }
        if priority_id.is_some_and(|id| !self.priorities.contains_key(&id)) {
            return Err(constraint("service_requests_priority_id_fkey"));
        }
        if !self.locations.contains_key(&location_id) {
            return Err(constraint("service_requests_location_id_fkey"));
        }
        Ok(())
    }

    fn listing(&self, request: &ServiceRequest) -> RequestListing {
        RequestListing {
            request: request.clone(),
            priority_resolution_hours: request
                .priority_id
                .and_then(|id| self.priorities.get(&id))
                .map(|priority| priority.resolution_time_hours),
        }
    }
}

fn constraint(name: &str) -> ServiceDeskError {
    ServiceDeskError::ConstraintViolation {
        constraint: name.to_string(),
    }
}

fn is_owner_editable(request: &ServiceRequest, owner: i64) -> bool {
    request.is_owned_by(owner) && request.is_editable()
}

/// Thread-safe in-memory implementation of both store contracts
#[derive(Debug, Default)]
pub struct InMemoryServiceDeskStore {
    tables: RwLock<Tables>,
}

impl InMemoryServiceDeskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored requests
    pub fn request_count(&self) -> usize {
        self.tables.read().requests.len()
    }
}

#[async_trait]
impl RequestStore for InMemoryServiceDeskStore {
    async fn insert_request(
        &self,
        created_by: i64,
        new_request: &NewServiceRequest,
        location_id: i64,
        now: NaiveDateTime,
    ) -> Result<ServiceRequest> {
        let mut tables = self.tables.write();
        tables.check_request_references(
            new_request.category_id,
            new_request.priority_id,
            location_id,
        )?;

        let service_request_id = tables.next_id("service_requests");
        let request = ServiceRequest {
            service_request_id,
            title: new_request.title.trim().to_string(),
            description: new_request.description.clone(),
            location_id: Some(location_id),
            category_id: new_request.category_id,
            priority_id: new_request.priority_id,
            attachment: new_request.attachment.clone(),
            created_by,
            assigned_to: None,
            status: RequestStatus::New,
            rejection_reason: None,
            rejected_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };
        tables.requests.insert(service_request_id, request.clone());
        Ok(request)
    }

    async fn find_request(&self, service_request_id: i64) -> Result<Option<ServiceRequest>> {
        Ok(self.tables.read().requests.get(&service_request_id).cloned())
    }

    async fn update_request_details(
        &self,
        service_request_id: i64,
        owner: i64,
        update: &ServiceRequestUpdate,
        location_id: i64,
        now: NaiveDateTime,
    ) -> Result<Option<ServiceRequest>> {
        let mut tables = self.tables.write();
        let editable = tables
            .requests
            .get(&service_request_id)
            .is_some_and(|request| is_owner_editable(request, owner));
        if !editable {
            return Ok(None);
        }
        tables.check_request_references(update.category_id, update.priority_id, location_id)?;

        let Some(request) = tables.requests.get_mut(&service_request_id) else {
            return Ok(None);
        };
        request.title = update.title.trim().to_string();
        request.description = update.description.clone();
        request.category_id = update.category_id;
        request.priority_id = update.priority_id;
        request.location_id = Some(location_id);
        request.attachment = update.attachment.clone();
        request.updated_at = now;
        Ok(Some(request.clone()))
    }

    async fn delete_request(&self, service_request_id: i64, owner: i64) -> Result<bool> {
        let mut tables = self.tables.write();
        let deletable = tables
            .requests
            .get(&service_request_id)
            .is_some_and(|request| is_owner_editable(request, owner));
        if deletable {
            tables.requests.remove(&service_request_id);
        }
        Ok(deletable)
    }

    async fn apply_transition(
        &self,
        service_request_id: i64,
        expected: TransitionExpectation,
        patch: &RequestPatch,
        now: NaiveDateTime,
    ) -> Result<Option<ServiceRequest>> {
        let mut tables = self.tables.write();
        match tables.requests.get_mut(&service_request_id) {
            Some(request) if expected.matches(request) => {
                patch.apply_to(request, now);
                Ok(Some(request.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn list_requests(&self, query: &RequestQuery) -> Result<Vec<RequestListing>> {
        let tables = self.tables.read();
        Ok(tables
            .requests
            .values()
            .filter(|request| query.matches(request))
            .map(|request| tables.listing(request))
            .collect())
    }

    async fn active_request_counts(&self, user_ids: &[i64]) -> Result<HashMap<i64, i64>> {
        let tables = self.tables.read();
        let mut counts: HashMap<i64, i64> = user_ids.iter().map(|id| (*id, 0)).collect();
        for request in tables.requests.values() {
            if !status_groups::ACTIVE_WORKLOAD.contains(&request.status) {
                continue;
            }
            let Some(user_id) = request.assigned_to else {
                continue;
            };
            if let Some(count) = counts.get_mut(&user_id) {
                *count += 1;
            }
        }
        Ok(counts)
    }
}

#[async_trait]
impl DirectoryStore for InMemoryServiceDeskStore {
    async fn create_category(&self, name: &str) -> Result<ServiceCategory> {
        let mut tables = self.tables.write();
        let category = ServiceCategory {
            category_id: tables.next_id("service_categories"),
            name: name.to_string(),
        };
        tables.categories.insert(category.category_id, category.clone());
        Ok(category)
    }

    async fn find_category(&self, category_id: i64) -> Result<Option<ServiceCategory>> {
        Ok(self.tables.read().categories.get(&category_id).cloned())
    }

    async fn list_categories(&self) -> Result<Vec<ServiceCategory>> {
        Ok(self.tables.read().categories.values().cloned().collect())
    }

    async fn create_priority(
        &self,
        name: &str,
        color: &str,
        resolution_time_hours: i32,
    ) -> Result<PriorityLevel> {
        if resolution_time_hours < 0 {
            return Err(constraint("priority_levels_resolution_time_hours_check"));
        }
        let mut tables = self.tables.write();
        let priority = PriorityLevel {
            priority_id: tables.next_id("priority_levels"),
            name: name.to_string(),
            color: color.to_string(),
            resolution_time_hours,
        };
        tables.priorities.insert(priority.priority_id, priority.clone());
        Ok(priority)
    }

    async fn find_priority(&self, priority_id: i64) -> Result<Option<PriorityLevel>> {
        Ok(self.tables.read().priorities.get(&priority_id).cloned())
    }

    async fn list_priorities(&self) -> Result<Vec<PriorityLevel>> {
        Ok(self.tables.read().priorities.values().cloned().collect())
    }

    async fn create_department(&self, name: &str) -> Result<SupportDepartment> {
        let mut tables = self.tables.write();
        if tables.departments.values().any(|dept| dept.name == name) {
            return Err(constraint("support_departments_name_key"));
        }
        let department = SupportDepartment {
            department_id: tables.next_id("support_departments"),
            name: name.to_string(),
        };
        tables
            .departments
            .insert(department.department_id, department.clone());
        Ok(department)
    }

    async fn list_departments(&self) -> Result<Vec<SupportDepartment>> {
        let mut departments: Vec<_> = self.tables.read().departments.values().cloned().collect();
        departments.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(departments)
    }

    async fn get_or_create_location(&self, location: &NewLocation) -> Result<Location> {
        let mut tables = self.tables.write();
        if let Some(existing) = tables.locations.values().find(|loc| location.matches(loc)) {
            return Ok(existing.clone());
        }
        let created = Location {
            location_id: tables.next_id("locations"),
            block_building: location.block_building.clone(),
            floor: location.floor.clone(),
            room: location.room.clone(),
        };
        tables.locations.insert(created.location_id, created.clone());
        Ok(created)
    }

    async fn find_location(&self, location_id: i64) -> Result<Option<Location>> {
        Ok(self.tables.read().locations.get(&location_id).cloned())
    }

    async fn create_technician_profile(
        &self,
        profile: &NewTechnicianProfile,
    ) -> Result<TechnicianProfile> {
        let mut tables = self.tables.write();
        if tables
            .technicians
            .values()
            .any(|existing| existing.user_id == profile.user_id)
        {
            return Err(constraint("technician_profiles_user_id_key"));
        }
        if profile
            .expertise
            .iter()
            .any(|id| !tables.categories.contains_key(id))
        {
            return Err(constraint("technician_expertise_category_id_fkey"));
        }
        if profile
            .departments
            .iter()
            .any(|id| !tables.departments.contains_key(id))
        {
            return Err(constraint("technician_departments_department_id_fkey"));
        }

        let mut expertise = profile.expertise.clone();
        expertise.sort_unstable();
        expertise.dedup();
        let mut departments = profile.departments.clone();
        departments.sort_unstable();
        departments.dedup();

        let created = TechnicianProfile {
            technician_profile_id: tables.next_id("technician_profiles"),
            user_id: profile.user_id,
            expertise,
            departments,
        };
        tables
            .technicians
            .insert(created.technician_profile_id, created.clone());
        Ok(created)
    }

    async fn find_technician_by_user(&self, user_id: i64) -> Result<Option<TechnicianProfile>> {
        Ok(self
            .tables
            .read()
            .technicians
            .values()
            .find(|profile| profile.user_id == user_id)
            .cloned())
    }

    async fn list_technicians(&self) -> Result<Vec<TechnicianProfile>> {
        Ok(self.tables.read().technicians.values().cloned().collect())
    }

    async fn technicians_with_expertise(
        &self,
        category_id: i64,
    ) -> Result<Vec<TechnicianProfile>> {
        Ok(self
            .tables
            .read()
            .technicians
            .values()
            .filter(|profile| profile.has_expertise(category_id))
            .cloned()
            .collect())
    }
}
