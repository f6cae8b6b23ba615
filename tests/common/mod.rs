//! Shared fixtures for integration tests.
//!
//! Every fixture runs against the in-memory store, so the suite needs no
//! database.

#![allow(dead_code)]

pub mod strategies;

use chrono::{Duration, NaiveDateTime, Utc};
use std::sync::Arc;

use service_desk_core::config::ServiceDeskConfig;
use service_desk_core::database::{DirectoryStore, RequestStore};
use service_desk_core::models::{
    Actor, NewLocation, NewServiceRequest, NewTechnicianProfile, ServiceRequest,
};
use service_desk_core::{InMemoryServiceDeskStore, ServiceDesk, ServiceDeskStore};

pub const ADMIN: i64 = 1;
pub const MANAGER: i64 = 2;
pub const CREATOR: i64 = 10;
pub const OTHER_STAFF: i64 = 11;
pub const TECH_A: i64 = 20;
pub const TECH_B: i64 = 21;
pub const TECH_C: i64 = 22;

/// Location used when a test does not care where the work is
pub fn office() -> NewLocation {
    NewLocation::new("Main Building", "2", "210")
}

pub fn admin() -> Actor {
    Actor::admin(ADMIN)
}

pub fn manager() -> Actor {
    Actor::manager(MANAGER)
}

pub fn creator() -> Actor {
    Actor::staff(CREATOR)
}

pub fn other_staff() -> Actor {
    Actor::staff(OTHER_STAFF)
}

pub fn tech(user_id: i64) -> Actor {
    Actor::technician(user_id)
}

/// A desk seeded with two categories, two priorities and three technicians.
///
/// `TECH_A` and `TECH_B` know plumbing, `TECH_C` knows electrical only.
pub struct DeskFixture {
    pub desk: ServiceDesk,
    pub store: Arc<InMemoryServiceDeskStore>,
    pub plumbing: i64,
    pub electrical: i64,
    pub urgent: i64,
    pub low: i64,
}

impl DeskFixture {
    pub async fn new() -> Self {
        Self::with_config(ServiceDeskConfig::default()).await
    }

    pub async fn with_config(config: ServiceDeskConfig) -> Self {
        let store = Arc::new(InMemoryServiceDeskStore::new());
        let desk = ServiceDesk::with_store(config, store.clone() as Arc<dyn ServiceDeskStore>)
            .expect("default configuration is valid");

        let plumbing = store
            .create_category("Plumbing")
            .await
            .expect("create plumbing category")
            .category_id;
        let electrical = store
            .create_category("Electrical")
            .await
            .expect("create electrical category")
            .category_id;
        let urgent = store
            .create_priority("Urgent", "#d9534f", 4)
            .await
            .expect("create urgent priority")
            .priority_id;
        let low = store
            .create_priority("Low", "#5cb85c", 72)
            .await
            .expect("create low priority")
            .priority_id;

        for (user_id, expertise) in [
            (TECH_A, vec![plumbing]),
            (TECH_B, vec![plumbing, electrical]),
            (TECH_C, vec![electrical]),
        ] {
            store
                .create_technician_profile(&NewTechnicianProfile::new(user_id, expertise))
                .await
                .expect("create technician profile");
        }

        Self {
            desk,
            store,
            plumbing,
            electrical,
            urgent,
            low,
        }
    }

    /// Submit through the service as `CREATOR`
    pub async fn submit(&self, title: &str) -> ServiceRequest {
        let new_request = NewServiceRequest::new(title, "details", self.plumbing, office());
        self.submit_as(&creator(), new_request).await
    }

    pub async fn submit_as(&self, actor: &Actor, new_request: NewServiceRequest) -> ServiceRequest {
        self.desk
            .requests()
            .submit(actor, new_request)
            .await
            .expect("submit request")
    }

    /// Insert straight into the store with an explicit creation time
    pub async fn insert_at(
        &self,
        new_request: NewServiceRequest,
        created_at: NaiveDateTime,
    ) -> ServiceRequest {
        let location = self
            .store
            .get_or_create_location(&new_request.location)
            .await
            .expect("create location");
        self.store
            .insert_request(CREATOR, &new_request, location.location_id, created_at)
            .await
            .expect("insert request")
    }

    /// A request already assigned to `technician_id`
    pub async fn assigned(&self, title: &str, technician_id: i64) -> ServiceRequest {
        let request = self.submit(title).await;
        self.desk
            .requests()
            .assign(&admin(), request.service_request_id, technician_id)
            .await
            .expect("assign request")
    }

    /// A request walked to In Progress by `technician_id`
    pub async fn in_progress(&self, title: &str, technician_id: i64) -> ServiceRequest {
        let request = self.assigned(title, technician_id).await;
        let requests = self.desk.requests();
        requests
            .accept(&tech(technician_id), request.service_request_id)
            .await
            .expect("accept request");
        requests
            .start(&tech(technician_id), request.service_request_id)
            .await
            .expect("start request")
    }

    pub async fn reload(&self, service_request_id: i64) -> ServiceRequest {
        self.store
            .find_request(service_request_id)
            .await
            .expect("find request")
            .expect("request exists")
    }
}

/// Start of a window one day in the past; tests offset from it explicitly
pub fn base_time() -> NaiveDateTime {
    Utc::now().naive_utc() - Duration::days(1)
}
