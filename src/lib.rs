#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Service Desk Core
//!
//! Lifecycle, assignment and ordering core for a facilities/IT
//! service-request tracker.
//!
//! ## Overview
//!
//! Staff submit requests, admins assign them to technicians, technicians
//! accept or reject, work them and mark them complete, and the creator
//! confirms. The crate owns the rules of that flow; identity, rendering,
//! uploads and notifications belong to the surrounding application.
//!
//! ## Module Organization
//!
//! - [`state_machine`] - request lifecycle: states, events, guards, effects
//! - [`services`] - assignment and ordering policies, request and report services
//! - [`models`] - request, technician profile and reference data rows
//! - [`database`] - store contracts with PostgreSQL and in-memory implementations
//! - [`events`] - fire-and-forget lifecycle event publisher
//! - [`pagination`] - page arithmetic for list views
//! - [`bootstrap`] - [`ServiceDesk`] wiring from configuration
//! - [`config`] - layered configuration loading
//! - [`logging`] - structured `tracing` setup
//! - [`error`] - structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use service_desk_core::config::ServiceDeskConfig;
//! use service_desk_core::models::{Actor, NewLocation, NewServiceRequest};
//! use service_desk_core::ServiceDesk;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let desk = ServiceDesk::in_memory(ServiceDeskConfig::default())?;
//! let category = desk.store().create_category("Plumbing").await?;
//!
//! let request = desk
//!     .requests()
//!     .submit(
//!         &Actor::staff(10),
//!         NewServiceRequest::new(
//!             "Leaking tap",
//!             "Kitchen tap drips",
//!             category.category_id,
//!             NewLocation::new("Block A", "2", "201"),
//!         ),
//!     )
//!     .await?;
//!
//! let candidates = desk
//!     .assignment_policy()
//!     .candidates_for_request(request.service_request_id)
//!     .await?;
//! println!("{} technicians can take this request", candidates.len());
//! # Ok(())
//! # }
//! ```

pub mod bootstrap;
pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod pagination;
pub mod services;
pub mod state_machine;

pub use bootstrap::ServiceDesk;
pub use config::{ConfigManager, ServiceDeskConfig};
pub use database::{
    InMemoryServiceDeskStore, PgServiceDeskStore, RequestQuery, ServiceDeskStore,
};
pub use error::{Result, ServiceDeskError};
pub use events::{EventPublisher, PublishedEvent};
pub use models::{Actor, ActorRole, ServiceRequest, TechnicianProfile};
pub use pagination::{Page, Pagination};
pub use services::{
    AssignmentPolicy, ReportFilter, ReportPeriod, ServiceRequestService, TechnicianCandidate,
};
pub use state_machine::{RequestEvent, RequestStateMachine, RequestStatus};
