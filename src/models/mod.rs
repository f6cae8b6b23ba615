//! # Service Desk Models
//!
//! Row types for service requests, technician profiles and the reference
//! data they point at, plus the caller-supplied [`Actor`].

pub mod actor;
pub mod reference;
pub mod service_request;
pub mod technician_profile;

pub use actor::{Actor, ActorRole};
pub use reference::{Location, NewLocation, PriorityLevel, ServiceCategory, SupportDepartment};
pub use service_request::{
    NewServiceRequest, RequestListing, ServiceRequest, ServiceRequestUpdate,
};
pub use technician_profile::{NewTechnicianProfile, TechnicianProfile};
