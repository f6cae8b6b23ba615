//! # Service Desk Constants
//!
//! Status groupings, lifecycle event names and defaults shared by the
//! lifecycle engine, the policies and the stores.

pub use crate::state_machine::RequestStatus;

/// Lifecycle events published after a successful transition
pub mod events {
    pub const REQUEST_SUBMITTED: &str = "request.submitted";
    pub const REQUEST_ASSIGNED: &str = "request.assigned";
    pub const REQUEST_ACCEPTED: &str = "request.accepted";
    pub const REQUEST_REJECTED: &str = "request.rejected";
    pub const REQUEST_STARTED: &str = "request.started";
    pub const REQUEST_AWAITING_CONFIRMATION: &str = "request.awaiting_confirmation";
    pub const REQUEST_COMPLETED: &str = "request.completed";
}

/// Status groups used by list views and workload counting
pub mod status_groups {
    use super::RequestStatus;

    /// Statuses that count toward a technician's active workload. Accepted is not counted.
    pub const ACTIVE_WORKLOAD: &[RequestStatus] =
        &[RequestStatus::Assigned, RequestStatus::InProgress];

    /// Statuses shown on a technician's "assigned to me" list
    pub const TECHNICIAN_OPEN: &[RequestStatus] = &[
        RequestStatus::Assigned,
        RequestStatus::Accepted,
        RequestStatus::InProgress,
    ];

    /// Statuses after which no transition is possible
    pub const TERMINAL: &[RequestStatus] = &[RequestStatus::Completed, RequestStatus::Rejected];
}

/// System-wide defaults
pub mod system {
    /// Rows per page on every request list
    pub const DEFAULT_PAGE_SIZE: u32 = 5;

    /// Number of recent requests shown on dashboards
    pub const DASHBOARD_RECENT_LIMIT: usize = 5;

    /// Broadcast capacity for lifecycle events
    pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1000;

    pub const MAX_TITLE_LENGTH: usize = 200;

    /// Column widths of the `locations` triple
    pub const MAX_BLOCK_BUILDING_LENGTH: usize = 100;
    pub const MAX_FLOOR_LENGTH: usize = 50;
    pub const MAX_ROOM_LENGTH: usize = 50;

    /// Environment variables consulted, in order, to pick the configuration environment
    pub const ENVIRONMENT_VARIABLES: &[&str] = &["SERVICE_DESK_ENV", "APP_ENV"];

    pub const DEFAULT_ENVIRONMENT: &str = "development";

    /// Prefix for `SERVICE_DESK__SECTION__KEY` overrides
    pub const CONFIG_ENV_PREFIX: &str = "SERVICE_DESK";
    pub const CONFIG_ENV_SEPARATOR: &str = "__";
}
