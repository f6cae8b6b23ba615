pub mod assignment_policy;
pub mod ordering_policy;
pub mod report_service;
pub mod request_service;

pub use assignment_policy::{AssignmentPolicy, TechnicianCandidate};
pub use ordering_policy::{phase_rank, sort_requests, RequestSortKey};
pub use report_service::{ReportFilter, ReportPeriod, ReportRow, ReportService};
pub use request_service::{
    AdminRequestFilter, CategoryCount, Dashboard, ServiceRequestService, StatusCount,
    TechnicianView,
};
