//! Canonical ordering for every list of service requests.
//!
//! Key, ascending:
//! 1. phase rank of the status
//! 2. priority resolution hours (requests without a priority after all others)
//! 3. creation time, most recent first
//! 4. request id, so the order is total

use chrono::NaiveDateTime;
use std::cmp::{Ordering, Reverse};

use crate::models::RequestListing;
use crate::state_machine::RequestStatus;

/// Rank used only for ordering. Statuses outside the main flow rank last.
pub fn phase_rank(status: RequestStatus) -> u8 {
    match status {
        RequestStatus::New => 1,
        RequestStatus::Assigned => 2,
        RequestStatus::Accepted => 3,
        RequestStatus::InProgress => 4,
        RequestStatus::Completed => 5,
        RequestStatus::Rejected => 6,
        RequestStatus::AwaitingConfirmation => 7,
    }
}

/// Composite sort key for a listed request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestSortKey {
    pub phase_rank: u8,
    pub resolution_hours: Option<i32>,
    pub created_at: NaiveDateTime,
    pub service_request_id: i64,
}

impl RequestSortKey {
    pub fn of(listing: &RequestListing) -> Self {
        Self {
            phase_rank: phase_rank(listing.request.status),
            resolution_hours: listing.priority_resolution_hours,
            created_at: listing.request.created_at,
            service_request_id: listing.request.service_request_id,
        }
    }

    // (false, hours) sorts before (true, 0): present priorities first
    fn priority_component(&self) -> (bool, i32) {
        match self.resolution_hours {
            Some(hours) => (false, hours),
            None => (true, 0),
        }
    }
}

impl Ord for RequestSortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        (
            self.phase_rank,
            self.priority_component(),
            Reverse(self.created_at),
            self.service_request_id,
        )
            .cmp(&(
                other.phase_rank,
                other.priority_component(),
                Reverse(other.created_at),
                other.service_request_id,
            ))
    }
}

impl PartialOrd for RequestSortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Sort listings in place into canonical order
pub fn sort_requests(listings: &mut [RequestListing]) {
    listings.sort_by_cached_key(RequestSortKey::of);
}
