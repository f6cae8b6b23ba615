use chrono::{Duration, NaiveDate, NaiveDateTime};
use proptest::prelude::*;

use service_desk_core::models::{RequestListing, ServiceRequest};
use service_desk_core::RequestStatus;

/// Any lifecycle status
pub fn status_strategy() -> impl Strategy<Value = RequestStatus> {
    prop::sample::select(RequestStatus::ALL.to_vec())
}

/// Resolution hours of the request's priority, absent when it has none
pub fn resolution_hours_strategy() -> impl Strategy<Value = Option<i32>> {
    prop::option::of(prop::sample::select(vec![1, 4, 24, 72]))
}

/// Creation times on a coarse grid so ties actually happen
pub fn created_at_strategy() -> impl Strategy<Value = NaiveDateTime> {
    (0i64..12).prop_map(|hours| epoch() + Duration::hours(hours))
}

fn epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 1)
        .and_then(|date| date.and_hms_opt(8, 0, 0))
        .expect("valid epoch")
}

/// Lists of listings with unique ids
pub fn listings_strategy() -> impl Strategy<Value = Vec<RequestListing>> {
    prop::collection::vec(
        (
            status_strategy(),
            resolution_hours_strategy(),
            created_at_strategy(),
        ),
        0..30,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(index, (status, hours, created_at))| {
                listing(index as i64 + 1, status, hours, created_at)
            })
            .collect()
    })
}

pub fn listing(
    service_request_id: i64,
    status: RequestStatus,
    priority_resolution_hours: Option<i32>,
    created_at: NaiveDateTime,
) -> RequestListing {
    let assigned_to = (status != RequestStatus::New).then_some(20);
    let rejection_reason =
        (status == RequestStatus::Rejected).then(|| "not our department".to_string());

    RequestListing {
        request: ServiceRequest {
            service_request_id,
            title: format!("Request {service_request_id}"),
            description: "generated".to_string(),
            location_id: None,
            category_id: 1,
            priority_id: priority_resolution_hours.map(i64::from),
            attachment: None,
            created_by: 10,
            assigned_to,
            status,
            rejection_reason,
            rejected_at: None,
            completed_at: None,
            created_at,
            updated_at: created_at,
        },
        priority_resolution_hours,
    }
}

/// Who triggers a lifecycle event in a generated sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Admin,
    AssignedTechnician,
    OtherTechnician,
    Creator,
    OtherStaff,
}

/// A lifecycle event without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    AssignA,
    AssignB,
    Accept,
    Reject,
    RejectBlank,
    Start,
    MarkComplete,
    ConfirmCompletion,
}

pub fn trigger_strategy() -> impl Strategy<Value = Trigger> {
    prop_oneof![
        Just(Trigger::Admin),
        Just(Trigger::AssignedTechnician),
        Just(Trigger::OtherTechnician),
        Just(Trigger::Creator),
        Just(Trigger::OtherStaff),
    ]
}

pub fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        Just(Step::AssignA),
        Just(Step::AssignB),
        Just(Step::Accept),
        Just(Step::Reject),
        Just(Step::RejectBlank),
        Just(Step::Start),
        Just(Step::MarkComplete),
        Just(Step::ConfirmCompletion),
    ]
}

/// Random sequences of (who, what)
pub fn event_sequence_strategy() -> impl Strategy<Value = Vec<(Trigger, Step)>> {
    prop::collection::vec((trigger_strategy(), step_strategy()), 1..20)
}

/// Workload counts keyed by user id, ids unique
pub fn workloads_strategy() -> impl Strategy<Value = Vec<(i64, i64)>> {
    prop::collection::btree_map(1i64..500, 0i64..6, 0..20)
        .prop_map(|map| map.into_iter().collect())
}
