//! Property-based tests for the ordering, ranking and lifecycle rules.

mod common;

use proptest::prelude::*;
use std::collections::HashSet;

use common::strategies::*;
use common::*;
use service_desk_core::models::{Actor, TechnicianProfile};
use service_desk_core::services::assignment_policy::rank;
use service_desk_core::services::{phase_rank, sort_requests, RequestSortKey};
use service_desk_core::state_machine::TransitionGuard;
use service_desk_core::{RequestEvent, RequestStatus, TechnicianCandidate};

fn actor_for(trigger: Trigger, assigned_to: Option<i64>) -> Actor {
    match trigger {
        Trigger::Admin => admin(),
        Trigger::AssignedTechnician => tech(assigned_to.unwrap_or(TECH_A)),
        Trigger::OtherTechnician => tech(TECH_C),
        Trigger::Creator => creator(),
        Trigger::OtherStaff => other_staff(),
    }
}

fn event_for(step: Step) -> RequestEvent {
    match step {
        Step::AssignA => RequestEvent::assign_to(TECH_A),
        Step::AssignB => RequestEvent::assign_to(TECH_B),
        Step::Accept => RequestEvent::Accept,
        Step::Reject => RequestEvent::reject_with_reason("outside our remit"),
        Step::RejectBlank => RequestEvent::reject_with_reason("   "),
        Step::Start => RequestEvent::Start,
        Step::MarkComplete => RequestEvent::MarkComplete,
        Step::ConfirmCompletion => RequestEvent::ConfirmCompletion,
    }
}

proptest! {
    #[test]
    fn test_sorting_is_a_total_order(mut listings in listings_strategy()) {
        let original_ids: HashSet<i64> = listings
            .iter()
            .map(|l| l.request.service_request_id)
            .collect();

        sort_requests(&mut listings);

        let sorted_ids: HashSet<i64> = listings
            .iter()
            .map(|l| l.request.service_request_id)
            .collect();
        prop_assert_eq!(original_ids, sorted_ids);

        for pair in listings.windows(2) {
            prop_assert!(RequestSortKey::of(&pair[0]) < RequestSortKey::of(&pair[1]));
        }
    }

    #[test]
    fn test_sorting_is_idempotent(mut listings in listings_strategy()) {
        sort_requests(&mut listings);
        let once = listings.clone();
        sort_requests(&mut listings);
        prop_assert_eq!(once, listings);
    }

    #[test]
    fn test_phase_dominates_everything_else(mut listings in listings_strategy()) {
        sort_requests(&mut listings);
        let ranks: Vec<u8> = listings.iter().map(|l| phase_rank(l.request.status)).collect();
        prop_assert!(ranks.windows(2).all(|pair| pair[0] <= pair[1]));

        let first_new = listings
            .iter()
            .position(|l| l.request.status == RequestStatus::New);
        if let Some(first_new) = first_new {
            prop_assert!(listings[..first_new]
                .iter()
                .all(|l| l.request.status == RequestStatus::New));
        }
    }

    #[test]
    fn test_ranking_orders_by_workload_then_user(workloads in workloads_strategy()) {
        let candidates: Vec<TechnicianCandidate> = workloads
            .iter()
            .map(|(user_id, count)| TechnicianCandidate {
                profile: TechnicianProfile {
                    technician_profile_id: *user_id,
                    user_id: *user_id,
                    expertise: vec![1],
                    departments: vec![],
                },
                active_request_count: *count,
            })
            .collect();

        let ranked = rank(candidates);
        prop_assert_eq!(ranked.len(), workloads.len());
        for pair in ranked.windows(2) {
            let left = (pair[0].active_request_count, pair[0].user_id());
            let right = (pair[1].active_request_count, pair[1].user_id());
            prop_assert!(left < right);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Any event sequence keeps the row consistent: a transition succeeds
    /// exactly when the guard allows it, and a refused one changes nothing.
    #[test]
    fn test_random_event_sequences_preserve_invariants(sequence in event_sequence_strategy()) {
        tokio_test::block_on(async {
            let fixture = DeskFixture::new().await;
            let machine = fixture.desk.state_machine();
            let id = fixture.submit("Generated").await.service_request_id;

            for (trigger, step) in sequence {
                let before = fixture.reload(id).await;
                let actor = actor_for(trigger, before.assigned_to);
                let event = event_for(step);
                let allowed = TransitionGuard::check(&actor, &before, &event).is_ok();

                let result = machine.transition(&actor, id, event).await;
                let after = fixture.reload(id).await;

                prop_assert_eq!(result.is_ok(), allowed);
                prop_assert!(after.check_invariants().is_ok());

                match result {
                    Ok(updated) => {
                        prop_assert_eq!(&updated, &after);
                        prop_assert!(!before.status.is_terminal());
                        prop_assert_eq!(after.created_by, before.created_by);
                    }
                    Err(_) => {
                        prop_assert_eq!(&after, &before);
                    }
                }

                if after.status == RequestStatus::AwaitingConfirmation
                    || after.status == RequestStatus::Completed
                {
                    prop_assert!(after.completed_at.is_some());
                }
            }
            Ok(())
        })?;
    }
}
