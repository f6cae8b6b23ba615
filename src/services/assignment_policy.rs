use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::database::ServiceDeskStore;
use crate::error::{Result, ServiceDeskError};
use crate::logging::log_assignment_operation;
use crate::models::TechnicianProfile;

/// A technician eligible for a request, with their live workload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechnicianCandidate {
    pub profile: TechnicianProfile,
    /// Requests currently Assigned or In Progress for this technician
    pub active_request_count: i64,
}

impl TechnicianCandidate {
    pub fn user_id(&self) -> i64 {
        self.profile.user_id
    }
}

/// Ranks technicians for the admin's assignment decision.
///
/// The policy never assigns on its own; it only orders the candidates.
#[derive(Clone)]
pub struct AssignmentPolicy {
    store: Arc<dyn ServiceDeskStore>,
}

impl AssignmentPolicy {
    pub fn new(store: Arc<dyn ServiceDeskStore>) -> Self {
        Self { store }
    }

    /// Technicians with expertise in `category_id`, least loaded first.
    /// Equal workloads are ordered by user id.
    pub async fn rank_candidates(&self, category_id: i64) -> Result<Vec<TechnicianCandidate>> {
        if self.store.find_category(category_id).await?.is_none() {
            return Err(ServiceDeskError::not_found("category", category_id));
        }

        let profiles = self.store.technicians_with_expertise(category_id).await?;
        let candidates = self.with_workloads(profiles).await?;

        log_assignment_operation(
            "rank_candidates",
            None,
            Some(category_id),
            candidates.len(),
            candidates.first().map(TechnicianCandidate::user_id),
        );

        Ok(candidates)
    }

    /// Candidates for an existing request's category.
    ///
    /// Fails with `AlreadyAssigned` once the request has an assignee.
    pub async fn candidates_for_request(
        &self,
        service_request_id: i64,
    ) -> Result<Vec<TechnicianCandidate>> {
        let request = self
            .store
            .find_request(service_request_id)
            .await?
            .ok_or_else(|| ServiceDeskError::not_found("service request", service_request_id))?;

        if request.is_assigned() {
            return Err(ServiceDeskError::AlreadyAssigned {
                request_id: service_request_id,
            });
        }

        let candidates = self.rank_candidates(request.category_id).await?;
        debug!(
            service_request_id = service_request_id,
            candidate_count = candidates.len(),
            "Ranked assignment candidates for request"
        );
        Ok(candidates)
    }

    /// Every technician with their active workload, ranked the same way
    pub async fn technician_workloads(&self) -> Result<Vec<TechnicianCandidate>> {
        let profiles = self.store.list_technicians().await?;
        self.with_workloads(profiles).await
    }

    async fn with_workloads(
        &self,
        profiles: Vec<TechnicianProfile>,
    ) -> Result<Vec<TechnicianCandidate>> {
        let user_ids: Vec<i64> = profiles.iter().map(|p| p.user_id).collect();
        let counts = self.store.active_request_counts(&user_ids).await?;

        let candidates = profiles
            .into_iter()
            .map(|profile| TechnicianCandidate {
                active_request_count: counts.get(&profile.user_id).copied().unwrap_or(0),
                profile,
            })
            .collect();

        Ok(rank(candidates))
    }
}

/// Order candidates by `(active_request_count, user_id)` ascending
pub fn rank(mut candidates: Vec<TechnicianCandidate>) -> Vec<TechnicianCandidate> {
    candidates.sort_by_key(|c| (c.active_request_count, c.profile.user_id));
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(user_id: i64, active_request_count: i64) -> TechnicianCandidate {
        TechnicianCandidate {
            profile: TechnicianProfile {
                technician_profile_id: user_id,
                user_id,
                expertise: vec![1],
                departments: vec![],
            },
            active_request_count,
        }
    }

    #[test]
    fn test_rank_by_workload_then_user_id() {
        let ranked = rank(vec![
            candidate(30, 2),
            candidate(21, 0),
            candidate(20, 0),
            candidate(5, 3),
        ]);
        let order: Vec<_> = ranked.iter().map(TechnicianCandidate::user_id).collect();
        assert_eq!(order, vec![20, 21, 30, 5]);
    }

    #[test]
    fn test_rank_empty() {
        assert!(rank(Vec::new()).is_empty());
    }
}
