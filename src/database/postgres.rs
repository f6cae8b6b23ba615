//! PostgreSQL implementation of the store contracts.
//!
//! Queries are checked at runtime (`query_as::<_, T>`) so the crate builds
//! without a live database. Lifecycle writes are conditional `UPDATE`s: the
//! row is only changed while it still holds the status and assignee the
//! transition was validated against.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;

use super::store::{DirectoryStore, RequestQuery, RequestStore};
use crate::constants::status_groups;
use crate::error::{Result, ServiceDeskError};
use crate::models::{
    Location, NewLocation, NewServiceRequest, NewTechnicianProfile, PriorityLevel,
    RequestListing, ServiceCategory, ServiceRequest, ServiceRequestUpdate, SupportDepartment,
    TechnicianProfile,
};
use crate::services::ordering_policy::phase_rank;
use crate::state_machine::{RequestPatch, RequestStatus, TransitionExpectation};

const REQUEST_COLUMNS: &str = "service_request_id, title, description, location_id, \
     category_id, priority_id, attachment, created_by, assigned_to, status, \
     rejection_reason, rejected_at, completed_at, created_at, updated_at";

const LISTING_SELECT: &str = "SELECT sr.service_request_id, sr.title, sr.description, \
     sr.location_id, sr.category_id, sr.priority_id, sr.attachment, sr.created_by, \
     sr.assigned_to, sr.status, sr.rejection_reason, sr.rejected_at, sr.completed_at, \
     sr.created_at, sr.updated_at, pl.resolution_time_hours AS priority_resolution_hours \
     FROM service_requests sr \
     LEFT JOIN priority_levels pl ON pl.priority_id = sr.priority_id \
     WHERE TRUE";

const TECHNICIAN_SELECT: &str = "SELECT tp.technician_profile_id, tp.user_id, \
     ARRAY(SELECT te.category_id FROM technician_expertise te \
           WHERE te.technician_profile_id = tp.technician_profile_id \
           ORDER BY te.category_id) AS expertise, \
     ARRAY(SELECT td.department_id FROM technician_departments td \
           WHERE td.technician_profile_id = tp.technician_profile_id \
           ORDER BY td.department_id) AS departments \
     FROM technician_profiles tp";

/// `CASE` expression ranking `sr.status` the same way the ordering policy does
fn phase_rank_sql() -> String {
    let arms: String = RequestStatus::ALL
        .iter()
        .map(|status| format!(" WHEN '{}' THEN {}", status.as_str(), phase_rank(*status)))
        .collect();
    format!("CASE sr.status{arms} ELSE 7 END")
}

fn status_labels(statuses: &[RequestStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.as_str().to_string()).collect()
}

fn normalized(ids: &[i64]) -> Vec<i64> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Store backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgServiceDeskStore {
    pool: PgPool,
}

impl PgServiceDeskStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl RequestStore for PgServiceDeskStore {
    async fn insert_request(
        &self,
        created_by: i64,
        new_request: &NewServiceRequest,
        location_id: i64,
        now: NaiveDateTime,
    ) -> Result<ServiceRequest> {
        let request = sqlx::query_as::<_, ServiceRequest>(&format!(
            "INSERT INTO service_requests \
             (title, description, location_id, category_id, priority_id, attachment, \
              created_by, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9) \
             RETURNING {REQUEST_COLUMNS}"
        ))
        .bind(new_request.title.trim())
        .bind(&new_request.description)
        .bind(location_id)
        .bind(new_request.category_id)
        .bind(new_request.priority_id)
        .bind(&new_request.attachment)
        .bind(created_by)
        .bind(RequestStatus::New.as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(request)
    }

    async fn find_request(&self, service_request_id: i64) -> Result<Option<ServiceRequest>> {
        let request = sqlx::query_as::<_, ServiceRequest>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM service_requests WHERE service_request_id = $1"
        ))
        .bind(service_request_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(request)
    }

    async fn update_request_details(
        &self,
        service_request_id: i64,
        owner: i64,
        update: &ServiceRequestUpdate,
        location_id: i64,
        now: NaiveDateTime,
    ) -> Result<Option<ServiceRequest>> {
        let request = sqlx::query_as::<_, ServiceRequest>(&format!(
            "UPDATE service_requests \
             SET title = $1, description = $2, category_id = $3, priority_id = $4, \
                 location_id = $5, attachment = $6, updated_at = $7 \
             WHERE service_request_id = $8 AND created_by = $9 \
               AND status = $10 AND assigned_to IS NULL \
             RETURNING {REQUEST_COLUMNS}"
        ))
        .bind(update.title.trim())
        .bind(&update.description)
        .bind(update.category_id)
        .bind(update.priority_id)
        .bind(location_id)
        .bind(&update.attachment)
        .bind(now)
        .bind(service_request_id)
        .bind(owner)
        .bind(RequestStatus::New.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(request)
    }

    async fn delete_request(&self, service_request_id: i64, owner: i64) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM service_requests \
             WHERE service_request_id = $1 AND created_by = $2 \
               AND status = $3 AND assigned_to IS NULL",
        )
        .bind(service_request_id)
        .bind(owner)
        .bind(RequestStatus::New.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn apply_transition(
        &self,
        service_request_id: i64,
        expected: TransitionExpectation,
        patch: &RequestPatch,
        now: NaiveDateTime,
    ) -> Result<Option<ServiceRequest>> {
        let request = sqlx::query_as::<_, ServiceRequest>(&format!(
            "UPDATE service_requests \
             SET status = $1, assigned_to = $2, rejection_reason = $3, \
                 rejected_at = $4, completed_at = $5, updated_at = $6 \
             WHERE service_request_id = $7 \
               AND status = $8 AND assigned_to IS NOT DISTINCT FROM $9 \
             RETURNING {REQUEST_COLUMNS}"
        ))
        .bind(patch.status.as_str())
        .bind(patch.assigned_to)
        .bind(&patch.rejection_reason)
        .bind(patch.rejected_at)
        .bind(patch.completed_at)
        .bind(now)
        .bind(service_request_id)
        .bind(expected.status.as_str())
        .bind(expected.assigned_to)
        .fetch_optional(&self.pool)
        .await?;

        Ok(request)
    }

    async fn list_requests(&self, query: &RequestQuery) -> Result<Vec<RequestListing>> {
        let mut builder = QueryBuilder::<Postgres>::new(LISTING_SELECT);

        if let Some(created_by) = query.created_by {
            builder.push(" AND sr.created_by = ").push_bind(created_by);
        }
        if let Some(assigned_to) = query.assigned_to {
            builder.push(" AND sr.assigned_to = ").push_bind(assigned_to);
        }
        if !query.statuses.is_empty() {
            builder
                .push(" AND sr.status = ANY(")
                .push_bind(status_labels(&query.statuses))
                .push(")");
        }
        if let Some(priority_id) = query.priority_id {
            builder.push(" AND sr.priority_id = ").push_bind(priority_id);
        }
        if let Some(category_id) = query.category_id {
            builder.push(" AND sr.category_id = ").push_bind(category_id);
        }
        if let Some(from) = query.created_from {
            builder.push(" AND sr.created_at >= ").push_bind(from);
        }
        if let Some(until) = query.created_until {
            builder.push(" AND sr.created_at < ").push_bind(until);
        }

        builder.push(format!(
            " ORDER BY {}, pl.resolution_time_hours ASC NULLS LAST, \
             sr.created_at DESC, sr.service_request_id ASC",
            phase_rank_sql()
        ));

        let listings = builder
            .build_query_as::<RequestListing>()
            .fetch_all(&self.pool)
            .await?;

        Ok(listings)
    }

    async fn active_request_counts(&self, user_ids: &[i64]) -> Result<HashMap<i64, i64>> {
        let mut counts: HashMap<i64, i64> = user_ids.iter().map(|id| (*id, 0)).collect();
        if user_ids.is_empty() {
            return Ok(counts);
        }

        let rows = sqlx::query_as::<_, (i64, i64)>(
            "SELECT assigned_to, COUNT(*) FROM service_requests \
             WHERE assigned_to = ANY($1) AND status = ANY($2) \
             GROUP BY assigned_to",
        )
        .bind(user_ids)
        .bind(status_labels(status_groups::ACTIVE_WORKLOAD))
        .fetch_all(&self.pool)
        .await?;

        counts.extend(rows);
        Ok(counts)
    }
}

#[async_trait]
impl DirectoryStore for PgServiceDeskStore {
    async fn create_category(&self, name: &str) -> Result<ServiceCategory> {
        let category = sqlx::query_as::<_, ServiceCategory>(
            "INSERT INTO service_categories (name) VALUES ($1) RETURNING category_id, name",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(category)
    }

    async fn find_category(&self, category_id: i64) -> Result<Option<ServiceCategory>> {
        let category = sqlx::query_as::<_, ServiceCategory>(
            "SELECT category_id, name FROM service_categories WHERE category_id = $1",
        )
        .bind(category_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    async fn list_categories(&self) -> Result<Vec<ServiceCategory>> {
        let categories = sqlx::query_as::<_, ServiceCategory>(
            "SELECT category_id, name FROM service_categories ORDER BY category_id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    async fn create_priority(
        &self,
        name: &str,
        color: &str,
        resolution_time_hours: i32,
    ) -> Result<PriorityLevel> {
        let priority = sqlx::query_as::<_, PriorityLevel>(
            "INSERT INTO priority_levels (name, color, resolution_time_hours) \
             VALUES ($1, $2, $3) \
             RETURNING priority_id, name, color, resolution_time_hours",
        )
        .bind(name)
        .bind(color)
        .bind(resolution_time_hours)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| match &err {
            sqlx::Error::Database(db_err) if db_err.constraint().is_some() => {
                ServiceDeskError::ConstraintViolation {
                    constraint: db_err.constraint().unwrap_or_default().to_string(),
                }
            }
            _ => err.into(),
        })?;

        Ok(priority)
    }

    async fn find_priority(&self, priority_id: i64) -> Result<Option<PriorityLevel>> {
        let priority = sqlx::query_as::<_, PriorityLevel>(
            "SELECT priority_id, name, color, resolution_time_hours \
             FROM priority_levels WHERE priority_id = $1",
        )
        .bind(priority_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(priority)
    }

    async fn list_priorities(&self) -> Result<Vec<PriorityLevel>> {
        let priorities = sqlx::query_as::<_, PriorityLevel>(
            "SELECT priority_id, name, color, resolution_time_hours \
             FROM priority_levels ORDER BY priority_id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(priorities)
    }

    async fn create_department(&self, name: &str) -> Result<SupportDepartment> {
        let department = sqlx::query_as::<_, SupportDepartment>(
            "INSERT INTO support_departments (name) VALUES ($1) RETURNING department_id, name",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(department)
    }

    async fn list_departments(&self) -> Result<Vec<SupportDepartment>> {
        let departments = sqlx::query_as::<_, SupportDepartment>(
            "SELECT department_id, name FROM support_departments ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(departments)
    }

    async fn get_or_create_location(&self, location: &NewLocation) -> Result<Location> {
        // The no-op update makes RETURNING yield the existing row on conflict
        let location = sqlx::query_as::<_, Location>(
            "INSERT INTO locations (block_building, floor, room) VALUES ($1, $2, $3) \
             ON CONFLICT (block_building, floor, room) DO UPDATE SET room = EXCLUDED.room \
             RETURNING location_id, block_building, floor, room",
        )
        .bind(&location.block_building)
        .bind(&location.floor)
        .bind(&location.room)
        .fetch_one(&self.pool)
        .await?;

        Ok(location)
    }

    async fn find_location(&self, location_id: i64) -> Result<Option<Location>> {
        let location = sqlx::query_as::<_, Location>(
            "SELECT location_id, block_building, floor, room FROM locations WHERE location_id = $1",
        )
        .bind(location_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(location)
    }

    async fn create_technician_profile(
        &self,
        profile: &NewTechnicianProfile,
    ) -> Result<TechnicianProfile> {
        let expertise = normalized(&profile.expertise);
        let departments = normalized(&profile.departments);

        let mut tx = self.pool.begin().await?;

        let technician_profile_id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO technician_profiles (user_id) VALUES ($1) RETURNING technician_profile_id",
        )
        .bind(profile.user_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO technician_expertise (technician_profile_id, category_id) \
             SELECT $1, UNNEST($2::BIGINT[])",
        )
        .bind(technician_profile_id)
        .bind(&expertise)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO technician_departments (technician_profile_id, department_id) \
             SELECT $1, UNNEST($2::BIGINT[])",
        )
        .bind(technician_profile_id)
        .bind(&departments)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(TechnicianProfile {
            technician_profile_id,
            user_id: profile.user_id,
            expertise,
            departments,
        })
    }

    async fn find_technician_by_user(&self, user_id: i64) -> Result<Option<TechnicianProfile>> {
        let profile = sqlx::query_as::<_, TechnicianProfile>(&format!(
            "{TECHNICIAN_SELECT} WHERE tp.user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn list_technicians(&self) -> Result<Vec<TechnicianProfile>> {
        let profiles = sqlx::query_as::<_, TechnicianProfile>(&format!(
            "{TECHNICIAN_SELECT} ORDER BY tp.technician_profile_id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(profiles)
    }

    async fn technicians_with_expertise(
        &self,
        category_id: i64,
    ) -> Result<Vec<TechnicianProfile>> {
        let profiles = sqlx::query_as::<_, TechnicianProfile>(&format!(
            "{TECHNICIAN_SELECT} \
             WHERE EXISTS (SELECT 1 FROM technician_expertise te \
                           WHERE te.technician_profile_id = tp.technician_profile_id \
                             AND te.category_id = $1) \
             ORDER BY tp.technician_profile_id"
        ))
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(profiles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_rank_sql_covers_every_status() {
        let sql = phase_rank_sql();
        for status in RequestStatus::ALL {
            assert!(sql.contains(&format!("'{}'", status.as_str())));
        }
        assert!(sql.contains("WHEN 'New' THEN 1"));
        assert!(sql.contains("WHEN 'Awaiting Confirmation' THEN 7"));
    }

    #[test]
    fn test_normalized_ids() {
        assert_eq!(normalized(&[3, 1, 3, 2]), vec![1, 2, 3]);
    }
}
