//! Read-only report rows for the admin/manager report page.
//!
//! Rendering to CSV, spreadsheets or documents belongs to the presentation
//! layer; this module only filters and orders.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::database::{RequestQuery, ServiceDeskStore};
use crate::error::{Result, ServiceDeskError};
use crate::models::Actor;
use crate::state_machine::RequestStatus;

/// Creation-time window relative to the moment the report is run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportPeriod {
    /// The last hour
    Hourly,
    /// The current calendar day
    Daily,
    /// The last seven days
    Weekly,
    /// The current calendar month
    Monthly,
    /// The current calendar year
    Annual,
}

impl ReportPeriod {
    /// `[from, until)` bounds on `created_at`. Rolling windows have no upper bound.
    pub fn window(&self, now: NaiveDateTime) -> (NaiveDateTime, Option<NaiveDateTime>) {
        let today = now.date();
        match self {
            Self::Hourly => (now - Duration::hours(1), None),
            Self::Weekly => (now - Duration::days(7), None),
            Self::Daily => (start_of(today), today.succ_opt().map(start_of)),
            Self::Monthly => {
                let first = today.with_day(1).unwrap_or(today);
                let next = if first.month() == 12 {
                    NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
                };
                (start_of(first), next.map(start_of))
            }
            Self::Annual => {
                let first = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
                let next = NaiveDate::from_ymd_opt(today.year() + 1, 1, 1);
                (start_of(first), next.map(start_of))
            }
        }
    }
}

impl std::str::FromStr for ReportPeriod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "hourly" => Ok(Self::Hourly),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "annual" => Ok(Self::Annual),
            _ => Err(format!("Invalid report period: {s}")),
        }
    }
}

fn start_of(date: NaiveDate) -> NaiveDateTime {
    date.and_time(chrono::NaiveTime::MIN)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportFilter {
    pub status: Option<RequestStatus>,
    pub category_id: Option<i64>,
    pub technician_id: Option<i64>,
    pub period: Option<ReportPeriod>,
}

impl ReportFilter {
    fn to_query(self, now: NaiveDateTime) -> RequestQuery {
        let mut query = RequestQuery::all();
        if let Some(status) = self.status {
            query = query.with_status(status);
        }
        if let Some(category_id) = self.category_id {
            query = query.with_category(category_id);
        }
        if let Some(technician_id) = self.technician_id {
            query = query.assigned_to(technician_id);
        }
        if let Some(period) = self.period {
            let (from, until) = period.window(now);
            query = query.created_between(Some(from), until);
        }
        query
    }
}

/// One exported line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub service_request_id: i64,
    pub title: String,
    pub requester_id: i64,
    pub technician_id: Option<i64>,
    pub category: String,
    pub priority: Option<String>,
    pub status: RequestStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Clone)]
pub struct ReportService {
    store: Arc<dyn ServiceDeskStore>,
}

impl ReportService {
    pub fn new(store: Arc<dyn ServiceDeskStore>) -> Self {
        Self { store }
    }

    /// Filtered rows, newest first
    pub async fn rows(
        &self,
        actor: &Actor,
        filter: ReportFilter,
        now: NaiveDateTime,
    ) -> Result<Vec<ReportRow>> {
        if !actor.role.sees_all_requests() {
            return Err(ServiceDeskError::permission_denied(
                "only admins and managers may run reports",
            ));
        }

        let listings = self.store.list_requests(&filter.to_query(now)).await?;
        let categories: HashMap<i64, String> = self
            .store
            .list_categories()
            .await?
            .into_iter()
            .map(|c| (c.category_id, c.name))
            .collect();
        let priorities: HashMap<i64, String> = self
            .store
            .list_priorities()
            .await?
            .into_iter()
            .map(|p| (p.priority_id, p.name))
            .collect();

        let mut rows: Vec<ReportRow> = listings
            .into_iter()
            .map(|listing| {
                let request = listing.request;
                ReportRow {
                    category: categories
                        .get(&request.category_id)
                        .cloned()
                        .unwrap_or_default(),
                    priority: request.priority_id.and_then(|id| priorities.get(&id).cloned()),
                    service_request_id: request.service_request_id,
                    title: request.title,
                    requester_id: request.created_by,
                    technician_id: request.assigned_to,
                    status: request.status,
                    created_at: request.created_at,
                    updated_at: request.updated_at,
                }
            })
            .collect();

        rows.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(a.service_request_id.cmp(&b.service_request_id))
        });

        tracing::info!(
            actor_id = actor.actor_id,
            row_count = rows.len(),
            period = ?filter.period,
            "Report generated"
        );

        Ok(rows)
    }
}
