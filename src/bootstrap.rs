//! Wiring of store, publisher and services from a loaded configuration.

use std::sync::Arc;
use tracing::info;

use crate::config::ServiceDeskConfig;
use crate::database::{
    DatabaseConnection, DatabaseMigrations, InMemoryServiceDeskStore, PgServiceDeskStore,
    ServiceDeskStore,
};
use crate::error::{Result, ServiceDeskError};
use crate::events::EventPublisher;
use crate::services::{AssignmentPolicy, ReportService, ServiceRequestService};
use crate::state_machine::RequestStateMachine;

/// Fully wired service desk core
#[derive(Clone)]
pub struct ServiceDesk {
    config: ServiceDeskConfig,
    store: Arc<dyn ServiceDeskStore>,
    event_publisher: EventPublisher,
    requests: ServiceRequestService,
    reports: ReportService,
}

impl ServiceDesk {
    /// Build on top of an existing store
    pub fn with_store(config: ServiceDeskConfig, store: Arc<dyn ServiceDeskStore>) -> Result<Self> {
        config.validate()?;

        let event_publisher = EventPublisher::new(config.events.channel_capacity);
        let requests = ServiceRequestService::new(
            store.clone(),
            event_publisher.clone(),
            config.pagination.per_page,
        );
        let reports = ReportService::new(store.clone());

        Ok(Self {
            config,
            store,
            event_publisher,
            requests,
            reports,
        })
    }

    /// Build on a fresh in-memory store
    pub fn in_memory(config: ServiceDeskConfig) -> Result<Self> {
        Self::with_store(config, Arc::new(InMemoryServiceDeskStore::new()))
    }

    /// Connect to PostgreSQL, applying migrations first when configured
    pub async fn connect(config: ServiceDeskConfig) -> Result<Self> {
        config.validate()?;

        let connection = DatabaseConnection::connect(&config.database).await?;
        if !connection.health_check().await? {
            return Err(ServiceDeskError::Database(
                "database health check failed".to_string(),
            ));
        }

        if config.database.run_migrations {
            let applied = DatabaseMigrations::run_all(connection.pool()).await?;
            info!(applied = applied.len(), "Database migrations complete");
        }

        let store = PgServiceDeskStore::new(connection.pool().clone());
        Self::with_store(config, Arc::new(store))
    }

    pub fn config(&self) -> &ServiceDeskConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ServiceDeskStore> {
        &self.store
    }

    pub fn event_publisher(&self) -> &EventPublisher {
        &self.event_publisher
    }

    pub fn requests(&self) -> &ServiceRequestService {
        &self.requests
    }

    pub fn reports(&self) -> &ReportService {
        &self.reports
    }

    pub fn assignment_policy(&self) -> &AssignmentPolicy {
        self.requests.assignment_policy()
    }

    pub fn state_machine(&self) -> &RequestStateMachine {
        self.requests.state_machine()
    }
}
