use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use crate::config::DatabaseConfig;

pub struct DatabaseConnection {
    pool: PgPool,
}

impl DatabaseConnection {
    /// Open a pool sized from configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect(&config.url)
            .await?;

        tracing::info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "Database pool established"
        );

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 as health")
            .fetch_one(&self.pool)
            .await?;

        let health: i32 = row.get("health");
        Ok(health == 1)
    }
}
