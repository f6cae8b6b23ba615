//! # Database Migration System
//!
//! Schema migrations are embedded at compile time and applied in version
//! order. Applied versions are tracked in `service_desk_schema_migrations`.
//!
//! ## Concurrency Control
//!
//! Several processes (or parallel test binaries) may start against the same
//! database. All work happens on one pooled connection holding a session-level
//! advisory lock, so only one runner applies migrations at a time and the
//! others see the recorded versions once they get the lock:
//!
//! ```sql
//! SELECT pg_advisory_lock(7205534162394511)
//! ```

use sqlx::{PgConnection, PgPool};
use std::collections::HashSet;

/// A single embedded migration
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    /// Version timestamp (YYYYMMDDHHMMSS format)
    pub version: &'static str,
    /// Human-readable migration name
    pub name: &'static str,
    pub sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: "20250101000000",
    name: "create service desk schema",
    sql: include_str!("../../migrations/20250101000000_create_service_desk_schema.sql"),
}];

const MIGRATION_LOCK_KEY: i64 = 7205534162394511;

/// Manages database schema migrations with concurrency safety.
pub struct DatabaseMigrations;

impl DatabaseMigrations {
    /// Every known migration in application order
    pub fn all() -> &'static [Migration] {
        MIGRATIONS
    }

    /// Apply outstanding migrations. Returns the versions applied by this call.
    pub async fn run_all(pool: &PgPool) -> Result<Vec<&'static str>, sqlx::Error> {
        let mut conn = pool.acquire().await?;

        sqlx::query("SELECT pg_advisory_lock($1)")
            .bind(MIGRATION_LOCK_KEY)
            .execute(&mut *conn)
            .await?;

        let result = Self::run_outstanding_migrations(&mut conn).await;

        // Always release the lock
        sqlx::query("SELECT pg_advisory_unlock($1)")
            .bind(MIGRATION_LOCK_KEY)
            .execute(&mut *conn)
            .await?;

        result
    }

    async fn run_outstanding_migrations(
        conn: &mut PgConnection,
    ) -> Result<Vec<&'static str>, sqlx::Error> {
        Self::ensure_migration_table(conn).await?;
        let applied_migrations = Self::get_applied_migrations(conn).await?;

        let mut applied_now = Vec::new();
        for migration in Self::all() {
            if applied_migrations.contains(migration.version) {
                continue;
            }
            tracing::info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            sqlx::raw_sql(migration.sql).execute(&mut *conn).await?;
            Self::record_migration(conn, migration.version).await?;
            applied_now.push(migration.version);
        }

        Ok(applied_now)
    }

    /// Ensure migration tracking table exists
    async fn ensure_migration_table(conn: &mut PgConnection) -> Result<(), sqlx::Error> {
        sqlx::raw_sql(
            r#"
            CREATE TABLE IF NOT EXISTS service_desk_schema_migrations (
                version VARCHAR(14) PRIMARY KEY,
                applied_at TIMESTAMP WITHOUT TIME ZONE DEFAULT NOW()
            )
        "#,
        )
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    async fn get_applied_migrations(
        conn: &mut PgConnection,
    ) -> Result<HashSet<String>, sqlx::Error> {
        let versions =
            sqlx::query_scalar::<_, String>("SELECT version FROM service_desk_schema_migrations")
                .fetch_all(&mut *conn)
                .await?;

        Ok(versions.into_iter().collect())
    }

    async fn record_migration(conn: &mut PgConnection, version: &str) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO service_desk_schema_migrations (version) VALUES ($1)")
            .bind(version)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_ordered_and_versioned() {
        let versions: Vec<_> = DatabaseMigrations::all().iter().map(|m| m.version).collect();
        let mut sorted = versions.clone();
        sorted.sort_unstable();
        assert_eq!(versions, sorted);

        for migration in DatabaseMigrations::all() {
            assert_eq!(migration.version.len(), 14);
            assert!(migration.version.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_schema_carries_lifecycle_constraints() {
        let sql = DatabaseMigrations::all()[0].sql;
        assert!(sql.contains("service_requests_assignee_check"));
        assert!(sql.contains("service_requests_rejection_reason_check"));
        assert!(sql.contains("technician_profiles_user_id_key"));
    }
}
