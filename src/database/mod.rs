//! # Database Operations
//!
//! Persistence for service requests, technician profiles and reference data.
//!
//! ## Key Components
//!
//! - [`store`] - `RequestStore` / `DirectoryStore` contracts the core depends on
//! - [`postgres`] - SQLx/PostgreSQL implementation
//! - [`memory`] - in-process implementation used by tests and embedded callers
//! - [`connection`] - pool construction from configuration
//! - [`migrations`] - embedded schema migrations with advisory locking
//!
//! ## Atomicity
//!
//! Every status change goes through [`store::RequestStore::apply_transition`],
//! a compare-and-set on `(status, assigned_to)`. PostgreSQL performs it as a
//! single conditional `UPDATE ... RETURNING`; the in-memory store performs it
//! under one write lock. A failed comparison writes nothing.

pub mod connection;
pub mod memory;
pub mod migrations;
pub mod postgres;
pub mod store;

pub use connection::DatabaseConnection;
pub use memory::InMemoryServiceDeskStore;
pub use migrations::DatabaseMigrations;
pub use postgres::PgServiceDeskStore;
pub use store::{DirectoryStore, RequestQuery, RequestStore, ServiceDeskStore};
