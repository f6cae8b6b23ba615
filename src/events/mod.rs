//! Lifecycle event hand-off to notification and reporting consumers.

pub mod publisher;

// Re-export key types for convenience
pub use publisher::{EventPublisher, PublishError, PublishedEvent};
