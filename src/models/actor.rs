use serde::{Deserialize, Serialize};
use std::fmt;

/// Role tag supplied by the identity provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Staff,
    Technician,
    Admin,
    Manager,
}

impl ActorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Staff => "staff",
            Self::Technician => "technician",
            Self::Admin => "admin",
            Self::Manager => "manager",
        }
    }

    /// Roles allowed to read organisation-wide views and reports
    pub fn sees_all_requests(&self) -> bool {
        matches!(self, Self::Admin | Self::Manager)
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActorRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "staff" => Ok(Self::Staff),
            "technician" => Ok(Self::Technician),
            "admin" => Ok(Self::Admin),
            "manager" => Ok(Self::Manager),
            _ => Err(format!("Invalid actor role: {s}")),
        }
    }
}

/// Authenticated caller of a core operation.
///
/// The core never looks up a "current user"; every operation receives the
/// actor explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub actor_id: i64,
    pub role: ActorRole,
}

impl Actor {
    pub fn new(actor_id: i64, role: ActorRole) -> Self {
        Self { actor_id, role }
    }

    pub fn staff(actor_id: i64) -> Self {
        Self::new(actor_id, ActorRole::Staff)
    }

    pub fn technician(actor_id: i64) -> Self {
        Self::new(actor_id, ActorRole::Technician)
    }

    pub fn admin(actor_id: i64) -> Self {
        Self::new(actor_id, ActorRole::Admin)
    }

    pub fn manager(actor_id: i64) -> Self {
        Self::new(actor_id, ActorRole::Manager)
    }

    pub fn is(&self, role: ActorRole) -> bool {
        self.role == role
    }
}
