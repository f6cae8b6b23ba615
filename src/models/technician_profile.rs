use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Capability record for a technician actor.
/// Maps to `technician_profiles` with its expertise and department join tables
/// aggregated into arrays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TechnicianProfile {
    pub technician_profile_id: i64,
    /// Identity of the technician actor this profile belongs to
    pub user_id: i64,
    /// Category ids the technician can be assigned to
    pub expertise: Vec<i64>,
    /// Optional department memberships; not used for candidate selection
    pub departments: Vec<i64>,
}

impl TechnicianProfile {
    pub fn has_expertise(&self, category_id: i64) -> bool {
        self.expertise.contains(&category_id)
    }
}

/// New profile for creation (without generated fields)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTechnicianProfile {
    pub user_id: i64,
    pub expertise: Vec<i64>,
    pub departments: Vec<i64>,
}

impl NewTechnicianProfile {
    pub fn new(user_id: i64, expertise: Vec<i64>) -> Self {
        Self {
            user_id,
            expertise,
            departments: Vec::new(),
        }
    }

    pub fn with_departments(mut self, departments: Vec<i64>) -> Self {
        self.departments = departments;
        self
    }
}
