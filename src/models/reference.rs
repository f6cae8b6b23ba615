//! Lookup data referenced by service requests. No lifecycle logic lives here.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

use crate::constants::system::{MAX_BLOCK_BUILDING_LENGTH, MAX_FLOOR_LENGTH, MAX_ROOM_LENGTH};
use crate::error::{Result, ServiceDeskError};

/// Maps to `service_categories`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ServiceCategory {
    pub category_id: i64,
    pub name: String,
}

/// Maps to `priority_levels`.
///
/// `resolution_time_hours` is only consulted when ordering request lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PriorityLevel {
    pub priority_id: i64,
    pub name: String,
    pub color: String,
    pub resolution_time_hours: i32,
}

/// Maps to `support_departments`; names are unique
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SupportDepartment {
    pub department_id: i64,
    pub name: String,
}

/// Maps to `locations`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Location {
    pub location_id: i64,
    pub block_building: String,
    pub floor: String,
    pub room: String,
}

/// Location triple used for get-or-create
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NewLocation {
    pub block_building: String,
    pub floor: String,
    pub room: String,
}

impl NewLocation {
    pub fn new(
        block_building: impl Into<String>,
        floor: impl Into<String>,
        room: impl Into<String>,
    ) -> Self {
        Self {
            block_building: block_building.into(),
            floor: floor.into(),
            room: room.into(),
        }
    }

    /// Copy with surrounding whitespace removed from every component
    pub fn trimmed(&self) -> Self {
        Self::new(self.block_building.trim(), self.floor.trim(), self.room.trim())
    }

    /// Every component is required and must fit its column
    pub fn validate(&self) -> Result<()> {
        let components = [
            ("block_building", &self.block_building, MAX_BLOCK_BUILDING_LENGTH),
            ("floor", &self.floor, MAX_FLOOR_LENGTH),
            ("room", &self.room, MAX_ROOM_LENGTH),
        ];
        for (field, value, max_length) in components {
            let value = value.trim();
            if value.is_empty() {
                return Err(ServiceDeskError::Validation(format!(
                    "location {field} must not be empty"
                )));
            }
            if value.chars().count() > max_length {
                return Err(ServiceDeskError::Validation(format!(
                    "location {field} must be at most {max_length} characters"
                )));
            }
        }
        Ok(())
    }

    pub fn matches(&self, location: &Location) -> bool {
        self.block_building == location.block_building
            && self.floor == location.floor
            && self.room == location.room
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - Floor {} - Room {}",
            self.block_building, self.floor, self.room
        )
    }
}
