use serde::{Deserialize, Serialize};
use std::fmt;

/// Service request status, stored verbatim as the display label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    /// Submitted by staff, not yet assigned
    #[default]
    #[serde(rename = "New")]
    New,
    /// Assigned to a technician by an admin
    #[serde(rename = "Assigned")]
    Assigned,
    /// Assignee accepted the work
    #[serde(rename = "Accepted")]
    Accepted,
    /// Assignee declined the work, with a reason
    #[serde(rename = "Rejected")]
    Rejected,
    /// Work has started
    #[serde(rename = "In Progress")]
    InProgress,
    /// Technician finished; waiting on the creator to confirm
    #[serde(rename = "Awaiting Confirmation")]
    AwaitingConfirmation,
    /// Creator confirmed the work
    #[serde(rename = "Completed")]
    Completed,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 7] = [
        Self::New,
        Self::Assigned,
        Self::Accepted,
        Self::Rejected,
        Self::InProgress,
        Self::AwaitingConfirmation,
        Self::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Assigned => "Assigned",
            Self::Accepted => "Accepted",
            Self::Rejected => "Rejected",
            Self::InProgress => "In Progress",
            Self::AwaitingConfirmation => "Awaiting Confirmation",
            Self::Completed => "Completed",
        }
    }

    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Rejected)
    }

    /// Check if a request in this state counts toward its assignee's workload
    pub fn counts_as_active(&self) -> bool {
        matches!(self, Self::Assigned | Self::InProgress)
    }

    /// Whether a request in this state must carry an assignee
    pub fn requires_assignee(&self) -> bool {
        !matches!(self, Self::New)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Invalid request status: {s}"))
    }
}

impl TryFrom<String> for RequestStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_check() {
        assert!(RequestStatus::Completed.is_terminal());
        assert!(RequestStatus::Rejected.is_terminal());
        assert!(!RequestStatus::New.is_terminal());
        assert!(!RequestStatus::AwaitingConfirmation.is_terminal());
    }

    #[test]
    fn test_default_is_new() {
        assert_eq!(RequestStatus::default(), RequestStatus::New);
    }

    #[test]
    fn test_state_string_conversion() {
        assert_eq!(RequestStatus::InProgress.to_string(), "In Progress");
        assert_eq!(
            "Awaiting Confirmation".parse::<RequestStatus>().unwrap(),
            RequestStatus::AwaitingConfirmation
        );
        assert!("in_progress".parse::<RequestStatus>().is_err());
    }

    #[test]
    fn test_state_serde_uses_labels() {
        let json = serde_json::to_string(&RequestStatus::InProgress).unwrap();
        assert_eq!(json, "\"In Progress\"");

        let parsed: RequestStatus = serde_json::from_str("\"Assigned\"").unwrap();
        assert_eq!(parsed, RequestStatus::Assigned);
    }

    #[test]
    fn test_only_new_may_lack_assignee() {
        for status in RequestStatus::ALL {
            assert_eq!(status.requires_assignee(), status != RequestStatus::New);
        }
    }
}
