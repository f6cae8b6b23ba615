use serde::{Deserialize, Serialize};
use std::fmt;

/// Actions that can trigger service request status transitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum RequestEvent {
    /// Admin assigns the request to a technician
    Assign { technician_id: i64 },
    /// Assignee accepts the work
    Accept,
    /// Assignee declines the work
    Reject { reason: String },
    /// Assignee starts working
    Start,
    /// Assignee reports the work done
    MarkComplete,
    /// Creator confirms the work is done
    ConfirmCompletion,
}

impl RequestEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Assign { .. } => "assign",
            Self::Accept => "accept",
            Self::Reject { .. } => "reject",
            Self::Start => "start",
            Self::MarkComplete => "mark_complete",
            Self::ConfirmCompletion => "confirm_completion",
        }
    }

    /// Create a rejection event with the given reason
    pub fn reject_with_reason(reason: impl Into<String>) -> Self {
        Self::Reject {
            reason: reason.into(),
        }
    }

    pub fn assign_to(technician_id: i64) -> Self {
        Self::Assign { technician_id }
    }

    /// Trimmed rejection reason, if this is a rejection carrying a non-blank one
    pub fn rejection_reason(&self) -> Option<&str> {
        match self {
            Self::Reject { reason } => {
                let reason = reason.trim();
                (!reason.is_empty()).then_some(reason)
            }
            _ => None,
        }
    }
}

impl fmt::Display for RequestEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.event_type())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_reason_is_trimmed() {
        let event = RequestEvent::reject_with_reason("  wrong category ");
        assert_eq!(event.rejection_reason(), Some("wrong category"));

        assert_eq!(RequestEvent::reject_with_reason("   ").rejection_reason(), None);
        assert_eq!(RequestEvent::Accept.rejection_reason(), None);
    }

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_value(RequestEvent::assign_to(5)).unwrap();
        assert_eq!(json["type"], "assign");
        assert_eq!(json["data"]["technician_id"], 5);

        let json = serde_json::to_value(RequestEvent::MarkComplete).unwrap();
        assert_eq!(json["type"], "mark_complete");
    }
}
