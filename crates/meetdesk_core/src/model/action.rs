//! Action item record.
//!
//! # Invariants
//! - `completed_at.is_some()` exactly when `status == ActionStatus::Done`.
//! - `meeting_id == None` marks a legacy (unlinked) import.

use crate::model::meeting::{MeetingId, MeetingType};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ActionId = Uuid;

/// Code prefix for action codes (`ACT-001`).
pub const ACTION_CODE_PREFIX: &str = "ACT";

/// Action lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Open,
    #[serde(rename = "in-progress")]
    InProgress,
    Done,
}

impl ActionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in-progress",
            Self::Done => "done",
        }
    }
}

/// Follow-up task raised during a meeting (or imported without one).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub id: ActionId,
    /// Human-readable sequential code; empty until the store assigns one.
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub meeting_id: Option<MeetingId>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub owners: Vec<String>,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    pub status: ActionStatus,
    #[serde(default)]
    pub completed_at: Option<NaiveDate>,
    /// Agenda topic the action was raised under.
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub meeting_type: Option<MeetingType>,
    #[serde(default)]
    pub legacy: bool,
}

impl Action {
    /// Creates an open, unassigned action with a fresh id.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            code: String::new(),
            meeting_id: None,
            title: title.into(),
            description: String::new(),
            owners: Vec::new(),
            deadline: None,
            status: ActionStatus::Open,
            completed_at: None,
            topic: String::new(),
            meeting_type: None,
            legacy: false,
        }
    }

    pub fn with_owners<I, S>(mut self, owners: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.owners = owners.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_deadline(mut self, deadline: NaiveDate) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Moves the action to `status`, stamping or clearing the completion date.
    pub fn transition(&mut self, status: ActionStatus, today: NaiveDate) {
        self.status = status;
        self.completed_at = match status {
            ActionStatus::Done => Some(today),
            ActionStatus::Open | ActionStatus::InProgress => None,
        };
    }

    /// Restores "completion date iff done" on records built outside
    /// `transition`: a done action without a date is stamped `today`, a
    /// pending one loses any stale date.
    pub fn normalize_completion(&mut self, today: NaiveDate) {
        self.completed_at = match self.status {
            ActionStatus::Done => self.completed_at.or(Some(today)),
            ActionStatus::Open | ActionStatus::InProgress => None,
        };
    }

    /// Returns whether `name` is among the owners (case-insensitive).
    pub fn is_owned_by(&self, name: &str) -> bool {
        self.owners
            .iter()
            .any(|owner| owner.trim().eq_ignore_ascii_case(name.trim()))
    }
}

/// Formats a sequential code such as `ACT-007` or `DEC-1200`.
pub fn format_code(prefix: &str, number: u64, width: usize) -> String {
    format!("{prefix}-{number:0width$}")
}

#[cfg(test)]
mod tests {
    use super::{format_code, Action, ActionStatus};
    use chrono::NaiveDate;

    #[test]
    fn transition_keeps_completion_date_in_sync_with_status() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 4).unwrap();
        let mut action = Action::new("Send minutes");

        action.transition(ActionStatus::Done, today);
        assert_eq!(action.completed_at, Some(today));

        action.transition(ActionStatus::InProgress, today);
        assert_eq!(action.completed_at, None);
    }

    #[test]
    fn normalize_completion_stamps_done_and_clears_pending() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 4).unwrap();
        let earlier = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();

        let mut done = Action::new("Book venue");
        done.status = ActionStatus::Done;
        done.normalize_completion(today);
        assert_eq!(done.completed_at, Some(today));

        done.completed_at = Some(earlier);
        done.normalize_completion(today);
        assert_eq!(done.completed_at, Some(earlier));

        let mut open = Action::new("Call vendor");
        open.completed_at = Some(earlier);
        open.normalize_completion(today);
        assert_eq!(open.completed_at, None);
    }

    #[test]
    fn in_progress_status_uses_hyphenated_name() {
        let encoded = serde_json::to_string(&ActionStatus::InProgress).unwrap();
        assert_eq!(encoded, "\"in-progress\"");
        assert_eq!(ActionStatus::InProgress.as_str(), "in-progress");
        let decoded: ActionStatus = serde_json::from_str("\"in-progress\"").unwrap();
        assert_eq!(decoded, ActionStatus::InProgress);
    }

    #[test]
    fn format_code_pads_and_grows() {
        assert_eq!(format_code("ACT", 7, 3), "ACT-007");
        assert_eq!(format_code("DEC", 1200, 3), "DEC-1200");
    }
}
