//! Meeting and meeting-draft records.
//!
//! # Invariants
//! - `Meeting::week` is the ISO week of `Meeting::date`.
//! - Embedded actions/decisions point back at their meeting via `meeting_id`.
//! - A committed meeting only changes through note correction or removal of
//!   individual embedded actions/decisions.

use crate::model::action::Action;
use crate::model::decision::Decision;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type MeetingId = Uuid;

/// The two meeting formats the tool distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingType {
    /// Recurring team meeting.
    Weekly,
    /// One-off meeting outside the regular cadence.
    Special,
}

impl MeetingType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Special => "special",
        }
    }
}

/// One sub-topic checkbox under an agenda item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItem {
    pub label: String,
    #[serde(default)]
    pub checked: bool,
}

/// Notes taken for one agenda item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub topic: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checklist: Vec<ChecklistItem>,
}

impl Note {
    pub fn new(topic: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            content: content.into(),
            checklist: Vec::new(),
        }
    }
}

/// Committed meeting with its embedded notes, actions and decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    pub id: MeetingId,
    pub date: NaiveDate,
    /// ISO week number, derived from `date` on save.
    #[serde(default)]
    pub week: u32,
    #[serde(rename = "type")]
    pub meeting_type: MeetingType,
    #[serde(default)]
    pub attendees: Vec<String>,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub decisions: Vec<Decision>,
    /// Recorded duration in whole seconds.
    #[serde(default)]
    pub duration_secs: Option<u64>,
}

impl Meeting {
    pub fn new(date: NaiveDate, meeting_type: MeetingType) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            week: iso_week(date),
            meeting_type,
            attendees: Vec::new(),
            notes: Vec::new(),
            actions: Vec::new(),
            decisions: Vec::new(),
            duration_secs: None,
        }
    }

    /// Re-derives computed fields and points embedded items at this meeting.
    ///
    /// Codes are left untouched; code allocation belongs to the store.
    pub fn normalize(&mut self) {
        self.week = iso_week(self.date);
        for action in &mut self.actions {
            action.meeting_id = Some(self.id);
            action.meeting_type = Some(self.meeting_type);
            action.legacy = false;
        }
        for decision in &mut self.decisions {
            decision.meeting_id = Some(self.id);
            decision.legacy = false;
        }
    }
}

/// In-progress meeting editor state; at most one per workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingDraft {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(rename = "type")]
    pub meeting_type: MeetingType,
    #[serde(default)]
    pub attendees: Vec<String>,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub decisions: Vec<Decision>,
    /// Index of the agenda item currently being edited.
    #[serde(default)]
    pub current_topic: usize,
}

impl MeetingDraft {
    pub fn new(meeting_type: MeetingType) -> Self {
        Self {
            date: None,
            meeting_type,
            attendees: Vec::new(),
            notes: Vec::new(),
            actions: Vec::new(),
            decisions: Vec::new(),
            current_topic: 0,
        }
    }

    /// Drops `name` from the attendee list; returns whether it was present.
    pub fn remove_attendee(&mut self, name: &str) -> bool {
        let before = self.attendees.len();
        self.attendees.retain(|attendee| attendee != name);
        self.attendees.len() != before
    }

    /// Builds the meeting this draft describes, dated `fallback_date` when
    /// the draft carries no date of its own.
    pub fn into_meeting(self, fallback_date: NaiveDate) -> Meeting {
        let mut meeting = Meeting::new(self.date.unwrap_or(fallback_date), self.meeting_type);
        meeting.attendees = self.attendees;
        meeting.notes = self.notes;
        meeting.actions = self.actions;
        meeting.decisions = self.decisions;
        meeting.normalize();
        meeting
    }
}

/// ISO-8601 week number of `date`.
pub fn iso_week(date: NaiveDate) -> u32 {
    date.iso_week().week()
}
