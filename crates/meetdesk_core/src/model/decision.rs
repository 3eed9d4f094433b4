//! Decision record. Decisions are write-once; only removal is offered.

use crate::model::meeting::MeetingId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type DecisionId = Uuid;

/// Code prefix for decision codes (`DEC-001`).
pub const DECISION_CODE_PREFIX: &str = "DEC";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub id: DecisionId,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub meeting_id: Option<MeetingId>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub owners: Vec<String>,
    pub date: NaiveDate,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub legacy: bool,
}

impl Decision {
    pub fn new(title: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            code: String::new(),
            meeting_id: None,
            title: title.into(),
            description: String::new(),
            owners: Vec::new(),
            date,
            topic: String::new(),
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

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    pub fn is_owned_by(&self, name: &str) -> bool {
        self.owners
            .iter()
            .any(|owner| owner.trim().eq_ignore_ascii_case(name.trim()))
    }
}
