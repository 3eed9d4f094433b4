//! Transient per-workspace session state: timer, voting poll, presence.
//!
//! # Invariants
//! - Timestamps are Unix epoch milliseconds.
//! - `TimerState::start_time` is meaningful only while `is_running`.
//! - `VotingState::votes` never holds the same voter twice.
//! - A presence list never holds two records for one `session_id`.

use serde::{Deserialize, Serialize};

/// Pausable meeting duration timer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub is_running: bool,
    #[serde(default)]
    pub start_time: Option<i64>,
    /// Whole seconds banked from completed run segments.
    #[serde(default)]
    pub accumulated: u64,
}

impl TimerState {
    /// Elapsed whole seconds at `now_ms`, including the running segment.
    pub fn elapsed_at(&self, now_ms: i64) -> u64 {
        match (self.is_running, self.start_time) {
            (true, Some(start)) => self.accumulated + whole_seconds_between(start, now_ms),
            _ => self.accumulated,
        }
    }
}

/// Show-of-hands poll.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingState {
    pub is_active: bool,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub start_time: Option<i64>,
    /// Distinct voter ids in arrival order.
    #[serde(default)]
    pub votes: Vec<String>,
}

impl VotingState {
    pub fn started(topic: impl Into<String>, now_ms: i64) -> Self {
        Self {
            is_active: true,
            topic: topic.into(),
            start_time: Some(now_ms),
            votes: Vec::new(),
        }
    }

    /// Records `voter_id` unless already present; returns whether it was added.
    pub fn record_vote(&mut self, voter_id: &str) -> bool {
        if self.votes.iter().any(|vote| vote == voter_id) {
            return false;
        }
        self.votes.push(voter_id.to_string());
        true
    }
}

/// Last heartbeat of one client session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceRecord {
    pub session_id: String,
    pub last_active: i64,
}

/// Floor of `(to - from) / 1s`, clamped at zero when the clock went backwards.
pub fn whole_seconds_between(from_ms: i64, to_ms: i64) -> u64 {
    u64::try_from(to_ms.saturating_sub(from_ms) / 1000).unwrap_or(0)
}
