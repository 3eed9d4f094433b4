//! Persisted entity kinds.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// One persisted collection (or singleton) inside a workspace.
///
/// Also used as the change-event discriminator so observers can refetch
/// only what they display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// The active workspace itself changed.
    Workspace,
    Employees,
    Meetings,
    LegacyActions,
    LegacyDecisions,
    Draft,
    Timer,
    Voting,
    Presence,
}

impl EntityKind {
    /// Stable storage name used in `{workspace}:{entity}` keys.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Workspace => "workspace",
            Self::Employees => "employees",
            Self::Meetings => "meetings",
            Self::LegacyActions => "legacy_actions",
            Self::LegacyDecisions => "legacy_decisions",
            Self::Draft => "meeting_draft",
            Self::Timer => "timer",
            Self::Voting => "voting",
            Self::Presence => "presence",
        }
    }

    /// Kinds that own a persisted blob.
    pub fn persisted() -> &'static [EntityKind] {
        &[
            Self::Employees,
            Self::Meetings,
            Self::LegacyActions,
            Self::LegacyDecisions,
            Self::Draft,
            Self::Timer,
            Self::Voting,
            Self::Presence,
        ]
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
