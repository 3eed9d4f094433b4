//! Cross-meeting read models.
//!
//! # Invariants
//! - Views are computed on every call from the current collections; nothing
//!   is cached.
//! - Base views keep stored order: meeting-owned items (meeting order, then
//!   item order) followed by legacy items. No dedup, no validation.

use crate::model::action::{Action, ActionStatus};
use crate::model::decision::Decision;
use crate::model::meeting::MeetingId;
use crate::model::workspace::WorkspaceId;
use crate::repo::kv_repo::KvRepository;
use crate::service::collections::{collect_actions, collect_decisions};
use crate::service::context::ServiceContext;
use crate::service::ServiceResult;
use std::cmp::Ordering;

/// Sort order for action queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ActionOrder {
    /// Stored order (meetings first, then legacy).
    #[default]
    Stored,
    /// Earliest deadline first; actions without deadline last.
    Deadline,
    /// Code number ascending.
    Code,
    /// Open, then in-progress, then done.
    Status,
}

/// Filter and sort options for `query_actions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionQuery {
    pub status: Option<ActionStatus>,
    /// Case-insensitive owner name.
    pub owner: Option<String>,
    pub meeting_id: Option<MeetingId>,
    pub include_legacy: bool,
    pub order: ActionOrder,
}

impl Default for ActionQuery {
    fn default() -> Self {
        Self {
            status: None,
            owner: None,
            meeting_id: None,
            include_legacy: true,
            order: ActionOrder::Stored,
        }
    }
}

/// Sort order for decision queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DecisionOrder {
    #[default]
    Stored,
    /// Most recent first.
    NewestFirst,
    Code,
}

/// Filter and sort options for `query_decisions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionQuery {
    pub owner: Option<String>,
    /// Case-insensitive exact topic.
    pub topic: Option<String>,
    pub include_legacy: bool,
    pub order: DecisionOrder,
}

impl Default for DecisionQuery {
    fn default() -> Self {
        Self {
            owner: None,
            topic: None,
            include_legacy: true,
            order: DecisionOrder::Stored,
        }
    }
}

pub struct AggregationService<R: KvRepository> {
    repo: R,
    ctx: ServiceContext,
}

impl<R: KvRepository> AggregationService<R> {
    pub fn new(repo: R, ctx: ServiceContext) -> Self {
        Self { repo, ctx }
    }

    /// Every action: meeting-owned, then legacy.
    pub fn all_actions(&self, workspace: &WorkspaceId) -> ServiceResult<Vec<Action>> {
        Ok(collect_actions(&self.repo, workspace)?)
    }

    /// Every decision: meeting-owned, then legacy.
    pub fn all_decisions(&self, workspace: &WorkspaceId) -> ServiceResult<Vec<Decision>> {
        Ok(collect_decisions(&self.repo, workspace)?)
    }

    pub fn query_actions(
        &self,
        workspace: &WorkspaceId,
        query: &ActionQuery,
    ) -> ServiceResult<Vec<Action>> {
        let mut actions: Vec<Action> = self
            .all_actions(workspace)?
            .into_iter()
            .filter(|action| query.include_legacy || !action.legacy)
            .filter(|action| query.status.map_or(true, |status| action.status == status))
            .filter(|action| {
                query
                    .owner
                    .as_deref()
                    .map_or(true, |owner| action.is_owned_by(owner))
            })
            .filter(|action| {
                query
                    .meeting_id
                    .map_or(true, |meeting_id| action.meeting_id == Some(meeting_id))
            })
            .collect();

        match query.order {
            ActionOrder::Stored => {}
            ActionOrder::Deadline => actions.sort_by(|a, b| compare_deadlines(a, b)),
            ActionOrder::Code => actions.sort_by(|a, b| compare_codes(&a.code, &b.code)),
            ActionOrder::Status => actions.sort_by_key(|action| action.status),
        }
        Ok(actions)
    }

    pub fn query_decisions(
        &self,
        workspace: &WorkspaceId,
        query: &DecisionQuery,
    ) -> ServiceResult<Vec<Decision>> {
        let mut decisions: Vec<Decision> = self
            .all_decisions(workspace)?
            .into_iter()
            .filter(|decision| query.include_legacy || !decision.legacy)
            .filter(|decision| {
                query
                    .owner
                    .as_deref()
                    .map_or(true, |owner| decision.is_owned_by(owner))
            })
            .filter(|decision| {
                query.topic.as_deref().map_or(true, |topic| {
                    decision.topic.trim().eq_ignore_ascii_case(topic.trim())
                })
            })
            .collect();

        match query.order {
            DecisionOrder::Stored => {}
            DecisionOrder::NewestFirst => decisions.sort_by(|a, b| b.date.cmp(&a.date)),
            DecisionOrder::Code => decisions.sort_by(|a, b| compare_codes(&a.code, &b.code)),
        }
        Ok(decisions)
    }

    /// Not-done actions whose deadline lies before today, earliest first.
    pub fn overdue_actions(&self, workspace: &WorkspaceId) -> ServiceResult<Vec<Action>> {
        let today = self.ctx.clock().today();
        let mut overdue: Vec<Action> = self
            .all_actions(workspace)?
            .into_iter()
            .filter(|action| action.status != ActionStatus::Done)
            .filter(|action| action.deadline.is_some_and(|deadline| deadline < today))
            .collect();
        overdue.sort_by(compare_deadlines);
        Ok(overdue)
    }
}

fn compare_deadlines(a: &Action, b: &Action) -> Ordering {
    match (a.deadline, b.deadline) {
        (Some(left), Some(right)) => left.cmp(&right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Orders `ACT-9` before `ACT-10`; unparsable codes sort after numbered ones.
fn compare_codes(a: &str, b: &str) -> Ordering {
    match (code_number(a), code_number(b)) {
        (Some(left), Some(right)) => left.cmp(&right).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

fn code_number(code: &str) -> Option<u64> {
    code.rsplit_once('-')
        .and_then(|(_, digits)| digits.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::compare_codes;
    use std::cmp::Ordering;

    #[test]
    fn codes_compare_numerically() {
        assert_eq!(compare_codes("ACT-009", "ACT-010"), Ordering::Less);
        assert_eq!(compare_codes("ACT-1000", "ACT-999"), Ordering::Greater);
        assert_eq!(compare_codes("legacy", "ACT-001"), Ordering::Greater);
    }
}
