//! Show-of-hands voting poll.
//!
//! # Invariants
//! - Starting a poll always replaces the previous one ("restart wins").
//! - The vote list holds each voter at most once, in arrival order.
//! - Majority is decided by callers against a participant count from the
//!   presence tracker; this service never computes it.

use crate::model::kind::EntityKind;
use crate::model::session::VotingState;
use crate::model::workspace::WorkspaceId;
use crate::repo::kv_repo::KvRepository;
use crate::service::collections::{load_single, remove, store};
use crate::service::context::ServiceContext;
use crate::service::{ServiceError, ServiceResult};
use log::debug;

pub struct VotingService<R: KvRepository> {
    repo: R,
    ctx: ServiceContext,
}

impl<R: KvRepository> VotingService<R> {
    pub fn new(repo: R, ctx: ServiceContext) -> Self {
        Self { repo, ctx }
    }

    /// Current poll; an inactive empty poll when none exists.
    pub fn state(&self, workspace: &WorkspaceId) -> ServiceResult<VotingState> {
        Ok(load_single(&self.repo, workspace, EntityKind::Voting)?.unwrap_or_default())
    }

    /// Opens a poll on `topic`, discarding any poll in progress.
    pub fn start(
        &self,
        workspace: &WorkspaceId,
        topic: impl Into<String>,
    ) -> ServiceResult<VotingState> {
        let state = VotingState::started(topic, self.ctx.clock().now_ms());
        store(&self.repo, workspace, EntityKind::Voting, &state)?;
        debug!("event=poll_start module=service status=ok workspace={workspace}");
        self.ctx.notify(workspace, EntityKind::Voting);
        Ok(state)
    }

    /// Records one vote. `false` when no poll is active or the voter
    /// already voted; neither case writes or notifies.
    pub fn cast_vote(&self, workspace: &WorkspaceId, voter_id: &str) -> ServiceResult<bool> {
        let voter_id = voter_id.trim();
        if voter_id.is_empty() {
            return Err(ServiceError::InvalidInput(
                "voter id must not be blank".to_string(),
            ));
        }

        let recorded = self.repo.atomic(|repo| -> ServiceResult<bool> {
            let Some(mut state) = load_single::<_, VotingState>(repo, workspace, EntityKind::Voting)?
            else {
                return Ok(false);
            };
            if !state.is_active || !state.record_vote(voter_id) {
                return Ok(false);
            }
            store(repo, workspace, EntityKind::Voting, &state)?;
            Ok(true)
        })?;

        if recorded {
            self.ctx.notify(workspace, EntityKind::Voting);
        }
        Ok(recorded)
    }

    /// Deletes the poll entirely and notifies.
    pub fn stop(&self, workspace: &WorkspaceId) -> ServiceResult<()> {
        remove(&self.repo, workspace, EntityKind::Voting)?;
        debug!("event=poll_stop module=service status=ok workspace={workspace}");
        self.ctx.notify(workspace, EntityKind::Voting);
        Ok(())
    }
}

/// Strict majority: more than half of `participants` voted.
pub fn majority_reached(votes: usize, participants: usize) -> bool {
    participants > 0 && votes * 2 > participants
}

#[cfg(test)]
mod tests {
    use super::majority_reached;

    #[test]
    fn majority_is_strictly_more_than_half() {
        assert!(!majority_reached(1, 2));
        assert!(majority_reached(2, 3));
        assert!(majority_reached(1, 1));
        assert!(!majority_reached(0, 0));
    }
}
