//! Heartbeat-based presence tracker.
//!
//! Two windows apply: records older than the prune window are dropped on
//! every heartbeat, and only records inside the shorter active window are
//! counted as participants.

use crate::model::kind::EntityKind;
use crate::model::session::PresenceRecord;
use crate::model::workspace::WorkspaceId;
use crate::repo::kv_repo::KvRepository;
use crate::service::collections::{load_list, store};
use crate::service::context::ServiceContext;
use crate::service::{ServiceError, ServiceResult};

pub struct PresenceService<R: KvRepository> {
    repo: R,
    ctx: ServiceContext,
}

impl<R: KvRepository> PresenceService<R> {
    pub fn new(repo: R, ctx: ServiceContext) -> Self {
        Self { repo, ctx }
    }

    /// Prunes stale records, upserts `session_id` at now, and notifies.
    ///
    /// Returns the number of records kept after the update.
    pub fn heartbeat(&self, workspace: &WorkspaceId, session_id: &str) -> ServiceResult<usize> {
        let session_id = require_session_id(session_id)?;
        let now = self.ctx.clock().now_ms();
        let prune_window = self.ctx.config().presence_prune_window_ms;

        let kept = self.repo.atomic(|repo| -> ServiceResult<usize> {
            let mut records: Vec<PresenceRecord> =
                load_list(repo, workspace, EntityKind::Presence)?;
            records.retain(|record| now.saturating_sub(record.last_active) <= prune_window);
            match records
                .iter_mut()
                .find(|record| record.session_id == session_id)
            {
                Some(record) => record.last_active = now,
                None => records.push(PresenceRecord {
                    session_id: session_id.to_string(),
                    last_active: now,
                }),
            }
            store(repo, workspace, EntityKind::Presence, &records)?;
            Ok(records.len())
        })?;

        self.ctx.notify(workspace, EntityKind::Presence);
        Ok(kept)
    }

    /// Sessions heard from inside the active window. Pure read.
    pub fn active_sessions(&self, workspace: &WorkspaceId) -> ServiceResult<Vec<String>> {
        let now = self.ctx.clock().now_ms();
        let active_window = self.ctx.config().presence_active_window_ms;
        let records: Vec<PresenceRecord> = load_list(&self.repo, workspace, EntityKind::Presence)?;
        Ok(records
            .into_iter()
            .filter(|record| now.saturating_sub(record.last_active) <= active_window)
            .map(|record| record.session_id)
            .collect())
    }

    /// Active participant count, never below one: the caller counts itself
    /// even before its first heartbeat lands.
    pub fn active_count(&self, workspace: &WorkspaceId) -> ServiceResult<usize> {
        Ok(self.active_sessions(workspace)?.len().max(1))
    }

    /// Drops the caller's record right away instead of waiting for pruning.
    pub fn depart(&self, workspace: &WorkspaceId, session_id: &str) -> ServiceResult<bool> {
        let session_id = require_session_id(session_id)?;
        let removed = self.repo.atomic(|repo| -> ServiceResult<bool> {
            let mut records: Vec<PresenceRecord> =
                load_list(repo, workspace, EntityKind::Presence)?;
            let before = records.len();
            records.retain(|record| record.session_id != session_id);
            if records.len() == before {
                return Ok(false);
            }
            store(repo, workspace, EntityKind::Presence, &records)?;
            Ok(true)
        })?;

        if removed {
            self.ctx.notify(workspace, EntityKind::Presence);
        }
        Ok(removed)
    }
}

fn require_session_id(session_id: &str) -> ServiceResult<&str> {
    let trimmed = session_id.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::InvalidInput(
            "session id must not be blank".to_string(),
        ));
    }
    Ok(trimmed)
}
