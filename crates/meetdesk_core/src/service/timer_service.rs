//! Pausable meeting timer.
//!
//! # Invariants
//! - The persisted state changes only on `start`, `pause` and `reset`;
//!   live displays tick locally by calling `elapsed`.
//! - Time is banked in whole seconds (floor), never rounded.

use crate::model::kind::EntityKind;
use crate::model::session::{whole_seconds_between, TimerState};
use crate::model::workspace::WorkspaceId;
use crate::repo::kv_repo::KvRepository;
use crate::service::collections::{load_single, remove, store};
use crate::service::context::ServiceContext;
use crate::service::ServiceResult;
use log::debug;

pub struct TimerService<R: KvRepository> {
    repo: R,
    ctx: ServiceContext,
}

impl<R: KvRepository> TimerService<R> {
    pub fn new(repo: R, ctx: ServiceContext) -> Self {
        Self { repo, ctx }
    }

    /// Persisted timer state; a stopped zero timer when none exists.
    pub fn state(&self, workspace: &WorkspaceId) -> ServiceResult<TimerState> {
        Ok(load_single(&self.repo, workspace, EntityKind::Timer)?.unwrap_or_default())
    }

    /// Starts a run segment; `false` (no write) when already running.
    pub fn start(&self, workspace: &WorkspaceId) -> ServiceResult<bool> {
        let now = self.ctx.clock().now_ms();
        let started = self.repo.atomic(|repo| -> ServiceResult<bool> {
            let mut state: TimerState =
                load_single(repo, workspace, EntityKind::Timer)?.unwrap_or_default();
            if state.is_running {
                return Ok(false);
            }
            state.is_running = true;
            state.start_time = Some(now);
            store(repo, workspace, EntityKind::Timer, &state)?;
            Ok(true)
        })?;

        if started {
            debug!("event=timer_start module=service status=ok workspace={workspace}");
            self.ctx.notify(workspace, EntityKind::Timer);
        }
        Ok(started)
    }

    /// Banks the running segment; `false` (no write) when already stopped.
    pub fn pause(&self, workspace: &WorkspaceId) -> ServiceResult<bool> {
        let now = self.ctx.clock().now_ms();
        let paused = self.repo.atomic(|repo| -> ServiceResult<bool> {
            let mut state: TimerState =
                load_single(repo, workspace, EntityKind::Timer)?.unwrap_or_default();
            if !state.is_running {
                return Ok(false);
            }
            let segment = state
                .start_time
                .map_or(0, |start| whole_seconds_between(start, now));
            state.accumulated += segment;
            state.is_running = false;
            state.start_time = None;
            store(repo, workspace, EntityKind::Timer, &state)?;
            Ok(true)
        })?;

        if paused {
            debug!("event=timer_pause module=service status=ok workspace={workspace}");
            self.ctx.notify(workspace, EntityKind::Timer);
        }
        Ok(paused)
    }

    /// Elapsed whole seconds, including the running segment. Pure read.
    pub fn elapsed(&self, workspace: &WorkspaceId) -> ServiceResult<u64> {
        Ok(self.state(workspace)?.elapsed_at(self.ctx.clock().now_ms()))
    }

    /// Deletes the timer state entirely and notifies.
    pub fn reset(&self, workspace: &WorkspaceId) -> ServiceResult<()> {
        remove(&self.repo, workspace, EntityKind::Timer)?;
        debug!("event=timer_reset module=service status=ok workspace={workspace}");
        self.ctx.notify(workspace, EntityKind::Timer);
        Ok(())
    }
}
