//! Workspace resolver.
//!
//! # Responsibility
//! - Decide the active namespace from an explicit override, the remembered
//!   value, or the configured default.
//! - Remember the chosen namespace across process restarts.
//!
//! # Invariants
//! - Returned ids are sanitized; resolution never fails on bad input.
//! - There is no ambient "active workspace" pointer: callers thread the
//!   returned `WorkspaceId` into every other service call.

use crate::model::kind::EntityKind;
use crate::model::workspace::WorkspaceId;
use crate::repo::kv_repo::{KvRepository, StoreKey};
use crate::service::context::ServiceContext;
use crate::service::ServiceResult;
use log::info;
use std::collections::BTreeSet;

const CURRENT_WORKSPACE_KEY: StoreKey = StoreKey::Meta("current_workspace");

pub struct WorkspaceService<R: KvRepository> {
    repo: R,
    ctx: ServiceContext,
}

impl<R: KvRepository> WorkspaceService<R> {
    pub fn new(repo: R, ctx: ServiceContext) -> Self {
        Self { repo, ctx }
    }

    /// Resolves the workspace for a new session.
    ///
    /// A non-empty sanitized `explicit` override is remembered and returned.
    /// Does not notify: nothing observable changed for running observers.
    pub fn resolve(&self, explicit: Option<&str>) -> ServiceResult<WorkspaceId> {
        if let Some(workspace) = explicit.and_then(WorkspaceId::try_new) {
            self.remember(&workspace)?;
            return Ok(workspace);
        }
        self.current()
    }

    /// Remembered workspace, or the configured default. Pure read.
    pub fn current(&self) -> ServiceResult<WorkspaceId> {
        let remembered = self
            .repo
            .read_json::<WorkspaceId>(&CURRENT_WORKSPACE_KEY)?
            .map(|versioned| versioned.value)
            .and_then(|raw| WorkspaceId::try_new(raw.as_str()));
        Ok(remembered.unwrap_or_else(|| self.default_workspace()))
    }

    /// Switches to `raw` (sanitized; blank collapses to the default),
    /// remembers it and notifies.
    pub fn set(&self, raw: &str) -> ServiceResult<WorkspaceId> {
        let workspace = WorkspaceId::parse_or(raw, &self.ctx.config().default_workspace);
        self.remember(&workspace)?;
        info!("event=workspace_set module=service status=ok workspace={workspace}");
        self.ctx.notify(&workspace, EntityKind::Workspace);
        Ok(workspace)
    }

    /// Workspaces that own at least one persisted entity, sorted.
    pub fn list_workspaces(&self) -> ServiceResult<Vec<WorkspaceId>> {
        let mut found = BTreeSet::new();
        for key in self.repo.keys_with_prefix("")? {
            let Some((namespace, entity)) = key.rsplit_once(':') else {
                continue;
            };
            let is_entity = EntityKind::persisted()
                .iter()
                .any(|kind| kind.as_str() == entity);
            if is_entity {
                if let Some(workspace) = WorkspaceId::try_new(namespace) {
                    found.insert(workspace);
                }
            }
        }
        Ok(found.into_iter().collect())
    }

    fn remember(&self, workspace: &WorkspaceId) -> ServiceResult<()> {
        self.repo.write_json(&CURRENT_WORKSPACE_KEY, workspace)?;
        Ok(())
    }

    fn default_workspace(&self) -> WorkspaceId {
        WorkspaceId::parse_or("", &self.ctx.config().default_workspace)
    }
}
