//! Typed collection access shared by the services.

use crate::model::action::Action;
use crate::model::decision::Decision;
use crate::model::kind::EntityKind;
use crate::model::meeting::Meeting;
use crate::model::workspace::WorkspaceId;
use crate::repo::kv_repo::{KvRepository, RepoResult, StoreKey};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Loads a list collection, defaulting to empty.
pub(crate) fn load_list<R, T>(repo: &R, workspace: &WorkspaceId, kind: EntityKind) -> RepoResult<Vec<T>>
where
    R: KvRepository,
    T: DeserializeOwned,
{
    Ok(load_single(repo, workspace, kind)?.unwrap_or_default())
}

/// Loads a singleton blob; `None` when nothing is persisted.
pub(crate) fn load_single<R, T>(
    repo: &R,
    workspace: &WorkspaceId,
    kind: EntityKind,
) -> RepoResult<Option<T>>
where
    R: KvRepository,
    T: DeserializeOwned,
{
    let stored = repo.read_json::<T>(&StoreKey::entity(workspace, kind))?;
    Ok(stored.map(|versioned| versioned.value))
}

pub(crate) fn store<R, T>(repo: &R, workspace: &WorkspaceId, kind: EntityKind, value: &T) -> RepoResult<u64>
where
    R: KvRepository,
    T: Serialize,
{
    repo.write_json(&StoreKey::entity(workspace, kind), value)
}

pub(crate) fn remove<R: KvRepository>(
    repo: &R,
    workspace: &WorkspaceId,
    kind: EntityKind,
) -> RepoResult<bool> {
    repo.delete(&StoreKey::entity(workspace, kind))
}

pub(crate) fn load_meetings<R: KvRepository>(
    repo: &R,
    workspace: &WorkspaceId,
) -> RepoResult<Vec<Meeting>> {
    load_list(repo, workspace, EntityKind::Meetings)
}

/// Meeting-owned actions followed by legacy actions, in stored order.
pub(crate) fn collect_actions<R: KvRepository>(
    repo: &R,
    workspace: &WorkspaceId,
) -> RepoResult<Vec<Action>> {
    let mut actions: Vec<Action> = load_meetings(repo, workspace)?
        .into_iter()
        .flat_map(|meeting| meeting.actions)
        .collect();
    actions.extend(load_list::<_, Action>(repo, workspace, EntityKind::LegacyActions)?);
    Ok(actions)
}

/// Meeting-owned decisions followed by legacy decisions, in stored order.
pub(crate) fn collect_decisions<R: KvRepository>(
    repo: &R,
    workspace: &WorkspaceId,
) -> RepoResult<Vec<Decision>> {
    let mut decisions: Vec<Decision> = load_meetings(repo, workspace)?
        .into_iter()
        .flat_map(|meeting| meeting.decisions)
        .collect();
    decisions.extend(load_list::<_, Decision>(repo, workspace, EntityKind::LegacyDecisions)?);
    Ok(decisions)
}
