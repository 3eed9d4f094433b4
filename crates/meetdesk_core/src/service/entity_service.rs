//! Entity repository use-case service.
//!
//! # Responsibility
//! - CRUD over employees, meetings, legacy actions/decisions and the draft.
//! - Allocate sequential action/decision codes inside the creating write.
//! - Cascade employee removal into the draft attendee list.
//!
//! # Invariants
//! - Every mutation is one `atomic` read-modify-write of whole collections.
//! - Null meeting references route to the legacy collections.
//! - `Action::completed_at` is stamped exactly on transition into `Done`.

use crate::model::action::{format_code, Action, ActionId, ActionStatus, ACTION_CODE_PREFIX};
use crate::model::decision::{Decision, DecisionId, DECISION_CODE_PREFIX};
use crate::model::employee::{palette_color, Employee, EmployeeId};
use crate::model::kind::EntityKind;
use crate::model::meeting::{Meeting, MeetingDraft, MeetingId, Note};
use crate::model::workspace::WorkspaceId;
use crate::repo::kv_repo::{KvRepository, RepoResult, StoreKey, Versioned};
use crate::service::collections::{
    collect_actions, collect_decisions, load_list, load_meetings, load_single, remove, store,
};
use crate::service::context::ServiceContext;
use crate::service::{ServiceError, ServiceResult};
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Entity repository facade over one key-value repository.
pub struct EntityService<R: KvRepository> {
    repo: R,
    ctx: ServiceContext,
}

impl<R: KvRepository> EntityService<R> {
    pub fn new(repo: R, ctx: ServiceContext) -> Self {
        Self { repo, ctx }
    }

    // ---- employees -------------------------------------------------------

    /// Returns the persisted employees, or the configured seed list.
    pub fn employees(&self, workspace: &WorkspaceId) -> ServiceResult<Vec<Employee>> {
        Ok(self.employees_snapshot(workspace)?.value)
    }

    /// Employees together with the version they were read at.
    ///
    /// Pair with `replace_employees` when the caller edits across a yield
    /// point and wants a conflict instead of a silent lost update.
    pub fn employees_snapshot(
        &self,
        workspace: &WorkspaceId,
    ) -> ServiceResult<Versioned<Vec<Employee>>> {
        let key = StoreKey::entity(workspace, EntityKind::Employees);
        Ok(self
            .repo
            .read_json::<Vec<Employee>>(&key)?
            .unwrap_or_else(|| Versioned {
                value: self.ctx.config().seeded_employees(),
                version: None,
            }))
    }

    /// Replaces the whole employee list if nobody wrote since `expected`.
    pub fn replace_employees(
        &self,
        workspace: &WorkspaceId,
        expected: Option<u64>,
        employees: &[Employee],
    ) -> ServiceResult<u64> {
        for employee in employees {
            validate_employee(employee)?;
        }
        let key = StoreKey::entity(workspace, EntityKind::Employees);
        let version = self
            .repo
            .write_json_if_version(&key, expected, &employees)?;
        self.ctx.notify(workspace, EntityKind::Employees);
        Ok(version)
    }

    /// Appends an employee, assigning a palette color when none is set.
    pub fn add_employee(
        &self,
        workspace: &WorkspaceId,
        mut employee: Employee,
    ) -> ServiceResult<Employee> {
        normalize_employee(&mut employee);
        validate_employee(&employee)?;

        let added = self.repo.atomic(|repo| -> ServiceResult<Employee> {
            let mut employees = self.load_employees(repo, workspace)?;
            if employee.color.is_empty() {
                employee.color = palette_color(employees.len()).to_string();
            }
            employees.push(employee.clone());
            store(repo, workspace, EntityKind::Employees, &employees)?;
            Ok(employee)
        })?;

        debug!("event=employee_add module=service status=ok workspace={workspace}");
        self.ctx.notify(workspace, EntityKind::Employees);
        Ok(added)
    }

    /// Replaces the employee with the same id; `false` when absent.
    pub fn update_employee(
        &self,
        workspace: &WorkspaceId,
        mut employee: Employee,
    ) -> ServiceResult<bool> {
        normalize_employee(&mut employee);
        validate_employee(&employee)?;

        let updated = self.repo.atomic(|repo| -> ServiceResult<bool> {
            let mut employees = self.load_employees(repo, workspace)?;
            let Some(slot) = employees.iter_mut().find(|item| item.id == employee.id) else {
                return Ok(false);
            };
            *slot = employee;
            store(repo, workspace, EntityKind::Employees, &employees)?;
            Ok(true)
        })?;

        if updated {
            self.ctx.notify(workspace, EntityKind::Employees);
        }
        Ok(updated)
    }

    /// Removes an employee and strips their name from the draft attendees.
    ///
    /// Returns the updated employee list. Observers are notified before this
    /// returns, but callers should rely on the return value rather than on a
    /// refetch triggered by the notification.
    pub fn remove_employee(
        &self,
        workspace: &WorkspaceId,
        employee_id: EmployeeId,
    ) -> ServiceResult<Vec<Employee>> {
        let (employees, removed, draft_changed) =
            self.repo.atomic(|repo| -> ServiceResult<(Vec<Employee>, bool, bool)> {
                let mut employees = self.load_employees(repo, workspace)?;
                let Some(index) = employees.iter().position(|item| item.id == employee_id) else {
                    return Ok((employees, false, false));
                };
                let removed = employees.remove(index);
                store(repo, workspace, EntityKind::Employees, &employees)?;

                let mut draft_changed = false;
                if let Some(mut draft) =
                    load_single::<_, MeetingDraft>(repo, workspace, EntityKind::Draft)?
                {
                    if draft.remove_attendee(&removed.name) {
                        store(repo, workspace, EntityKind::Draft, &draft)?;
                        draft_changed = true;
                    }
                }
                Ok((employees, true, draft_changed))
            })?;

        if removed {
            debug!(
                "event=employee_remove module=service status=ok workspace={workspace} draft_cascade={draft_changed}"
            );
            self.ctx.notify(workspace, EntityKind::Employees);
            if draft_changed {
                self.ctx.notify(workspace, EntityKind::Draft);
            }
        }
        Ok(employees)
    }

    // ---- meetings --------------------------------------------------------

    pub fn meetings(&self, workspace: &WorkspaceId) -> ServiceResult<Vec<Meeting>> {
        Ok(load_meetings(&self.repo, workspace)?)
    }

    pub fn get_meeting(
        &self,
        workspace: &WorkspaceId,
        meeting_id: MeetingId,
    ) -> ServiceResult<Option<Meeting>> {
        Ok(load_meetings(&self.repo, workspace)?
            .into_iter()
            .find(|meeting| meeting.id == meeting_id))
    }

    /// Appends a meeting with all embedded notes, actions and decisions.
    ///
    /// Derives the week number, links embedded items to the meeting and
    /// allocates codes for items without one. Embedded codes supplied by the
    /// caller are kept as-is and not checked for uniqueness.
    pub fn save_meeting(
        &self,
        workspace: &WorkspaceId,
        meeting: Meeting,
    ) -> ServiceResult<Meeting> {
        let saved = self
            .repo
            .atomic(|repo| self.append_meeting(repo, workspace, meeting))?;

        debug!(
            "event=meeting_save module=service status=ok workspace={workspace} actions={} decisions={}",
            saved.actions.len(),
            saved.decisions.len()
        );
        self.ctx.notify(workspace, EntityKind::Meetings);
        Ok(saved)
    }

    /// Replaces the notes of one meeting; `false` when the meeting is absent.
    pub fn update_meeting_notes(
        &self,
        workspace: &WorkspaceId,
        meeting_id: MeetingId,
        notes: Vec<Note>,
    ) -> ServiceResult<bool> {
        self.modify_meeting(workspace, meeting_id, move |meeting| {
            meeting.notes = notes;
            true
        })
    }

    /// Removes an action from a meeting, or from the legacy list when
    /// `meeting_id` is `None`.
    pub fn remove_action(
        &self,
        workspace: &WorkspaceId,
        meeting_id: Option<MeetingId>,
        action_id: ActionId,
    ) -> ServiceResult<bool> {
        match meeting_id {
            Some(meeting_id) => self.modify_meeting(workspace, meeting_id, |meeting| {
                remove_by(&mut meeting.actions, |action| action.id == action_id)
            }),
            None => self.modify_legacy::<Action, _>(workspace, EntityKind::LegacyActions, |actions| {
                remove_by(actions, |action| action.id == action_id)
            }),
        }
    }

    /// Removes a decision, routed like `remove_action`.
    pub fn remove_decision(
        &self,
        workspace: &WorkspaceId,
        meeting_id: Option<MeetingId>,
        decision_id: DecisionId,
    ) -> ServiceResult<bool> {
        match meeting_id {
            Some(meeting_id) => self.modify_meeting(workspace, meeting_id, |meeting| {
                remove_by(&mut meeting.decisions, |decision| decision.id == decision_id)
            }),
            None => {
                self.modify_legacy::<Decision, _>(workspace, EntityKind::LegacyDecisions, |decisions| {
                    remove_by(decisions, |decision| decision.id == decision_id)
                })
            }
        }
    }

    /// Moves an action to `status`, stamping today's date on `Done`.
    pub fn update_action_status(
        &self,
        workspace: &WorkspaceId,
        meeting_id: Option<MeetingId>,
        action_id: ActionId,
        status: ActionStatus,
    ) -> ServiceResult<bool> {
        let today = self.ctx.clock().today();
        let apply = |actions: &mut Vec<Action>| match actions
            .iter_mut()
            .find(|action| action.id == action_id)
        {
            Some(action) => {
                action.transition(status, today);
                true
            }
            None => false,
        };

        match meeting_id {
            Some(meeting_id) => {
                self.modify_meeting(workspace, meeting_id, |meeting| apply(&mut meeting.actions))
            }
            None => self.modify_legacy::<Action, _>(workspace, EntityKind::LegacyActions, apply),
        }
    }

    // ---- legacy imports ----------------------------------------------------

    pub fn legacy_actions(&self, workspace: &WorkspaceId) -> ServiceResult<Vec<Action>> {
        Ok(load_list(&self.repo, workspace, EntityKind::LegacyActions)?)
    }

    pub fn legacy_decisions(&self, workspace: &WorkspaceId) -> ServiceResult<Vec<Decision>> {
        Ok(load_list(&self.repo, workspace, EntityKind::LegacyDecisions)?)
    }

    /// Appends one unlinked action, assigning a code when it has none.
    pub fn save_legacy_action(
        &self,
        workspace: &WorkspaceId,
        action: Action,
    ) -> ServiceResult<Action> {
        let mut saved = self.import_legacy_actions(workspace, vec![action])?;
        saved
            .pop()
            .ok_or_else(|| ServiceError::InvalidInput("legacy action was not stored".to_string()))
    }

    /// Appends one unlinked decision, assigning a code when it has none.
    pub fn save_legacy_decision(
        &self,
        workspace: &WorkspaceId,
        decision: Decision,
    ) -> ServiceResult<Decision> {
        let mut saved = self.import_legacy_decisions(workspace, vec![decision])?;
        saved.pop().ok_or_else(|| {
            ServiceError::InvalidInput("legacy decision was not stored".to_string())
        })
    }

    /// Bulk-appends unlinked actions in one write.
    pub fn import_legacy_actions(
        &self,
        workspace: &WorkspaceId,
        mut actions: Vec<Action>,
    ) -> ServiceResult<Vec<Action>> {
        if actions.is_empty() {
            return Ok(actions);
        }
        let today = self.ctx.clock().today();
        for action in &mut actions {
            action.meeting_id = None;
            action.legacy = true;
            action.normalize_completion(today);
        }

        let saved = self.repo.atomic(|repo| -> ServiceResult<Vec<Action>> {
            self.assign_action_codes(repo, workspace, &mut actions)?;
            let mut legacy: Vec<Action> = load_list(repo, workspace, EntityKind::LegacyActions)?;
            legacy.extend(actions.iter().cloned());
            store(repo, workspace, EntityKind::LegacyActions, &legacy)?;
            Ok(actions)
        })?;

        debug!(
            "event=legacy_import module=service status=ok workspace={workspace} kind=actions count={}",
            saved.len()
        );
        self.ctx.notify(workspace, EntityKind::LegacyActions);
        Ok(saved)
    }

    /// Bulk-appends unlinked decisions in one write.
    pub fn import_legacy_decisions(
        &self,
        workspace: &WorkspaceId,
        mut decisions: Vec<Decision>,
    ) -> ServiceResult<Vec<Decision>> {
        if decisions.is_empty() {
            return Ok(decisions);
        }
        for decision in &mut decisions {
            decision.meeting_id = None;
            decision.legacy = true;
        }

        let saved = self.repo.atomic(|repo| -> ServiceResult<Vec<Decision>> {
            self.assign_decision_codes(repo, workspace, &mut decisions)?;
            let mut legacy: Vec<Decision> =
                load_list(repo, workspace, EntityKind::LegacyDecisions)?;
            legacy.extend(decisions.iter().cloned());
            store(repo, workspace, EntityKind::LegacyDecisions, &legacy)?;
            Ok(decisions)
        })?;

        debug!(
            "event=legacy_import module=service status=ok workspace={workspace} kind=decisions count={}",
            saved.len()
        );
        self.ctx.notify(workspace, EntityKind::LegacyDecisions);
        Ok(saved)
    }

    // ---- draft -----------------------------------------------------------

    pub fn get_draft(&self, workspace: &WorkspaceId) -> ServiceResult<Option<MeetingDraft>> {
        Ok(load_single(&self.repo, workspace, EntityKind::Draft)?)
    }

    /// Overwrites the single draft of the workspace.
    pub fn save_draft(&self, workspace: &WorkspaceId, draft: &MeetingDraft) -> ServiceResult<()> {
        store(&self.repo, workspace, EntityKind::Draft, draft)?;
        self.ctx.notify(workspace, EntityKind::Draft);
        Ok(())
    }

    /// Discards the draft. Notifies even when none existed, matching the
    /// unconditional-reset semantics of the other singletons.
    pub fn clear_draft(&self, workspace: &WorkspaceId) -> ServiceResult<bool> {
        let existed = remove(&self.repo, workspace, EntityKind::Draft)?;
        self.ctx.notify(workspace, EntityKind::Draft);
        Ok(existed)
    }

    /// Turns the draft into a saved meeting and deletes the draft, in one
    /// write. Returns `None` when there is no draft.
    pub fn commit_draft(
        &self,
        workspace: &WorkspaceId,
        duration_secs: Option<u64>,
    ) -> ServiceResult<Option<Meeting>> {
        let today = self.ctx.clock().today();
        let committed = self.repo.atomic(|repo| -> ServiceResult<Option<Meeting>> {
            let Some(draft) = load_single::<_, MeetingDraft>(repo, workspace, EntityKind::Draft)?
            else {
                return Ok(None);
            };
            let mut meeting = draft.into_meeting(today);
            meeting.duration_secs = duration_secs;
            let saved = self.append_meeting(repo, workspace, meeting)?;
            remove(repo, workspace, EntityKind::Draft)?;
            Ok(Some(saved))
        })?;

        if committed.is_some() {
            debug!("event=draft_commit module=service status=ok workspace={workspace}");
            self.ctx.notify(workspace, EntityKind::Meetings);
            self.ctx.notify(workspace, EntityKind::Draft);
        }
        Ok(committed)
    }

    // ---- internals -------------------------------------------------------

    fn load_employees(&self, repo: &R, workspace: &WorkspaceId) -> RepoResult<Vec<Employee>> {
        Ok(load_single(repo, workspace, EntityKind::Employees)?
            .unwrap_or_else(|| self.ctx.config().seeded_employees()))
    }

    fn append_meeting(
        &self,
        repo: &R,
        workspace: &WorkspaceId,
        mut meeting: Meeting,
    ) -> ServiceResult<Meeting> {
        meeting.normalize();
        let today = self.ctx.clock().today();
        for action in &mut meeting.actions {
            action.normalize_completion(today);
        }
        self.assign_action_codes(repo, workspace, &mut meeting.actions)?;
        self.assign_decision_codes(repo, workspace, &mut meeting.decisions)?;

        let mut meetings = load_meetings(repo, workspace)?;
        meetings.push(meeting.clone());
        store(repo, workspace, EntityKind::Meetings, &meetings)?;
        Ok(meeting)
    }

    fn assign_action_codes(
        &self,
        repo: &R,
        workspace: &WorkspaceId,
        actions: &mut [Action],
    ) -> RepoResult<()> {
        if actions.iter().all(|action| !action.code.is_empty()) {
            return Ok(());
        }
        let existing = collect_actions(repo, workspace)?.len() as u64;
        for action in actions.iter_mut().filter(|action| action.code.is_empty()) {
            let number = repo.next_code(workspace, ACTION_CODE_PREFIX, existing)?;
            action.code = format_code(ACTION_CODE_PREFIX, number, self.ctx.config().code_width);
        }
        Ok(())
    }

    fn assign_decision_codes(
        &self,
        repo: &R,
        workspace: &WorkspaceId,
        decisions: &mut [Decision],
    ) -> RepoResult<()> {
        if decisions.iter().all(|decision| !decision.code.is_empty()) {
            return Ok(());
        }
        let existing = collect_decisions(repo, workspace)?.len() as u64;
        for decision in decisions
            .iter_mut()
            .filter(|decision| decision.code.is_empty())
        {
            let number = repo.next_code(workspace, DECISION_CODE_PREFIX, existing)?;
            decision.code =
                format_code(DECISION_CODE_PREFIX, number, self.ctx.config().code_width);
        }
        Ok(())
    }

    /// Applies `change` to one meeting; writes and notifies only if it
    /// reports a modification.
    fn modify_meeting<F>(
        &self,
        workspace: &WorkspaceId,
        meeting_id: MeetingId,
        change: F,
    ) -> ServiceResult<bool>
    where
        F: FnOnce(&mut Meeting) -> bool,
    {
        let changed = self.repo.atomic(|repo| -> ServiceResult<bool> {
            let mut meetings = load_meetings(repo, workspace)?;
            let Some(meeting) = meetings.iter_mut().find(|meeting| meeting.id == meeting_id)
            else {
                debug!(
                    "event=meeting_modify module=service status=noop reason=meeting_not_found workspace={workspace}"
                );
                return Ok(false);
            };
            if !change(meeting) {
                return Ok(false);
            }
            store(repo, workspace, EntityKind::Meetings, &meetings)?;
            Ok(true)
        })?;

        if changed {
            self.ctx.notify(workspace, EntityKind::Meetings);
        }
        Ok(changed)
    }

    fn modify_legacy<T, F>(
        &self,
        workspace: &WorkspaceId,
        kind: EntityKind,
        change: F,
    ) -> ServiceResult<bool>
    where
        T: DeserializeOwned + Serialize,
        F: FnOnce(&mut Vec<T>) -> bool,
    {
        let changed = self.repo.atomic(|repo| -> ServiceResult<bool> {
            let mut items: Vec<T> = load_list(repo, workspace, kind)?;
            if !change(&mut items) {
                return Ok(false);
            }
            store(repo, workspace, kind, &items)?;
            Ok(true)
        })?;

        if changed {
            self.ctx.notify(workspace, kind);
        }
        Ok(changed)
    }
}

fn remove_by<T>(items: &mut Vec<T>, predicate: impl Fn(&T) -> bool) -> bool {
    let before = items.len();
    items.retain(|item| !predicate(item));
    items.len() != before
}

fn normalize_employee(employee: &mut Employee) {
    employee.name = employee.name.trim().to_string();
    employee.role = employee
        .role
        .take()
        .map(|role| role.trim().to_string())
        .filter(|role| !role.is_empty());
    employee.email = employee
        .email
        .take()
        .map(|email| email.trim().to_string())
        .filter(|email| !email.is_empty());
}

fn validate_employee(employee: &Employee) -> ServiceResult<()> {
    if employee.name.trim().is_empty() {
        return Err(ServiceError::InvalidInput(
            "employee name must not be blank".to_string(),
        ));
    }
    Ok(())
}
