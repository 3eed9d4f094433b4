use chrono::NaiveDate;
use meetdesk_core::db::open_db_in_memory;
use meetdesk_core::{
    Action, ActionStatus, AggregationService, ChangeBus, Decision, Employee, EntityService,
    ManualClock, Meeting, MeetingDraft, MeetingType, Note, ServiceContext, ServiceError,
    SqliteKvRepository, StoreConfig, WorkspaceId,
};
use rusqlite::Connection;
use std::sync::Arc;

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn context(today: NaiveDate) -> ServiceContext {
    ServiceContext::new(
        ChangeBus::new(),
        Arc::new(ManualClock::at_date(today)),
        StoreConfig::default(),
    )
}

fn team() -> WorkspaceId {
    WorkspaceId::parse_or("team", "default")
}

fn service(conn: &Connection, today: NaiveDate) -> EntityService<SqliteKvRepository<'_>> {
    EntityService::new(SqliteKvRepository::new(conn), context(today))
}

#[test]
fn unpersisted_employees_default_to_seed_list_without_writing() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn, date(2025, 1, 6));

    let employees = service.employees(&team()).unwrap();
    assert_eq!(employees, StoreConfig::default().seeded_employees());
    let snapshot = service.employees_snapshot(&team()).unwrap();
    assert_eq!(snapshot.version, None);
}

#[test]
fn add_employee_assigns_color_and_rejects_blank_names() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn, date(2025, 1, 6));

    let alice = service
        .add_employee(&team(), Employee::new("  Alice ").with_role("  "))
        .unwrap();
    assert_eq!(alice.name, "Alice");
    assert_eq!(alice.role, None);
    assert!(!alice.color.is_empty());

    let err = service.add_employee(&team(), Employee::new("   ")).unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));
}

#[test]
fn update_employee_is_noop_for_unknown_id() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn, date(2025, 1, 6));
    let alice = service.add_employee(&team(), Employee::new("Alice")).unwrap();

    let renamed = Employee {
        name: "Alicia".to_string(),
        ..alice.clone()
    };
    assert!(service.update_employee(&team(), renamed).unwrap());
    assert!(!service
        .update_employee(&team(), Employee::new("Ghost"))
        .unwrap());

    let names: Vec<String> = service
        .employees(&team())
        .unwrap()
        .into_iter()
        .map(|employee| employee.name)
        .collect();
    assert!(names.contains(&"Alicia".to_string()));
    assert!(!names.contains(&"Ghost".to_string()));
}

#[test]
fn remove_employee_cascades_to_draft_attendees() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn, date(2025, 1, 6));
    let alice = service.add_employee(&team(), Employee::new("Alice")).unwrap();
    service.add_employee(&team(), Employee::new("Bob")).unwrap();

    let mut draft = MeetingDraft::new(MeetingType::Weekly);
    draft.attendees = vec!["Alice".to_string(), "Bob".to_string()];
    service.save_draft(&team(), &draft).unwrap();

    let remaining = service.remove_employee(&team(), alice.id).unwrap();
    assert!(remaining.iter().all(|employee| employee.id != alice.id));
    assert_eq!(remaining, service.employees(&team()).unwrap());

    let draft = service.get_draft(&team()).unwrap().unwrap();
    assert_eq!(draft.attendees, vec!["Bob".to_string()]);
}

#[test]
fn replace_employees_detects_concurrent_writers() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn, date(2025, 1, 6));

    let first = service.employees_snapshot(&team()).unwrap();
    let second = service.employees_snapshot(&team()).unwrap();

    let mut edited = first.value.clone();
    edited.push(Employee::new("Alice"));
    assert_eq!(
        service
            .replace_employees(&team(), first.version, &edited)
            .unwrap(),
        1
    );

    let mut stale = second.value.clone();
    stale.push(Employee::new("Bob"));
    let err = service
        .replace_employees(&team(), second.version, &stale)
        .unwrap_err();
    assert!(err.is_conflict());

    let names: Vec<String> = service
        .employees(&team())
        .unwrap()
        .into_iter()
        .map(|employee| employee.name)
        .collect();
    assert!(names.contains(&"Alice".to_string()));
    assert!(!names.contains(&"Bob".to_string()));
}

#[test]
fn follow_up_action_round_trips_through_meeting() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteKvRepository::new(&conn);
    let ctx = context(date(2025, 1, 6));
    let entities = EntityService::new(repo, ctx.clone());
    let aggregation = AggregationService::new(repo, ctx);

    entities.add_employee(&team(), Employee::new("Alice")).unwrap();
    entities.add_employee(&team(), Employee::new("Bob")).unwrap();

    let mut meeting = Meeting::new(date(2025, 1, 6), MeetingType::Weekly);
    meeting.actions.push(
        Action::new("Follow up")
            .with_owners(["Alice"])
            .with_deadline(date(2025, 1, 10)),
    );
    let saved = entities.save_meeting(&team(), meeting).unwrap();

    let actions = aggregation.all_actions(&team()).unwrap();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].title, "Follow up");
    assert_eq!(actions[0].owners, vec!["Alice".to_string()]);
    assert_eq!(actions[0].meeting_id, Some(saved.id));

    assert!(entities
        .remove_action(&team(), Some(saved.id), actions[0].id)
        .unwrap());
    assert!(aggregation.all_actions(&team()).unwrap().is_empty());
}

#[test]
fn save_meeting_derives_week_links_items_and_allocates_codes() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn, date(2025, 1, 6));

    let mut meeting = Meeting::new(date(2025, 1, 10), MeetingType::Special);
    meeting.week = 0;
    meeting.actions.push(Action::new("Book room"));
    meeting.actions.push(Action::new("Send agenda"));
    meeting
        .decisions
        .push(Decision::new("Adopt plan", date(2025, 1, 10)));
    let saved = service.save_meeting(&team(), meeting).unwrap();

    assert_eq!(saved.week, 2);
    let codes: Vec<&str> = saved.actions.iter().map(|action| action.code.as_str()).collect();
    assert_eq!(codes, vec!["ACT-001", "ACT-002"]);
    assert_eq!(saved.decisions[0].code, "DEC-001");
    assert!(saved
        .actions
        .iter()
        .all(|action| action.meeting_type == Some(MeetingType::Special) && !action.legacy));

    let stored = service.get_meeting(&team(), saved.id).unwrap().unwrap();
    assert_eq!(stored, saved);
}

#[test]
fn codes_keep_counting_after_deletions() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn, date(2025, 1, 6));

    let first = service
        .save_legacy_action(&team(), Action::new("One"))
        .unwrap();
    let second = service
        .save_legacy_action(&team(), Action::new("Two"))
        .unwrap();
    assert!(service.remove_action(&team(), None, second.id).unwrap());

    let third = service
        .save_legacy_action(&team(), Action::new("Three"))
        .unwrap();
    assert_eq!(first.code, "ACT-001");
    assert_eq!(second.code, "ACT-002");
    assert_eq!(third.code, "ACT-003");
}

#[test]
fn codes_seed_from_records_written_before_counters_existed() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn, date(2025, 1, 6));

    let mut older = Action::new("Older item");
    older.code = "ACT-040".to_string();
    let mut old = Action::new("Old item");
    old.code = "ACT-041".to_string();
    service
        .import_legacy_actions(&team(), vec![older, old])
        .unwrap();

    let fresh = service
        .save_legacy_action(&team(), Action::new("New item"))
        .unwrap();
    assert_eq!(fresh.code, "ACT-003");
}

#[test]
fn action_status_done_stamps_and_open_clears_completion_date() {
    let conn = open_db_in_memory().unwrap();
    let today = date(2025, 2, 14);
    let service = service(&conn, today);

    let mut meeting = Meeting::new(date(2025, 2, 10), MeetingType::Weekly);
    meeting.actions.push(Action::new("Draft budget"));
    let saved = service.save_meeting(&team(), meeting).unwrap();
    let action_id = saved.actions[0].id;

    assert!(service
        .update_action_status(&team(), Some(saved.id), action_id, ActionStatus::Done)
        .unwrap());
    let done = service.get_meeting(&team(), saved.id).unwrap().unwrap();
    assert_eq!(done.actions[0].status, ActionStatus::Done);
    assert_eq!(done.actions[0].completed_at, Some(today));

    assert!(service
        .update_action_status(&team(), Some(saved.id), action_id, ActionStatus::Open)
        .unwrap());
    let reopened = service.get_meeting(&team(), saved.id).unwrap().unwrap();
    assert_eq!(reopened.actions[0].status, ActionStatus::Open);
    assert_eq!(reopened.actions[0].completed_at, None);
}

#[test]
fn null_meeting_reference_routes_to_legacy_collections() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn, date(2025, 3, 1));

    let action = service
        .save_legacy_action(&team(), Action::new("Legacy task"))
        .unwrap();
    let decision = service
        .save_legacy_decision(&team(), Decision::new("Legacy call", date(2024, 12, 1)))
        .unwrap();
    assert!(action.legacy && action.meeting_id.is_none());
    assert_eq!(decision.code, "DEC-001");

    assert!(service
        .update_action_status(&team(), None, action.id, ActionStatus::InProgress)
        .unwrap());
    assert_eq!(
        service.legacy_actions(&team()).unwrap()[0].status,
        ActionStatus::InProgress
    );

    assert!(service.remove_decision(&team(), None, decision.id).unwrap());
    assert!(service.legacy_decisions(&team()).unwrap().is_empty());
}

#[test]
fn missing_targets_are_silent_noops() {
    let conn = open_db_in_memory().unwrap();
    let ctx = context(date(2025, 3, 1));
    let (_, events) = ctx.bus().subscribe_channel();
    let service = EntityService::new(SqliteKvRepository::new(&conn), ctx.clone());

    let ghost_meeting = uuid::Uuid::new_v4();
    let ghost_item = uuid::Uuid::new_v4();
    assert!(!service
        .update_meeting_notes(&team(), ghost_meeting, vec![Note::new("Intro", "")])
        .unwrap());
    assert!(!service
        .remove_action(&team(), Some(ghost_meeting), ghost_item)
        .unwrap());
    assert!(!service.remove_decision(&team(), None, ghost_item).unwrap());
    assert!(!service
        .update_action_status(&team(), None, ghost_item, ActionStatus::Done)
        .unwrap());
    assert!(service.remove_employee(&team(), ghost_item).unwrap().len() == 1);

    assert_eq!(events.try_iter().count(), 0);
    assert!(service.meetings(&team()).unwrap().is_empty());
}

#[test]
fn update_meeting_notes_replaces_the_whole_list() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn, date(2025, 3, 1));

    let mut meeting = Meeting::new(date(2025, 3, 1), MeetingType::Weekly);
    meeting.notes = vec![Note::new("Old", "stale"), Note::new("Older", "")];
    let saved = service.save_meeting(&team(), meeting).unwrap();

    let notes = vec![Note::new("Roadmap", "Ship Q2 scope")];
    assert!(service
        .update_meeting_notes(&team(), saved.id, notes.clone())
        .unwrap());
    assert_eq!(
        service.get_meeting(&team(), saved.id).unwrap().unwrap().notes,
        notes
    );
}

#[test]
fn commit_draft_creates_meeting_and_clears_draft() {
    let conn = open_db_in_memory().unwrap();
    let today = date(2025, 4, 2);
    let service = service(&conn, today);

    assert!(service.commit_draft(&team(), None).unwrap().is_none());

    let mut draft = MeetingDraft::new(MeetingType::Weekly);
    draft.attendees = vec!["Alice".to_string()];
    draft.actions.push(Action::new("Write summary"));
    service.save_draft(&team(), &draft).unwrap();

    let meeting = service.commit_draft(&team(), Some(1_800)).unwrap().unwrap();
    assert_eq!(meeting.date, today);
    assert_eq!(meeting.duration_secs, Some(1_800));
    assert_eq!(meeting.actions[0].code, "ACT-001");
    assert_eq!(meeting.actions[0].meeting_id, Some(meeting.id));

    assert!(service.get_draft(&team()).unwrap().is_none());
    assert_eq!(service.meetings(&team()).unwrap(), vec![meeting]);
}

#[test]
fn clear_draft_reports_whether_draft_existed() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn, date(2025, 4, 2));

    assert!(!service.clear_draft(&team()).unwrap());
    service
        .save_draft(&team(), &MeetingDraft::new(MeetingType::Special))
        .unwrap();
    assert!(service.clear_draft(&team()).unwrap());
    assert!(service.get_draft(&team()).unwrap().is_none());
}

#[test]
fn completion_date_tracks_done_status_on_every_save_path() {
    let conn = open_db_in_memory().unwrap();
    let today = date(2025, 1, 20);
    let earlier = date(2025, 1, 10);
    let service = service(&conn, today);

    let mut done_undated = Action::new("Send invoice");
    done_undated.status = ActionStatus::Done;
    let mut open_dated = Action::new("Chase supplier");
    open_dated.completed_at = Some(earlier);
    let mut done_dated = Action::new("Close ticket");
    done_dated.status = ActionStatus::Done;
    done_dated.completed_at = Some(earlier);

    let mut meeting = Meeting::new(today, MeetingType::Weekly);
    meeting.actions = vec![done_undated.clone(), open_dated.clone(), done_dated];
    let saved = service.save_meeting(&team(), meeting).unwrap();
    assert_eq!(saved.actions[0].completed_at, Some(today));
    assert_eq!(saved.actions[1].completed_at, None);
    assert_eq!(saved.actions[2].completed_at, Some(earlier));
    let stored = service.get_meeting(&team(), saved.id).unwrap().unwrap();
    assert_eq!(stored.actions, saved.actions);

    let legacy = service
        .save_legacy_action(&team(), done_undated.clone())
        .unwrap();
    assert_eq!(legacy.completed_at, Some(today));
    let mut imported = Action::new("Stale import");
    imported.status = ActionStatus::InProgress;
    imported.completed_at = Some(earlier);
    let imported = service
        .import_legacy_actions(&team(), vec![imported])
        .unwrap();
    assert_eq!(imported[0].completed_at, None);
    assert!(service
        .legacy_actions(&team())
        .unwrap()
        .iter()
        .all(|action| action.completed_at.is_some() == (action.status == ActionStatus::Done)));

    let mut draft = MeetingDraft::new(MeetingType::Special);
    draft.actions = vec![done_undated, open_dated];
    service.save_draft(&team(), &draft).unwrap();
    let committed = service.commit_draft(&team(), None).unwrap().unwrap();
    assert_eq!(committed.actions[0].completed_at, Some(today));
    assert_eq!(committed.actions[1].completed_at, None);
}
