//! Core store for the meeting desk.
//!
//! Owns the persisted workspace data (employees, meetings, actions,
//! decisions, draft) and the live session state (timer, poll, presence),
//! plus the change bus that tells observers what to refetch.

pub mod clock;
pub mod config;
pub mod db;
pub mod events;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, StoreConfig};
pub use db::{open_db, open_db_in_memory, DbError};
pub use events::bus::{ChangeBus, ChangeEvent, SubscriptionId};
pub use logging::{
    default_log_level, init_logging, init_logging_with, logging_status, LoggingConfig,
    LoggingError,
};
pub use model::action::{Action, ActionId, ActionStatus};
pub use model::decision::{Decision, DecisionId};
pub use model::employee::{Employee, EmployeeId};
pub use model::kind::EntityKind;
pub use model::meeting::{ChecklistItem, Meeting, MeetingDraft, MeetingId, MeetingType, Note};
pub use model::session::{PresenceRecord, TimerState, VotingState};
pub use model::workspace::{sanitize_workspace_id, workspace_from_query, WorkspaceId};
pub use repo::kv_repo::{
    KvRepository, RepoError, RepoResult, SqliteKvRepository, StoreKey, Versioned,
};
pub use service::aggregation_service::{
    ActionOrder, ActionQuery, AggregationService, DecisionOrder, DecisionQuery,
};
pub use service::context::ServiceContext;
pub use service::entity_service::EntityService;
pub use service::presence_service::PresenceService;
pub use service::timer_service::TimerService;
pub use service::voting_service::{majority_reached, VotingService};
pub use service::workspace_service::WorkspaceService;
pub use service::{ServiceError, ServiceResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
