//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate read-modify-write sequences over the key-value repository.
//! - Emit one change event per committed mutation.
//! - Keep callers decoupled from storage keys and blob layout.
//!
//! # Invariants
//! - Every workspace-scoped call takes an explicit `WorkspaceId`.
//! - Mutations commit before they notify; reads never notify. A caller that
//!   wraps service calls in its own `KvRepository::atomic` defers that commit
//!   and receives the events first.
//! - Missing targets are a silent no-op reported as `false`.

pub mod aggregation_service;
mod collections;
pub mod context;
pub mod entity_service;
pub mod presence_service;
pub mod timer_service;
pub mod voting_service;
pub mod workspace_service;

use crate::repo::kv_repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors from store services.
#[derive(Debug)]
pub enum ServiceError {
    /// Caller input violates a record invariant (e.g. blank employee name).
    InvalidInput(String),
    /// Persistence-layer failure, including optimistic write conflicts.
    Repo(RepoError),
}

impl ServiceError {
    /// Returns whether this error is a lost optimistic write.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Repo(RepoError::Conflict { .. }))
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::InvalidInput(_) => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}
