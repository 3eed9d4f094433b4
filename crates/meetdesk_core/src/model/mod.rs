//! Domain records persisted per workspace.
//!
//! # Responsibility
//! - Define the serialized shapes stored as whole-collection blobs.
//! - Keep field naming compatible with the camelCase blob layout.
//!
//! # Invariants
//! - Every entity carries a stable `Uuid` identity.
//! - `Action::completed_at` is set if and only if the status is `Done`.

pub mod action;
pub mod decision;
pub mod employee;
pub mod kind;
pub mod meeting;
pub mod session;
pub mod workspace;
