//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the key-value contract every service persists through.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Values are whole-collection blobs; there are no per-record keys.
//! - Repository APIs surface conflicts and corrupt data as errors instead of
//!   silently substituting defaults.

pub mod kv_repo;
