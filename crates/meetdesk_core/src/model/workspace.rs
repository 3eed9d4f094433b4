//! Workspace namespace identifier.
//!
//! # Invariants
//! - A `WorkspaceId` only contains `[a-z0-9_-]`.
//! - Sanitization is total and idempotent; it never fails.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

static DISALLOWED_CHARS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9_-]+").expect("valid workspace charset regex"));

/// Query parameter names recognized as an explicit workspace override.
const WORKSPACE_QUERY_KEYS: &[&str] = &["workspace", "ws"];

/// Sanitized namespace handle passed into every store call.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceId(String);

impl WorkspaceId {
    /// Sanitizes `raw`, falling back to `default` when nothing survives.
    ///
    /// `default` is sanitized too, so the result always satisfies the
    /// charset invariant (it may be empty only if `default` is).
    pub fn parse_or(raw: &str, default: &str) -> Self {
        let sanitized = sanitize_workspace_id(raw);
        if sanitized.is_empty() {
            Self(sanitize_workspace_id(default))
        } else {
            Self(sanitized)
        }
    }

    /// Sanitizes `raw`; returns `None` when nothing survives.
    pub fn try_new(raw: &str) -> Option<Self> {
        let sanitized = sanitize_workspace_id(raw);
        if sanitized.is_empty() {
            None
        } else {
            Some(Self(sanitized))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for WorkspaceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for WorkspaceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Lowercases and strips everything outside `[a-z0-9_-]`.
pub fn sanitize_workspace_id(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    DISALLOWED_CHARS_RE.replace_all(&lowered, "").into_owned()
}

/// Extracts the raw workspace override from a URL query string.
///
/// Accepts `?workspace=x` or `?ws=x`, with or without the leading `?`.
/// Returns the first non-empty value; the value is not sanitized here.
pub fn workspace_from_query(query: &str) -> Option<String> {
    let query = query.split_once('?').map_or(query, |(_, rest)| rest);
    let query = query.split('#').next().unwrap_or_default();
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, value)| WORKSPACE_QUERY_KEYS.contains(key) && !value.is_empty())
        .map(|(_, value)| value.replace('+', " "))
}
