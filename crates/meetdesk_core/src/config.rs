//! Store configuration.
//!
//! # Responsibility
//! - Hold tunables shared by all services (default workspace, presence
//!   windows, seed employees, code width).
//! - Load overrides from JSON; every missing field keeps its default.
//!
//! # Invariants
//! - `presence_active_window_ms <= presence_prune_window_ms` after
//!   `validate()`; a record is never pruned while still counted as active.

use crate::model::employee::{palette_color, Employee};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use uuid::Uuid;

pub const DEFAULT_WORKSPACE: &str = "default";
/// Heartbeats older than this are garbage-collected.
pub const PRESENCE_PRUNE_WINDOW_MS: i64 = 2 * 60 * 1000;
/// Heartbeats newer than this count as active participants.
pub const PRESENCE_ACTIVE_WINDOW_MS: i64 = 60 * 1000;
pub const DEFAULT_CODE_WIDTH: usize = 3;

/// Employee entry used to seed an empty workspace.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EmployeeSeed {
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read store config: {err}"),
            Self::Parse(err) => write!(f, "failed to parse store config: {err}"),
            Self::Invalid(message) => write!(f, "invalid store config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

/// Tunables for the workspace store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Literal used when neither an override nor a remembered workspace exists.
    pub default_workspace: String,
    pub presence_prune_window_ms: i64,
    pub presence_active_window_ms: i64,
    /// Minimum digit count of action/decision codes.
    pub code_width: usize,
    /// Employee list returned before a workspace has persisted its own.
    pub seed_employees: Vec<EmployeeSeed>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_workspace: DEFAULT_WORKSPACE.to_string(),
            presence_prune_window_ms: PRESENCE_PRUNE_WINDOW_MS,
            presence_active_window_ms: PRESENCE_ACTIVE_WINDOW_MS,
            code_width: DEFAULT_CODE_WIDTH,
            seed_employees: vec![EmployeeSeed {
                name: "Facilitator".to_string(),
                role: Some("Chair".to_string()),
            }],
        }
    }
}

impl StoreConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.presence_active_window_ms <= 0 || self.presence_prune_window_ms <= 0 {
            return Err(ConfigError::Invalid(
                "presence windows must be positive".to_string(),
            ));
        }
        if self.presence_active_window_ms > self.presence_prune_window_ms {
            return Err(ConfigError::Invalid(format!(
                "presence active window {}ms exceeds prune window {}ms",
                self.presence_active_window_ms, self.presence_prune_window_ms
            )));
        }
        if crate::model::workspace::sanitize_workspace_id(&self.default_workspace).is_empty() {
            return Err(ConfigError::Invalid(
                "default_workspace must keep at least one [a-z0-9_-] character".to_string(),
            ));
        }
        if self.code_width == 0 {
            return Err(ConfigError::Invalid("code_width must be >= 1".to_string()));
        }
        Ok(())
    }

    /// Materializes the seed list with deterministic ids and palette colors.
    ///
    /// Ids are derived from the seed position so repeated reads of an
    /// unpersisted workspace return the same identities.
    pub fn seeded_employees(&self) -> Vec<Employee> {
        self.seed_employees
            .iter()
            .enumerate()
            .map(|(index, seed)| Employee {
                id: Uuid::from_u128(SEED_ID_BASE + index as u128),
                name: seed.name.clone(),
                role: seed.role.clone(),
                email: None,
                color: palette_color(index).to_string(),
            })
            .collect()
    }
}

const SEED_ID_BASE: u128 = 0x5eed_0000_0000_4000_8000_0000_0000_0000;

#[cfg(test)]
mod tests {
    use super::{StoreConfig, PRESENCE_ACTIVE_WINDOW_MS};

    #[test]
    fn partial_json_keeps_defaults() {
        let config = StoreConfig::from_json_str(r#"{"default_workspace":"board"}"#).unwrap();
        assert_eq!(config.default_workspace, "board");
        assert_eq!(config.presence_active_window_ms, PRESENCE_ACTIVE_WINDOW_MS);
    }

    #[test]
    fn inverted_presence_windows_are_rejected() {
        let err = StoreConfig::from_json_str(
            r#"{"presence_prune_window_ms":1000,"presence_active_window_ms":5000}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("exceeds"));
    }

    #[test]
    fn blank_default_workspace_is_rejected() {
        let err = StoreConfig::from_json_str(r#"{"default_workspace":"  !! "}"#).unwrap_err();
        assert!(err.to_string().contains("default_workspace"));
    }

    #[test]
    fn seeded_employees_are_stable() {
        let config = StoreConfig::default();
        assert_eq!(config.seeded_employees(), config.seeded_employees());
        assert!(!config.seeded_employees()[0].color.is_empty());
    }
}
