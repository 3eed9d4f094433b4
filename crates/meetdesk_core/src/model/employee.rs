//! Employee (meeting participant) record.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type EmployeeId = Uuid;

/// Display colors cycled through when an employee is added without one.
pub const EMPLOYEE_COLOR_PALETTE: &[&str] = &[
    "#2563eb", "#16a34a", "#db2777", "#ea580c", "#7c3aed", "#0891b2", "#ca8a04", "#dc2626",
];

/// Participant that can attend meetings and own actions/decisions.
///
/// Meetings reference employees by `name` (by value), so renaming an
/// employee does not rewrite historical meetings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// CSS-style color tag used by avatars and charts.
    #[serde(default)]
    pub color: String,
}

impl Employee {
    /// Creates an employee with a fresh id and no color assigned yet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            role: None,
            email: None,
            color: String::new(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }
}

/// Picks the palette color for the `index`-th employee.
pub fn palette_color(index: usize) -> &'static str {
    EMPLOYEE_COLOR_PALETTE[index % EMPLOYEE_COLOR_PALETTE.len()]
}
