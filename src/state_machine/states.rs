use serde::{Deserialize, Serialize};
use std::fmt;

/// Review-task status definitions.
///
/// The four-state lifecycle is `Incomplete -> InProgress -> Verifying ->
/// Completed`, with a back-edge from Verifying on verification failure and a
/// bulk administrative back-edge out of Completed when the owning image is
/// uncompleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Initial status when a task is created or assigned
    Incomplete,
    /// A reviewer is actively working the task
    InProgress,
    /// Review finished, awaiting verification
    Verifying,
    /// Verification passed; terminal
    Completed,
}

impl TaskStatus {
    /// Check if this is the terminal status (counts toward image completion)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Check if this status counts toward a reviewer's active workload
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Incomplete => write!(f, "incomplete"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Verifying => write!(f, "verifying"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "incomplete" => Ok(Self::Incomplete),
            "in_progress" => Ok(Self::InProgress),
            "verifying" => Ok(Self::Verifying),
            "completed" => Ok(Self::Completed),
            _ => Err(format!("Invalid task status: {s}")),
        }
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Incomplete
    }
}
