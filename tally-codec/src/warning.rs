//! Non-fatal integrity findings.

use std::fmt;

/// Something suspicious that does not stop processing.
///
/// Warnings are logged where they arise and also returned so callers can
/// put them in a run report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// Two or more tasks in one workflow share a name.
    DuplicateTaskName { name: String },
    /// An embedded task id could not be mapped; the reference was left as is.
    UnresolvedReference { task: String, reference: String },
    /// A linkage endpoint names a task that is not in the task map.
    UnknownLinkageTask { name: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::DuplicateTaskName { name } => write!(f, "duplicate task name '{name}'"),
            Warning::UnresolvedReference { task, reference } => {
                write!(f, "task '{task}': unresolved task id in '{reference}'")
            }
            Warning::UnknownLinkageTask { name } => {
                write!(f, "linkage refers to unknown task '{name}'")
            }
        }
    }
}
