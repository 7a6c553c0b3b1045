//! Run reports.

use std::fmt;

use tally_core::types::ArtifactKind;

/// The three phases of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Extract,
    Plan,
    Deploy,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Extract => write!(f, "extract"),
            Phase::Plan => write!(f, "plan"),
            Phase::Deploy => write!(f, "deploy"),
        }
    }
}

/// A unit (object, template, workflow, record) a step passed over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skip {
    pub unit: String,
    pub reason: String,
}

/// What one step did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepLog {
    pub processed: Vec<String>,
    pub skipped: Vec<Skip>,
    pub warnings: Vec<String>,
}

impl StepLog {
    pub fn processed(&mut self, unit: impl Into<String>) {
        self.processed.push(unit.into());
    }

    pub fn skip(&mut self, unit: impl Into<String>, reason: impl fmt::Display) {
        let skip = Skip {
            unit: unit.into(),
            reason: reason.to_string(),
        };
        tracing::warn!("skipping {}: {}", skip.unit, skip.reason);
        self.skipped.push(skip);
    }

    pub fn warn(&mut self, warning: impl fmt::Display) {
        self.warnings.push(warning.to_string());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Done(StepLog),
    /// Not selected in the request form.
    Skipped,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub kind: ArtifactKind,
    pub outcome: StepOutcome,
}

/// Per-kind outcome of one phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub phase: Phase,
    pub steps: Vec<StepReport>,
}

impl RunReport {
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            steps: Vec::new(),
        }
    }

    pub fn outcome(&self, kind: ArtifactKind) -> Option<&StepOutcome> {
        self.steps.iter().find(|s| s.kind == kind).map(|s| &s.outcome)
    }

    pub fn has_failures(&self) -> bool {
        self.steps
            .iter()
            .any(|s| matches!(s.outcome, StepOutcome::Failed(_)))
    }

    pub fn warnings(&self) -> impl Iterator<Item = &str> + '_ {
        self.steps
            .iter()
            .filter_map(|s| match &s.outcome {
                StepOutcome::Done(log) => Some(log),
                _ => None,
            })
            .flat_map(|log| log.warnings.iter())
            .map(String::as_str)
    }
}
