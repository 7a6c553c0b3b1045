//! # tally-sync
//!
//! Diff engine, per-kind extract/plan/deploy steps and the phase runner.
//!
//! Every step talks to the platform through a [`Context`] and reads or
//! writes the source-of-truth repository through [`writer`]. The three
//! entry points are [`extract`], [`plan`] and [`deploy`]; each returns a
//! [`RunReport`] with one outcome per artifact kind.

pub mod billing;
pub mod context;
pub mod diff;
pub mod error;
pub mod fields;
pub mod migration;
pub mod objects;
pub mod pipeline;
pub mod records;
pub mod report;
pub mod summary;
pub mod workflows;
pub mod writer;

pub use context::Context;
pub use diff::{diff_properties, diff_records, Change, PropertyDiff, RecordDiff};
pub use error::SyncError;
pub use pipeline::{deploy, extract, is_fatal, plan};
pub use report::{Phase, RunReport, StepLog, StepOutcome, StepReport};
pub use summary::{PlanManifest, PlanSummary, SummaryRow};
