//! Tally core library — domain types, configuration, repository layout, secrets.
//!
//! Public API surface:
//! - [`types`] — environments, artifact kinds, request forms, match criteria
//! - [`config`] — explicit run configuration (load / save)
//! - [`layout`] — on-disk repository paths
//! - [`secrets`] — local per-environment secret store
//! - [`error`] — [`ConfigError`]

pub mod config;
pub mod error;
pub mod layout;
pub mod secrets;
pub mod types;

pub use config::Config;
pub use error::ConfigError;
pub use layout::RepoLayout;
pub use secrets::SecretStore;
pub use types::{
    ArtifactKind, ArtifactSelection, Environment, ExtractForm, MatchCriteria, ObjectName,
    PlanDeployForm, WorkflowName, WorkflowRef,
};
