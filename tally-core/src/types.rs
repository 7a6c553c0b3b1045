//! Domain types shared by every tally crate.
//!
//! Request forms are plain serde structs; the environment name is validated
//! while the form is parsed, so an invalid environment fails before any I/O.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A standard or custom object name as known by the billing platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectName(pub String);

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ObjectName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ObjectName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A workflow name; the stable identity of a workflow across environments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkflowName(pub String);

impl fmt::Display for WorkflowName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for WorkflowName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for WorkflowName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// A live platform environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Environment {
    Dev,
    Qa,
    Uat,
    Prod,
}

impl Environment {
    pub fn all() -> &'static [Environment] {
        &[
            Environment::Dev,
            Environment::Qa,
            Environment::Uat,
            Environment::Prod,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Qa => "qa",
            Environment::Uat => "uat",
            Environment::Prod => "prod",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "qa" => Ok(Environment::Qa),
            "uat" => Ok(Environment::Uat),
            "prod" => Ok(Environment::Prod),
            _ => Err(ConfigError::InvalidEnvironment(s.to_owned())),
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Environment> for String {
    fn from(env: Environment) -> Self {
        env.as_str().to_owned()
    }
}

/// The configurable artifact kinds, in the order every phase processes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    CustomFields,
    CustomObjectDefinitions,
    CustomObjectRecords,
    BillingDocuments,
    Workflows,
}

impl ArtifactKind {
    pub fn all() -> &'static [ArtifactKind] {
        &[
            ArtifactKind::CustomFields,
            ArtifactKind::CustomObjectDefinitions,
            ArtifactKind::CustomObjectRecords,
            ArtifactKind::BillingDocuments,
            ArtifactKind::Workflows,
        ]
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::CustomFields => write!(f, "custom fields"),
            ArtifactKind::CustomObjectDefinitions => write!(f, "custom object definitions"),
            ArtifactKind::CustomObjectRecords => write!(f, "custom object records"),
            ArtifactKind::BillingDocuments => write!(f, "billing document templates"),
            ArtifactKind::Workflows => write!(f, "workflows"),
        }
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// Business key used to match custom object records across environments.
///
/// The platform `Id` never takes part in matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchCriteria {
    pub primary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<String>,
}

impl MatchCriteria {
    pub fn primary(key: impl Into<String>) -> Self {
        Self {
            primary: key.into(),
            secondary: None,
        }
    }

    pub fn composite(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            secondary: Some(secondary.into()),
        }
    }
}

/// Per-kind inclusion flags shared by the extract and plan/deploy forms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSelection {
    #[serde(default)]
    pub include_custom_fields: bool,
    #[serde(default)]
    pub include_custom_object_definitions: bool,
    #[serde(default)]
    pub include_custom_object_records: bool,
    #[serde(default)]
    pub include_html_templates: bool,
}

impl ArtifactSelection {
    /// Whether the flag for `kind` is set. Workflows are selected by name, not by flag.
    pub fn includes(&self, kind: ArtifactKind) -> bool {
        match kind {
            ArtifactKind::CustomFields => self.include_custom_fields,
            ArtifactKind::CustomObjectDefinitions => self.include_custom_object_definitions,
            ArtifactKind::CustomObjectRecords => self.include_custom_object_records,
            ArtifactKind::BillingDocuments => self.include_html_templates,
            ArtifactKind::Workflows => false,
        }
    }
}

/// A workflow to extract, pinned to one of its versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRef {
    pub name: WorkflowName,
    pub version: String,
}

/// Request form for the extract phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractForm {
    pub source_environment: Environment,
    #[serde(flatten)]
    pub selection: ArtifactSelection,
    #[serde(default)]
    pub workflows: Vec<WorkflowRef>,
}

/// Request form shared by the plan and deploy phases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanDeployForm {
    pub target_env: Environment,
    #[serde(flatten)]
    pub selection: ArtifactSelection,
    #[serde(default)]
    pub workflows: Vec<WorkflowName>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newtype_display() {
        assert_eq!(ObjectName::from("Account").to_string(), "Account");
        assert_eq!(WorkflowName::from("Invoice Sync").to_string(), "Invoice Sync");
    }

    #[test]
    fn environment_parse_is_case_insensitive() {
        assert_eq!("QA".parse::<Environment>().unwrap(), Environment::Qa);
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Prod);
    }

    #[test]
    fn environment_rejects_unknown_names() {
        let err = "staging".parse::<Environment>().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvironment(ref name) if name == "staging"));
    }

    #[test]
    fn form_with_invalid_environment_fails_to_parse() {
        let raw = r#"{"target_env": "sandbox", "include_custom_fields": true}"#;
        let err = serde_json::from_str::<PlanDeployForm>(raw).unwrap_err();
        assert!(err.to_string().contains("sandbox"));
    }

    #[test]
    fn plan_form_defaults_missing_flags_to_false() {
        let raw = r#"{"target_env": "uat", "workflows": ["Invoice Sync"]}"#;
        let form: PlanDeployForm = serde_json::from_str(raw).unwrap();
        assert_eq!(form.target_env, Environment::Uat);
        assert_eq!(form.selection, ArtifactSelection::default());
        assert_eq!(form.workflows, vec![WorkflowName::from("Invoice Sync")]);
    }

    #[test]
    fn extract_form_reads_workflow_versions() {
        let raw = r#"{
            "source_environment": "dev",
            "include_html_templates": true,
            "workflows": [{"name": "Invoice Sync", "version": "1.0.3"}]
        }"#;
        let form: ExtractForm = serde_json::from_str(raw).unwrap();
        assert!(form.selection.includes(ArtifactKind::BillingDocuments));
        assert!(!form.selection.includes(ArtifactKind::CustomFields));
        assert_eq!(form.workflows[0].version, "1.0.3");
    }

    #[test]
    fn artifact_kind_display() {
        assert_eq!(ArtifactKind::Workflows.to_string(), "workflows");
        assert_eq!(
            ArtifactKind::BillingDocuments.to_string(),
            "billing document templates"
        );
    }
}
