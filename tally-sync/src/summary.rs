//! Offline view of the persisted plan output.
//!
//! Reads `temp/` only; nothing here talks to the platform.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use similar::TextDiff;

use tally_core::types::{ArtifactKind, Environment};
use tally_core::RepoLayout;

use crate::diff::{Change, PropertyDiff, RecordDiff};
use crate::error::SyncError;
use crate::writer::{files_in, read_json_opt, write_json};

/// Written at the end of every plan run as `temp/plan.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanManifest {
    pub target_env: Environment,
    pub planned_at: DateTime<Utc>,
}

impl PlanManifest {
    pub fn new(target_env: Environment) -> Self {
        Self {
            target_env,
            planned_at: Utc::now(),
        }
    }

    pub fn load(layout: &RepoLayout) -> Result<Option<Self>, SyncError> {
        read_json_opt(&layout.plan_manifest_file())
    }

    pub fn save(&self, layout: &RepoLayout) -> Result<(), SyncError> {
        write_json(&layout.plan_manifest_file(), self)
    }
}

/// Change counts for one unit of plan output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRow {
    pub kind: ArtifactKind,
    pub unit: String,
    pub add: usize,
    pub update: usize,
    pub delete: usize,
}

/// Everything a plan run left under `temp/`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanSummary {
    pub manifest: Option<PlanManifest>,
    pub custom_fields: BTreeMap<String, PropertyDiff>,
    pub custom_objects: BTreeMap<String, PropertyDiff>,
    pub records: BTreeMap<String, RecordDiff>,
    pub billing_payloads: Vec<String>,
    pub workflow_payloads: Vec<String>,
}

fn payload_names(files: Vec<String>, suffix: &str) -> Vec<String> {
    files
        .into_iter()
        .filter_map(|f| f.strip_suffix(suffix).map(str::to_owned))
        .collect()
}

impl PlanSummary {
    pub fn load(layout: &RepoLayout) -> Result<Self, SyncError> {
        Ok(Self {
            manifest: PlanManifest::load(layout)?,
            custom_fields: read_json_opt(&layout.custom_fields_diff_file())?.unwrap_or_default(),
            custom_objects: read_json_opt(&layout.custom_objects_diff_file())?.unwrap_or_default(),
            records: read_json_opt(&layout.records_diff_file())?.unwrap_or_default(),
            billing_payloads: payload_names(
                files_in(&layout.billing_payloads_dir())?,
                "_form_new.json",
            ),
            workflow_payloads: payload_names(
                files_in(&layout.workflow_payloads_dir())?,
                "-output-to-zuora.json",
            ),
        })
    }

    /// No plan output at all.
    pub fn is_empty(&self) -> bool {
        self.manifest.is_none()
            && self.custom_fields.is_empty()
            && self.custom_objects.is_empty()
            && self.records.is_empty()
            && self.billing_payloads.is_empty()
            && self.workflow_payloads.is_empty()
    }

    /// One row per diffed object; prepared payloads count as one update each.
    pub fn rows(&self) -> Vec<SummaryRow> {
        let property_rows = |kind: ArtifactKind, diffs: &BTreeMap<String, PropertyDiff>| {
            diffs
                .iter()
                .map(move |(unit, d)| SummaryRow {
                    kind,
                    unit: unit.clone(),
                    add: d.add.len(),
                    update: d.update.len(),
                    delete: d.delete.len(),
                })
                .collect::<Vec<_>>()
        };
        let payload_rows = |kind: ArtifactKind, names: &[String]| {
            names
                .iter()
                .map(move |unit| SummaryRow {
                    kind,
                    unit: unit.clone(),
                    add: 0,
                    update: 1,
                    delete: 0,
                })
                .collect::<Vec<_>>()
        };

        let mut rows = property_rows(ArtifactKind::CustomFields, &self.custom_fields);
        rows.extend(property_rows(
            ArtifactKind::CustomObjectDefinitions,
            &self.custom_objects,
        ));
        rows.extend(self.records.iter().map(|(unit, d)| SummaryRow {
            kind: ArtifactKind::CustomObjectRecords,
            unit: unit.clone(),
            add: d.add.len(),
            update: d.update.len(),
            delete: d.delete.len(),
        }));
        rows.extend(payload_rows(ArtifactKind::BillingDocuments, self.billing_payloads.as_slice()));
        rows.extend(payload_rows(ArtifactKind::Workflows, self.workflow_payloads.as_slice()));
        rows
    }

    /// Unified diffs of every property update, `(object.property, diff)`.
    pub fn property_changes(&self) -> Vec<(String, String)> {
        self.custom_fields
            .iter()
            .chain(&self.custom_objects)
            .flat_map(|(object, diff)| {
                diff.update
                    .iter()
                    .map(move |(name, change)| {
                        let unit = format!("{object}.{name}");
                        let rendered = render_change(&unit, change);
                        (unit, rendered)
                    })
            })
            .collect()
    }
}

/// Unified diff between the pretty-printed old and new values.
pub fn render_change(unit: &str, change: &Change) -> String {
    let old = pretty(&change.old);
    let new = pretty(&change.new);
    TextDiff::from_lines(&old, &new)
        .unified_diff()
        .header(&format!("target/{unit}"), &format!("repository/{unit}"))
        .context_radius(3)
        .to_string()
}

fn pretty(value: &serde_json::Value) -> String {
    let mut text = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    text.push('\n');
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn empty_repository_has_empty_summary() {
        let root = TempDir::new().unwrap();
        let summary = PlanSummary::load(&RepoLayout::new(root.path())).unwrap();
        assert!(summary.is_empty());
        assert!(summary.rows().is_empty());
    }

    #[test]
    fn counts_diff_buckets_and_payloads() {
        let root = TempDir::new().unwrap();
        let layout = RepoLayout::new(root.path());
        write_json(
            &layout.custom_fields_diff_file(),
            &json!({"account": {"add": {"A__c": {}}, "update": {}, "delete": {"B__c": {}, "C__c": {}}}}),
        )
        .unwrap();
        write_json(
            &layout.records_diff_file(),
            &json!({"Rate": {"add": [], "update": [{"V": 1, "__V": 2, "Id": "9"}], "delete": []}}),
        )
        .unwrap();
        write_json(&layout.workflow_payload_file("Invoice Sync"), &json!({})).unwrap();
        PlanManifest::new(Environment::Qa).save(&layout).unwrap();

        let summary = PlanSummary::load(&layout).unwrap();
        assert_eq!(summary.manifest.as_ref().map(|m| m.target_env), Some(Environment::Qa));
        assert_eq!(
            summary.rows(),
            vec![
                SummaryRow { kind: ArtifactKind::CustomFields, unit: "account".into(), add: 1, update: 0, delete: 2 },
                SummaryRow { kind: ArtifactKind::CustomObjectRecords, unit: "Rate".into(), add: 0, update: 1, delete: 0 },
                SummaryRow { kind: ArtifactKind::Workflows, unit: "Invoice Sync".into(), add: 0, update: 1, delete: 0 },
            ]
        );
    }

    #[test]
    fn renders_property_update_as_unified_diff() {
        let change = Change {
            old: json!({"type": "string"}),
            new: json!({"type": "number"}),
        };
        let rendered = render_change("account.Region__c", &change);
        assert!(rendered.contains("--- target/account.Region__c"));
        assert!(rendered.contains("-  \"type\": \"string\""));
        assert!(rendered.contains("+  \"type\": \"number\""));
    }
}
