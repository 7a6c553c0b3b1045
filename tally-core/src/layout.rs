//! Source-of-truth repository layout.
//!
//! ```text
//! <root>/
//!   custom_fields/<object>.json
//!   custom_objects/<object>.json
//!   custom_object_records/<object>.json
//!   workflows/<name>/{workflow.json, task_map.json, duplicates.json, linkages.json, tasks/}
//!   billing_documents/<template>/{<template>.json, <template>_form.json, main_content.html, <htmlID>.html}
//!   temp/                                  (plan output, rebuilt every plan run)
//!     plan.json                            (target environment + plan time)
//! ```
//!
//! All helpers are pure path arithmetic; nothing here touches the disk.

use std::path::{Path, PathBuf};

/// Path arithmetic over a repository root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoLayout {
    root: PathBuf,
}

impl RepoLayout {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn custom_fields_dir(&self) -> PathBuf {
        self.root.join("custom_fields")
    }

    pub fn custom_fields_file(&self, object: &str) -> PathBuf {
        self.custom_fields_dir().join(format!("{object}.json"))
    }

    pub fn custom_objects_dir(&self) -> PathBuf {
        self.root.join("custom_objects")
    }

    pub fn custom_object_file(&self, object: &str) -> PathBuf {
        self.custom_objects_dir().join(format!("{object}.json"))
    }

    pub fn records_dir(&self) -> PathBuf {
        self.root.join("custom_object_records")
    }

    pub fn records_file(&self, object: &str) -> PathBuf {
        self.records_dir().join(format!("{object}.json"))
    }

    pub fn workflows_dir(&self) -> PathBuf {
        self.root.join("workflows")
    }

    pub fn workflow_dir(&self, name: &str) -> PathBuf {
        self.workflows_dir().join(name)
    }

    pub fn workflow_tasks_dir(&self, name: &str) -> PathBuf {
        self.workflow_dir(name).join("tasks")
    }

    pub fn workflow_metadata_file(&self, name: &str) -> PathBuf {
        self.workflow_dir(name).join("workflow.json")
    }

    pub fn task_map_file(&self, name: &str) -> PathBuf {
        self.workflow_dir(name).join("task_map.json")
    }

    pub fn duplicates_file(&self, name: &str) -> PathBuf {
        self.workflow_dir(name).join("duplicates.json")
    }

    pub fn linkages_file(&self, name: &str) -> PathBuf {
        self.workflow_dir(name).join("linkages.json")
    }

    pub fn billing_documents_dir(&self) -> PathBuf {
        self.root.join("billing_documents")
    }

    pub fn billing_document_dir(&self, template: &str) -> PathBuf {
        self.billing_documents_dir().join(template)
    }

    /// Template document with custom blocks and page HTML replaced by placeholders.
    pub fn billing_template_file(&self, template: &str) -> PathBuf {
        self.billing_document_dir(template)
            .join(format!("{template}.json"))
    }

    /// Request form stripped of environment-owned keys.
    pub fn billing_form_file(&self, template: &str) -> PathBuf {
        self.billing_document_dir(template)
            .join(format!("{template}_form.json"))
    }

    pub fn billing_main_content_file(&self, template: &str) -> PathBuf {
        self.billing_document_dir(template).join("main_content.html")
    }

    // -- plan output ------------------------------------------------------

    pub fn temp_dir(&self) -> PathBuf {
        self.root.join("temp")
    }

    /// Target environment and time of the last plan run.
    pub fn plan_manifest_file(&self) -> PathBuf {
        self.temp_dir().join("plan.json")
    }

    pub fn custom_fields_diff_file(&self) -> PathBuf {
        self.temp_dir().join("custom_fields").join("diff.json")
    }

    pub fn custom_objects_diff_file(&self) -> PathBuf {
        self.temp_dir().join("custom_objects").join("diff.json")
    }

    pub fn records_diff_file(&self) -> PathBuf {
        self.temp_dir().join("custom_object_records").join("diff.json")
    }

    pub fn billing_payloads_dir(&self) -> PathBuf {
        self.temp_dir().join("billing_documents")
    }

    pub fn billing_payload_file(&self, template: &str) -> PathBuf {
        self.billing_payloads_dir()
            .join(format!("{template}_form_new.json"))
    }

    pub fn workflow_payloads_dir(&self) -> PathBuf {
        self.temp_dir().join("workflows")
    }

    pub fn workflow_payload_file(&self, name: &str) -> PathBuf {
        self.workflow_payloads_dir()
            .join(format!("{name}-output-to-zuora.json"))
    }
}
