//! Billing document HTML templates.
//!
//! Templates are listed per document type; only HTML templates associated
//! to a billing account are versioned. A template's identity across
//! environments is its name.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;
use serde_json::Value;

use tally_api::{ApiRequest, Method};
use tally_codec::billing::{
    build_request_payload, decode_template_content, decompose_template, fragment_file_name,
    fragment_ids, portable_request_form, recompose_template,
};
use tally_codec::validate_name;

use crate::context::Context;
use crate::error::SyncError;
use crate::report::StepLog;
use crate::writer::{files_in, read_json, read_text, reset_dir, subdirectories, write_json, write_text};

const PAYLOAD_SUFFIX: &str = "_form_new.json";

/// One entry of `GET settings/{type}-templates`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TemplateSummary {
    pub id: String,
    pub name: String,
    #[serde(default, rename = "templateFormat")]
    pub template_format: Option<String>,
    #[serde(default, rename = "associatedToBillingAccount")]
    pub associated_to_billing_account: bool,
}

impl TemplateSummary {
    pub fn is_versioned(&self) -> bool {
        self.template_format.as_deref() == Some("HTML") && self.associated_to_billing_account
    }
}

pub fn templates_path(document_type: &str) -> String {
    format!("settings/{document_type}-templates")
}

/// Versioned templates of every configured document type.
///
/// A type whose listing fails is logged and left out.
pub fn list_templates(ctx: &Context<'_>) -> Result<Vec<(String, TemplateSummary)>, SyncError> {
    let mut templates = Vec::new();
    for document_type in &ctx.config.billing_document_types {
        tracing::info!("listing {document_type} templates");
        match ctx.fetch_json::<Vec<TemplateSummary>>(&templates_path(document_type)) {
            Ok(listed) => templates.extend(
                listed
                    .into_iter()
                    .filter(TemplateSummary::is_versioned)
                    .map(|t| (document_type.clone(), t)),
            ),
            Err(e @ SyncError::Upstream { .. }) => {
                tracing::error!("could not list {document_type} templates: {e}");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(templates)
}

// ---------------------------------------------------------------------------
// Extract
// ---------------------------------------------------------------------------

fn write_template(ctx: &Context<'_>, name: &str, form: Value) -> Result<(), SyncError> {
    validate_name(name)?;
    let document = decode_template_content(&form)?;
    let decomposed = decompose_template(document)?;
    let form = portable_request_form(form)?;

    let layout = &ctx.layout;
    let dir = layout.billing_document_dir(name);
    reset_dir(&dir)?;
    write_json(&layout.billing_template_file(name), &decomposed.metadata)?;
    write_json(&layout.billing_form_file(name), &form)?;
    write_text(&layout.billing_main_content_file(name), &decomposed.main_content)?;
    for fragment in &decomposed.fragments {
        tracing::info!("writing {}", fragment.file_name);
        write_text(&dir.join(&fragment.file_name), &fragment.contents)?;
    }
    Ok(())
}

pub fn extract(ctx: &Context<'_>) -> Result<StepLog, SyncError> {
    let mut log = StepLog::default();
    for (document_type, template) in list_templates(ctx)? {
        let path = format!("{}/{}", templates_path(&document_type), template.id);
        let form: Value = match ctx.fetch_json(&path) {
            Ok(form) => form,
            Err(e @ SyncError::Upstream { .. }) => {
                log.skip(template.name.as_str(), e);
                continue;
            }
            Err(e) => return Err(e),
        };
        write_template(ctx, &template.name, form)?;
        log.processed(template.name.as_str());
    }
    Ok(log)
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// Rebuild the deployable request form of one template from the repository.
pub fn build_payload(ctx: &Context<'_>, name: &str) -> Result<Value, SyncError> {
    let layout = &ctx.layout;
    let metadata: Value = read_json(&layout.billing_template_file(name))?;
    let main_content = read_text(&layout.billing_main_content_file(name))?;
    let form: Value = read_json(&layout.billing_form_file(name))?;

    let dir = layout.billing_document_dir(name);
    let mut fragments = BTreeMap::new();
    for html_id in fragment_ids(&metadata)? {
        let html = read_text(&dir.join(fragment_file_name(&html_id)))?;
        fragments.insert(html_id, html);
    }

    let template = recompose_template(metadata, &main_content, &fragments)?;
    Ok(build_request_payload(form, &template)?)
}

/// Templates present in the repository: directories holding a request form.
pub fn repository_templates(ctx: &Context<'_>) -> Result<Vec<String>, SyncError> {
    Ok(subdirectories(&ctx.layout.billing_documents_dir())?
        .into_iter()
        .filter(|name| ctx.layout.billing_form_file(name).is_file())
        .collect())
}

pub fn plan(ctx: &Context<'_>) -> Result<StepLog, SyncError> {
    let mut log = StepLog::default();
    for name in repository_templates(ctx)? {
        tracing::info!("generating payload for template {name}");
        let payload = match build_payload(ctx, &name) {
            Ok(payload) => payload,
            Err(e) => {
                log.skip(name.as_str(), e);
                continue;
            }
        };
        write_json(&ctx.layout.billing_payload_file(&name), &payload)?;
        log.processed(name.as_str());
    }
    Ok(log)
}

// ---------------------------------------------------------------------------
// Deploy
// ---------------------------------------------------------------------------

/// Template names with a prepared payload under `temp/billing_documents/`.
pub fn prepared_payloads(ctx: &Context<'_>) -> Result<Vec<String>, SyncError> {
    Ok(files_in(&ctx.layout.billing_payloads_dir())?
        .into_iter()
        .filter_map(|file| file.strip_suffix(PAYLOAD_SUFFIX).map(str::to_owned))
        .collect())
}

pub fn deploy(ctx: &Context<'_>) -> Result<StepLog, SyncError> {
    let mut log = StepLog::default();
    let mut matched = BTreeSet::new();

    for (document_type, template) in list_templates(ctx)? {
        let payload_file = ctx.layout.billing_payload_file(&template.name);
        if !payload_file.is_file() {
            tracing::info!("no payload prepared for {}", template.name);
            continue;
        }
        matched.insert(template.name.clone());
        let payload: Value = match read_json(&payload_file) {
            Ok(payload) => payload,
            Err(e) => {
                log.skip(template.name.as_str(), e);
                continue;
            }
        };
        let path = format!("{}/{}", templates_path(&document_type), template.id);
        match ctx.send(ApiRequest::new(Method::Put, path).body(payload)) {
            Ok(_) => log.processed(template.name.as_str()),
            Err(e) => log.skip(template.name.as_str(), e),
        }
    }

    for name in prepared_payloads(ctx)? {
        if !matched.contains(&name) {
            log.warn(format!("template {name} matched no template in the target environment"));
        }
    }
    Ok(log)
}
