//! Workflows: portable extraction, deployable payloads and version import.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use tally_api::{ApiRequest, Method};
use tally_codec::task::{code_file_name, metadata_file_name, recompose};
use tally_codec::workflow::{build_deployable, export_to_portable};
use tally_codec::{next_version, validate_name, PortableLinkage, PortableWorkflow, WorkflowExport};
use tally_core::types::{WorkflowName, WorkflowRef};

use crate::context::Context;
use crate::error::SyncError;
use crate::report::StepLog;
use crate::writer::{read_json, read_json_opt, read_text_opt, reset_dir, write_json, write_text};

// ---------------------------------------------------------------------------
// Version map
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct WorkflowListing {
    #[serde(default)]
    data: Vec<WorkflowEntry>,
}

#[derive(Debug, Deserialize)]
struct WorkflowEntry {
    #[serde(default)]
    active_version: Option<VersionEntry>,
    #[serde(default)]
    latest_inactive_versions: Vec<VersionEntry>,
}

#[derive(Debug, Deserialize)]
struct VersionEntry {
    version: String,
    #[serde(rename = "definitionId")]
    definition_id: i64,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    pub definition_id: i64,
    pub description: Option<String>,
}

/// Version tag -> definition, active version first, then the latest inactive ones.
///
/// A workflow unknown to the environment has an empty map.
pub fn version_map(ctx: &Context<'_>, name: &str) -> Result<IndexMap<String, VersionInfo>, SyncError> {
    tracing::info!("listing versions of workflow {name}");
    let listing: WorkflowListing = ctx.fetch_json_with_query("workflows", &[("name", name)])?;
    let mut versions = IndexMap::new();
    let Some(entry) = listing.data.into_iter().next() else {
        return Ok(versions);
    };
    for v in entry.active_version.into_iter().chain(entry.latest_inactive_versions) {
        tracing::debug!("{name} {} -> {}", v.version, v.definition_id);
        versions.insert(
            v.version,
            VersionInfo {
                definition_id: v.definition_id,
                description: v.description,
            },
        );
    }
    Ok(versions)
}

// ---------------------------------------------------------------------------
// Extract
// ---------------------------------------------------------------------------

fn export(ctx: &Context<'_>, workflow: &WorkflowRef) -> Result<WorkflowExport, SyncError> {
    let name = &workflow.name.0;
    let versions = version_map(ctx, name)?;
    let info = versions
        .get(&workflow.version)
        .ok_or_else(|| SyncError::UnknownVersion {
            workflow: name.clone(),
            version: workflow.version.clone(),
        })?;
    tracing::info!(
        "exporting {name} v{} (definition {})",
        workflow.version,
        info.definition_id
    );
    ctx.fetch_json_with_query(
        &format!("workflows/{}/export", info.definition_id),
        &[("version", workflow.version.as_str())],
    )
}

fn write_portable(ctx: &Context<'_>, name: &str, portable: &PortableWorkflow) -> Result<(), SyncError> {
    let layout = &ctx.layout;
    reset_dir(&layout.workflow_dir(name))?;
    write_json(&layout.workflow_metadata_file(name), &portable.metadata)?;
    write_json(&layout.task_map_file(name), &portable.task_map)?;
    write_json(&layout.duplicates_file(name), &portable.duplicates)?;
    write_json(&layout.linkages_file(name), &portable.linkages)?;

    let tasks_dir = layout.workflow_tasks_dir(name);
    for task in &portable.tasks {
        write_json(&tasks_dir.join(task.metadata_file_name()), &task.metadata)?;
        if let Some(code) = &task.code {
            write_text(&tasks_dir.join(&code.file_name), &code.contents)?;
        }
    }
    Ok(())
}

/// Extract every requested workflow; the first failure stops the step.
pub fn extract(ctx: &Context<'_>, workflows: &[WorkflowRef]) -> Result<StepLog, SyncError> {
    let mut log = StepLog::default();
    for workflow in workflows {
        let name = workflow.name.0.as_str();
        validate_name(name)?;
        let portable = export_to_portable(export(ctx, workflow)?)?;
        for warning in &portable.warnings {
            tracing::warn!("{name}: {warning}");
            log.warn(format!("{name}: {warning}"));
        }
        write_portable(ctx, name, &portable)?;
        log.processed(name);
    }
    Ok(log)
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// Rebuild the import payload of one workflow from the repository.
///
/// Tasks listed in the task map without a metadata file are skipped.
pub fn build_payload(ctx: &Context<'_>, name: &str, log: &mut StepLog) -> Result<Value, SyncError> {
    let layout = &ctx.layout;
    let metadata: Value = read_json(&layout.workflow_metadata_file(name))?;
    let task_map: IndexMap<String, i64> = read_json(&layout.task_map_file(name))?;
    let linkages: Vec<PortableLinkage> = read_json(&layout.linkages_file(name))?;

    let tasks_dir = layout.workflow_tasks_dir(name);
    let mut tasks = Vec::with_capacity(task_map.len());
    for (task_name, &id) in &task_map {
        let path = tasks_dir.join(metadata_file_name(task_name));
        let Some(task_metadata) = read_json_opt::<Value>(&path)? else {
            log.skip(format!("{name}/{task_name}"), format!("{} not found", path.display()));
            continue;
        };
        let action_type = task_metadata
            .get("action_type")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let code = match code_file_name(task_name, action_type) {
            Some(file) => read_text_opt(&tasks_dir.join(file))?,
            None => None,
        };
        tasks.push(recompose(task_name, id, task_metadata, code.as_deref())?);
    }

    let (payload, warnings) = build_deployable(metadata, &task_map, &linkages, tasks)?;
    for warning in warnings {
        log.warn(format!("{name}: {warning}"));
    }
    Ok(payload)
}

pub fn plan(ctx: &Context<'_>, workflows: &[WorkflowName]) -> Result<StepLog, SyncError> {
    let mut log = StepLog::default();
    for workflow in workflows {
        let name = workflow.0.as_str();
        tracing::info!("generating workflow payload for {name}");
        match build_payload(ctx, name, &mut log) {
            Ok(payload) => {
                write_json(&ctx.layout.workflow_payload_file(name), &payload)?;
                log.processed(name);
            }
            Err(e) => log.skip(name, e),
        }
    }
    Ok(log)
}

// ---------------------------------------------------------------------------
// Deploy
// ---------------------------------------------------------------------------

fn deploy_one(ctx: &Context<'_>, name: &str) -> Result<String, SyncError> {
    let payload: Value = read_json(&ctx.layout.workflow_payload_file(name))?;

    let versions = version_map(ctx, name)?;
    let Some(first) = versions.values().next() else {
        return Err(SyncError::WorkflowNotInTarget(name.to_owned()));
    };
    let tags: Vec<&str> = versions.keys().map(String::as_str).collect();
    let version = next_version(&tags)?;

    let request = ApiRequest::new(
        Method::Post,
        format!("workflows/{}/versions/import", first.definition_id),
    )
    .query("version", version.as_str())
    .body(payload);
    ctx.send(request)?;
    Ok(version)
}

pub fn deploy(ctx: &Context<'_>, workflows: &[WorkflowName]) -> Result<StepLog, SyncError> {
    let mut log = StepLog::default();
    for workflow in workflows {
        let name = workflow.0.as_str();
        match deploy_one(ctx, name) {
            Ok(version) => {
                tracing::info!("deployed {name} v{version}");
                log.processed(format!("{name} v{version}"));
            }
            Err(e) => log.skip(name, e),
        }
    }
    Ok(log)
}
