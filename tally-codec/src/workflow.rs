//! Whole-workflow conversion between the platform export and the portable
//! repository form.
//!
//! Portable form, one directory per workflow:
//!
//! ```text
//! workflow.json     {"workflow_definition": …, "workflow": … (id forced to 1)}
//! task_map.json     task name -> portable id (1-based, workflow order)
//! duplicates.json   task names that occur more than once
//! linkages.json     name-keyed linkages
//! tasks/            <task>.json metadata + optional code side file
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{malformed, CodecError};
use crate::linkage::{self, ApiLinkage, PortableLinkage};
use crate::names::validate_name;
use crate::relink::{duplicate_names, TaskMaps};
use crate::task::{self, DecomposedTask, TaskDefinition};
use crate::warning::Warning;

/// Response body of `GET workflows/{id}/export`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowExport {
    pub workflow: Map<String, Value>,
    #[serde(default)]
    pub workflow_definition: Value,
    #[serde(default)]
    pub tasks: Vec<TaskDefinition>,
    #[serde(default)]
    pub linkages: Vec<ApiLinkage>,
}

/// Everything that gets written under `workflows/<name>/`.
#[derive(Debug, Clone, PartialEq)]
pub struct PortableWorkflow {
    /// Contents of `workflow.json`.
    pub metadata: Value,
    pub task_map: IndexMap<String, i64>,
    pub duplicates: Vec<String>,
    pub linkages: Vec<PortableLinkage>,
    pub tasks: Vec<DecomposedTask>,
    pub warnings: Vec<Warning>,
}

/// Convert an export into portable form.
///
/// All task names are validated before anything is decomposed, so a single
/// bad name rejects the workflow as a whole. Embedded task ids are re-linked
/// from the exporting environment's ids to portable ids.
pub fn export_to_portable(export: WorkflowExport) -> Result<PortableWorkflow, CodecError> {
    let WorkflowExport {
        mut workflow,
        workflow_definition,
        tasks,
        linkages,
    } = export;

    for t in &tasks {
        validate_name(&t.name)?;
    }

    let duplicates = duplicate_names(&tasks);
    let mut warnings: Vec<Warning> = duplicates
        .iter()
        .map(|name| Warning::DuplicateTaskName { name: name.clone() })
        .collect();

    let maps = TaskMaps::from_tasks(&tasks);
    let portable_linkages = linkage::to_portable(&linkages, &tasks);

    let mut decomposed = Vec::with_capacity(tasks.len());
    for mut t in tasks {
        task::strip_environment_parameters(&mut t.body);
        warnings.extend(maps.relink_task(&mut t));
        decomposed.push(task::decompose(t)?);
    }

    workflow.insert("id".to_owned(), Value::from(1));
    let mut metadata = Map::new();
    metadata.insert("workflow_definition".to_owned(), workflow_definition);
    metadata.insert("workflow".to_owned(), Value::Object(workflow));

    Ok(PortableWorkflow {
        metadata: Value::Object(metadata),
        task_map: maps.new,
        duplicates,
        linkages: portable_linkages,
        tasks: decomposed,
        warnings,
    })
}

/// Assemble the import payload: `workflow.json` plus rebuilt tasks and
/// id-keyed linkages.
pub fn build_deployable(
    metadata: Value,
    task_map: &IndexMap<String, i64>,
    linkages: &[PortableLinkage],
    tasks: Vec<TaskDefinition>,
) -> Result<(Value, Vec<Warning>), CodecError> {
    let Value::Object(mut payload) = metadata else {
        return Err(malformed("workflow.json", "expected a JSON object"));
    };
    let (api_linkages, warnings) = linkage::to_api(linkages, task_map);
    payload.insert("tasks".to_owned(), serde_json::to_value(tasks)?);
    payload.insert("linkages".to_owned(), serde_json::to_value(api_linkages)?);
    Ok((Value::Object(payload), warnings))
}
