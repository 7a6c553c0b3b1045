//! Workflow linkages in API (id keyed) and portable (name keyed) form.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::task::TaskDefinition;
use crate::warning::Warning;

pub const START: &str = "Start";

/// A linkage as the platform exports and imports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiLinkage {
    #[serde(default)]
    pub source_workflow_id: Option<i64>,
    #[serde(default)]
    pub source_task_id: Option<i64>,
    #[serde(default)]
    pub target_task_id: Option<i64>,
    pub linkage_type: String,
}

/// A linkage whose endpoints are task names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortableLinkage {
    #[serde(default)]
    pub source_workflow_id: Option<i64>,
    #[serde(default)]
    pub source_task_name: Option<String>,
    #[serde(default)]
    pub target_task_name: Option<String>,
    pub linkage_type: String,
}

/// `Some(1)` for a start linkage, `None` otherwise.
pub fn normalized_source_workflow_id(linkage_type: &str) -> Option<i64> {
    (linkage_type == START).then_some(1)
}

impl PortableLinkage {
    pub fn normalize(&mut self) {
        self.source_workflow_id = normalized_source_workflow_id(&self.linkage_type);
    }
}

/// Resolve task ids to names, normalize and sort by source task name, descending.
///
/// An id that matches no task keeps its number as the name.
pub fn to_portable(linkages: &[ApiLinkage], tasks: &[TaskDefinition]) -> Vec<PortableLinkage> {
    let name_of = |id: Option<i64>| {
        id.map(|id| {
            tasks
                .iter()
                .find(|t| t.id == id)
                .map_or_else(|| id.to_string(), |t| t.name.clone())
        })
    };

    let mut portable: Vec<PortableLinkage> = linkages
        .iter()
        .map(|l| PortableLinkage {
            source_workflow_id: normalized_source_workflow_id(&l.linkage_type),
            source_task_name: name_of(l.source_task_id),
            target_task_name: name_of(l.target_task_id),
            linkage_type: l.linkage_type.clone(),
        })
        .collect();
    portable.sort_by(|a, b| b.source_task_name.cmp(&a.source_task_name));
    portable
}

/// Resolve task names back to ids through `task_map`.
pub fn to_api(
    linkages: &[PortableLinkage],
    task_map: &IndexMap<String, i64>,
) -> (Vec<ApiLinkage>, Vec<Warning>) {
    let mut warnings = Vec::new();
    let mut id_of = |name: &Option<String>| {
        let name = name.as_deref()?;
        let id = task_map.get(name).copied();
        if id.is_none() {
            let warning = Warning::UnknownLinkageTask {
                name: name.to_owned(),
            };
            tracing::warn!("{warning}");
            warnings.push(warning);
        }
        id
    };

    let api = linkages
        .iter()
        .map(|l| ApiLinkage {
            source_workflow_id: normalized_source_workflow_id(&l.linkage_type),
            source_task_id: id_of(&l.source_task_name),
            target_task_id: id_of(&l.target_task_name),
            linkage_type: l.linkage_type.clone(),
        })
        .collect();
    (api, warnings)
}
