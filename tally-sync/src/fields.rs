//! Custom fields on standard objects.
//!
//! Only properties with `origin == "custom"` are versioned, together with
//! the object's read-only and filterable field lists.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::context::Context;
use crate::diff::{diff_properties, PropertyDiff};
use crate::error::SyncError;
use crate::migration::{self, definition_path, Namespace};
use crate::report::StepLog;
use crate::writer::{read_json_opt, write_json};

/// Contents of `custom_fields/<object>.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomFieldSet {
    pub custom_fields: Map<String, Value>,
    #[serde(default)]
    pub read_only: Vec<Value>,
    #[serde(default)]
    pub filterable: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct DefinitionResponse {
    #[serde(default)]
    schema: Schema,
}

#[derive(Debug, Default, Deserialize)]
struct Schema {
    #[serde(default)]
    properties: Map<String, Value>,
    #[serde(default, rename = "readonlyOnUI")]
    readonly_on_ui: Vec<Value>,
    #[serde(default)]
    filterable: Vec<Value>,
}

impl From<DefinitionResponse> for CustomFieldSet {
    fn from(response: DefinitionResponse) -> Self {
        let Schema {
            properties,
            readonly_on_ui,
            filterable,
        } = response.schema;
        let custom_fields = properties
            .into_iter()
            .filter(|(_, definition)| {
                definition.get("origin").and_then(Value::as_str) == Some("custom")
            })
            .collect();
        Self {
            custom_fields,
            read_only: readonly_on_ui,
            filterable,
        }
    }
}

/// Fetch the custom fields of one standard object.
///
/// A non-200 answer is logged into `log` as a skip of `object` and yields
/// `Ok(None)`; transport and decoding failures stay errors.
pub fn fetch(
    ctx: &Context<'_>,
    object: &str,
    log: &mut StepLog,
) -> Result<Option<CustomFieldSet>, SyncError> {
    match ctx.fetch_json::<DefinitionResponse>(&definition_path(Namespace::Standard, object)) {
        Ok(response) => Ok(Some(response.into())),
        Err(e @ SyncError::Upstream { .. }) => {
            tracing::error!("failed to fetch definition of {object}: {e}");
            log.skip(object, e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

pub fn extract(ctx: &Context<'_>) -> Result<StepLog, SyncError> {
    let mut log = StepLog::default();
    for object in &ctx.config.zuora_objects {
        let Some(fields) = fetch(ctx, &object.0, &mut log)? else {
            continue;
        };
        tracing::info!("{object}: {} custom fields", fields.custom_fields.len());
        write_json(&ctx.layout.custom_fields_file(&object.0), &fields)?;
        log.processed(object.0.as_str());
    }
    Ok(log)
}

pub fn plan(ctx: &Context<'_>) -> Result<StepLog, SyncError> {
    let mut log = StepLog::default();
    let mut diffs: BTreeMap<String, PropertyDiff> = BTreeMap::new();

    for object in &ctx.config.zuora_objects {
        let path = ctx.layout.custom_fields_file(&object.0);
        let Some(source) = read_json_opt::<CustomFieldSet>(&path)? else {
            log.skip(object.0.as_str(), format!("{} not extracted", path.display()));
            continue;
        };
        let Some(target) = fetch(ctx, &object.0, &mut log)? else {
            continue;
        };
        diffs.insert(
            object.0.clone(),
            diff_properties(&source.custom_fields, &target.custom_fields),
        );
        log.processed(object.0.as_str());
    }

    let out = ctx.layout.custom_fields_diff_file();
    tracing::info!("writing custom fields diff to {}", out.display());
    write_json(&out, &diffs)?;
    Ok(log)
}

pub fn deploy(ctx: &Context<'_>) -> Result<StepLog, SyncError> {
    let mut log = StepLog::default();
    let path = ctx.layout.custom_fields_diff_file();
    let Some(diffs) = read_json_opt::<BTreeMap<String, PropertyDiff>>(&path)? else {
        log.skip("custom fields", format!("no plan output at {}", path.display()));
        return Ok(log);
    };
    migration::replay(ctx, Namespace::Standard, &diffs, &mut log);
    Ok(log)
}
