//! Custom object definitions.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::context::Context;
use crate::diff::{diff_properties, PropertyDiff};
use crate::error::SyncError;
use crate::migration::{self, definition_path, Namespace};
use crate::report::StepLog;
use crate::writer::{read_json_opt, write_json};

/// Keys the platform manages on definitions and records.
pub const SYSTEM_KEYS: [&str; 6] = [
    "Id",
    "type",
    "CreatedById",
    "UpdatedById",
    "CreatedDate",
    "UpdatedDate",
];

pub fn strip_system_keys(fields: &mut Map<String, Value>) {
    for key in SYSTEM_KEYS {
        fields.remove(key);
    }
}

#[derive(Debug, Deserialize)]
struct DefinitionSchema {
    schema: Properties,
}

#[derive(Debug, Deserialize)]
struct Properties {
    #[serde(default)]
    properties: Map<String, Value>,
}

/// `schema.properties` of a definition document.
pub fn properties(definition: &Map<String, Value>) -> Result<Map<String, Value>, SyncError> {
    let parsed: DefinitionSchema = serde_json::from_value(Value::Object(definition.clone()))?;
    Ok(parsed.schema.properties)
}

/// Fetch one definition; `Ok(None)` when the platform does not answer 200.
fn fetch(ctx: &Context<'_>, object: &str) -> Result<Option<Map<String, Value>>, SyncError> {
    match ctx.fetch_json(&definition_path(Namespace::Custom, object)) {
        Ok(definition) => Ok(Some(definition)),
        Err(e @ SyncError::Upstream { .. }) => {
            tracing::error!("failed to fetch definition of {object}: {e}");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

pub fn extract(ctx: &Context<'_>) -> Result<StepLog, SyncError> {
    let mut log = StepLog::default();
    for object in &ctx.config.custom_object_names {
        let Some(mut definition) = fetch(ctx, &object.0)? else {
            log.skip(object.0.as_str(), "definition not available in source environment");
            continue;
        };
        strip_system_keys(&mut definition);
        write_json(&ctx.layout.custom_object_file(&object.0), &definition)?;
        log.processed(object.0.as_str());
    }
    Ok(log)
}

pub fn plan(ctx: &Context<'_>) -> Result<StepLog, SyncError> {
    let mut log = StepLog::default();
    let mut diffs: BTreeMap<String, PropertyDiff> = BTreeMap::new();

    for object in &ctx.config.custom_object_names {
        let path = ctx.layout.custom_object_file(&object.0);
        let Some(source) = read_json_opt::<Map<String, Value>>(&path)? else {
            log.skip(object.0.as_str(), format!("{} not extracted", path.display()));
            continue;
        };
        let Some(target) = fetch(ctx, &object.0)? else {
            log.warn(format!("custom object {object} does not exist in target environment"));
            log.skip(object.0.as_str(), "missing in target environment");
            continue;
        };
        diffs.insert(
            object.0.clone(),
            diff_properties(&properties(&source)?, &properties(&target)?),
        );
        log.processed(object.0.as_str());
    }

    let out = ctx.layout.custom_objects_diff_file();
    tracing::info!("writing custom object definitions diff to {}", out.display());
    write_json(&out, &diffs)?;
    Ok(log)
}

pub fn deploy(ctx: &Context<'_>) -> Result<StepLog, SyncError> {
    let mut log = StepLog::default();
    let path = ctx.layout.custom_objects_diff_file();
    let Some(diffs) = read_json_opt::<BTreeMap<String, PropertyDiff>>(&path)? else {
        log.skip(
            "custom object definitions",
            format!("no plan output at {}", path.display()),
        );
        return Ok(log);
    };
    migration::replay(ctx, Namespace::Custom, &diffs, &mut log);
    Ok(log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn strips_platform_managed_keys() {
        let mut def = object(json!({
            "Id": "x", "type": "Rate", "CreatedById": "u", "UpdatedById": "u",
            "CreatedDate": "d", "UpdatedDate": "d", "schema": {}
        }));
        strip_system_keys(&mut def);
        assert_eq!(def, object(json!({"schema": {}})));
    }

    #[test]
    fn properties_default_to_empty() {
        assert!(properties(&object(json!({"schema": {}}))).unwrap().is_empty());
    }

    #[test]
    fn definition_without_schema_is_rejected() {
        assert!(properties(&object(json!({"label": "Rate"}))).is_err());
    }
}
