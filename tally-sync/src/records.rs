//! Custom object records.
//!
//! Records are matched across environments on the business key configured
//! in `custom_objects_map`, never on the platform `Id`.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{json, Value};

use tally_api::{ApiRequest, Method};

use crate::context::Context;
use crate::diff::{diff_records, Record, RecordDiff, GENERATED_ON_DEPLOY, ID, LOOKUP_VALUE};
use crate::error::SyncError;
use crate::objects::strip_system_keys;
use crate::report::StepLog;
use crate::writer::{read_json_opt, write_json};

#[derive(Debug, Deserialize)]
struct RecordsResponse {
    #[serde(default)]
    records: Vec<Record>,
}

pub fn records_path(object_type: &str) -> String {
    format!("objects/records/default/{object_type}")
}

/// Fetch all records of one type; `Ok(None)` when the platform does not answer 200.
fn fetch(ctx: &Context<'_>, object_type: &str) -> Result<Option<Vec<Record>>, SyncError> {
    match ctx.fetch_json::<RecordsResponse>(&records_path(object_type)) {
        Ok(response) => Ok(Some(response.records)),
        Err(e @ SyncError::Upstream { .. }) => {
            tracing::error!("failed to fetch {object_type} records: {e}");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Extract records of every configured custom object, system keys removed.
pub fn extract(ctx: &Context<'_>) -> Result<StepLog, SyncError> {
    let mut log = StepLog::default();
    for object in &ctx.config.custom_object_names {
        let Some(mut records) = fetch(ctx, &object.0)? else {
            log.skip(object.0.as_str(), "records not available in source environment");
            continue;
        };
        records.iter_mut().for_each(strip_system_keys);
        tracing::info!("{object}: {} records", records.len());
        write_json(&ctx.layout.records_file(&object.0), &records)?;
        log.processed(object.0.as_str());
    }
    Ok(log)
}

/// Diff repository records against the target's, keys intact on the target side.
///
/// A type that was never extracted is skipped; an unreadable or malformed
/// repository file is an error.
pub fn plan(ctx: &Context<'_>) -> Result<StepLog, SyncError> {
    let mut log = StepLog::default();
    let mut diffs: BTreeMap<String, RecordDiff> = BTreeMap::new();

    for (object_type, criteria) in &ctx.config.custom_objects_map {
        let path = ctx.layout.records_file(object_type);
        let Some(source) = read_json_opt::<Vec<Record>>(&path)? else {
            log.skip(object_type.as_str(), format!("{} not extracted", path.display()));
            continue;
        };
        let Some(target) = fetch(ctx, object_type)? else {
            log.skip(object_type.as_str(), "records not available in target environment");
            continue;
        };
        tracing::info!("comparing {object_type} records");
        let diff = diff_records(&source, &target, criteria);
        tracing::info!(
            "{object_type}: {} to add, {} to update, {} to delete",
            diff.add.len(),
            diff.update.len(),
            diff.delete.len()
        );
        diffs.insert(object_type.clone(), diff);
        log.processed(object_type.as_str());
    }

    let out = ctx.layout.records_diff_file();
    tracing::info!("writing custom object records diff to {}", out.display());
    write_json(&out, &diffs)?;
    Ok(log)
}

/// New values of an update entry, without the `__` old values and the `Id`.
pub fn update_values(update: &Record) -> Record {
    update
        .iter()
        .filter(|(key, _)| key.as_str() != ID && !key.starts_with("__"))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn awaits_generation(record: &Record) -> bool {
    record.get(LOOKUP_VALUE).and_then(Value::as_str) == Some(GENERATED_ON_DEPLOY)
}

fn deploy_type(ctx: &Context<'_>, object_type: &str, diff: RecordDiff, log: &mut StepLog) {
    let base = records_path(object_type);

    let (pending, adds): (Vec<Record>, Vec<Record>) =
        diff.add.into_iter().partition(awaits_generation);
    for record in &pending {
        log.warn(format!(
            "{object_type}: record {} needs a generated sequence value, not deployed",
            Value::Object(record.clone())
        ));
    }
    if !adds.is_empty() {
        let count = adds.len();
        match ctx.send(ApiRequest::new(Method::Post, &base).body(json!({ "records": adds }))) {
            Ok(_) => log.processed(format!("{object_type}: {count} added")),
            Err(e) => log.skip(format!("{object_type} adds"), e),
        }
    }

    for update in &diff.update {
        let Some(id) = update.get(ID).and_then(Value::as_str) else {
            log.skip(format!("{object_type} update"), "entry has no target Id");
            continue;
        };
        let request = ApiRequest::new(Method::Put, format!("{base}/{id}"))
            .body(Value::Object(update_values(update)));
        match ctx.send(request) {
            Ok(_) => log.processed(format!("{object_type}/{id}")),
            Err(e) => log.skip(format!("{object_type}/{id}"), e),
        }
    }

    let ids: Vec<Value> = diff
        .delete
        .iter()
        .filter_map(|record| record.get(ID).cloned())
        .collect();
    if !ids.is_empty() {
        let count = ids.len();
        let body = json!({ "action": { "type": "delete", "ids": ids } });
        match ctx.send(ApiRequest::new(Method::Post, format!("{base}/bulk")).body(body)) {
            Ok(_) => log.processed(format!("{object_type}: {count} deleted")),
            Err(e) => log.skip(format!("{object_type} deletes"), e),
        }
    }
}

pub fn deploy(ctx: &Context<'_>) -> Result<StepLog, SyncError> {
    let mut log = StepLog::default();
    let path = ctx.layout.records_diff_file();
    let Some(diffs) = read_json_opt::<BTreeMap<String, RecordDiff>>(&path)? else {
        log.skip("custom object records", format!("no plan output at {}", path.display()));
        return Ok(log);
    };
    for (object_type, diff) in diffs {
        if diff.is_empty() {
            tracing::info!("{object_type}: records already in sync");
            continue;
        }
        deploy_type(ctx, &object_type, diff, &mut log);
    }
    Ok(log)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_values_drop_old_values_and_id() {
        let update: Record = serde_json::from_value(json!({
            "Val__c": 1, "__Val__c": 2, "Name": "n", "__Name": null, "Id": "9"
        }))
        .unwrap();
        let values = update_values(&update);
        assert_eq!(Value::Object(values), json!({"Val__c": 1, "Name": "n"}));
    }

    #[test]
    fn records_path_uses_default_namespace() {
        assert_eq!(records_path("Rate"), "objects/records/default/Rate");
    }
}
