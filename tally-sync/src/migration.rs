//! Property diffs replayed as object migrations.
//!
//! One `POST objects/migrations` per object, carrying every add, update and
//! delete of that object's properties as a single action list.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{json, Value};

use tally_api::{ApiRequest, Method};

use crate::context::Context;
use crate::diff::PropertyDiff;
use crate::report::StepLog;

pub const MIGRATIONS_PATH: &str = "objects/migrations";

/// Definition namespace an object lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    /// Standard platform objects.
    Standard,
    /// Tenant-defined custom objects.
    Custom,
}

impl Namespace {
    pub fn as_str(self) -> &'static str {
        match self {
            Namespace::Standard => "com_zuora",
            Namespace::Custom => "default",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Path of an object definition, e.g. `objects/definitions/com_zuora/account`.
pub fn definition_path(namespace: Namespace, object: &str) -> String {
    format!("objects/definitions/{namespace}/{object}")
}

fn action(kind: &str, namespace: Namespace, object: &str, name: &str) -> serde_json::Map<String, Value> {
    let mut action = serde_json::Map::new();
    action.insert("type".to_owned(), Value::from(kind));
    action.insert("namespace".to_owned(), Value::from(namespace.as_str()));
    action.insert("object".to_owned(), Value::from(object));
    action.insert("name".to_owned(), Value::from(name));
    action
}

/// Migration actions for one object, adds first, then updates, then deletes.
pub fn migration_actions(namespace: Namespace, object: &str, diff: &PropertyDiff) -> Vec<Value> {
    let mut actions = Vec::with_capacity(diff.add.len() + diff.update.len() + diff.delete.len());
    for (name, definition) in &diff.add {
        let mut a = action("addField", namespace, object, name);
        a.insert("field".to_owned(), definition.clone());
        actions.push(Value::Object(a));
    }
    for (name, change) in &diff.update {
        let mut a = action("updateField", namespace, object, name);
        a.insert("field".to_owned(), change.new.clone());
        actions.push(Value::Object(a));
    }
    for name in diff.delete.keys() {
        actions.push(Value::Object(action("deleteField", namespace, object, name)));
    }
    actions
}

/// Request body for one object, or `None` when there is nothing to migrate.
pub fn migration_body(namespace: Namespace, object: &str, diff: &PropertyDiff) -> Option<Value> {
    if diff.is_empty() {
        return None;
    }
    Some(json!({ "actions": migration_actions(namespace, object, diff) }))
}

/// Send one migration per object with a non-empty diff.
///
/// A rejected migration skips that object; the others are still sent.
pub(crate) fn replay(
    ctx: &Context<'_>,
    namespace: Namespace,
    diffs: &BTreeMap<String, PropertyDiff>,
    log: &mut StepLog,
) {
    for (object, diff) in diffs {
        let Some(body) = migration_body(namespace, object, diff) else {
            tracing::info!("{object}: nothing to migrate");
            continue;
        };
        tracing::info!(
            "{object}: migrating {} added, {} updated, {} deleted",
            diff.add.len(),
            diff.update.len(),
            diff.delete.len()
        );
        match ctx.send(ApiRequest::new(Method::Post, MIGRATIONS_PATH).body(body)) {
            Ok(_) => log.processed(object.as_str()),
            Err(e) => log.skip(object.as_str(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::Change;

    #[test]
    fn empty_diff_has_no_body() {
        assert!(migration_body(Namespace::Custom, "Rate", &PropertyDiff::default()).is_none());
    }

    #[test]
    fn actions_follow_diff_buckets() {
        let mut diff = PropertyDiff::default();
        diff.add.insert("New__c".to_owned(), json!({"type": "string"}));
        diff.update.insert(
            "Old__c".to_owned(),
            Change { old: json!({"type": "string"}), new: json!({"type": "number"}) },
        );
        diff.delete.insert("Gone__c".to_owned(), json!({"type": "date"}));

        let body = migration_body(Namespace::Standard, "account", &diff).unwrap();
        assert_eq!(
            body,
            json!({"actions": [
                {"type": "addField", "namespace": "com_zuora", "object": "account",
                 "name": "New__c", "field": {"type": "string"}},
                {"type": "updateField", "namespace": "com_zuora", "object": "account",
                 "name": "Old__c", "field": {"type": "number"}},
                {"type": "deleteField", "namespace": "com_zuora", "object": "account",
                 "name": "Gone__c"}
            ]})
        );
    }

    #[test]
    fn definition_paths_use_namespace() {
        assert_eq!(
            definition_path(Namespace::Custom, "Rate"),
            "objects/definitions/default/Rate"
        );
    }
}
