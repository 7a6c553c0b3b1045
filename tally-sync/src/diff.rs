//! Diff engine.
//!
//! Two shapes of diff:
//!
//! - [`PropertyDiff`] for custom fields and custom object definitions,
//!   keyed by property name.
//! - [`RecordDiff`] for custom object records, matched on a configured
//!   business key. The platform `Id` never takes part in matching or in the
//!   field comparison; it only rides along so updates can target the record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use tally_core::types::MatchCriteria;

pub const ID: &str = "Id";
pub const LOOKUP_TYPE: &str = "LookupType__c";
pub const LOOKUP_VALUE: &str = "LookupValue1__c";
pub const SEQUENCE_SET: &str = "SEQUENCESET";
/// Value given to a sequence-set record's lookup value when it is added.
pub const GENERATED_ON_DEPLOY: &str = "To be generated on DEPLOY step";

pub type Record = Map<String, Value>;

// ---------------------------------------------------------------------------
// Property diff
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    pub old: Value,
    pub new: Value,
}

/// Add / update / delete sets for one object's properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyDiff {
    #[serde(default)]
    pub add: BTreeMap<String, Value>,
    #[serde(default)]
    pub update: BTreeMap<String, Change>,
    #[serde(default)]
    pub delete: BTreeMap<String, Value>,
}

impl PropertyDiff {
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }
}

/// Compare two property maps by name. Definitions are compared whole.
pub fn diff_properties(source: &Map<String, Value>, target: &Map<String, Value>) -> PropertyDiff {
    let mut diff = PropertyDiff::default();
    for (name, definition) in source {
        match target.get(name) {
            None => {
                diff.add.insert(name.clone(), definition.clone());
            }
            Some(current) if current != definition => {
                diff.update.insert(
                    name.clone(),
                    Change {
                        old: current.clone(),
                        new: definition.clone(),
                    },
                );
            }
            Some(_) => {}
        }
    }
    for (name, definition) in target {
        if !source.contains_key(name) {
            diff.delete.insert(name.clone(), definition.clone());
        }
    }
    diff
}

// ---------------------------------------------------------------------------
// Record diff
// ---------------------------------------------------------------------------

/// Add / update / delete sets for one custom object type's records.
///
/// `update` entries hold only differing attributes: `{attr: new, "__attr": old}`
/// plus the target record's `Id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordDiff {
    #[serde(default)]
    pub add: Vec<Record>,
    #[serde(default)]
    pub update: Vec<Record>,
    #[serde(default)]
    pub delete: Vec<Record>,
}

impl RecordDiff {
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }
}

/// First record in `records` whose business key equals `wanted`'s.
///
/// A missing key attribute compares equal to another missing one.
pub fn find_match<'a>(records: &'a [Record], wanted: &Record, criteria: &MatchCriteria) -> Option<&'a Record> {
    records.iter().find(|record| {
        record.get(&criteria.primary) == wanted.get(&criteria.primary)
            && criteria
                .secondary
                .as_ref()
                .map_or(true, |key| record.get(key) == wanted.get(key))
    })
}

fn is_sequence_set(record: &Record) -> bool {
    record.get(LOOKUP_TYPE).and_then(Value::as_str) == Some(SEQUENCE_SET)
}

/// Field-level changes from `target` to `source`, or `None` when equal.
fn record_changes(source: &Record, target: &Record) -> Option<Record> {
    let mut changes = Record::new();
    for (key, value) in source {
        if key == ID {
            continue;
        }
        let current = target.get(key);
        if current != Some(value) {
            changes.insert(key.clone(), value.clone());
            changes.insert(format!("__{key}"), current.cloned().unwrap_or(Value::Null));
        }
    }
    if changes.is_empty() {
        return None;
    }
    changes.insert(ID.to_owned(), target.get(ID).cloned().unwrap_or(Value::Null));
    Some(changes)
}

/// Diff `source` records (repository) against `target` records (environment).
///
/// Matching is first-match-wins by linear scan: when several target records
/// share a business key only the first one receives the update. The others
/// still match a source record, so they are neither updated nor deleted.
pub fn diff_records(source: &[Record], target: &[Record], criteria: &MatchCriteria) -> RecordDiff {
    let mut diff = RecordDiff::default();

    for record in source {
        match find_match(target, record, criteria) {
            Some(_) if is_sequence_set(record) => {}
            Some(matched) => diff.update.extend(record_changes(record, matched)),
            None => {
                let mut added = record.clone();
                added.remove(ID);
                if is_sequence_set(record) {
                    added.insert(LOOKUP_VALUE.to_owned(), Value::String(GENERATED_ON_DEPLOY.to_owned()));
                }
                diff.add.push(added);
            }
        }
    }

    for record in target {
        if find_match(source, record, criteria).is_none() {
            diff.delete.push(record.clone());
        }
    }

    diff
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(m) => m,
            other => panic!("expected object, got {other}"),
        }
    }

    fn records(value: Value) -> Vec<Record> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn new_field_is_added() {
        let diff = diff_properties(&map(json!({"Foo__c": {"type": "string"}})), &Map::new());
        assert_eq!(diff.add, BTreeMap::from([("Foo__c".to_owned(), json!({"type": "string"}))]));
        assert!(diff.update.is_empty());
        assert!(diff.delete.is_empty());
    }

    #[test]
    fn changed_and_removed_fields() {
        let source = map(json!({"A": {"type": "string"}, "B": {"type": "number"}}));
        let target = map(json!({"A": {"type": "string"}, "B": {"type": "string"}, "C": {}}));
        let diff = diff_properties(&source, &target);

        assert!(diff.add.is_empty());
        assert_eq!(
            diff.update["B"],
            Change { old: json!({"type": "string"}), new: json!({"type": "number"}) }
        );
        assert_eq!(diff.delete.keys().collect::<Vec<_>>(), vec!["C"]);
    }

    #[test]
    fn record_update_carries_old_value_and_target_id() {
        let source = records(json!([{"Id": "1", "Key__c": "A", "Val__c": 1}]));
        let target = records(json!([{"Id": "9", "Key__c": "A", "Val__c": 2}]));
        let diff = diff_records(&source, &target, &MatchCriteria::primary("Key__c"));

        assert_eq!(diff.update, records(json!([{"Val__c": 1, "__Val__c": 2, "Id": "9"}])));
        assert!(diff.add.is_empty());
        assert!(diff.delete.is_empty());
    }

    #[test]
    fn attribute_missing_in_target_records_null_old_value() {
        let source = records(json!([{"Key__c": "A", "New__c": "x"}]));
        let target = records(json!([{"Id": "9", "Key__c": "A"}]));
        let diff = diff_records(&source, &target, &MatchCriteria::primary("Key__c"));
        assert_eq!(diff.update, records(json!([{"New__c": "x", "__New__c": null, "Id": "9"}])));
    }

    #[test]
    fn platform_id_never_matches_records() {
        let source = records(json!([{"Id": "same", "Key__c": "A"}]));
        let target = records(json!([{"Id": "same", "Key__c": "B"}]));
        let diff = diff_records(&source, &target, &MatchCriteria::primary("Key__c"));

        assert_eq!(diff.add, records(json!([{"Key__c": "A"}])));
        assert_eq!(diff.delete, target);
    }

    #[test]
    fn composite_key_requires_both_attributes() {
        let criteria = MatchCriteria::composite("Type__c", "Code__c");
        let source = records(json!([{"Type__c": "T", "Code__c": "1", "V": 1}]));
        let target = records(json!([{"Id": "9", "Type__c": "T", "Code__c": "2", "V": 1}]));
        let diff = diff_records(&source, &target, &criteria);
        assert_eq!(diff.add.len(), 1);
        assert_eq!(diff.delete.len(), 1);
    }

    #[test]
    fn sequence_set_is_exempt_from_update_and_marked_on_add() {
        let criteria = MatchCriteria::composite("LookupType__c", "Key__c");
        let source = records(json!([
            {"LookupType__c": "SEQUENCESET", "Key__c": "INV", "LookupValue1__c": "100"},
            {"Id": "4", "LookupType__c": "SEQUENCESET", "Key__c": "CM", "LookupValue1__c": "7"}
        ]));
        let target = records(json!([
            {"Id": "9", "LookupType__c": "SEQUENCESET", "Key__c": "INV", "LookupValue1__c": "555"}
        ]));
        let diff = diff_records(&source, &target, &criteria);

        assert!(diff.update.is_empty());
        assert_eq!(
            diff.add,
            records(json!([{
                "LookupType__c": "SEQUENCESET", "Key__c": "CM",
                "LookupValue1__c": GENERATED_ON_DEPLOY
            }]))
        );
    }

    #[test]
    fn duplicate_target_keys_match_first_only() {
        let source = records(json!([{"Key__c": "A", "V": 1}]));
        let target = records(json!([
            {"Id": "t1", "Key__c": "A", "V": 2},
            {"Id": "t2", "Key__c": "A", "V": 1}
        ]));
        let diff = diff_records(&source, &target, &MatchCriteria::primary("Key__c"));

        assert_eq!(diff.update, records(json!([{"V": 1, "__V": 2, "Id": "t1"}])));
        assert!(diff.add.is_empty());
        assert!(diff.delete.is_empty());
    }
}
