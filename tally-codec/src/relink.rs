//! Task-id re-linking.
//!
//! Task ids are small integers local to one environment, and they leak into
//! task parameters: file keys such as `Callout__12.json`, download URLs, and
//! the `object` of iterating tasks. Two maps translate them:
//!
//! - `original`: task name -> id in the exporting environment
//! - `new`: task name -> 1-based position in the workflow's task list
//!
//! A reference `...__<id>.<ext>` is rewritten by resolving `<id>` to a task
//! name through `original` and replacing it with that name's id in `new`.
//! Only the trailing id is touched. Unresolvable ids leave the reference
//! unchanged and produce a [`Warning`].

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::task::{References, TaskDefinition};
use crate::warning::Warning;

/// The two task maps of one workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskMaps {
    pub original: IndexMap<String, i64>,
    pub new: IndexMap<String, i64>,
}

impl TaskMaps {
    /// Build both maps from tasks in workflow order. A repeated name keeps
    /// its first position and its last id.
    pub fn from_tasks(tasks: &[TaskDefinition]) -> Self {
        let mut maps = Self::default();
        for (position, task) in tasks.iter().enumerate() {
            maps.original.insert(task.name.clone(), task.id);
            maps.new.insert(task.name.clone(), position as i64 + 1);
        }
        maps
    }

    /// Maps where every task keeps its id; re-linking with these is a no-op.
    pub fn identity(map: IndexMap<String, i64>) -> Self {
        Self {
            original: map.clone(),
            new: map,
        }
    }

    /// Name of the task that had `id` in the exporting environment.
    pub fn name_for_original_id(&self, id: i64) -> Option<&str> {
        self.original
            .iter()
            .find(|(_, v)| **v == id)
            .map(|(name, _)| name.as_str())
    }

    pub fn new_id(&self, name: &str) -> Option<i64> {
        self.new.get(name).copied()
    }

    /// Rewrite the trailing task id of `reference`.
    ///
    /// Returns the (possibly unchanged) reference and, when the id could not
    /// be resolved, a warning attributed to `task`.
    pub fn relink_reference(&self, task: &str, reference: &str) -> (String, Option<Warning>) {
        let Some((range, old_id)) = locate_id(reference) else {
            return (reference.to_owned(), None);
        };
        let resolved = self
            .name_for_original_id(old_id)
            .and_then(|name| self.new_id(name));
        match resolved {
            Some(new_id) if new_id == old_id => (reference.to_owned(), None),
            Some(new_id) => {
                tracing::debug!("task '{task}': id {old_id} -> {new_id} in '{reference}'");
                let mut out = String::with_capacity(reference.len());
                out.push_str(&reference[..range.start]);
                out.push_str(&new_id.to_string());
                out.push_str(&reference[range.end..]);
                (out, None)
            }
            None => {
                let warning = Warning::UnresolvedReference {
                    task: task.to_owned(),
                    reference: reference.to_owned(),
                };
                tracing::warn!("{warning}");
                (reference.to_owned(), Some(warning))
            }
        }
    }

    /// Rewrite every embedded reference of `task` that its action type declares.
    pub fn relink_task(&self, task: &mut TaskDefinition) -> Vec<Warning> {
        let Some(action) = task.body.action() else {
            return Vec::new();
        };
        let name = task.name.clone();
        let mut warnings = Vec::new();
        let mut relink = |value: &str| {
            let (out, warning) = self.relink_reference(&name, value);
            warnings.extend(warning);
            out
        };

        match action.spec().references {
            References::None => {}
            References::Object => {
                if let Some(object) = task.body.object.as_deref() {
                    task.body.object = Some(relink(object));
                }
            }
            References::FilesAndDownloadUrl => {
                if let Some(Value::Array(files)) = task.body.parameters.get_mut("files") {
                    for file in files.iter_mut() {
                        if let Some(Value::String(key)) = file.get_mut("key") {
                            *key = relink(key);
                        }
                    }
                }
                if let Some(Value::String(url)) = task.body.parameters.get_mut("url") {
                    if url.contains("FileDownload") {
                        *url = relink(url);
                    }
                }
            }
            References::Attachments => {
                if let Some(Value::Object(files)) = task.body.parameters.get_mut("files") {
                    let relinked: Map<String, Value> = std::mem::take(files)
                        .into_iter()
                        .map(|(file_name, file)| (relink(&file_name), file))
                        .collect();
                    *files = relinked;
                }
            }
        }
        warnings
    }
}

/// The task id a reference ends with: the text after the last `__`, up to
/// its first `.`. Zero and non-numeric text are not ids.
pub fn id_from_reference(reference: &str) -> Option<i64> {
    locate_id(reference).map(|(_, id)| id)
}

fn locate_id(reference: &str) -> Option<(std::ops::Range<usize>, i64)> {
    let start = reference.rfind("__").map_or(0, |i| i + 2);
    let suffix = &reference[start..];
    let end = start + suffix.find('.').unwrap_or(suffix.len());
    let id: i64 = reference[start..end].parse().ok()?;
    (id != 0).then_some((start..end, id))
}

/// Names appearing more than once, in order of their second appearance.
pub fn duplicate_names(tasks: &[TaskDefinition]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut duplicates = Vec::new();
    for task in tasks {
        if !seen.insert(task.name.as_str()) {
            tracing::warn!("duplicate task name '{}'", task.name);
            duplicates.push(task.name.clone());
        }
    }
    duplicates
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn task(value: Value) -> TaskDefinition {
        serde_json::from_value(value).unwrap()
    }

    fn maps() -> TaskMaps {
        let tasks = vec![
            task(json!({"id": 501, "name": "Fetch", "action_type": "Callout"})),
            task(json!({"id": 502, "name": "Loop", "action_type": "Iterate"})),
            task(json!({"id": 510, "name": "Mail", "action_type": "Email"})),
        ];
        TaskMaps::from_tasks(&tasks)
    }

    #[test]
    fn id_is_parsed_from_trailing_suffix() {
        assert_eq!(id_from_reference("Callout__501.json"), Some(501));
        assert_eq!(id_from_reference("Data.Export__abc__7.csv"), Some(7));
        assert_eq!(id_from_reference("42"), Some(42));
        assert_eq!(id_from_reference("report.pdf"), None);
        assert_eq!(id_from_reference("Callout__0.json"), None);
    }

    #[test]
    fn new_ids_are_sequential() {
        let m = maps();
        assert_eq!(m.new_id("Fetch"), Some(1));
        assert_eq!(m.new_id("Mail"), Some(3));
        assert_eq!(m.name_for_original_id(510), Some("Mail"));
    }

    #[test]
    fn only_the_trailing_id_is_replaced() {
        let (out, warning) = maps().relink_reference("t", "Batch501__501.json");
        assert_eq!(out, "Batch501__1.json");
        assert!(warning.is_none());
    }

    #[test]
    fn unresolved_id_is_left_with_warning() {
        let (out, warning) = maps().relink_reference("Loop", "Callout__999.json");
        assert_eq!(out, "Callout__999.json");
        assert_eq!(
            warning,
            Some(Warning::UnresolvedReference {
                task: "Loop".to_owned(),
                reference: "Callout__999.json".to_owned()
            })
        );
    }

    #[test]
    fn callout_files_and_download_url_are_relinked() {
        let mut t = task(json!({
            "id": 600, "name": "Get", "action_type": "Callout",
            "parameters": {
                "files": [{"key": "Callout__501.json"}, {"key": "plain.txt"}],
                "url": "https://host/FileDownload/Fetch__502.csv"
            }
        }));
        let warnings = maps().relink_task(&mut t);
        assert!(warnings.is_empty());
        assert_eq!(t.body.parameters["files"][0]["key"], "Callout__1.json");
        assert_eq!(t.body.parameters["files"][1]["key"], "plain.txt");
        assert_eq!(t.body.parameters["url"], "https://host/FileDownload/Fetch__2.csv");
    }

    #[test]
    fn url_without_file_download_is_untouched() {
        let mut t = task(json!({
            "id": 600, "name": "Get", "action_type": "Callout",
            "parameters": {"url": "https://host/v1/accounts__501.json"}
        }));
        maps().relink_task(&mut t);
        assert_eq!(t.body.parameters["url"], "https://host/v1/accounts__501.json");
    }

    #[test]
    fn iterate_object_and_email_attachments_are_relinked() {
        let mut iterate = task(json!({
            "id": 700, "name": "Each", "action_type": "Iterate", "object": "Fetch__501"
        }));
        maps().relink_task(&mut iterate);
        assert_eq!(iterate.body.object.as_deref(), Some("Fetch__1"));

        let mut email = task(json!({
            "id": 701, "name": "Send", "action_type": "Email",
            "parameters": {"files": {"Export__510.csv": {"size": 1}}}
        }));
        maps().relink_task(&mut email);
        assert_eq!(email.body.parameters["files"], json!({"Export__3.csv": {"size": 1}}));
    }

    #[test]
    fn duplicates_are_reported_and_last_id_wins() {
        let tasks = vec![
            task(json!({"id": 1, "name": "A", "action_type": "If"})),
            task(json!({"id": 2, "name": "B", "action_type": "If"})),
            task(json!({"id": 3, "name": "A", "action_type": "If"})),
        ];
        assert_eq!(duplicate_names(&tasks), vec!["A".to_owned()]);
        let m = TaskMaps::from_tasks(&tasks);
        assert_eq!(m.original["A"], 3);
        assert_eq!(m.new["A"], 3);
        assert_eq!(m.new.get_index_of("A"), Some(0));
    }
}
