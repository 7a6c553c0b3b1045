//! Workflow task codec.
//!
//! A task's embedded source (liquid, JavaScript, JSONata, SQL or HTML) is
//! lifted out of its parameters into a side file `{task_name}.{ext}`; the
//! rest of the task becomes the metadata file `{task_name}.json`.
//!
//! Which parameter holds the code, which extension it gets and which object
//! binding the metadata keeps are all looked up in one table,
//! [`ActionType::spec`]. Supporting a new action type means adding a variant
//! and its row there.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{malformed, CodecError};
use crate::names::validate_name;

/// Parameter keys that only make sense inside the environment they came from.
pub const ENVIRONMENT_PARAMETERS: [&str; 2] = ["workflow_tags", "delete_payload_paths"];

// ---------------------------------------------------------------------------
// Typed task shape
// ---------------------------------------------------------------------------

/// A workflow task as the platform exports and imports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub id: i64,
    pub name: String,
    #[serde(flatten)]
    pub body: TaskBody,
}

/// Everything in a task except its environment id and name.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TaskBody {
    pub action_type: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default)]
    pub css: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// Action table
// ---------------------------------------------------------------------------

/// Extension of an embedded code side file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeExt {
    Liquid,
    Js,
    Jsonata,
    Sql,
    Html,
}

impl CodeExt {
    pub fn as_str(self) -> &'static str {
        match self {
            CodeExt::Liquid => "liquid",
            CodeExt::Js => "js",
            CodeExt::Jsonata => "jsonata",
            CodeExt::Sql => "sql",
            CodeExt::Html => "html",
        }
    }
}

/// Where a task's embedded code lives inside `parameters`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeSlot {
    pub path: &'static [&'static str],
    pub ext: CodeExt,
}

/// Which object fields the metadata file keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    None,
    ObjectAndId,
    /// `object` only; it names another task's output and is re-linked.
    Object,
    /// `object_id` when the task has one.
    ObjectIdIfPresent,
}

/// Embedded task-id references the re-linker rewrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum References {
    None,
    /// `parameters.files[].key` and a `parameters.url` containing `FileDownload`.
    FilesAndDownloadUrl,
    /// The task's `object`.
    Object,
    /// Keys of the `parameters.files` map.
    Attachments,
}

/// Known action types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionType {
    If,
    Liquid,
    Case,
    JavaScript,
    JsonTransform,
    DataLink,
    Email,
    CustomDocument,
    CustomBillingDocument,
    Update,
    ExecuteWorkflowTask,
    CustomObjectCreate,
    Iterate,
    CsvTranslator,
    Delay,
    Callout,
    GraphQuery,
    DownloadFile,
}

/// One row of the action table.
#[derive(Debug, Clone, Copy)]
pub struct ActionSpec {
    pub kind: ActionType,
    pub name: &'static str,
    pub code: Option<CodeSlot>,
    pub binding: Binding,
    pub references: References,
}

const fn code(path: &'static [&'static str], ext: CodeExt) -> Option<CodeSlot> {
    Some(CodeSlot { path, ext })
}

const fn row(
    kind: ActionType,
    name: &'static str,
    code: Option<CodeSlot>,
    binding: Binding,
    references: References,
) -> ActionSpec {
    ActionSpec {
        kind,
        name,
        code,
        binding,
        references,
    }
}

/// The action table, one row per [`ActionType`] in declaration order.
pub const ACTIONS: [ActionSpec; ActionType::ALL.len()] = {
    let mut table = [ActionType::If.spec(); ActionType::ALL.len()];
    let mut i = 0;
    while i < table.len() {
        table[i] = ActionType::ALL[i].spec();
        i += 1;
    }
    table
};

impl ActionType {
    pub const ALL: [ActionType; 18] = [
        ActionType::If,
        ActionType::Liquid,
        ActionType::Case,
        ActionType::JavaScript,
        ActionType::JsonTransform,
        ActionType::DataLink,
        ActionType::Email,
        ActionType::CustomDocument,
        ActionType::CustomBillingDocument,
        ActionType::Update,
        ActionType::ExecuteWorkflowTask,
        ActionType::CustomObjectCreate,
        ActionType::Iterate,
        ActionType::CsvTranslator,
        ActionType::Delay,
        ActionType::Callout,
        ActionType::GraphQuery,
        ActionType::DownloadFile,
    ];

    /// This action's row. The match is exhaustive, so a new variant cannot
    /// compile without one.
    #[rustfmt::skip]
    pub const fn spec(self) -> ActionSpec {
        match self {
            ActionType::If => row(self, "If", code(&["if_clause"], CodeExt::Liquid), Binding::None, References::None),
            ActionType::Liquid => row(self, "Logic::Liquid", code(&["code"], CodeExt::Liquid), Binding::None, References::None),
            ActionType::Case => row(self, "Logic::Case", code(&["case_clause"], CodeExt::Liquid), Binding::None, References::None),
            ActionType::JavaScript => row(self, "Script::JavaScript", code(&["code"], CodeExt::Js), Binding::None, References::None),
            ActionType::JsonTransform => row(self, "Logic::JSONTransform", code(&["template"], CodeExt::Jsonata), Binding::None, References::None),
            ActionType::DataLink => row(self, "Data::Link", code(&["query"], CodeExt::Sql), Binding::None, References::None),
            ActionType::Email => row(self, "Email", code(&["email", "template"], CodeExt::Html), Binding::None, References::Attachments),
            ActionType::CustomDocument => row(self, "File::CustomPDF::CustomDocument", code(&["template"], CodeExt::Html), Binding::ObjectIdIfPresent, References::None),
            ActionType::CustomBillingDocument => row(self, "Billing::CustomBillingDocument", code(&["template"], CodeExt::Html), Binding::ObjectIdIfPresent, References::None),
            ActionType::Update => row(self, "Update", None, Binding::ObjectAndId, References::None),
            ActionType::ExecuteWorkflowTask => row(self, "Execute::WorkflowTask", None, Binding::ObjectAndId, References::None),
            ActionType::CustomObjectCreate => row(self, "CustomObject::Create", None, Binding::ObjectAndId, References::None),
            ActionType::Iterate => row(self, "Iterate", None, Binding::Object, References::Object),
            ActionType::CsvTranslator => row(self, "Logic::CSVTranslator", None, Binding::Object, References::Object),
            ActionType::Delay => row(self, "Delay", None, Binding::None, References::FilesAndDownloadUrl),
            ActionType::Callout => row(self, "Callout", None, Binding::None, References::FilesAndDownloadUrl),
            ActionType::GraphQuery => row(self, "GraphQuery", None, Binding::None, References::FilesAndDownloadUrl),
            ActionType::DownloadFile => row(self, "File::DownloadFile", None, Binding::None, References::FilesAndDownloadUrl),
        }
    }

    /// Look up a platform action-type string. Unknown types return `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        ACTIONS.iter().find(|a| a.name == name).map(|a| a.kind)
    }

    pub fn as_str(self) -> &'static str {
        self.spec().name
    }
}

impl TaskBody {
    pub fn action(&self) -> Option<ActionType> {
        ActionType::from_name(&self.action_type)
    }
}

// ---------------------------------------------------------------------------
// Decompose
// ---------------------------------------------------------------------------

/// A file to be written next to the task metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideFile {
    pub file_name: String,
    pub contents: String,
}

/// A task split into its metadata document and optional code file.
#[derive(Debug, Clone, PartialEq)]
pub struct DecomposedTask {
    pub name: String,
    pub metadata: Value,
    pub code: Option<SideFile>,
}

impl DecomposedTask {
    pub fn metadata_file_name(&self) -> String {
        metadata_file_name(&self.name)
    }
}

pub fn metadata_file_name(task_name: &str) -> String {
    format!("{task_name}.json")
}

/// Name of the code side file a task of `action_type` would have, if any.
pub fn code_file_name(task_name: &str, action_type: &str) -> Option<String> {
    let slot = ActionType::from_name(action_type)?.spec().code?;
    Some(format!("{task_name}.{}", slot.ext.as_str()))
}

/// Remove parameter keys that are specific to the exporting environment.
pub fn strip_environment_parameters(body: &mut TaskBody) {
    for key in ENVIRONMENT_PARAMETERS {
        body.parameters.remove(key);
    }
}

/// Split `task` into metadata and code side file.
///
/// The task name is validated first; a forbidden character fails the whole
/// task. Carriage returns are removed from the extracted code.
pub fn decompose(task: TaskDefinition) -> Result<DecomposedTask, CodecError> {
    validate_name(&task.name)?;

    let Some(action) = task.body.action() else {
        tracing::info!(
            "task '{}': action type '{}' has no codec entry, keeping full task",
            task.name,
            task.body.action_type
        );
        let name = task.name.clone();
        return Ok(DecomposedTask {
            name,
            metadata: serde_json::to_value(&task)?,
            code: None,
        });
    };

    let spec = action.spec();
    let TaskDefinition { name, mut body, .. } = task;

    let code = match spec.code {
        Some(slot) => take_code(&mut body.parameters, slot, &name)?.map(|text| SideFile {
            file_name: format!("{name}.{}", slot.ext.as_str()),
            contents: text.replace('\r', ""),
        }),
        None => None,
    };

    let mut metadata = Map::new();
    metadata.insert("action_type".to_owned(), Value::String(body.action_type));
    metadata.insert("parameters".to_owned(), Value::Object(body.parameters));
    metadata.insert("css".to_owned(), body.css);
    match spec.binding {
        Binding::None => {}
        Binding::ObjectAndId => {
            metadata.insert(
                "object".to_owned(),
                body.object.map(Value::String).unwrap_or(Value::Null),
            );
            metadata.insert("object_id".to_owned(), body.object_id.unwrap_or(Value::Null));
        }
        Binding::Object => {
            metadata.insert(
                "object".to_owned(),
                body.object.map(Value::String).unwrap_or(Value::Null),
            );
        }
        Binding::ObjectIdIfPresent => {
            if let Some(object_id) = body.object_id {
                metadata.insert("object_id".to_owned(), object_id);
            }
        }
    }

    Ok(DecomposedTask {
        name,
        metadata: Value::Object(metadata),
        code,
    })
}

/// Remove the string at `slot` from `parameters`.
///
/// An absent or null slot means the task carries no code.
fn take_code(
    parameters: &mut Map<String, Value>,
    slot: CodeSlot,
    task_name: &str,
) -> Result<Option<String>, CodecError> {
    let Some((last, parents)) = slot.path.split_last() else {
        return Ok(None);
    };
    let mut current = parameters;
    for key in parents {
        match current.get_mut(*key) {
            Some(Value::Object(inner)) => current = inner,
            _ => return Ok(None),
        }
    }
    match current.remove(*last) {
        None => Ok(None),
        Some(Value::String(text)) => Ok(Some(text)),
        Some(Value::Null) => {
            current.insert((*last).to_owned(), Value::Null);
            Ok(None)
        }
        Some(other) => Err(malformed(
            format!("task '{task_name}'"),
            format!("parameter '{}' is {other}, expected a string", slot.path.join(".")),
        )),
    }
}

// ---------------------------------------------------------------------------
// Recompose
// ---------------------------------------------------------------------------

/// Rebuild a task from its metadata document and optional code text.
///
/// `id` and `name` come from the workflow's task map and always override
/// whatever the metadata carries.
pub fn recompose(
    name: &str,
    id: i64,
    metadata: Value,
    code: Option<&str>,
) -> Result<TaskDefinition, CodecError> {
    let Value::Object(mut fields) = metadata else {
        return Err(malformed(
            format!("task '{name}' metadata"),
            "expected a JSON object",
        ));
    };
    fields.remove("id");
    fields.remove("name");
    let mut body: TaskBody = serde_json::from_value(Value::Object(fields))?;

    if let (Some(text), Some(slot)) = (code, body.action().and_then(|a| a.spec().code)) {
        put_code(&mut body.parameters, slot, text);
    }

    Ok(TaskDefinition {
        id,
        name: name.to_owned(),
        body,
    })
}

fn put_code(parameters: &mut Map<String, Value>, slot: CodeSlot, text: &str) {
    let Some((last, parents)) = slot.path.split_last() else {
        return;
    };
    let mut current = parameters;
    for key in parents {
        let entry = current
            .entry((*key).to_owned())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        match entry {
            Value::Object(inner) => current = inner,
            _ => return,
        }
    }
    current.insert((*last).to_owned(), Value::String(text.to_owned()));
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
