//! Property tests: codec round trips and the re-linking fixed point.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use proptest::prelude::*;
use serde_json::{json, Map, Value};

use tally_codec::billing::{decompose_template, recompose_template};
use tally_codec::task::{self, Binding, TaskBody, ACTIONS};
use tally_codec::{TaskDefinition, TaskMaps};

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn task_name() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9 _-]{0,12}"
}

fn code_text() -> impl Strategy<Value = String> {
    "[a-z0-9 {}()<>=;\n]{0,40}"
}

fn parameters() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map("p_[a-z]{1,6}", "[a-z0-9]{0,8}", 0..4).prop_map(|m| {
        m.into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect()
    })
}

/// Tasks whose fields are all ones the codec carries for their action type.
fn portable_task() -> impl Strategy<Value = TaskDefinition> {
    let action = prop::sample::select(
        ACTIONS
            .iter()
            .map(|a| a.name)
            .chain(["Export", "Wait::Until"])
            .collect::<Vec<_>>(),
    );
    (
        1..10_000i64,
        task_name(),
        action,
        parameters(),
        prop::option::of(code_text()),
        "[a-z]{0,6}",
        "[A-Za-z]{1,10}",
        prop::option::of("[0-9]{1,5}"),
    )
        .prop_map(|(id, name, action, mut parameters, code, css, object, object_id)| {
            let spec = ACTIONS.iter().find(|a| a.name == action);
            if let (Some(code), Some(slot)) = (code, spec.and_then(|s| s.code)) {
                match slot.path {
                    [key] => {
                        parameters.insert((*key).to_owned(), Value::String(code));
                    }
                    [outer, key] => {
                        let mut inner = Map::new();
                        inner.insert((*key).to_owned(), Value::String(code));
                        parameters.insert((*outer).to_owned(), Value::Object(inner));
                    }
                    _ => {}
                }
            }
            let (object, object_id) = match spec.map(|s| s.binding) {
                Some(Binding::None) => (None, None),
                Some(Binding::ObjectAndId) => (Some(object), Some(Value::String(object_id.unwrap_or_default()))),
                Some(Binding::Object) => (Some(object), None),
                Some(Binding::ObjectIdIfPresent) => (None, object_id.map(Value::String)),
                None => (Some(object), object_id.map(Value::String)),
            };
            TaskDefinition {
                id,
                name,
                body: TaskBody {
                    action_type: action.to_owned(),
                    parameters,
                    css: json!({ "color": css }),
                    object,
                    object_id,
                    extra: Map::new(),
                },
            }
        })
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn task_round_trip(original in portable_task()) {
        let parts = task::decompose(original.clone()).unwrap();
        let code = parts.code.as_ref().map(|f| f.contents.as_str());
        let rebuilt = task::recompose(&original.name, original.id, parts.metadata, code).unwrap();
        prop_assert_eq!(rebuilt, original);
    }

    #[test]
    fn relink_with_identical_maps_is_a_no_op(
        ids in prop::collection::btree_set(1..500i64, 1..6),
        extra_id in 0..600i64,
    ) {
        let map: IndexMap<String, i64> =
            ids.iter().map(|id| (format!("Task{id}"), *id)).collect();
        let maps = TaskMaps::identity(map);

        let mut files = Vec::new();
        for id in ids.iter().chain([&extra_id]) {
            files.push(json!({"key": format!("Export__{id}.csv")}));
        }
        let original: TaskDefinition = serde_json::from_value(json!({
            "id": 1, "name": "Fetch", "action_type": "Callout",
            "parameters": {
                "files": files,
                "url": format!("https://h/FileDownload/Task__{extra_id}.json")
            }
        })).unwrap();

        let mut relinked = original.clone();
        maps.relink_task(&mut relinked);
        prop_assert_eq!(relinked, original);
    }

    #[test]
    fn template_round_trip(
        blocks in prop::collection::vec(("[a-z ]{0,10}", "[A-Za-z0-9 ]{0,12}"), 0..14),
        tail in "[a-z ]{0,10}",
    ) {
        let mut page = String::new();
        let mut contents = Vec::new();
        for (i, (filler, text)) in blocks.iter().enumerate() {
            let html = format!("<span data-k=\"{i}\">{text}</span>");
            page.push_str(filler);
            page.push_str(&format!("<div id=\"blk{i}\">{html}</div>"));
            contents.push(json!({
                "type": "customx", "slug": "reactHtml",
                "values": {"_meta": {"htmlID": format!("blk{i}")}, "html": html}
            }));
        }
        page.push_str(&tail);
        let original = json!({
            "htmlContent": page,
            "design": {"body": {"rows": [{"columns": [{"contents": contents}]}]}}
        });

        let parts = decompose_template(original.clone()).unwrap();
        let fragments: BTreeMap<String, String> = parts
            .fragments
            .iter()
            .map(|f| (f.file_name.trim_end_matches(".html").to_owned(), f.contents.clone()))
            .collect();
        let rebuilt = recompose_template(parts.metadata, &parts.main_content, &fragments).unwrap();
        prop_assert_eq!(rebuilt, original);
    }
}
