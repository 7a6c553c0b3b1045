//! Billing document template codec.
//!
//! A template document carries its HTML twice: the full page in
//! `htmlContent`, and each custom HTML block again inside the design tree
//! (`design.body.rows[].columns[].contents[]`, entries with
//! `type == "customx"` and `slug == "reactHtml"`). Decompose keeps one copy
//! of each block in a side file `<htmlID>.html`, writes the page with the
//! content of each element `id="<htmlID>"` replaced by `placeholder-<htmlID>`
//! to `main_content.html`, and leaves `"Placeholder"` in both JSON slots.
//! Recompose fills both back in.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{malformed, CodecError};
use crate::markup::inner_html_span;
use crate::names::validate_name;
use crate::task::SideFile;

pub const PLACEHOLDER: &str = "Placeholder";
pub const CONTENT_FIELD: &str = "base64EncodedTemplateFileContent";

/// Request-form keys owned by the environment the template was read from.
pub const ENVIRONMENT_FORM_KEYS: [&str; 5] = [
    "id",
    "updatedOn",
    "templateNumber",
    "templateFormat",
    "associatedToBillingAccount",
];

const CUSTOM_TYPE: &str = "customx";
const HTML_SLUG: &str = "reactHtml";

pub fn placeholder_token(html_id: &str) -> String {
    format!("placeholder-{html_id}")
}

// ---------------------------------------------------------------------------
// Design tree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct TemplateDocument {
    design: Design,
    #[serde(rename = "htmlContent")]
    html_content: String,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Design {
    body: DesignBody,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct DesignBody {
    #[serde(default)]
    rows: Vec<Row>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Row {
    #[serde(default)]
    columns: Vec<Column>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Column {
    #[serde(default)]
    contents: Vec<Content>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Content {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    slug: Option<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    values: Value,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl Content {
    fn is_custom_html(&self) -> bool {
        self.kind.as_deref() == Some(CUSTOM_TYPE) && self.slug.as_deref() == Some(HTML_SLUG)
    }

    fn html_id(&self) -> Result<String, CodecError> {
        self.values
            .pointer("/_meta/htmlID")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| malformed("template content", "custom HTML block without _meta.htmlID"))
    }

    fn html_slot(&mut self, html_id: &str) -> Result<&mut Value, CodecError> {
        self.values
            .as_object_mut()
            .map(|values| values.entry("html").or_insert(Value::Null))
            .ok_or_else(|| malformed(format!("template block '{html_id}'"), "values is not an object"))
    }
}

impl TemplateDocument {
    fn custom_blocks_mut(&mut self) -> impl Iterator<Item = &mut Content> + '_ {
        self.design
            .body
            .rows
            .iter_mut()
            .flat_map(|row| row.columns.iter_mut())
            .flat_map(|column| column.contents.iter_mut())
            .filter(|content| content.is_custom_html())
    }
}

// ---------------------------------------------------------------------------
// Decompose / recompose
// ---------------------------------------------------------------------------

/// A template split into metadata, page HTML and one file per custom block.
#[derive(Debug, Clone, PartialEq)]
pub struct DecomposedTemplate {
    pub metadata: Value,
    pub main_content: String,
    pub fragments: Vec<SideFile>,
}

pub fn fragment_file_name(html_id: &str) -> String {
    format!("{html_id}.html")
}

/// Split a template document.
///
/// The page element whose `id` equals a block's `htmlID` has its content
/// replaced by the placeholder token. A block without such an element, or
/// nested inside another block so that its token is lost, fails the whole
/// template.
pub fn decompose_template(raw: Value) -> Result<DecomposedTemplate, CodecError> {
    let mut doc: TemplateDocument = serde_json::from_value(raw)?;
    let mut main = std::mem::take(&mut doc.html_content);
    let mut fragments = Vec::new();

    for content in doc.custom_blocks_mut() {
        let html_id = content.html_id()?;
        validate_name(&html_id)?;
        let slot = content.html_slot(&html_id)?;
        let html = match std::mem::replace(slot, Value::String(PLACEHOLDER.to_owned())) {
            Value::String(html) => html,
            other => {
                return Err(malformed(
                    format!("template block '{html_id}'"),
                    format!("html is {other}, expected a string"),
                ))
            }
        };

        let span = inner_html_span(&main, &html_id).ok_or_else(|| CodecError::FragmentNotFound {
            html_id: html_id.clone(),
        })?;
        main.replace_range(span, &placeholder_token(&html_id));

        tracing::debug!("extracted template block {html_id}");
        fragments.push(SideFile {
            file_name: fragment_file_name(&html_id),
            contents: html,
        });
    }

    // An outer block replaced after an inner one swallows the inner token.
    for fragment in &fragments {
        let html_id = fragment.file_name.trim_end_matches(".html");
        if token_span(&main, html_id).is_none() {
            return Err(CodecError::FragmentNotFound {
                html_id: html_id.to_owned(),
            });
        }
    }

    doc.html_content = PLACEHOLDER.to_owned();
    Ok(DecomposedTemplate {
        metadata: serde_json::to_value(&doc)?,
        main_content: main,
        fragments,
    })
}

/// The `htmlID`s of every custom block in a template's metadata, in tree order.
pub fn fragment_ids(metadata: &Value) -> Result<Vec<String>, CodecError> {
    let mut doc: TemplateDocument = serde_json::from_value(metadata.clone())?;
    doc.custom_blocks_mut().map(|c| c.html_id()).collect()
}

/// Inverse of [`decompose_template`]. `fragments` maps `htmlID` to block HTML.
pub fn recompose_template(
    metadata: Value,
    main_content: &str,
    fragments: &BTreeMap<String, String>,
) -> Result<Value, CodecError> {
    let mut doc: TemplateDocument = serde_json::from_value(metadata)?;
    let mut main = main_content.to_owned();

    for content in doc.custom_blocks_mut() {
        let html_id = content.html_id()?;
        let html = fragments
            .get(&html_id)
            .ok_or_else(|| CodecError::MissingFragment {
                html_id: html_id.clone(),
            })?;
        *content.html_slot(&html_id)? = Value::String(html.clone());

        let span = token_span(&main, &html_id).ok_or_else(|| CodecError::FragmentNotFound {
            html_id: html_id.clone(),
        })?;
        main.replace_range(span, html);
    }

    doc.html_content = main;
    Ok(serde_json::to_value(&doc)?)
}

/// Location of `placeholder-{html_id}` inside the element `id="{html_id}"`.
fn token_span(main: &str, html_id: &str) -> Option<std::ops::Range<usize>> {
    let inner = inner_html_span(main, html_id)?;
    let token = placeholder_token(html_id);
    let at = inner.start + find_token(&main[inner.clone()], &token)?;
    Some(at..at + token.len())
}

/// First occurrence of `token` not directly followed by an id character, so
/// `placeholder-x1` never matches inside `placeholder-x10`.
fn find_token(haystack: &str, token: &str) -> Option<usize> {
    haystack.match_indices(token).map(|(at, _)| at).find(|&at| {
        !haystack[at + token.len()..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    })
}

// ---------------------------------------------------------------------------
// Request form
// ---------------------------------------------------------------------------

/// Decode the template document embedded in a template request form.
pub fn decode_template_content(form: &Value) -> Result<Value, CodecError> {
    let encoded = form
        .get(CONTENT_FIELD)
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("template request form", format!("missing {CONTENT_FIELD}")))?;
    let bytes = STANDARD.decode(encoded)?;
    let text = String::from_utf8(bytes)?;
    Ok(serde_json::from_str(&text)?)
}

/// Remove environment-owned keys and blank out the embedded content.
pub fn portable_request_form(form: Value) -> Result<Value, CodecError> {
    let Value::Object(mut fields) = form else {
        return Err(malformed("template request form", "expected a JSON object"));
    };
    for key in ENVIRONMENT_FORM_KEYS {
        fields.remove(key);
    }
    fields.insert(CONTENT_FIELD.to_owned(), Value::String(PLACEHOLDER.to_owned()));
    Ok(Value::Object(fields))
}

/// Embed `template` (base64 of its compact JSON) into a portable request form.
pub fn build_request_payload(form: Value, template: &Value) -> Result<Value, CodecError> {
    let Value::Object(mut fields) = form else {
        return Err(malformed("template request form", "expected a JSON object"));
    };
    let encoded = STANDARD.encode(serde_json::to_string(template)?);
    fields.insert(CONTENT_FIELD.to_owned(), Value::String(encoded));
    Ok(Value::Object(fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn template() -> Value {
        json!({
            "name": "Standard",
            "htmlContent": "<body><div id=\"a1\"><b>Total</b></div><p>x</p><div id=\"b2\"><i>Due</i></div></body>",
            "design": {
                "counters": {"u_row": 2},
                "body": {
                    "rows": [{
                        "columns": [{
                            "contents": [
                                {"type": "text", "values": {"text": "plain"}},
                                {"type": "customx", "slug": "reactHtml",
                                 "values": {"_meta": {"htmlID": "a1"}, "html": "<b>Total</b>"}}
                            ]
                        }, {
                            "contents": [
                                {"type": "customx", "slug": "reactHtml",
                                 "values": {"_meta": {"htmlID": "b2"}, "html": "<i>Due</i>"}}
                            ]
                        }]
                    }],
                    "values": {"backgroundColor": "#fff"}
                }
            }
        })
    }

    #[test]
    fn decompose_lifts_blocks_and_leaves_placeholders() {
        let out = decompose_template(template()).unwrap();

        assert_eq!(
            out.main_content,
            "<body><div id=\"a1\">placeholder-a1</div><p>x</p><div id=\"b2\">placeholder-b2</div></body>"
        );
        let names: Vec<_> = out.fragments.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, vec!["a1.html", "b2.html"]);
        assert_eq!(out.fragments[1].contents, "<i>Due</i>");
        assert_eq!(out.metadata["htmlContent"], PLACEHOLDER);
        assert_eq!(
            out.metadata["design"]["body"]["rows"][0]["columns"][0]["contents"][1]["values"]["html"],
            PLACEHOLDER
        );
        assert_eq!(out.metadata["design"]["counters"], json!({"u_row": 2}));
    }

    #[test]
    fn recompose_restores_both_copies() {
        let original = template();
        let parts = decompose_template(original.clone()).unwrap();
        let fragments: BTreeMap<_, _> = parts
            .fragments
            .iter()
            .map(|f| (f.file_name.trim_end_matches(".html").to_owned(), f.contents.clone()))
            .collect();

        assert_eq!(fragment_ids(&parts.metadata).unwrap(), vec!["a1", "b2"]);
        let rebuilt = recompose_template(parts.metadata, &parts.main_content, &fragments).unwrap();
        assert_eq!(rebuilt, original);
    }

    #[test]
    fn block_missing_from_page_is_an_error() {
        let mut raw = template();
        raw["htmlContent"] = json!("<body></body>");
        assert!(matches!(
            decompose_template(raw),
            Err(CodecError::FragmentNotFound { html_id }) if html_id == "a1"
        ));
    }

    fn page_with_blocks(page: &str, blocks: &[(&str, &str)]) -> Value {
        let contents: Vec<Value> = blocks
            .iter()
            .map(|(id, html)| {
                json!({"type": "customx", "slug": "reactHtml",
                       "values": {"_meta": {"htmlID": id}, "html": html}})
            })
            .collect();
        json!({
            "htmlContent": page,
            "design": {"body": {"rows": [{"columns": [{"contents": contents}]}]}}
        })
    }

    fn round_trip(raw: Value) -> (DecomposedTemplate, Value) {
        let parts = decompose_template(raw).unwrap();
        let fragments: BTreeMap<_, _> = parts
            .fragments
            .iter()
            .map(|f| (f.file_name.trim_end_matches(".html").to_owned(), f.contents.clone()))
            .collect();
        let rebuilt =
            recompose_template(parts.metadata.clone(), &parts.main_content, &fragments).unwrap();
        (parts, rebuilt)
    }

    #[test]
    fn blocks_are_located_by_element_id_not_by_text() {
        let raw = page_with_blocks(
            r#"<div id="b2"><div><b>x</b></div></div><div id="a1"><b>x</b></div>"#,
            &[("a1", "<b>x</b>"), ("b2", "<div><b>x</b></div>")],
        );
        let (parts, rebuilt) = round_trip(raw.clone());
        assert_eq!(
            parts.main_content,
            r#"<div id="b2">placeholder-b2</div><div id="a1">placeholder-a1</div>"#
        );
        assert_eq!(rebuilt, raw);
    }

    #[test]
    fn short_block_text_never_matches_attributes_or_tokens() {
        let raw = page_with_blocks(
            r#"<div id="a1">Total</div><div id="b2">a</div>"#,
            &[("a1", "Total"), ("b2", "a")],
        );
        let (parts, rebuilt) = round_trip(raw.clone());
        assert_eq!(
            parts.main_content,
            r#"<div id="a1">placeholder-a1</div><div id="b2">placeholder-b2</div>"#
        );
        assert_eq!(rebuilt, raw);
    }

    #[test]
    fn block_nested_in_another_block_is_rejected() {
        let raw = page_with_blocks(
            r#"<div id="outer"><p id="inner">i</p></div>"#,
            &[("inner", "i"), ("outer", r#"<p id="inner">i</p>"#)],
        );
        assert!(matches!(
            decompose_template(raw),
            Err(CodecError::FragmentNotFound { html_id }) if html_id == "inner"
        ));
    }

    #[test]
    fn token_outside_its_element_is_not_found() {
        let raw = page_with_blocks(r#"<div id="a1">x</div>"#, &[("a1", "x")]);
        let parts = decompose_template(raw).unwrap();
        let fragments = BTreeMap::from([("a1".to_owned(), "x".to_owned())]);
        let err = recompose_template(parts.metadata, "<p>placeholder-a1</p>", &fragments);
        assert!(matches!(err, Err(CodecError::FragmentNotFound { .. })));
    }

    #[test]
    fn recompose_without_fragment_file_is_an_error() {
        let parts = decompose_template(template()).unwrap();
        let err = recompose_template(parts.metadata, &parts.main_content, &BTreeMap::new());
        assert!(matches!(err, Err(CodecError::MissingFragment { .. })));
    }

    #[test]
    fn request_form_round_trip() {
        let doc = json!({"design": {"body": {"rows": []}}, "htmlContent": "<p/>"});
        let form = json!({
            "id": "8a8a", "name": "Standard", "updatedOn": "2024-01-01",
            "templateNumber": "T-1", "templateFormat": "HTML",
            "associatedToBillingAccount": true, "description": "d",
            CONTENT_FIELD: STANDARD.encode(doc.to_string())
        });

        assert_eq!(decode_template_content(&form).unwrap(), doc);

        let portable = portable_request_form(form).unwrap();
        assert_eq!(
            portable,
            json!({"name": "Standard", "description": "d", CONTENT_FIELD: PLACEHOLDER})
        );

        let payload = build_request_payload(portable, &doc).unwrap();
        assert_eq!(decode_template_content(&payload).unwrap(), doc);
    }
}
