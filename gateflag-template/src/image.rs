//! Structural edit of a live template's machine image reference.
//!
//! The image is addressed as `Resources.<resource>.Properties.<property>`,
//! which must hold a `Ref` to one of two image parameters. Toggling flips the
//! `Ref` between them.
//!
//! JSON bodies are edited as JSON (key order preserved). YAML bodies are
//! edited as YAML; both the `{ Ref: X }` mapping form and the `!Ref X` short
//! form are understood, and other short-form tags survive the round trip.
//!
//! The edited document is written back by replacing only the referenced
//! parameter name in the original text, so comments and layout are kept.
//! When no such in-place edit parses back to the edited document (a quoted
//! or multi-line reference, say) the whole document is re-serialized, which
//! drops YAML comments.

use gateflag_core::{ImageSlot, ParameterSet};
use serde_yaml::value::Tag;

use crate::error::TemplateError;

/// Serialization format detected for a template body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateFormat {
    Json,
    Yaml,
}

/// Result of flipping the image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageToggle {
    pub format: TemplateFormat,
    /// Parameter name referenced before the edit.
    pub from: String,
    /// Parameter name referenced after the edit.
    pub to: String,
    /// The edited template body.
    pub body: String,
}

/// Parsed template with its detected format.
enum Document {
    Json(serde_json::Value),
    Yaml(serde_yaml::Value),
}

impl Document {
    fn parse(body: &str) -> Result<Self, TemplateError> {
        if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
            return Ok(Document::Json(json));
        }
        Ok(Document::Yaml(serde_yaml::from_str(body)?))
    }

    fn format(&self) -> TemplateFormat {
        match self {
            Document::Json(_) => TemplateFormat::Json,
            Document::Yaml(_) => TemplateFormat::Yaml,
        }
    }

    fn image_ref(&mut self, slot: &ImageSlot) -> Option<RefSlot<'_>> {
        match self {
            Document::Json(root) => root.pointer_mut(&json_pointer(slot)).map(RefSlot::Json),
            Document::Yaml(root) => yaml_ref(root, slot).map(RefSlot::Yaml),
        }
    }

    fn same_as(&self, other: &Document) -> bool {
        match (self, other) {
            (Document::Json(a), Document::Json(b)) => a == b,
            (Document::Yaml(a), Document::Yaml(b)) => a == b,
            _ => false,
        }
    }

    fn to_body(&self) -> Result<String, TemplateError> {
        match self {
            Document::Json(root) => Ok(serde_json::to_string_pretty(root)?),
            Document::Yaml(root) => Ok(serde_yaml::to_string(root)?),
        }
    }
}

enum RefSlot<'a> {
    Json(&'a mut serde_json::Value),
    Yaml(&'a mut serde_yaml::Value),
}

impl RefSlot<'_> {
    fn get(&self) -> Option<&str> {
        match self {
            RefSlot::Json(v) => v.as_str(),
            RefSlot::Yaml(v) => v.as_str(),
        }
    }

    fn set(&mut self, value: &str) {
        match self {
            RefSlot::Json(v) => **v = serde_json::Value::String(value.to_string()),
            RefSlot::Yaml(v) => **v = serde_yaml::Value::String(value.to_string()),
        }
    }
}

fn slot_path(slot: &ImageSlot) -> String {
    format!("Resources.{}.Properties.{}.Ref", slot.resource, slot.property)
}

fn json_pointer(slot: &ImageSlot) -> String {
    fn escape(segment: &str) -> String {
        segment.replace('~', "~0").replace('/', "~1")
    }
    format!(
        "/Resources/{}/Properties/{}/Ref",
        escape(&slot.resource),
        escape(&slot.property)
    )
}

/// Rewrite `from` to `to` in place at the one `Ref` occurrence that yields
/// `edited`, leaving the rest of `body` untouched.
fn splice_ref(body: &str, from: &str, to: &str, edited: &Document) -> Option<String> {
    body.match_indices(from)
        .map(|(at, _)| at)
        .filter(|&at| follows_ref(&body[..at]) && ends_token(&body[at + from.len()..]))
        .map(|at| format!("{}{}{}", &body[..at], to, &body[at + from.len()..]))
        .find(|spliced| Document::parse(spliced).is_ok_and(|doc| doc.same_as(edited)))
}

fn follows_ref(before: &str) -> bool {
    let line = before.rsplit('\n').next().unwrap_or(before);
    let line = line.strip_suffix(['"', '\'']).unwrap_or(line).trim_end();
    line.ends_with("!Ref") || line.ends_with("Ref:") || line.ends_with("\"Ref\":")
}

fn ends_token(after: &str) -> bool {
    after
        .chars()
        .next()
        .map_or(true, |c| !(c.is_alphanumeric() || c == '_'))
}

fn is_ref_tag(tag: &Tag) -> bool {
    tag.to_string().trim_start_matches('!') == "Ref"
}

fn yaml_ref<'v>(root: &'v mut serde_yaml::Value, slot: &ImageSlot) -> Option<&'v mut serde_yaml::Value> {
    let property = root
        .get_mut("Resources")?
        .get_mut(slot.resource.as_str())?
        .get_mut("Properties")?
        .get_mut(slot.property.as_str())?;
    match property {
        serde_yaml::Value::Tagged(tagged) if is_ref_tag(&tagged.tag) => Some(&mut tagged.value),
        serde_yaml::Value::Mapping(map) => map.get_mut("Ref"),
        _ => None,
    }
}

/// Parameter name currently referenced by the image property.
pub fn current_image_ref(body: &str, slot: &ImageSlot) -> Result<String, TemplateError> {
    let mut doc = Document::parse(body)?;
    doc.image_ref(slot)
        .and_then(|r| r.get().map(str::to_owned))
        .ok_or_else(|| TemplateError::MissingImageRef { path: slot_path(slot) })
}

/// Image id the template resolves to under `parameters`.
pub fn effective_image(
    body: &str,
    slot: &ImageSlot,
    parameters: &ParameterSet,
) -> Result<Option<String>, TemplateError> {
    let name = current_image_ref(body, slot)?;
    Ok(parameters.get(&name).map(str::to_owned))
}

/// Flip the image reference between `slot.primary` and `slot.alternate`.
///
/// A reference to anything else is pointed at `slot.primary`.
pub fn toggle_image(body: &str, slot: &ImageSlot) -> Result<ImageToggle, TemplateError> {
    let mut doc = Document::parse(body)?;
    let format = doc.format();

    let (from, to) = {
        let mut image_ref = doc
            .image_ref(slot)
            .ok_or_else(|| TemplateError::MissingImageRef { path: slot_path(slot) })?;
        let from = image_ref
            .get()
            .map(str::to_owned)
            .ok_or_else(|| TemplateError::MissingImageRef { path: slot_path(slot) })?;
        let to = if from == slot.primary { slot.alternate.clone() } else { slot.primary.clone() };
        image_ref.set(&to);
        (from, to)
    };

    let body = match splice_ref(body, &from, &to, &doc) {
        Some(spliced) => spliced,
        None => doc.to_body()?,
    };
    Ok(ImageToggle { format, from, to, body })
}
