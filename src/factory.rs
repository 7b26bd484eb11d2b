//! Entity factories: dictionaries in, registry-backed ids out.
//!
//! Every factory accepts the same four input forms:
//!
//! - `null` → the canonical default singleton for that type (id
//!   [`DEFAULT_ID`])
//! - a string → registry lookup/creation with only the id known
//! - an object → full construction: nested references resolve
//!   recursively through the referenced type's factory, and every field
//!   goes through the merge policy, so two partial records describing
//!   the same id enrich one entity instead of duplicating it
//! - anything else → [`Error::UnresolvableShape`] naming the shape
//!
//! Alternate key spellings from warehouse rows are accepted
//! (`entity`/`entity_id`, `task`/`task_id`, `annotator`/`annotator_id`,
//! `document`/`document_id`); unknown keys are ignored.

use serde_json::{Map, Value};

use crate::error::{json_type_name, Error, Result};
use crate::merge::{merge, merge_seq, Patch};
use crate::models::{
    parse_timestamp, AnnotationId, AnnotatorId, Body, CorpusId, DocumentId, LabelId, ScheduleId,
    ScheduleKind, ScheduleStatus, TaskId,
};
use crate::registry::{fresh_id, Hub, Identified, DEFAULT_ID};
use crate::selector::{Selector, Target};

/// The three recognized factory input forms.
enum Arg<'a> {
    Default,
    Id(&'a str),
    Record(&'a Map<String, Value>),
}

fn classify(value: &Value) -> Result<Arg<'_>> {
    match value {
        Value::Null => Ok(Arg::Default),
        Value::String(s) => Ok(Arg::Id(s)),
        Value::Object(map) => Ok(Arg::Record(map)),
        other => Err(Error::shape(json_type_name(other))),
    }
}

/// Record id, if one was supplied.
fn record_id(map: &Map<String, Value>) -> Option<&str> {
    map.get("id").and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// First present key wins; absent keys are `Unspecified`, explicit
/// nulls are `Clear`.
fn string_patch(map: &Map<String, Value>, keys: &[&str]) -> Patch<String> {
    for key in keys {
        if let Some(value) = map.get(*key) {
            return match value {
                Value::Null => Patch::Clear,
                Value::String(s) => Patch::Value(s.clone()),
                other => Patch::Value(other.to_string()),
            };
        }
    }
    Patch::Unspecified
}

/// Nested reference argument: first present key, or `null` (which the
/// called factory resolves to the default singleton).
fn ref_arg(map: &Map<String, Value>, keys: &[&str]) -> Value {
    for key in keys {
        if let Some(value) = map.get(*key) {
            return value.clone();
        }
    }
    Value::Null
}

// =============================================================================
// Label
// =============================================================================

/// Resolve a label from any recognized input form.
pub fn label(hub: &mut Hub, arg: &Value) -> Result<LabelId> {
    match classify(arg)? {
        Arg::Default => Ok(hub.labels.get_or_create(Some(DEFAULT_ID)).id().to_string()),
        Arg::Id(s) => Ok(hub.labels.get_or_create(Some(s)).id().to_string()),
        Arg::Record(map) => label_record(hub, map),
    }
}

fn label_record(hub: &mut Hub, map: &Map<String, Value>) -> Result<LabelId> {
    // `title` is the historical spelling of `name` in label payloads.
    let name = string_patch(map, &["name", "title"]);
    let color = string_patch(map, &["color"]);
    let rec = hub.labels.get_or_create(record_id(map));
    let id = rec.id().to_string();
    merge("name", &mut rec.name, name);
    merge("color", &mut rec.color, color);
    Ok(id)
}

// =============================================================================
// Document
// =============================================================================

/// Resolve a document from any recognized input form.
pub fn document(hub: &mut Hub, arg: &Value) -> Result<DocumentId> {
    match classify(arg)? {
        Arg::Default => Ok(hub
            .documents
            .get_or_create(Some(DEFAULT_ID))
            .id()
            .to_string()),
        Arg::Id(s) => Ok(hub.documents.get_or_create(Some(s)).id().to_string()),
        Arg::Record(map) => document_record(hub, map),
    }
}

fn document_record(hub: &mut Hub, map: &Map<String, Value>) -> Result<DocumentId> {
    let corpus_id = corpus(hub, &ref_arg(map, &["corpus", "corpus_id"]))?;
    let uri = string_patch(map, &["uri"]);
    let content = string_patch(map, &["content"]);
    let rec = hub.documents.get_or_create(record_id(map));
    let id = rec.id().to_string();
    merge("uri", &mut rec.uri, uri);
    merge("content", &mut rec.content, content);
    merge_seq("corpus", &mut rec.corpus, Patch::Value(corpus_id));
    Ok(id)
}

// =============================================================================
// Corpus
// =============================================================================

/// Resolve a corpus from any recognized input form.
pub fn corpus(hub: &mut Hub, arg: &Value) -> Result<CorpusId> {
    match classify(arg)? {
        Arg::Default => Ok(hub.corpora.get_or_create(Some(DEFAULT_ID)).id().to_string()),
        Arg::Id(s) => Ok(hub.corpora.get_or_create(Some(s)).id().to_string()),
        Arg::Record(map) => corpus_record(hub, map),
    }
}

fn corpus_record(hub: &mut Hub, map: &Map<String, Value>) -> Result<CorpusId> {
    let documents = ref_list(map, "documents", |hub, v| document(hub, v), hub)?;
    let name = string_patch(map, &["name"]);
    let description = string_patch(map, &["description"]);
    let rec = hub.corpora.get_or_create(record_id(map));
    let id = rec.id().to_string();
    merge("name", &mut rec.name, name);
    merge("description", &mut rec.description, description);
    merge_seq("documents", &mut rec.documents, documents);
    Ok(id)
}

/// Resolve an optional list of nested references element-wise.
fn ref_list(
    map: &Map<String, Value>,
    key: &str,
    resolve: impl Fn(&mut Hub, &Value) -> Result<String>,
    hub: &mut Hub,
) -> Result<Patch<Vec<String>>> {
    match map.get(key) {
        None => Ok(Patch::Unspecified),
        Some(Value::Null) => Ok(Patch::Clear),
        Some(Value::Array(items)) => {
            let mut ids = Vec::with_capacity(items.len());
            for item in items {
                ids.push(resolve(hub, item)?);
            }
            Ok(Patch::Value(ids))
        }
        Some(other) => Err(Error::shape(json_type_name(other))),
    }
}

// =============================================================================
// Annotator
// =============================================================================

/// Resolve an annotator from any recognized input form.
pub fn annotator(hub: &mut Hub, arg: &Value) -> Result<AnnotatorId> {
    match classify(arg)? {
        Arg::Default => Ok(hub
            .annotators
            .get_or_create(Some(DEFAULT_ID))
            .id()
            .to_string()),
        Arg::Id(s) => Ok(hub.annotators.get_or_create(Some(s)).id().to_string()),
        Arg::Record(map) => annotator_record(hub, map),
    }
}

fn annotator_record(hub: &mut Hub, map: &Map<String, Value>) -> Result<AnnotatorId> {
    let task_id = task(hub, &ref_arg(map, &["task", "task_id"]))?;
    let name = string_patch(map, &["name"]);
    let owner = string_patch(map, &["owner"]);
    let model = string_patch(map, &["model"]);
    let entity = string_patch(map, &["entity_id", "entity"]);
    let threshold = map
        .get("threshold")
        .and_then(Value::as_f64)
        .map_or(Patch::Unspecified, Patch::Value);
    let rec = hub.annotators.get_or_create(record_id(map));
    let id = rec.id().to_string();
    merge("name", &mut rec.name, name);
    merge("owner", &mut rec.owner, owner);
    merge("label", &mut rec.label, entity);
    merge_seq("model", &mut rec.model, model);
    merge_seq("threshold", &mut rec.threshold, threshold);
    merge_seq("task", &mut rec.task, Patch::Value(task_id));
    Ok(id)
}

// =============================================================================
// Task
// =============================================================================

/// Resolve a task from any recognized input form.
pub fn task(hub: &mut Hub, arg: &Value) -> Result<TaskId> {
    match classify(arg)? {
        Arg::Default => Ok(hub.tasks.get_or_create(Some(DEFAULT_ID)).id().to_string()),
        Arg::Id(s) => Ok(hub.tasks.get_or_create(Some(s)).id().to_string()),
        Arg::Record(map) => task_record(hub, map),
    }
}

fn task_record(hub: &mut Hub, map: &Map<String, Value>) -> Result<TaskId> {
    let labels = ref_list(map, "entities", |hub, v| label(hub, v), hub)?;
    let corpora = ref_list(map, "corpora", |hub, v| corpus(hub, v), hub)?;
    let annotators = ref_list(map, "annotators", |hub, v| annotator(hub, v), hub)?;
    let documents = ref_list(map, "documents", |hub, v| document(hub, v), hub)?;
    let annotations = ref_list(map, "annotations", |hub, v| annotation(hub, v), hub)?;
    let name = string_patch(map, &["name"]);
    let description = string_patch(map, &["description"]);
    let rec = hub.tasks.get_or_create(record_id(map));
    let id = rec.id().to_string();
    merge("name", &mut rec.name, name);
    merge("description", &mut rec.description, description);
    merge_seq("labels", &mut rec.labels, labels);
    merge_seq("corpora", &mut rec.corpora, corpora);
    merge_seq("annotators", &mut rec.annotators, annotators);
    merge_seq("documents", &mut rec.documents, documents);
    merge_seq("annotations", &mut rec.annotations, annotations);
    Ok(id)
}

// =============================================================================
// Target
// =============================================================================

/// Resolve a target from its wire forms.
///
/// Accepts an object (`{"source": .., "selector": [..]}`), an embedded
/// JSON string (warehouse rows store targets as single-quoted
/// quasi-JSON, which is normalized before parsing), the empty object,
/// or `null`; the latter two yield the empty target.
pub fn target(hub: &mut Hub, value: &Value) -> Result<Target> {
    match value {
        Value::Null => Ok(Target::empty()),
        Value::String(s) => {
            let normalized = s.replace('\'', "\"");
            let parsed: Value = serde_json::from_str(&normalized)
                .map_err(|e| Error::parse(format!("embedded target is not valid JSON: {e}")))?;
            target(hub, &parsed)
        }
        Value::Object(map) if map.is_empty() => Ok(Target::empty()),
        Value::Object(map) => {
            let source = match map.get("source") {
                None | Some(Value::Null) => None,
                Some(v) => Some(document(hub, v)?),
            };
            let selector = match map.get("selector") {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Array(items)) => items
                    .iter()
                    .map(Selector::from_value)
                    .collect::<Result<Vec<_>>>()?,
                Some(other) => return Err(Error::shape(json_type_name(other))),
            };
            Ok(Target { source, selector })
        }
        other => Err(Error::shape(json_type_name(other))),
    }
}

// =============================================================================
// Annotation
// =============================================================================

/// Resolve an annotation from any recognized input form.
///
/// Constructing from a record auto-tracks the annotation into its
/// document's annotation set.
pub fn annotation(hub: &mut Hub, arg: &Value) -> Result<AnnotationId> {
    match classify(arg)? {
        Arg::Default => Ok(hub
            .annotations
            .get_or_create(Some(DEFAULT_ID))
            .id()
            .to_string()),
        Arg::Id(s) => Ok(hub.annotations.get_or_create(Some(s)).id().to_string()),
        Arg::Record(map) => annotation_record(hub, map),
    }
}

fn annotation_record(hub: &mut Hub, map: &Map<String, Value>) -> Result<AnnotationId> {
    let label_id = label(hub, &ref_arg(map, &["entity", "entity_id"]))?;
    let task_id = task(hub, &ref_arg(map, &["task", "task_id"]))?;
    let annotator_id = annotator(hub, &ref_arg(map, &["annotator", "annotator_id"]))?;
    let document_id = document(hub, &ref_arg(map, &["document", "document_id"]))?;
    let new_target = match map.get("target") {
        None => Patch::Unspecified,
        Some(v) => Patch::Value(target(hub, v)?),
    };
    let created = match map.get("created") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(parse_timestamp(s)?),
        Some(other) => return Err(Error::parse(format!(
            "`created` must be a timestamp string, got {}",
            json_type_name(other)
        ))),
    };
    let score = map.get("score").and_then(Value::as_f64);
    let body = map.get("body").map(Body::from_value);

    let id = record_id(map).map_or_else(fresh_id, str::to_string);
    let rec = hub.annotations.get_or_create(Some(&id));
    merge_seq("label", &mut rec.label, Patch::Value(label_id));
    merge_seq("task", &mut rec.task, Patch::Value(task_id));
    merge_seq("annotator", &mut rec.annotator, Patch::Value(annotator_id));
    merge_seq("document", &mut rec.document, Patch::Value(document_id.clone()));
    merge_seq("target", &mut rec.target, new_target);
    if let Some(dt) = created {
        rec.created = dt;
    }
    if let Some(s) = score {
        merge("score", &mut rec.score, Patch::Value(s));
    }
    if let Some(b) = body {
        merge_seq("body", &mut rec.body, Patch::Value(b));
    }

    // Auto-track: the owning document always knows its annotations.
    if let Some(doc) = hub.documents.resolve_mut(&document_id) {
        doc.annotations.insert(id.clone());
    }
    Ok(id)
}

// =============================================================================
// Schedule
// =============================================================================

/// Resolve a schedule from any recognized input form.
pub fn schedule(hub: &mut Hub, arg: &Value) -> Result<ScheduleId> {
    match classify(arg)? {
        Arg::Default => Ok(hub
            .schedules
            .get_or_create(Some(DEFAULT_ID))
            .id()
            .to_string()),
        Arg::Id(s) => Ok(hub.schedules.get_or_create(Some(s)).id().to_string()),
        Arg::Record(map) => schedule_record(hub, map),
    }
}

fn schedule_record(hub: &mut Hub, map: &Map<String, Value>) -> Result<ScheduleId> {
    let document_id = document(hub, &ref_arg(map, &["document", "document_id"]))?;
    let annotator_id = annotator(hub, &ref_arg(map, &["annotator", "annotator_id"]))?;
    let task_id = task(hub, &ref_arg(map, &["task", "task_id"]))?;
    let reviewee_id = annotator(hub, &ref_arg(map, &["reviewee", "reviewee_id"]))?;
    let status = match map.get("status").and_then(Value::as_str) {
        Some(code) => Some(ScheduleStatus::from_code(code)?),
        None => None,
    };
    let kind = match map.get("type").and_then(Value::as_str) {
        Some(code) => Some(ScheduleKind::from_code(code)?),
        None => None,
    };
    let priority = map.get("priority").and_then(Value::as_f64);
    let timestamp = match map.get("timestamp") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(parse_timestamp(s)?),
        Some(other) => return Err(Error::parse(format!(
            "`timestamp` must be a timestamp string, got {}",
            json_type_name(other)
        ))),
    };

    let rec = hub.schedules.get_or_create(record_id(map));
    let id = rec.id().to_string();
    if let Some(status) = status {
        rec.status = status;
    }
    if let Some(kind) = kind {
        rec.kind = kind;
    }
    if let Some(priority) = priority {
        rec.priority = priority;
    }
    if let Some(timestamp) = timestamp {
        rec.timestamp = timestamp;
    }
    merge_seq("document", &mut rec.document, Patch::Value(document_id));
    merge_seq("annotator", &mut rec.annotator, Patch::Value(annotator_id));
    merge_seq("task", &mut rec.task, Patch::Value(task_id));
    merge_seq("reviewee", &mut rec.reviewee, Patch::Value(reviewee_id));
    Ok(id)
}
