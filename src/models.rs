//! Domain entities of the annotation platform.
//!
//! Every entity is keyed by a process-unique string id and lives in the
//! [`Hub`](crate::registry::Hub)'s per-type registries. Entities hold
//! *references* to each other as ids, resolved through the hub, so the
//! same logical entity is never duplicated: mutating it through one
//! reference is visible through all of them. The one exception is the
//! [`Target`] owned by an annotation, which has value semantics and is
//! deep-copied when the annotation is copied.
//!
//! ```text
//! Task ──┬── labels      (Label: name + color)
//!        ├── corpora ─── documents ─── annotations
//!        ├── annotators
//!        └── annotations ─── target ─── selectors
//! ```

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::registry::{Identified, DEFAULT_ID};
use crate::selector::Target;

/// Id of a [`Label`].
pub type LabelId = String;
/// Id of a [`Document`].
pub type DocumentId = String;
/// Id of a [`Corpus`].
pub type CorpusId = String;
/// Id of an [`Annotator`].
pub type AnnotatorId = String;
/// Id of a [`Task`].
pub type TaskId = String;
/// Id of an [`Annotation`].
pub type AnnotationId = String;
/// Id of a [`Schedule`].
pub type ScheduleId = String;

// =============================================================================
// Timestamps
// =============================================================================

/// Legacy timestamp pattern found in historical serializer output.
const LEGACY_TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S%.f";

/// Parse a timestamp string.
///
/// RFC 3339 is canonical; the legacy slash-separated pattern is
/// accepted for old payloads. Anything else is a parse error.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, LEGACY_TIMESTAMP_FORMAT) {
        return Ok(Utc.from_utc_datetime(&naive));
    }
    // ISO-8601 without an explicit offset, e.g. "2024-01-15T09:30:00".
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(Utc.from_utc_datetime(&naive));
    }
    Err(Error::parse(format!("unrecognized timestamp `{s}`")))
}

// =============================================================================
// Body
// =============================================================================

/// Annotation body: raw text or a structured payload.
///
/// Structured bodies carry a text plus free-form extra fields and
/// flatten to `{ "text": ..., ...extras }` on serialization.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Body {
    /// No body supplied. Serializes as the empty string.
    #[default]
    Empty,
    /// Plain text body.
    Text(String),
    /// Structured body: text plus free-form extras.
    Structured {
        /// Body text.
        text: String,
        /// Additional fields, flattened alongside `text` on output.
        extras: Map<String, Value>,
    },
}

impl Body {
    /// Construct a body from its wire value.
    ///
    /// `null` is empty, a string is text, an object with a `"text"`
    /// key is structured. Other scalars are carried as their JSON
    /// rendering.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => Body::Empty,
            Value::String(s) => Body::Text(s.clone()),
            Value::Object(map) => {
                let text = map
                    .get("text")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let extras: Map<String, Value> = map
                    .iter()
                    .filter(|(k, _)| k.as_str() != "text")
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                Body::Structured { text, extras }
            }
            other => Body::Text(other.to_string()),
        }
    }

    /// Serialize to the wire value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Body::Empty => Value::String(String::new()),
            Body::Text(s) => Value::String(s.clone()),
            Body::Structured { text, extras } => {
                let mut map = Map::new();
                map.insert("text".to_string(), Value::String(text.clone()));
                for (k, v) in extras {
                    map.insert(k.clone(), v.clone());
                }
                Value::Object(map)
            }
        }
    }

    /// True if no body content is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }
}

impl crate::merge::Fill for Body {
    fn is_vacant(&self) -> bool {
        self.is_empty()
    }
}

// =============================================================================
// Label
// =============================================================================

/// A classification tag assignable to content (e.g. "Person",
/// "Defect"). Referenced by annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    /// Stable id, unique within the label registry.
    pub id: LabelId,
    /// Display name.
    pub name: Option<String>,
    /// Display color (CSS-style string).
    pub color: Option<String>,
}

impl Identified for Label {
    fn id(&self) -> &str {
        &self.id
    }

    fn with_id(id: String) -> Self {
        Self {
            id,
            name: None,
            color: None,
        }
    }
}

// =============================================================================
// Document
// =============================================================================

/// The content on which annotations are made.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Stable id.
    pub id: DocumentId,
    /// Source URI.
    pub uri: Option<String>,
    /// Raw content.
    pub content: Option<String>,
    /// Owning corpus.
    pub corpus: CorpusId,
    /// Annotations made on this document. A set, so the same
    /// annotation id can never appear twice.
    pub annotations: BTreeSet<AnnotationId>,
}

impl Identified for Document {
    fn id(&self) -> &str {
        &self.id
    }

    fn with_id(id: String) -> Self {
        Self {
            id,
            uri: None,
            content: None,
            corpus: DEFAULT_ID.to_string(),
            annotations: BTreeSet::new(),
        }
    }
}

// =============================================================================
// Corpus
// =============================================================================

/// An ordered collection of documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Corpus {
    /// Stable id.
    pub id: CorpusId,
    /// Display name.
    pub name: Option<String>,
    /// Free-form description.
    pub description: Option<String>,
    /// Member documents, in order.
    pub documents: Vec<DocumentId>,
}

impl Identified for Corpus {
    fn id(&self) -> &str {
        &self.id
    }

    fn with_id(id: String) -> Self {
        Self {
            id,
            name: None,
            description: None,
            documents: Vec::new(),
        }
    }
}

// =============================================================================
// Annotator
// =============================================================================

/// Default model kind for annotators that do not declare one.
pub const MACHINE_MODEL: &str = "MACHINE";

/// A producer of annotations, human or machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotator {
    /// Stable id.
    pub id: AnnotatorId,
    /// Display name.
    pub name: Option<String>,
    /// Model kind; `"MACHINE"` when not declared.
    pub model: String,
    /// Decision threshold for machine annotators.
    pub threshold: f64,
    /// Owner account.
    pub owner: Option<String>,
    /// Label this annotator assigns, if fixed.
    pub label: Option<LabelId>,
    /// Task the annotator is assigned to.
    pub task: TaskId,
}

impl Annotator {
    /// Point this annotator at a task.
    pub fn assign_task(&mut self, task: impl Into<TaskId>) {
        self.task = task.into();
    }
}

impl Identified for Annotator {
    fn id(&self) -> &str {
        &self.id
    }

    fn with_id(id: String) -> Self {
        Self {
            id,
            name: None,
            model: MACHINE_MODEL.to_string(),
            threshold: 0.0,
            owner: None,
            label: None,
            task: DEFAULT_ID.to_string(),
        }
    }
}

// =============================================================================
// Task
// =============================================================================

/// The unit of work grouping labels, corpora, annotators, documents,
/// and resulting annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Stable id.
    pub id: TaskId,
    /// Display name.
    pub name: Option<String>,
    /// Free-form description.
    pub description: Option<String>,
    /// Labels available in this task.
    pub labels: Vec<LabelId>,
    /// Corpora attached to this task.
    pub corpora: Vec<CorpusId>,
    /// Annotators assigned to this task.
    pub annotators: Vec<AnnotatorId>,
    /// Documents scoped to this task.
    pub documents: Vec<DocumentId>,
    /// Annotations produced under this task.
    pub annotations: Vec<AnnotationId>,
}

impl Task {
    /// Record an annotation under this task. No-op if already present.
    pub fn add_annotation(&mut self, id: impl Into<AnnotationId>) {
        let id = id.into();
        if !self.annotations.contains(&id) {
            self.annotations.push(id);
        }
    }

    /// Record a document under this task. No-op if already present.
    pub fn add_document(&mut self, id: impl Into<DocumentId>) {
        let id = id.into();
        if !self.documents.contains(&id) {
            self.documents.push(id);
        }
    }
}

impl Identified for Task {
    fn id(&self) -> &str {
        &self.id
    }

    fn with_id(id: String) -> Self {
        Self {
            id,
            name: None,
            description: None,
            labels: Vec::new(),
            corpora: Vec::new(),
            annotators: Vec::new(),
            documents: Vec::new(),
            annotations: Vec::new(),
        }
    }
}

// =============================================================================
// Annotation
// =============================================================================

/// A single labeling decision: who (annotator), what label, on what
/// (document, located by the target), when (created), with optional
/// confidence (score). Compatible with the W3C annotation data model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Stable id.
    pub id: AnnotationId,
    /// Label assigned by this annotation.
    pub label: LabelId,
    /// Document the annotation applies to.
    pub document: DocumentId,
    /// Annotator that produced it.
    pub annotator: AnnotatorId,
    /// Task it was produced under.
    pub task: TaskId,
    /// Body text or structured payload.
    pub body: Body,
    /// Creation time. Always present; defaults to construction time.
    pub created: DateTime<Utc>,
    /// Optional confidence score.
    pub score: Option<f64>,
    /// Where the annotation applies. Owned, value semantics.
    pub target: Target,
}

impl Identified for Annotation {
    fn id(&self) -> &str {
        &self.id
    }

    fn with_id(id: String) -> Self {
        Self {
            id,
            label: DEFAULT_ID.to_string(),
            document: DEFAULT_ID.to_string(),
            annotator: DEFAULT_ID.to_string(),
            task: DEFAULT_ID.to_string(),
            body: Body::Empty,
            created: Utc::now(),
            score: None,
            target: Target::empty(),
        }
    }
}

// =============================================================================
// Schedule
// =============================================================================

/// Assignment status of a scheduled document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScheduleStatus {
    /// Assigned, not yet completed. Wire code `"A"`.
    Assigned,
    /// Completed. Wire code `"C"`.
    Completed,
}

impl ScheduleStatus {
    /// Parse from the wire code.
    pub fn from_code(code: &str) -> Result<Self> {
        match code {
            "A" => Ok(Self::Assigned),
            "C" => Ok(Self::Completed),
            other => Err(Error::parse(format!("unknown schedule status `{other}`"))),
        }
    }

    /// Wire code for this status.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Assigned => "A",
            Self::Completed => "C",
        }
    }
}

/// Kind of scheduled work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScheduleKind {
    /// Review an existing annotator's work. Wire code `"R"`.
    Review,
    /// Annotate from scratch. Wire code `"A"`.
    Annotate,
}

impl ScheduleKind {
    /// Parse from the wire code.
    pub fn from_code(code: &str) -> Result<Self> {
        match code {
            "R" => Ok(Self::Review),
            "A" => Ok(Self::Annotate),
            other => Err(Error::parse(format!("unknown schedule type `{other}`"))),
        }
    }

    /// Wire code for this kind.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Review => "R",
            Self::Annotate => "A",
        }
    }
}

/// An assignment of a document to an annotator or reviewer for a task,
/// with status and priority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    /// Stable id.
    pub id: ScheduleId,
    /// Assignment status.
    pub status: ScheduleStatus,
    /// Kind of work scheduled.
    pub kind: ScheduleKind,
    /// Scheduling priority.
    pub priority: f64,
    /// When the assignment was made.
    pub timestamp: DateTime<Utc>,
    /// Document to work on.
    pub document: DocumentId,
    /// Annotator or reviewer the work is assigned to.
    pub annotator: AnnotatorId,
    /// Task the assignment belongs to.
    pub task: TaskId,
    /// For reviews, the annotator being reviewed.
    pub reviewee: AnnotatorId,
}

impl Identified for Schedule {
    fn id(&self) -> &str {
        &self.id
    }

    fn with_id(id: String) -> Self {
        Self {
            id,
            status: ScheduleStatus::Assigned,
            kind: ScheduleKind::Annotate,
            priority: 0.0,
            timestamp: Utc::now(),
            document: DEFAULT_ID.to_string(),
            annotator: DEFAULT_ID.to_string(),
            task: DEFAULT_ID.to_string(),
            reviewee: DEFAULT_ID.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_timestamp_rfc3339() {
        let dt = parse_timestamp("2024-01-15T09:30:00+00:00").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-01-15T09:30:00+00:00");
    }

    #[test]
    fn test_parse_timestamp_legacy_pattern() {
        let dt = parse_timestamp("2024/01/15 09:30:00.250000").unwrap();
        assert_eq!(dt.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_body_from_string() {
        assert_eq!(
            Body::from_value(&json!("a note")),
            Body::Text("a note".to_string())
        );
    }

    #[test]
    fn test_structured_body_flattens() {
        let body = Body::from_value(&json!({"text": "hi", "lang": "en"}));
        let out = body.to_value();
        assert_eq!(out["text"], "hi");
        assert_eq!(out["lang"], "en");
    }

    #[test]
    fn test_empty_body_serializes_as_empty_string() {
        assert_eq!(Body::Empty.to_value(), json!(""));
    }

    #[test]
    fn test_schedule_codes() {
        assert_eq!(ScheduleStatus::from_code("A").unwrap(), ScheduleStatus::Assigned);
        assert_eq!(ScheduleKind::from_code("R").unwrap(), ScheduleKind::Review);
        assert_eq!(ScheduleStatus::Completed.code(), "C");
        assert!(ScheduleStatus::from_code("X").is_err());
    }

    #[test]
    fn test_task_add_annotation_dedupes() {
        let mut task = Task::with_id("t1".to_string());
        task.add_annotation("a1");
        task.add_annotation("a1");
        assert_eq!(task.annotations.len(), 1);
    }
}
