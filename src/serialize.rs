//! Serializers: entity graph back to plain dictionaries.
//!
//! Mirrors of the factories. Foreign-key fields reduce to the
//! referenced entity's id, with two exceptions: a corpus nests the
//! full dictionaries of its documents, and an annotation nests the
//! full target structure. Timestamps are emitted as RFC 3339 strings.
//! Bodies flatten per [`Body`] variant; selectors serialize by
//! exhaustive match on the variant, symmetric to deserialization.
//!
//! A [`Serializer`] borrows the hub and serializes either a single
//! entity by id or a homogeneous id slice element-wise.

use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::registry::Hub;

/// Serializes entities from a hub into plain dictionaries.
#[derive(Debug, Clone, Copy)]
pub struct Serializer<'a> {
    hub: &'a Hub,
}

impl<'a> Serializer<'a> {
    /// Create a serializer over a hub.
    #[must_use]
    pub fn new(hub: &'a Hub) -> Self {
        Self { hub }
    }

    // -------------------------------------------------------------------------
    // Annotation
    // -------------------------------------------------------------------------

    /// Serialize one annotation.
    pub fn annotation(&self, id: &str) -> Result<Value> {
        let ann = self
            .hub
            .annotations
            .resolve(id)
            .ok_or_else(|| Error::unknown_id("annotation", id))?;
        let target = if ann.target.is_empty() {
            Value::Null
        } else {
            ann.target.to_value()
        };
        Ok(json!({
            "id": ann.id,
            "task_id": ann.task,
            "entity_id": ann.label,
            "body": ann.body.to_value(),
            "annotator_id": ann.annotator,
            "document_id": ann.document,
            "created": ann.created.to_rfc3339(),
            "score": ann.score,
            "target": target,
        }))
    }

    /// Serialize a sequence of annotations element-wise.
    pub fn annotations(&self, ids: &[String]) -> Result<Value> {
        self.many(ids, |id| self.annotation(id))
    }

    // -------------------------------------------------------------------------
    // Document / Corpus
    // -------------------------------------------------------------------------

    /// Serialize one document.
    pub fn document(&self, id: &str) -> Result<Value> {
        let doc = self
            .hub
            .documents
            .resolve(id)
            .ok_or_else(|| Error::unknown_id("document", id))?;
        Ok(json!({
            "id": doc.id,
            "uri": doc.uri,
            "content": doc.content,
        }))
    }

    /// Serialize a sequence of documents element-wise.
    pub fn documents(&self, ids: &[String]) -> Result<Value> {
        self.many(ids, |id| self.document(id))
    }

    /// Serialize one corpus. Member documents are nested as full
    /// dictionaries, not reduced to ids.
    pub fn corpus(&self, id: &str) -> Result<Value> {
        let corpus = self
            .hub
            .corpora
            .resolve(id)
            .ok_or_else(|| Error::unknown_id("corpus", id))?;
        let documents = self.documents(&corpus.documents)?;
        Ok(json!({
            "id": corpus.id,
            "name": corpus.name,
            "description": corpus.description,
            "documents": documents,
        }))
    }

    // -------------------------------------------------------------------------
    // Label / Annotator / Task / Schedule
    // -------------------------------------------------------------------------

    /// Serialize one label.
    pub fn label(&self, id: &str) -> Result<Value> {
        let label = self
            .hub
            .labels
            .resolve(id)
            .ok_or_else(|| Error::unknown_id("label", id))?;
        Ok(json!({
            "id": label.id,
            "name": label.name,
            "color": label.color,
        }))
    }

    /// Serialize one annotator.
    pub fn annotator(&self, id: &str) -> Result<Value> {
        let annotator = self
            .hub
            .annotators
            .resolve(id)
            .ok_or_else(|| Error::unknown_id("annotator", id))?;
        Ok(json!({
            "id": annotator.id,
            "name": annotator.name,
            "model": annotator.model,
            "owner": annotator.owner,
            "threshold": annotator.threshold,
            "entity_id": annotator.label,
            "task_id": annotator.task,
        }))
    }

    /// Serialize one task. All member lists reduce to ids.
    pub fn task(&self, id: &str) -> Result<Value> {
        let task = self
            .hub
            .tasks
            .resolve(id)
            .ok_or_else(|| Error::unknown_id("task", id))?;
        Ok(json!({
            "id": task.id,
            "name": task.name,
            "description": task.description,
            "entities": task.labels,
            "corpora": task.corpora,
            "annotators": task.annotators,
            "documents": task.documents,
            "annotations": task.annotations,
        }))
    }

    /// Serialize one schedule. Status and type use their wire codes.
    pub fn schedule(&self, id: &str) -> Result<Value> {
        let sched = self
            .hub
            .schedules
            .resolve(id)
            .ok_or_else(|| Error::unknown_id("schedule", id))?;
        Ok(json!({
            "id": sched.id,
            "status": sched.status.code(),
            "type": sched.kind.code(),
            "priority": sched.priority,
            "timestamp": sched.timestamp.to_rfc3339(),
            "document_id": sched.document,
            "annotator_id": sched.annotator,
            "task_id": sched.task,
            "reviewee_id": sched.reviewee,
        }))
    }

    fn many(&self, ids: &[String], one: impl Fn(&str) -> Result<Value>) -> Result<Value> {
        let items = ids.iter().map(|id| one(id)).collect::<Result<Vec<_>>>()?;
        Ok(Value::Array(items))
    }
}
