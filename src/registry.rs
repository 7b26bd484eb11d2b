//! Identity registries and the hub that owns them.
//!
//! The platform invariant is "same id ⇒ same instance": constructing
//! "the same document" twice from two partial dictionaries must enrich
//! one record, never create duplicates. Each entity type gets a
//! [`Registry`] mapping a stable id to the single live record for that
//! id, and a [`Hub`] owns one registry per type.
//!
//! The hub is plain owned state passed by reference into every factory
//! call. There is deliberately no module-level registry: independent
//! graphs (one per test, one per task pipeline) each get their own hub
//! and cannot leak into each other.
//!
//! Get-or-create is exposed as an explicit two-step API rather than
//! hidden inside construction: [`Registry::resolve`] answers "is this
//! id known?", [`Registry::upsert`] creates or patches. Records are
//! never evicted; they live as long as their hub.

use std::collections::HashMap;
use uuid::Uuid;

use crate::models::{
    Annotation, AnnotationId, Annotator, Corpus, Document, Label, LabelId, Schedule, Task,
};
use crate::selector::Target;

/// Id of the canonical "default" singleton for each entity type.
pub const DEFAULT_ID: &str = "default";

/// A record addressable by a stable string id.
pub trait Identified {
    /// The record's id.
    fn id(&self) -> &str;
    /// A blank record carrying only its id.
    fn with_id(id: String) -> Self;
}

/// Generate a fresh process-unique id.
#[must_use]
pub fn fresh_id() -> String {
    Uuid::new_v4().to_string()
}

/// Per-entity-type identity cache: one live record per id.
#[derive(Debug, Clone)]
pub struct Registry<T> {
    records: HashMap<String, T>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            records: HashMap::new(),
        }
    }
}

impl<T: Identified> Registry<T> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the live record for an id.
    #[must_use]
    pub fn resolve(&self, id: &str) -> Option<&T> {
        self.records.get(id)
    }

    /// Look up the live record for an id, mutably.
    pub fn resolve_mut(&mut self, id: &str) -> Option<&mut T> {
        self.records.get_mut(id)
    }

    /// Create the record for an id if absent, then apply a patch to it.
    ///
    /// This is the explicit spelling of "constructing may return a
    /// pre-existing instance": call sites see the get-or-create.
    pub fn upsert(&mut self, id: impl Into<String>, apply: impl FnOnce(&mut T)) -> &mut T {
        let id = id.into();
        let record = self
            .records
            .entry(id.clone())
            .or_insert_with(|| T::with_id(id));
        apply(record);
        record
    }

    /// Get the record for an id, creating a blank one if absent. A
    /// fresh unique id is generated when none is supplied.
    pub fn get_or_create(&mut self, id: Option<&str>) -> &mut T {
        let id = match id {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => fresh_id(),
        };
        self.records
            .entry(id.clone())
            .or_insert_with(|| T::with_id(id))
    }

    /// True if a record exists for this id.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    /// Number of live records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if no records are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over all live records.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.records.values()
    }
}

/// Top-level context owning one registry per entity type.
///
/// All factory and serializer calls go through a hub. Single-threaded
/// by construction: callers hold `&mut Hub`, so unsynchronized sharing
/// is unrepresentable rather than merely discouraged.
#[derive(Debug, Clone, Default)]
pub struct Hub {
    /// Entity labels.
    pub labels: Registry<Label>,
    /// Documents.
    pub documents: Registry<Document>,
    /// Corpora.
    pub corpora: Registry<Corpus>,
    /// Annotators.
    pub annotators: Registry<Annotator>,
    /// Tasks.
    pub tasks: Registry<Task>,
    /// Annotations.
    pub annotations: Registry<Annotation>,
    /// Schedules.
    pub schedules: Registry<Schedule>,
}

impl Hub {
    /// Create an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Distinct labels used by a document's annotations.
    #[must_use]
    pub fn document_labels(&self, document_id: &str) -> Vec<LabelId> {
        let Some(document) = self.documents.resolve(document_id) else {
            return Vec::new();
        };
        let mut labels: Vec<LabelId> = document
            .annotations
            .iter()
            .filter_map(|ann_id| self.annotations.resolve(ann_id))
            .map(|ann| ann.label.clone())
            .collect();
        labels.sort();
        labels.dedup();
        labels
    }

    /// Copy an annotation under a fresh id.
    ///
    /// The target is deep-copied: mutating the copy's selectors never
    /// affects the original. The document (and every other reference)
    /// stays shared, and the copy is tracked into the same document's
    /// annotation set. Returns the new id, or `None` if the source id
    /// is unknown.
    pub fn copy_annotation(&mut self, id: &str) -> Option<AnnotationId> {
        let source = self.annotations.resolve(id)?.clone();
        let new_id = fresh_id();
        let target: Target = source.target.clone();
        let document = source.document.clone();
        self.annotations.upsert(new_id.clone(), |ann| {
            ann.label = source.label.clone();
            ann.document = source.document.clone();
            ann.annotator = source.annotator.clone();
            ann.task = source.task.clone();
            ann.body = source.body.clone();
            ann.score = source.score;
            ann.target = target;
        });
        if let Some(doc) = self.documents.resolve_mut(&document) {
            doc.annotations.insert(new_id.clone());
        }
        Some(new_id)
    }
}
