//! # annohub
//!
//! Entity model for a text/image annotation platform: documents,
//! corpora, entity labels, annotators, tasks, annotations, and
//! schedules, with JSON (de)serialization and a thin warehouse loader.
//!
//! The crate is built around three ideas:
//!
//! - **Identity registries**: every entity type has a per-[`Hub`]
//!   registry mapping a stable string id to the single live record for
//!   that id. Constructing "the same document" twice from two partial
//!   dictionaries enriches one record instead of creating duplicates.
//! - **Factories with a merge policy**: dictionaries resolve through
//!   [`factory`] functions that recursively resolve nested references
//!   and reconcile conflicting partial records with a
//!   first-non-empty-wins [`merge`](crate::merge) policy.
//! - **Value-typed targets**: the "where" of an annotation
//!   ([`Target`], [`Selector`]) is an owned value, deep-copied when an
//!   annotation is copied, while entity references stay shared by id.
//!
//! ```rust
//! use annohub::{factory, Hub, Serializer};
//! use serde_json::json;
//!
//! let mut hub = Hub::new();
//! let id = factory::annotation(&mut hub, &json!({
//!     "id": "a1",
//!     "entity": {"id": "l1", "title": "Person"},
//!     "document": {"id": "d1", "content": "Marie Curie won."},
//!     "task": "t1",
//!     "body": "a person",
//!     "created": "2024-01-15T09:30:00+00:00",
//!     "target": {"source": "d1", "selector": [
//!         {"startContainer": "/p[1]", "endContainer": "/p[1]",
//!          "startOffset": 0, "endOffset": 11}
//!     ]},
//! })).unwrap();
//!
//! let out = Serializer::new(&hub).annotation(&id).unwrap();
//! assert_eq!(out["entity_id"], "l1");
//! assert_eq!(out["document_id"], "d1");
//! ```
//!
//! The hub is plain owned state: one per graph, passed by reference
//! into every factory call. There is no global registry, no locking,
//! and no I/O in the core; the [`warehouse`] module is the only
//! external boundary and performs one blocking query per call.

pub mod error;
pub mod factory;
pub mod merge;
pub mod models;
pub mod registry;
pub mod selector;
pub mod serialize;
pub mod warehouse;

pub use error::{Error, Result};
pub use merge::{Fill, Patch};
pub use models::{
    parse_timestamp, Annotation, AnnotationId, Annotator, AnnotatorId, Body, Corpus, CorpusId,
    Document, DocumentId, Label, LabelId, Schedule, ScheduleId, ScheduleKind, ScheduleStatus,
    Task, TaskId, MACHINE_MODEL,
};
pub use registry::{fresh_id, Hub, Identified, Registry, DEFAULT_ID};
pub use selector::{Selector, Target};
pub use serialize::Serializer;
pub use warehouse::{load_annotations, load_documents, Row, SqliteWarehouse, Warehouse};
