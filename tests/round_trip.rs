//! End-to-end behavior of the factory → registry → serializer path.

use annohub::{factory, Hub, Selector, Serializer, DEFAULT_ID};
use serde_json::{json, Value};

fn full_annotation() -> Value {
    json!({
        "id": "a1",
        "entity": {"id": "l1", "title": "Person", "color": "#ff0000"},
        "document": {
            "id": "d1",
            "uri": "file:///news/curie.txt",
            "content": "Marie Curie won the Nobel Prize.",
            "corpus": {"id": "c1", "name": "News", "description": "Press corpus"},
        },
        "annotator": {"id": "u1", "name": "alice", "owner": "org-1", "threshold": 0.4},
        "task": {"id": "t1", "name": "NER pass 1"},
        "body": {"text": "a person", "lang": "en"},
        "created": "2024-01-15T09:30:00+00:00",
        "score": 0.92,
        "target": {"source": "d1", "selector": [
            {"startContainer": "/p[1]", "endContainer": "/p[1]",
             "startOffset": 0, "endOffset": 11},
            {"x": 10.0, "y": 20.0, "height": 5.0, "width": 40.0},
        ]},
    })
}

#[test]
fn same_id_resolves_to_same_instance() {
    let mut hub = Hub::new();
    factory::document(&mut hub, &json!("d1")).unwrap();
    factory::document(&mut hub, &json!("d1")).unwrap();
    assert_eq!(hub.documents.len(), 1);

    // Mutating through one reference is visible through the other.
    hub.documents.resolve_mut("d1").unwrap().content = Some("updated".to_string());
    assert_eq!(
        hub.documents.resolve("d1").unwrap().content.as_deref(),
        Some("updated")
    );
}

#[test]
fn serialization_round_trips() {
    let mut hub = Hub::new();
    let id = factory::annotation(&mut hub, &full_annotation()).unwrap();
    let first = Serializer::new(&hub).annotation(&id).unwrap();

    // Rebuild the graph in a fresh hub from the serialized form.
    let mut rebuilt = Hub::new();
    let id2 = factory::annotation(&mut rebuilt, &first).unwrap();
    let second = Serializer::new(&rebuilt).annotation(&id2).unwrap();

    assert_eq!(first, second);
}

#[test]
fn copy_isolates_target_but_shares_document() {
    let mut hub = Hub::new();
    let id = factory::annotation(&mut hub, &full_annotation()).unwrap();
    let copy_id = hub.copy_annotation(&id).unwrap();
    assert_ne!(copy_id, id);

    // Mutate a selector on the copy.
    if let Selector::BoundingBox { x, .. } = &mut hub
        .annotations
        .resolve_mut(&copy_id)
        .unwrap()
        .target
        .selector[1]
    {
        *x = 999.0;
    }

    let original = hub.annotations.resolve(&id).unwrap();
    let copy = hub.annotations.resolve(&copy_id).unwrap();
    assert_eq!(
        original.target.selector[1],
        Selector::bbox(10.0, 20.0, 5.0, 40.0)
    );
    // The source document reference is shared, not copied.
    assert_eq!(copy.target.source, original.target.source);
    assert_eq!(copy.document, original.document);
    // Both annotations are tracked on the one document.
    let doc = hub.documents.resolve("d1").unwrap();
    assert!(doc.annotations.contains(&id));
    assert!(doc.annotations.contains(&copy_id));
}

#[test]
fn selector_dispatch_follows_shape() {
    let bbox = Selector::from_value(&json!({"x": 1.0, "y": 2.0, "height": 3.0, "width": 4.0}))
        .unwrap();
    assert!(matches!(bbox, Selector::BoundingBox { .. }));

    let xpath = Selector::from_value(&json!({
        "startContainer": "/p[1]", "endContainer": "/p[2]",
        "startOffset": 3, "endOffset": 9,
    }))
    .unwrap();
    assert!(matches!(xpath, Selector::XPathRange { .. }));

    assert!(Selector::from_value(&json!({"anchor": 3})).is_err());
}

#[test]
fn default_factory_returns_singleton() {
    let mut hub = Hub::new();
    let a = factory::annotator(&mut hub, &Value::Null).unwrap();
    let b = factory::annotator(&mut hub, &Value::Null).unwrap();
    assert_eq!(a, DEFAULT_ID);
    assert_eq!(a, b);
    assert_eq!(hub.annotators.len(), 1);
}

#[test]
fn partial_records_enrich_without_duplicating() {
    let mut hub = Hub::new();
    factory::annotation(&mut hub, &json!({"id": "a1", "entity": "l1"})).unwrap();
    factory::annotation(
        &mut hub,
        &json!({"id": "a1", "body": "late-arriving body", "score": 0.5}),
    )
    .unwrap();

    assert_eq!(hub.annotations.len(), 1);
    let ann = hub.annotations.resolve("a1").unwrap();
    assert_eq!(ann.score, Some(0.5));
    // The second record carried no entity; the reference fell back to
    // the default singleton, as partial reconstruction always re-runs
    // the reference factories.
    assert_eq!(ann.label, DEFAULT_ID);
}

#[test]
fn document_labels_are_derived_from_annotations() {
    let mut hub = Hub::new();
    factory::annotation(
        &mut hub,
        &json!({"id": "a1", "entity": "l1", "document": "d1"}),
    )
    .unwrap();
    factory::annotation(
        &mut hub,
        &json!({"id": "a2", "entity": "l2", "document": "d1"}),
    )
    .unwrap();
    factory::annotation(
        &mut hub,
        &json!({"id": "a3", "entity": "l1", "document": "d1"}),
    )
    .unwrap();
    assert_eq!(hub.document_labels("d1"), vec!["l1".to_string(), "l2".to_string()]);
}
