//! Warehouse client: parameterized reads feeding the entity factories.
//!
//! The analytical store is an external collaborator. Its contract
//! toward the core is minimal: given a task id, produce row
//! dictionaries that the factories can consume. Two fixed queries are
//! issued, both bound with the single scalar `task_id` parameter:
//!
//! - annotation rows for the task, joined through the corpus↔task
//!   mapping table
//! - document rows for the task's corpora, through the same join
//!
//! Query failures propagate to the caller unhandled; there is no retry
//! and no partial-failure recovery.

use rusqlite::types::ValueRef;
use rusqlite::{params, Connection};
use serde_json::{Map, Value};
use std::path::Path;

use crate::error::Result;
use crate::factory;
use crate::models::{AnnotationId, DocumentId};
use crate::registry::Hub;

/// A warehouse row: column name to JSON value.
pub type Row = Map<String, Value>;

/// Read-side contract of the analytical store.
pub trait Warehouse {
    /// Annotation rows for a task.
    fn annotation_rows(&self, task_id: &str) -> Result<Vec<Row>>;
    /// Document rows for a task's corpora.
    fn document_rows(&self, task_id: &str) -> Result<Vec<Row>>;
}

const ANNOTATION_ROWS_SQL: &str = "SELECT a.*
 FROM corpus c
 JOIN task_corpora tc ON tc.corpus_id = c.id
 LEFT JOIN annotation a ON a.task_id = tc.task_id
 WHERE tc.task_id = ?1;";

const DOCUMENT_ROWS_SQL: &str = "SELECT d.*
 FROM document d
 JOIN corpus c ON c.id = d.corpus_id
 JOIN task_corpora tc ON tc.corpus_id = c.id
 WHERE tc.task_id = ?1;";

/// SQLite-backed warehouse.
pub struct SqliteWarehouse {
    conn: Connection,
}

impl SqliteWarehouse {
    /// Open a warehouse database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            conn: Connection::open(path)?,
        })
    }

    /// Wrap an already-open connection.
    #[must_use]
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    fn query_rows(&self, sql: &str, task_id: &str) -> Result<Vec<Row>> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt
            .column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();
        let mut rows = stmt.query(params![task_id])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Map::new();
            for (index, column) in columns.iter().enumerate() {
                let value = match row.get_ref(index)? {
                    ValueRef::Null => Value::Null,
                    ValueRef::Integer(n) => Value::from(n),
                    ValueRef::Real(f) => Value::from(f),
                    ValueRef::Text(bytes) => {
                        Value::String(String::from_utf8_lossy(bytes).into_owned())
                    }
                    ValueRef::Blob(_) => Value::Null,
                };
                record.insert(column.clone(), value);
            }
            out.push(record);
        }
        Ok(out)
    }
}

impl Warehouse for SqliteWarehouse {
    fn annotation_rows(&self, task_id: &str) -> Result<Vec<Row>> {
        self.query_rows(ANNOTATION_ROWS_SQL, task_id)
    }

    fn document_rows(&self, task_id: &str) -> Result<Vec<Row>> {
        self.query_rows(DOCUMENT_ROWS_SQL, task_id)
    }
}

/// Load a task's annotations from the warehouse into a hub.
///
/// Each row goes through the annotation factory, so rows describing
/// already-known entities enrich them instead of duplicating. The left
/// join can produce an all-null row for a task with no annotations
/// yet; such rows are skipped.
pub fn load_annotations(
    hub: &mut Hub,
    warehouse: &impl Warehouse,
    task_id: &str,
) -> Result<Vec<AnnotationId>> {
    let rows = warehouse.annotation_rows(task_id)?;
    let mut ids = Vec::with_capacity(rows.len());
    for row in rows {
        if row.get("id").map_or(true, Value::is_null) {
            log::debug!("skipping annotation row without id for task {task_id}");
            continue;
        }
        ids.push(factory::annotation(hub, &Value::Object(row))?);
    }
    Ok(ids)
}

/// Load a task's documents from the warehouse into a hub.
pub fn load_documents(
    hub: &mut Hub,
    warehouse: &impl Warehouse,
    task_id: &str,
) -> Result<Vec<DocumentId>> {
    let rows = warehouse.document_rows(task_id)?;
    let mut ids = Vec::with_capacity(rows.len());
    for row in rows {
        if row.get("id").map_or(true, Value::is_null) {
            log::debug!("skipping document row without id for task {task_id}");
            continue;
        }
        ids.push(factory::document(hub, &Value::Object(row))?);
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_warehouse() -> SqliteWarehouse {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE corpus (id TEXT PRIMARY KEY, name TEXT);
             CREATE TABLE task_corpora (task_id TEXT, corpus_id TEXT);
             CREATE TABLE document (
                 id TEXT PRIMARY KEY, uri TEXT, content TEXT, corpus_id TEXT
             );
             CREATE TABLE annotation (
                 id TEXT PRIMARY KEY, task_id TEXT, entity_id TEXT,
                 annotator_id TEXT, document_id TEXT, body TEXT,
                 created TEXT, score REAL, target TEXT
             );
             INSERT INTO corpus VALUES ('c1', 'News');
             INSERT INTO task_corpora VALUES ('t1', 'c1');
             INSERT INTO document VALUES
                 ('d1', 'file:///a.txt', 'Marie Curie won.', 'c1'),
                 ('d2', 'file:///b.txt', 'Nothing here.', 'c1');
             INSERT INTO annotation VALUES
                 ('a1', 't1', 'l1', 'u1', 'd1', 'a person',
                  '2024-01-15T09:30:00+00:00', 0.9,
                  '{''source'': ''d1'', ''selector'': []}');",
        )
        .unwrap();
        SqliteWarehouse::from_connection(conn)
    }

    #[test]
    fn test_document_rows_join_through_task() {
        let wh = seeded_warehouse();
        let rows = wh.document_rows("t1").unwrap();
        assert_eq!(rows.len(), 2);
        let d1 = rows.iter().find(|r| r["id"] == "d1").unwrap();
        assert_eq!(d1["uri"], "file:///a.txt");
        assert_eq!(d1["corpus_id"], "c1");
    }

    #[test]
    fn test_unknown_task_yields_no_rows() {
        let wh = seeded_warehouse();
        assert!(wh.annotation_rows("t999").unwrap().is_empty());
        assert!(wh.document_rows("t999").unwrap().is_empty());
    }

    #[test]
    fn test_load_documents_into_hub() {
        let wh = seeded_warehouse();
        let mut hub = Hub::new();
        let ids = load_documents(&mut hub, &wh, "t1").unwrap();
        assert_eq!(ids.len(), 2);
        let doc = hub.documents.resolve("d1").unwrap();
        assert_eq!(doc.content.as_deref(), Some("Marie Curie won."));
        assert_eq!(doc.corpus, "c1");
    }

    #[test]
    fn test_load_annotations_maps_rows_through_factory() {
        let wh = seeded_warehouse();
        let mut hub = Hub::new();
        let ids = load_annotations(&mut hub, &wh, "t1").unwrap();
        assert_eq!(ids, vec!["a1".to_string()]);
        let ann = hub.annotations.resolve("a1").unwrap();
        assert_eq!(ann.label, "l1");
        assert_eq!(ann.target.source.as_deref(), Some("d1"));
        assert_eq!(ann.score, Some(0.9));
        // The row's document reference was materialized too.
        assert!(hub.documents.contains("d1"));
    }

    #[test]
    fn test_left_join_null_rows_are_skipped() {
        let wh = seeded_warehouse();
        wh.conn
            .execute(
                "INSERT INTO task_corpora VALUES ('t2', 'c1');",
                [],
            )
            .unwrap();
        let mut hub = Hub::new();
        // t2 has the corpus mapping but no annotations: one all-null row.
        let ids = load_annotations(&mut hub, &wh, "t2").unwrap();
        assert!(ids.is_empty());
    }
}
