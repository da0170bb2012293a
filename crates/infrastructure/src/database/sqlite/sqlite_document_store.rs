use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::Value;
use sqlx::sqlite::SqliteArguments;
use sqlx::{query::Query, Row, Sqlite, SqlitePool};
use tasking_domain::{Document, DocumentFilter, DocumentStore, ID_KEY};
use tasking_errors::{TaskingError, TaskingResult};
use tracing::{debug, instrument};
use uuid::Uuid;

/// 以 JSON 文本保存文档的 SQLite 存储，所有集合共用 `documents` 表
#[derive(Clone)]
pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn build_select(filter: &DocumentFilter) -> String {
        let mut sql = String::from("SELECT id, body FROM documents WHERE collection = ?");
        for (_, value) in filter.conditions() {
            match value {
                Value::Null => sql.push_str(" AND json_extract(body, ?) IS NULL"),
                Value::Array(_) | Value::Object(_) => {
                    sql.push_str(" AND json_extract(body, ?) = json(?)")
                }
                _ => sql.push_str(" AND json_extract(body, ?) = ?"),
            }
        }
        sql.push_str(" ORDER BY seq");
        sql
    }

    fn bind_condition<'q>(
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
        path: &str,
        value: &'q Value,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        let query = query.bind(format!("$.{path}"));
        match value {
            Value::Null => query,
            Value::Bool(b) => query.bind(i64::from(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => query.bind(i),
                None => query.bind(n.as_f64()),
            },
            Value::String(s) => query.bind(s.as_str()),
            composite => query.bind(composite.to_string()),
        }
    }

    #[instrument(skip(self, filter))]
    async fn fetch_documents(
        &self,
        collection: &str,
        filter: &DocumentFilter,
    ) -> TaskingResult<Vec<TaskingResult<Document>>> {
        filter.validate()?;

        let sql = Self::build_select(filter);
        let mut query = sqlx::query(&sql).bind(collection);
        for (path, value) in filter.conditions() {
            query = Self::bind_condition(query, path, value);
        }

        let rows = query.fetch_all(&self.pool).await?;
        debug!("从集合 {} 读取 {} 条文档", collection, rows.len());

        Ok(rows
            .iter()
            .map(|row| -> TaskingResult<Document> {
                let id: String = row.try_get("id")?;
                let body: String = row.try_get("body")?;
                parse_body(&id, &body)
            })
            .collect())
    }
}

/// 损坏的文档带着自身标识返回，调用方据此定位
fn parse_body(id: &str, body: &str) -> TaskingResult<Document> {
    let value = serde_json::from_str::<Value>(body)
        .map_err(|e| TaskingError::corrupt_document(id, e.to_string()))?;
    match value {
        Value::Object(mut doc) => {
            doc.insert(ID_KEY.to_string(), Value::String(id.to_string()));
            Ok(doc)
        }
        other => Err(TaskingError::corrupt_document(
            id,
            format!("不是JSON对象: {other}"),
        )),
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    #[instrument(skip(self, document))]
    async fn insert_one(&self, collection: &str, mut document: Document) -> TaskingResult<String> {
        let id = Uuid::new_v4().to_string();
        document.insert(ID_KEY.to_string(), Value::String(id.clone()));
        let body = serde_json::to_string(&document)?;

        sqlx::query(
            "INSERT INTO documents (id, collection, body, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(collection)
        .bind(body)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!("文档已写入集合 {}: {}", collection, id);
        Ok(id)
    }

    fn find<'a>(
        &'a self,
        collection: &'a str,
        filter: &'a DocumentFilter,
    ) -> BoxStream<'a, TaskingResult<Document>> {
        stream::once(self.fetch_documents(collection, filter))
            .flat_map(|result| match result {
                Ok(documents) => stream::iter(documents),
                Err(e) => stream::iter(vec![Err(e)]),
            })
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use serde_json::json;

    async fn store() -> SqliteDocumentStore {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::query(
            "CREATE TABLE documents (seq INTEGER PRIMARY KEY AUTOINCREMENT, id TEXT NOT NULL UNIQUE, collection TEXT NOT NULL, body TEXT NOT NULL, created_at TEXT NOT NULL)",
        )
        .execute(&pool)
        .await
        .unwrap();
        SqliteDocumentStore::new(pool)
    }

    fn doc(value: Value) -> Document {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_build_select() {
        let filter = DocumentFilter::new()
            .eq("params.task_type", "foo")
            .eq("params.extra", Value::Null)
            .eq("params.datasources", json!(["radar"]));

        assert_eq!(
            SqliteDocumentStore::build_select(&filter),
            "SELECT id, body FROM documents WHERE collection = ? \
             AND json_extract(body, ?) = ? \
             AND json_extract(body, ?) IS NULL \
             AND json_extract(body, ?) = json(?) ORDER BY seq"
        );
    }

    #[tokio::test]
    async fn test_insert_assigns_id() {
        let store = store().await;
        let id = store
            .insert_one("windows", doc(json!({"state": "open"})))
            .await
            .unwrap();

        let docs: Vec<Document> = store
            .find("windows", &DocumentFilter::new())
            .try_collect()
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0][ID_KEY], Value::String(id));
        assert_eq!(docs[0]["state"], "open");
    }

    #[tokio::test]
    async fn test_find_filters_by_collection_and_path() {
        let store = store().await;
        for (task_type, state, count) in [("foo", "open", 1), ("bar", "open", 2), ("foo", "complete", 3)] {
            store
                .insert_one(
                    "windows",
                    doc(json!({"params": {"task_type": task_type, "count": count}, "state": state})),
                )
                .await
                .unwrap();
        }
        store
            .insert_one("task_types", doc(json!({"name": "foo"})))
            .await
            .unwrap();

        let filter = DocumentFilter::new().eq("params.task_type", "foo");
        let docs: Vec<Document> = store.find("windows", &filter).try_collect().await.unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0]["state"], "open");
        assert_eq!(docs[1]["state"], "complete");

        let filter = DocumentFilter::new()
            .eq("params.task_type", "foo")
            .eq("state", "complete");
        let docs: Vec<Document> = store.find("windows", &filter).try_collect().await.unwrap();
        assert_eq!(docs.len(), 1);

        let filter = DocumentFilter::new().eq("params.count", 2);
        let docs: Vec<Document> = store.find("windows", &filter).try_collect().await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["params"]["task_type"], "bar");

        let all: Vec<Document> = store
            .find("task_types", &DocumentFilter::new())
            .try_collect()
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_find_rejects_invalid_path() {
        let store = store().await;
        let filter = DocumentFilter::new().eq("state') OR 1=1 --", "x");

        let results: Vec<TaskingResult<Document>> = store.find("windows", &filter).collect().await;
        assert_eq!(results.len(), 1);
        assert!(results[0].is_err());
    }

    #[tokio::test]
    async fn test_corrupt_body_surfaces_per_item() {
        let store = store().await;
        store
            .insert_one("windows", doc(json!({"state": "open"})))
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO documents (id, collection, body, created_at) VALUES ('bad', 'windows', '[1,2]', '')",
        )
        .execute(&store.pool)
        .await
        .unwrap();

        let results: Vec<TaskingResult<Document>> = store
            .find("windows", &DocumentFilter::new())
            .collect()
            .await;
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(TaskingError::CorruptDocument { ref id, .. }) if id == "bad"));
    }
}
