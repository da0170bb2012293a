//! 内存实现的存储端口，用于不需要真实数据库的测试

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::Value;
use tasking_domain::{Document, DocumentFilter, DocumentStore, ID_KEY};
use tasking_errors::{TaskingError, TaskingResult};
use uuid::Uuid;

/// 按集合保存文档，保持插入顺序
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentStore {
    collections: Arc<Mutex<HashMap<String, Vec<Document>>>>,
    fail_inserts: Arc<Mutex<bool>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 直接放入文档，不分配标识，用于构造损坏或历史数据
    pub fn seed(&self, collection: &str, document: Document) {
        self.collections
            .lock()
            .unwrap()
            .entry(collection.to_string())
            .or_default()
            .push(document);
    }

    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .map_or(0, Vec::len)
    }

    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// 之后的写入都返回数据库错误
    pub fn fail_inserts(&self, fail: bool) {
        *self.fail_inserts.lock().unwrap() = fail;
    }

    pub fn clear(&self) {
        self.collections.lock().unwrap().clear();
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn insert_one(&self, collection: &str, mut document: Document) -> TaskingResult<String> {
        if *self.fail_inserts.lock().unwrap() {
            return Err(TaskingError::database_error("模拟写入失败"));
        }

        let id = Uuid::new_v4().to_string();
        document.insert(ID_KEY.to_string(), Value::String(id.clone()));
        self.seed(collection, document);
        Ok(id)
    }

    fn find<'a>(
        &'a self,
        collection: &'a str,
        filter: &'a DocumentFilter,
    ) -> BoxStream<'a, TaskingResult<Document>> {
        if let Err(e) = filter.validate() {
            return stream::iter(vec![Err(e)]).boxed();
        }

        let matching: Vec<TaskingResult<Document>> = self
            .documents(collection)
            .into_iter()
            .filter(|doc| filter.matches(doc))
            .map(Ok)
            .collect();
        stream::iter(matching).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let store = MemoryDocumentStore::new();
        let id = store
            .insert_one("windows", doc(json!({"params": {"task_type": "foo"}})))
            .await
            .unwrap();
        store
            .insert_one("windows", doc(json!({"params": {"task_type": "bar"}})))
            .await
            .unwrap();

        assert_eq!(store.count("windows"), 2);
        assert_eq!(store.count("task_types"), 0);

        let filter = DocumentFilter::new().eq("params.task_type", "foo");
        let found: Vec<Document> = store.find("windows", &filter).try_collect().await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0][ID_KEY], Value::String(id));
    }

    #[tokio::test]
    async fn test_fail_inserts() {
        let store = MemoryDocumentStore::new();
        store.fail_inserts(true);
        assert!(store.insert_one("windows", Document::new()).await.is_err());

        store.fail_inserts(false);
        assert!(store.insert_one("windows", Document::new()).await.is_ok());
    }
}
