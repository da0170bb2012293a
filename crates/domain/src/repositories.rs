//! 文档存储抽象
//!
//! 领域层只依赖这里的接口，具体存储由基础设施层实现

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;

use crate::codec::Document;
use crate::{TaskingError, TaskingResult};

/// 等值条件的合取，路径使用点号分隔，例如 `params.task_type`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentFilter {
    conditions: Vec<(String, Value)>,
}

impl DocumentFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq<P: Into<String>, V: Into<Value>>(mut self, path: P, value: V) -> Self {
        self.conditions.push((path.into(), value.into()));
        self
    }

    pub fn conditions(&self) -> &[(String, Value)] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// 路径的每一段只能包含字母、数字和下划线
    pub fn validate(&self) -> TaskingResult<()> {
        for (path, _) in &self.conditions {
            let valid = !path.is_empty()
                && path.split('.').all(|segment| {
                    !segment.is_empty()
                        && segment
                            .chars()
                            .all(|c| c.is_ascii_alphanumeric() || c == '_')
                });
            if !valid {
                return Err(TaskingError::field_violation(
                    "filter",
                    format!("无效的查询路径: {path}"),
                ));
            }
        }
        Ok(())
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.conditions
            .iter()
            .all(|(path, expected)| lookup_path(doc, path) == Some(expected))
    }
}

fn lookup_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// 文档存储
///
/// 存储在插入时分配不透明的标识并写入 `_id`。
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert_one(&self, collection: &str, document: Document) -> TaskingResult<String>;

    /// 按插入顺序返回匹配的文档
    fn find<'a>(
        &'a self,
        collection: &'a str,
        filter: &'a DocumentFilter,
    ) -> BoxStream<'a, TaskingResult<Document>>;
}
