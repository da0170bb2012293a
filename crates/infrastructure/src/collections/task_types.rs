use std::sync::Arc;

use futures::StreamExt;
use serde_json::Value;
use tasking_domain::{
    Document, DocumentFilter, DocumentStore, InitializationReport, RejectedTaskType, TaskType,
    TaskTypeRecord, TaskTypeRegistry, ID_KEY,
};
use tasking_errors::{TaskingError, TaskingResult};
use tracing::{debug, error, info, instrument};

#[derive(Clone)]
pub struct TaskTypeCollection {
    store: Arc<dyn DocumentStore>,
}

impl TaskTypeCollection {
    pub const COLLECTION: &'static str = "task_types";

    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self))]
    pub async fn find_by_name(&self, name: &str) -> TaskingResult<Option<TaskTypeRecord>> {
        let filter = DocumentFilter::new().eq("name", name);
        let mut records = self.find(&filter).await?;
        match records.pop() {
            Some(record) => record.map(Some),
            None => Ok(None),
        }
    }

    async fn find(&self, filter: &DocumentFilter) -> TaskingResult<Vec<TaskingResult<TaskTypeRecord>>> {
        Ok(self
            .find_documents(filter)
            .await?
            .into_iter()
            .map(|(_, record)| record)
            .collect())
    }

    /// 每条结果附带文档标识，解析失败时用于定位
    async fn find_documents(
        &self,
        filter: &DocumentFilter,
    ) -> TaskingResult<Vec<(String, TaskingResult<TaskTypeRecord>)>> {
        filter.validate()?;
        let items: Vec<TaskingResult<Document>> =
            self.store.find(Self::COLLECTION, filter).collect().await;

        let mut records = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Ok(doc) => {
                    let id = doc
                        .get(ID_KEY)
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string();
                    let record = serde_json::from_value(Value::Object(doc)).map_err(|e| {
                        TaskingError::Serialization(format!("任务类型文档 {id} 无法解析: {e}"))
                    });
                    records.push((id, record));
                }
                Err(TaskingError::CorruptDocument { id, reason }) => {
                    let error = TaskingError::corrupt_document(id.clone(), reason);
                    records.push((id, Err(error)));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(records)
    }

    /// 持久化任务类型，同名记录已存在时返回冲突
    ///
    /// 存储层的唯一索引兜住并发提交，插入失败后重新查询以区分冲突和其他错误。
    #[instrument(skip(self, task_type), fields(name = %task_type.name))]
    pub async fn insert_one(&self, task_type: TaskType) -> TaskingResult<TaskType> {
        if self.find_by_name(task_type.name.as_str()).await?.is_some() {
            return Err(TaskingError::TaskTypeAlreadyExists {
                name: task_type.name.into_inner(),
            });
        }

        let mut record = TaskTypeRecord::from(task_type);
        record.id = None;
        let document = match serde_json::to_value(&record)? {
            Value::Object(doc) => doc,
            other => {
                return Err(TaskingError::Serialization(format!(
                    "任务类型记录必须序列化为对象: {other}"
                )))
            }
        };

        let id = match self.store.insert_one(Self::COLLECTION, document).await {
            Ok(id) => id,
            Err(e) => {
                if self.find_by_name(&record.name).await?.is_some() {
                    return Err(TaskingError::TaskTypeAlreadyExists { name: record.name });
                }
                return Err(e);
            }
        };
        info!("任务类型已持久化: {} ({})", record.name, id);

        record.id = Some(id);
        TaskType::try_from(record)
    }
}

/// 把数据库中的任务类型注册到注册表
///
/// 无法解析的文档和注册失败的记录都只会被拒绝，不影响其余记录。
pub async fn register_types_from_db(
    task_types: &TaskTypeCollection,
    registry: &mut TaskTypeRegistry,
) -> TaskingResult<InitializationReport> {
    let mut records = Vec::new();
    let mut unreadable = Vec::new();
    for (id, result) in task_types.find_documents(&DocumentFilter::new()).await? {
        match result {
            Ok(record) => records.push(record),
            Err(e) => {
                error!("任务类型文档 {} 无法解析，已跳过: {}", id, e);
                unreadable.push(RejectedTaskType { name: id, error: e });
            }
        }
    }
    debug!("从数据库读取 {} 条任务类型记录", records.len());

    let mut report = registry.initialize(records);
    report.rejected.extend(unreadable);
    Ok(report)
}
