use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::IntoResponse,
    Json,
};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use tasking_domain::{CompiledSchema, RegisteredTaskType, TaskType, TaskTypeRecord};
use tasking_errors::TaskingError;
use tracing::info;

use crate::{
    error::ApiResult,
    response::{created_with_message, success},
    routes::AppState,
};

/// 任务类型及其编译模式的线上表示
#[derive(Debug, Serialize)]
pub struct TaskTypeView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub extensions: IndexMap<String, Value>,
    pub schema: Value,
}

impl TaskTypeView {
    fn new(task_type: &TaskType, schema: &CompiledSchema) -> Self {
        Self {
            id: task_type.id.clone(),
            name: task_type.name.to_string(),
            extensions: task_type.extensions.clone(),
            schema: schema.to_json_schema(),
        }
    }
}

impl From<&RegisteredTaskType> for TaskTypeView {
    fn from(entry: &RegisteredTaskType) -> Self {
        Self::new(&entry.task_type, &entry.schema)
    }
}

/// 获取已注册的任务类型，按名称排序
pub async fn list_task_types(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let mut views: Vec<TaskTypeView> = state
        .registry
        .all()
        .map(|entry| TaskTypeView::from(entry.as_ref()))
        .collect();
    views.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(success(views))
}

pub async fn get_task_type(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let entry = state
        .registry
        .get(&name)
        .ok_or_else(|| TaskingError::unknown_task_type(&name))?;

    Ok(success(TaskTypeView::from(entry.as_ref())))
}

/// 提交任务类型
///
/// 记录先按扩展目录编译，通过后才持久化；注册表在下次启动时加载它。
pub async fn create_task_type(
    State(state): State<AppState>,
    payload: Result<Json<TaskTypeRecord>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(mut record) = payload?;
    record.id = None;
    let task_type = TaskType::try_from(record)?;
    let schema = state.registry.compile(&task_type)?;
    let stored = state.task_types.insert_one(task_type).await?;

    info!("任务类型 {} 已提交，重启后生效", stored.name);
    Ok(created_with_message(
        TaskTypeView::new(&stored, &schema),
        format!("任务类型 {} 已保存，重启服务后可创建窗口", stored.name),
    ))
}
