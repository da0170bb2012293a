use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tasking_errors::{DecodeError, TaskingError};
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Tasking(#[from] TaskingError),

    #[error("请求参数错误: {0}")]
    BadRequest(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    fn parts(&self) -> (StatusCode, String, &'static str, Vec<String>) {
        match self {
            ApiError::Tasking(TaskingError::UnknownTaskType { name }) => (
                StatusCode::NOT_FOUND,
                format!("任务类型 {} 不存在", name),
                "UNKNOWN_TASK_TYPE",
                vec![
                    "请检查任务类型名称是否正确".to_string(),
                    "使用 GET /task_types 查看所有已注册的任务类型".to_string(),
                ],
            ),
            ApiError::Tasking(TaskingError::Decode(DecodeError::UnresolvedTaskType {
                task_type,
            })) => (
                StatusCode::NOT_FOUND,
                format!("任务类型 {} 未注册", task_type),
                "UNKNOWN_TASK_TYPE",
                vec!["使用 GET /task_types 查看所有已注册的任务类型".to_string()],
            ),
            ApiError::Tasking(TaskingError::TaskTypeAlreadyExists { name }) => (
                StatusCode::CONFLICT,
                format!("任务类型 {} 已持久化", name),
                "TASK_TYPE_CONFLICT",
                vec![
                    "同名任务类型只能提交一次".to_string(),
                    "使用其他名称重新提交".to_string(),
                ],
            ),
            ApiError::Tasking(TaskingError::FieldConstraintViolation { field, reason })
            | ApiError::Tasking(TaskingError::Decode(DecodeError::FieldViolation {
                field,
                reason,
            })) => (
                StatusCode::BAD_REQUEST,
                format!("字段 {} 校验失败: {}", field, reason),
                "VALIDATION_ERROR",
                vec![
                    "请检查请求参数是否符合任务类型的模式".to_string(),
                    "使用 GET /task_types/{name} 查看字段定义".to_string(),
                ],
            ),
            ApiError::Tasking(err) if err.is_registration_error() => (
                StatusCode::BAD_REQUEST,
                err.to_string(),
                "INVALID_TASK_TYPE",
                vec![
                    err.user_message().to_string(),
                    "任务类型名称须为2到16位小写字母、数字或下划线，以字母开头".to_string(),
                ],
            ),
            ApiError::Tasking(err) => {
                error!("请求处理失败: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "系统内部错误".to_string(),
                    "INTERNAL_ERROR",
                    vec![
                        err.user_message().to_string(),
                        "查看 GET /health 检查系统状态".to_string(),
                    ],
                )
            }
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                format!("请求参数错误: {}", msg),
                "BAD_REQUEST",
                vec![
                    "请检查请求体是否为合法的JSON".to_string(),
                    "请求头需包含 Content-Type: application/json".to_string(),
                ],
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message, error_type, suggestions) = self.parts();

        let body = Json(json!({
            "error": {
                "message": error_message,
                "type": error_type,
                "code": status.as_u16(),
                "suggestions": suggestions,
                "timestamp": chrono::Utc::now().to_rfc3339(),
            }
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
