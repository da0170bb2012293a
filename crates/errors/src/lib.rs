use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TaskingError {
    #[error("未知的扩展: {name}")]
    UnknownExtension { name: String },
    #[error("扩展重复注册: {name}")]
    DuplicateExtension { name: String },
    #[error("扩展 {extension} 参数无效: {reason}")]
    InvalidExtensionArgs { extension: String, reason: String },
    #[error("字段冲突: {field} 同时由 {first_owner} 和 {second_owner} 提供")]
    FieldCollision {
        field: String,
        first_owner: String,
        second_owner: String,
    },
    #[error("无效的任务类型名称: {name}")]
    InvalidTaskTypeName { name: String },
    #[error("未知的任务类型: {name}")]
    UnknownTaskType { name: String },
    #[error("任务类型已存在: {name}")]
    TaskTypeAlreadyExists { name: String },
    #[error("字段 {field} 校验失败: {reason}")]
    FieldConstraintViolation { field: String, reason: String },
    #[error("文档解码失败: {0}")]
    Decode(#[from] DecodeError),
    #[error("数据库操作错误: {0}")]
    DatabaseOperation(String),
    #[error("序列化错误: {0}")]
    Serialization(String),
    #[error("文档 {id} 已损坏: {reason}")]
    CorruptDocument { id: String, reason: String },
    #[error("内部错误: {0}")]
    Internal(String),
}

/// 已存储窗口文档的解码失败原因
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DecodeError {
    #[error("任务类型 {task_type} 未注册")]
    UnresolvedTaskType { task_type: String },
    #[error("字段 {field} 无效: {reason}")]
    FieldViolation { field: String, reason: String },
}

pub type TaskingResult<T> = Result<T, TaskingError>;

impl TaskingError {
    pub fn unknown_extension<S: Into<String>>(name: S) -> Self {
        Self::UnknownExtension { name: name.into() }
    }
    pub fn invalid_extension_args<S: Into<String>, R: Into<String>>(extension: S, reason: R) -> Self {
        Self::InvalidExtensionArgs {
            extension: extension.into(),
            reason: reason.into(),
        }
    }
    pub fn unknown_task_type<S: Into<String>>(name: S) -> Self {
        Self::UnknownTaskType { name: name.into() }
    }
    pub fn field_violation<S: Into<String>, R: Into<String>>(field: S, reason: R) -> Self {
        Self::FieldConstraintViolation {
            field: field.into(),
            reason: reason.into(),
        }
    }
    pub fn database_error<S: Into<String>>(msg: S) -> Self {
        Self::DatabaseOperation(msg.into())
    }
    pub fn corrupt_document<S: Into<String>, R: Into<String>>(id: S, reason: R) -> Self {
        Self::CorruptDocument {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// 任务类型注册阶段产生的错误，只影响单条记录
    pub fn is_registration_error(&self) -> bool {
        matches!(
            self,
            TaskingError::UnknownExtension { .. }
                | TaskingError::DuplicateExtension { .. }
                | TaskingError::InvalidExtensionArgs { .. }
                | TaskingError::FieldCollision { .. }
                | TaskingError::InvalidTaskTypeName { .. }
        )
    }

    pub fn user_message(&self) -> &str {
        match self {
            TaskingError::UnknownExtension { .. } => "引用的扩展不存在",
            TaskingError::DuplicateExtension { .. } => "扩展名称重复",
            TaskingError::InvalidExtensionArgs { .. } => "扩展参数配置有误",
            TaskingError::FieldCollision { .. } => "扩展之间存在字段冲突",
            TaskingError::InvalidTaskTypeName { .. } => "任务类型名称格式不正确",
            TaskingError::UnknownTaskType { .. } => "请求的任务类型不存在",
            TaskingError::TaskTypeAlreadyExists { .. } => "同名任务类型已存在",
            TaskingError::FieldConstraintViolation { .. } => "输入数据验证失败",
            TaskingError::Decode(_) => "存储的窗口数据无法解析",
            _ => "系统繁忙，请稍后重试",
        }
    }
}

impl From<sqlx::Error> for TaskingError {
    fn from(err: sqlx::Error) -> Self {
        TaskingError::DatabaseOperation(err.to_string())
    }
}

impl From<serde_json::Error> for TaskingError {
    fn from(err: serde_json::Error) -> Self {
        TaskingError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for TaskingError {
    fn from(err: anyhow::Error) -> Self {
        TaskingError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests;
