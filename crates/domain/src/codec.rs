//! 窗口文档编解码
//!
//! 存储格式：
//! ```json
//! {"_id": "...", "params": {"task_type": "foo", ...}, "state": "open"}
//! ```
//! 解码时先读取 `params.task_type`，再用注册表中对应的模式校验其余字段。

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::registry::TaskTypeRegistry;
use crate::schema::DISCRIMINATOR_FIELD;
use crate::window::{Window, WindowState};
use crate::{DecodeError, TaskingError};

pub type Document = Map<String, Value>;

pub const ID_KEY: &str = "_id";
pub const PARAMS_KEY: &str = "params";
pub const STATE_KEY: &str = "state";

/// 判别字段在文档中的路径
pub const DISCRIMINATOR_PATH: &str = "params.task_type";

#[derive(Debug, Clone)]
pub struct WindowCodec {
    registry: Arc<TaskTypeRegistry>,
}

impl WindowCodec {
    pub fn new(registry: Arc<TaskTypeRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<TaskTypeRegistry> {
        &self.registry
    }

    pub fn encode(&self, window: &Window) -> Document {
        let mut doc = Document::new();
        if let Some(id) = &window.id {
            doc.insert(ID_KEY.to_string(), Value::String(id.clone()));
        }

        let mut params = window.params.to_json();
        params
            .entry(DISCRIMINATOR_FIELD)
            .or_insert_with(|| Value::String(window.task_type().to_string()));
        doc.insert(PARAMS_KEY.to_string(), Value::Object(params));
        doc.insert(
            STATE_KEY.to_string(),
            Value::String(window.state.as_str().to_string()),
        );
        doc
    }

    /// 解码存储的窗口文档，任一字段失败则整体失败
    pub fn decode(&self, doc: &Document) -> Result<Window, DecodeError> {
        let id = match doc.get(ID_KEY) {
            None | Some(Value::Null) => None,
            Some(Value::String(id)) => Some(id.clone()),
            Some(other) => {
                return Err(violation(ID_KEY, format!("必须是字符串，实际为 {other}")));
            }
        };

        let params = doc
            .get(PARAMS_KEY)
            .ok_or_else(|| violation(PARAMS_KEY, "缺少参数"))?;
        let task_type = params
            .as_object()
            .ok_or_else(|| violation(PARAMS_KEY, format!("必须是对象，实际为 {params}")))?
            .get(DISCRIMINATOR_FIELD)
            .and_then(Value::as_str)
            .ok_or_else(|| violation(DISCRIMINATOR_PATH, "缺少任务类型或不是字符串"))?;

        let schema = self
            .registry
            .lookup(task_type)
            .map_err(|_| DecodeError::UnresolvedTaskType {
                task_type: task_type.to_string(),
            })?;

        let params = schema.validate(params).map_err(|e| match e {
            TaskingError::FieldConstraintViolation { field, reason } => {
                violation(format!("{PARAMS_KEY}.{field}"), reason)
            }
            other => violation(PARAMS_KEY, other.to_string()),
        })?;

        let state = match doc.get(STATE_KEY) {
            None | Some(Value::Null) => WindowState::default(),
            Some(Value::String(s)) => s
                .parse()
                .map_err(|_| violation(STATE_KEY, format!("无效的窗口状态: {s}")))?,
            Some(other) => {
                return Err(violation(STATE_KEY, format!("必须是字符串，实际为 {other}")));
            }
        };

        Ok(Window { id, params, state })
    }
}

fn violation<F: Into<String>, R: Into<String>>(field: F, reason: R) -> DecodeError {
    DecodeError::FieldViolation {
        field: field.into(),
        reason: reason.into(),
    }
}
