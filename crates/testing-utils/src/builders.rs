//! 测试数据构造器

use std::sync::Arc;

use serde_json::{json, Map, Value};
use tasking_domain::{TaskTypeRecord, TaskTypeRegistry, Window, WindowParams, WindowState};
use tasking_errors::TaskingResult;

/// 任务类型记录构造器，默认名称为 `foo`，没有扩展
pub struct TaskTypeRecordBuilder {
    record: TaskTypeRecord,
}

impl TaskTypeRecordBuilder {
    pub fn new() -> Self {
        Self {
            record: TaskTypeRecord::new("foo"),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.record.name = name.to_string();
        self
    }

    pub fn with_extension(mut self, name: &str, args: Value) -> Self {
        self.record.extensions.insert(name.to_string(), args);
        self
    }

    pub fn with_symbol_set(self) -> Self {
        self.with_extension("symbol_set", Value::Null)
    }

    pub fn with_keynonce(self, key_len: i64, nonce_len: i64) -> Self {
        self.with_extension(
            "keynonce",
            json!({"key_len": key_len, "nonce_len": nonce_len}),
        )
    }

    pub fn build(self) -> TaskTypeRecord {
        self.record
    }
}

impl Default for TaskTypeRecordBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 窗口参数构造器，默认包含合法的基础字段
pub struct WindowParamsBuilder {
    params: Map<String, Value>,
}

impl WindowParamsBuilder {
    pub fn new() -> Self {
        let mut params = Map::new();
        params.insert("start_time".to_string(), json!("2024-01-01T00:00:00Z"));
        params.insert("stop_time".to_string(), json!("2024-01-01T01:00:00Z"));
        params.insert("datasources".to_string(), json!(["radar"]));
        Self { params }
    }

    pub fn with(mut self, field: &str, value: Value) -> Self {
        self.params.insert(field.to_string(), value);
        self
    }

    pub fn without(mut self, field: &str) -> Self {
        self.params.remove(field);
        self
    }

    pub fn with_symbol_set(self, symbol_set: i64) -> Self {
        self.with("symbol_set", json!(symbol_set))
    }

    pub fn with_key_nonce(self, key: &str, nonce: &str) -> Self {
        self.with("key", json!(key)).with("nonce", json!(nonce))
    }

    pub fn build_json(self) -> Value {
        Value::Object(self.params)
    }

    /// 用注册表中对应任务类型的模式校验
    pub fn build(self, registry: &TaskTypeRegistry, task_type: &str) -> TaskingResult<WindowParams> {
        registry.lookup(task_type)?.validate(&self.build_json())
    }
}

impl Default for WindowParamsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 注册 `foo`（symbol_set + keynonce 12/12）和 `bar`（无扩展）的注册表
pub fn sample_registry() -> Arc<TaskTypeRegistry> {
    let mut registry = TaskTypeRegistry::default();
    registry.initialize(sample_records());
    Arc::new(registry)
}

pub fn sample_records() -> Vec<TaskTypeRecord> {
    vec![
        TaskTypeRecordBuilder::new()
            .with_name("foo")
            .with_symbol_set()
            .with_keynonce(12, 12)
            .build(),
        TaskTypeRecordBuilder::new().with_name("bar").build(),
    ]
}

/// `foo` 类型的合法参数
pub fn foo_params_json() -> Value {
    WindowParamsBuilder::new()
        .with_symbol_set(5)
        .with_key_nonce("0123456789ab", "ba9876543210")
        .build_json()
}

pub fn sample_window(registry: &TaskTypeRegistry, task_type: &str, state: WindowState) -> TaskingResult<Window> {
    let params = match task_type {
        "foo" => registry.lookup("foo")?.validate(&foo_params_json())?,
        other => WindowParamsBuilder::new().build(registry, other)?,
    };
    Ok(Window::new(params).with_state(state))
}
