//! 任务类型注册表
//!
//! 启动阶段由单一所有者通过 `&mut self` 填充，之后放入 `Arc` 冻结，
//! 请求处理期间只做并发读取，不需要加锁。

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{error, info, instrument};

use crate::extension::ExtensionCatalog;
use crate::schema::{CompiledSchema, SchemaCompiler};
use crate::task_type::{TaskType, TaskTypeRecord};
use crate::{TaskingError, TaskingResult};

/// 注册表条目：任务类型配置与它独占的编译模式
#[derive(Debug, Clone)]
pub struct RegisteredTaskType {
    pub task_type: TaskType,
    pub schema: Arc<CompiledSchema>,
}

impl RegisteredTaskType {
    pub fn name(&self) -> &str {
        self.task_type.name.as_str()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RejectedTaskType {
    pub name: String,
    pub error: TaskingError,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InitializationReport {
    pub registered: Vec<String>,
    pub rejected: Vec<RejectedTaskType>,
}

impl InitializationReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

#[derive(Debug)]
pub struct TaskTypeRegistry {
    catalog: Arc<ExtensionCatalog>,
    entries: HashMap<String, Arc<RegisteredTaskType>>,
}

impl Default for TaskTypeRegistry {
    fn default() -> Self {
        Self::new(Arc::new(ExtensionCatalog::builtin()))
    }
}

impl TaskTypeRegistry {
    pub fn new(catalog: Arc<ExtensionCatalog>) -> Self {
        Self {
            catalog,
            entries: HashMap::new(),
        }
    }

    pub fn catalog(&self) -> &ExtensionCatalog {
        &self.catalog
    }

    /// 批量注册任务类型记录
    ///
    /// 单条记录失败只会被拒绝并记录日志，其余记录继续注册。
    #[instrument(skip_all)]
    pub fn initialize<I>(&mut self, records: I) -> InitializationReport
    where
        I: IntoIterator<Item = TaskTypeRecord>,
    {
        let mut report = InitializationReport::default();

        for record in records {
            let name = record.name.clone();
            match self.register_record(record) {
                Ok(()) => report.registered.push(name),
                Err(e) => {
                    error!("任务类型 {} 注册失败，已跳过: {}", name, e);
                    report.rejected.push(RejectedTaskType { name, error: e });
                }
            }
        }

        info!(
            "任务类型注册完成: 成功 {} 个，拒绝 {} 个",
            report.registered.len(),
            report.rejected.len()
        );
        report
    }

    pub fn register_record(&mut self, record: TaskTypeRecord) -> TaskingResult<()> {
        let task_type = TaskType::try_from(record)?;
        self.register(task_type)
    }

    /// 编译并注册单个任务类型，同名条目会被整体替换
    pub fn register(&mut self, task_type: TaskType) -> TaskingResult<()> {
        let schema = Arc::new(self.compile(&task_type)?);
        let name = task_type.name.as_str().to_string();

        info!("注册任务类型: {}", name);
        let previous = self
            .entries
            .insert(name.clone(), Arc::new(RegisteredTaskType { task_type, schema }));
        if previous.is_some() {
            info!("任务类型 {} 已存在，使用新的配置覆盖", name);
        }
        Ok(())
    }

    /// 只编译不注册，用于校验管理接口提交的记录
    pub fn compile(&self, task_type: &TaskType) -> TaskingResult<CompiledSchema> {
        SchemaCompiler::new(&self.catalog).compile(&task_type.name, &task_type.extensions)
    }

    pub fn lookup(&self, name: &str) -> TaskingResult<Arc<CompiledSchema>> {
        self.entries
            .get(name)
            .map(|entry| Arc::clone(&entry.schema))
            .ok_or_else(|| TaskingError::unknown_task_type(name))
    }

    pub fn get(&self, name: &str) -> Option<Arc<RegisteredTaskType>> {
        self.entries.get(name).cloned()
    }

    /// 所有已注册的任务类型，不保证顺序
    pub fn all(&self) -> impl Iterator<Item = &Arc<RegisteredTaskType>> {
        self.entries.values()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
