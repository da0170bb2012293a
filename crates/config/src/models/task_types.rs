use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::validation::{ConfigValidator, ValidationUtils};

/// 配置文件中声明的任务类型
///
/// 只做结构校验，名称格式和扩展引用在注册表初始化时检查。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskTypeSeed {
    pub name: String,
    #[serde(default)]
    pub extensions: IndexMap<String, serde_json::Value>,
}

impl ConfigValidator for TaskTypeSeed {
    fn validate(&self) -> crate::ConfigResult<()> {
        ValidationUtils::validate_not_empty(&self.name, "task_types.name")?;
        for ext_name in self.extensions.keys() {
            ValidationUtils::validate_not_empty(ext_name, "task_types.extensions name")?;
        }
        Ok(())
    }
}
