use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{TaskingError, TaskingResult};

/// 任务类型名称：2-16 个字符，小写字母、数字或下划线，字母开头，不以下划线结尾
static TASK_TYPE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z][a-z0-9_]{0,14}[a-z0-9]$").expect("任务类型名称正则表达式必须有效")
});

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TaskTypeName(String);

impl TaskTypeName {
    pub fn parse<S: Into<String>>(name: S) -> TaskingResult<Self> {
        let name = name.into();
        if TASK_TYPE_NAME_RE.is_match(&name) {
            Ok(Self(name))
        } else {
            Err(TaskingError::InvalidTaskTypeName { name })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for TaskTypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TaskTypeName {
    type Err = TaskingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for TaskTypeName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for TaskTypeName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(raw).map_err(serde::de::Error::custom)
    }
}

/// 未经校验的任务类型记录，来自配置文件、数据库或管理接口
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskTypeRecord {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub extensions: IndexMap<String, Value>,
}

impl TaskTypeRecord {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            id: None,
            name: name.into(),
            extensions: IndexMap::new(),
        }
    }

    pub fn with_extension<S: Into<String>>(mut self, name: S, args: Value) -> Self {
        self.extensions.insert(name.into(), args);
        self
    }
}

/// 通过名称校验的任务类型配置
///
/// 扩展引用是否有效要到编译模式时才能确定。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskType {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: TaskTypeName,
    #[serde(default)]
    pub extensions: IndexMap<String, Value>,
}

impl TaskType {
    pub fn new(name: TaskTypeName, extensions: IndexMap<String, Value>) -> Self {
        Self {
            id: None,
            name,
            extensions,
        }
    }
}

impl TryFrom<TaskTypeRecord> for TaskType {
    type Error = TaskingError;

    fn try_from(record: TaskTypeRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: record.id,
            name: TaskTypeName::parse(record.name)?,
            extensions: record.extensions,
        })
    }
}

impl From<TaskType> for TaskTypeRecord {
    fn from(task_type: TaskType) -> Self {
        Self {
            id: task_type.id,
            name: task_type.name.into_inner(),
            extensions: task_type.extensions,
        }
    }
}
