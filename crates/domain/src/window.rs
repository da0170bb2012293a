use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::schema::{CompiledSchema, DISCRIMINATOR_FIELD};
use crate::TaskingError;

/// 经过模式校验的单个参数值
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    String(String),
    Integer(i64),
    DateTime(DateTime<Utc>),
    StringList(Vec<String>),
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            ParamValue::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            ParamValue::String(s) => Value::String(s.clone()),
            ParamValue::Integer(n) => Value::from(*n),
            ParamValue::DateTime(dt) => {
                Value::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            ParamValue::StringList(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
        }
    }
}

impl Serialize for ParamValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ParamValue::String(s) => serializer.serialize_str(s),
            ParamValue::Integer(n) => serializer.serialize_i64(*n),
            ParamValue::DateTime(dt) => {
                serializer.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            ParamValue::StringList(items) => items.serialize(serializer),
        }
    }
}

/// 窗口参数：参数值加上校验它们的模式
///
/// 只能通过 [`CompiledSchema::validate`] 构造，因此判别字段总是存在。
#[derive(Debug, Clone)]
pub struct WindowParams {
    schema: Arc<CompiledSchema>,
    values: IndexMap<String, ParamValue>,
}

impl WindowParams {
    pub(crate) fn new(schema: Arc<CompiledSchema>, values: IndexMap<String, ParamValue>) -> Self {
        Self { schema, values }
    }

    pub fn task_type(&self) -> &str {
        self.schema.task_type()
    }

    pub fn schema(&self) -> &Arc<CompiledSchema> {
        &self.schema
    }

    pub fn get(&self, field: &str) -> Option<&ParamValue> {
        self.values.get(field)
    }

    pub fn values(&self) -> &IndexMap<String, ParamValue> {
        &self.values
    }

    pub fn to_json(&self) -> Map<String, Value> {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect()
    }
}

impl PartialEq for WindowParams {
    fn eq(&self, other: &Self) -> bool {
        self.task_type() == other.task_type() && self.values == other.values
    }
}

impl Serialize for WindowParams {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        if !self.values.contains_key(DISCRIMINATOR_FIELD) {
            map.serialize_entry(DISCRIMINATOR_FIELD, self.task_type())?;
        }
        for (k, v) in &self.values {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowState {
    #[default]
    Open,
    Cancelled,
    Complete,
}

impl WindowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WindowState::Open => "open",
            WindowState::Cancelled => "cancelled",
            WindowState::Complete => "complete",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WindowState::Cancelled | WindowState::Complete)
    }

    /// 仅允许 open→cancelled 和 open→complete
    pub fn can_transition_to(&self, next: WindowState) -> bool {
        matches!(
            (self, next),
            (WindowState::Open, WindowState::Cancelled) | (WindowState::Open, WindowState::Complete)
        )
    }
}

impl fmt::Display for WindowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WindowState {
    type Err = TaskingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(WindowState::Open),
            "cancelled" => Ok(WindowState::Cancelled),
            "complete" => Ok(WindowState::Complete),
            _ => Err(TaskingError::field_violation(
                "state",
                format!("无效的窗口状态: {s}"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Window {
    /// 存储层在插入时分配
    pub id: Option<String>,
    pub params: WindowParams,
    pub state: WindowState,
}

impl Window {
    pub fn new(params: WindowParams) -> Self {
        Self {
            id: None,
            params,
            state: WindowState::default(),
        }
    }

    pub fn with_id<S: Into<String>>(mut self, id: S) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_state(mut self, state: WindowState) -> Self {
        self.state = state;
        self
    }

    pub fn task_type(&self) -> &str {
        self.params.task_type()
    }
}
