//! 任务类型参数模式
//!
//! 模式是数据驱动的：字段名到类型与约束的映射，由一个通用校验器解释，
//! 不为每个任务类型生成新的具体类型。

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use indexmap::IndexMap;
use regex::Regex;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::extension::{ExtensionCatalog, FieldSet};
use crate::task_type::TaskTypeName;
use crate::window::{ParamValue, WindowParams};
use crate::{TaskingError, TaskingResult};

/// 判别字段名称，值固定为所属任务类型的名称
pub const DISCRIMINATOR_FIELD: &str = "task_type";
pub const START_TIME_FIELD: &str = "start_time";
pub const STOP_TIME_FIELD: &str = "stop_time";
pub const DATASOURCES_FIELD: &str = "datasources";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    DateTime,
    StringList,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::DateTime => "datetime",
            FieldType::StringList => "string_list",
        }
    }
}

#[derive(Debug, Clone)]
pub enum Constraint {
    /// 字符串必须完整匹配正则
    Pattern(Regex),
    /// 整数闭区间
    Range { min: Option<i64>, max: Option<i64> },
    /// 列表最少元素个数
    MinItems(usize),
    /// 值固定，调用方不可设置为其他值
    Fixed(String),
}

impl Constraint {
    pub fn pattern(pattern: &str) -> TaskingResult<Self> {
        Regex::new(pattern)
            .map(Constraint::Pattern)
            .map_err(|e| TaskingError::Internal(format!("无效的正则表达式 {pattern}: {e}")))
    }

    fn check(&self, field: &str, value: &ParamValue) -> TaskingResult<()> {
        match (self, value) {
            (Constraint::Pattern(re), ParamValue::String(s)) => {
                if !re.is_match(s) {
                    return Err(TaskingError::field_violation(
                        field,
                        format!("值 {s:?} 不匹配模式 {}", re.as_str()),
                    ));
                }
            }
            (Constraint::Range { min, max }, ParamValue::Integer(n)) => {
                if let Some(min) = min {
                    if n < min {
                        return Err(TaskingError::field_violation(
                            field,
                            format!("值 {n} 小于最小值 {min}"),
                        ));
                    }
                }
                if let Some(max) = max {
                    if n > max {
                        return Err(TaskingError::field_violation(
                            field,
                            format!("值 {n} 大于最大值 {max}"),
                        ));
                    }
                }
            }
            (Constraint::MinItems(min), ParamValue::StringList(items)) => {
                if items.len() < *min {
                    return Err(TaskingError::field_violation(
                        field,
                        format!("至少需要 {min} 个元素，实际 {}", items.len()),
                    ));
                }
            }
            (Constraint::Fixed(expected), ParamValue::String(s)) => {
                if s != expected {
                    return Err(TaskingError::field_violation(
                        field,
                        format!("值固定为 {expected:?}，不能设置为 {s:?}"),
                    ));
                }
            }
            (constraint, value) => {
                return Err(TaskingError::Internal(format!(
                    "字段 {field} 的约束 {constraint:?} 不适用于值 {value:?}"
                )));
            }
        }
        Ok(())
    }
}

impl PartialEq for Constraint {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Constraint::Pattern(a), Constraint::Pattern(b)) => a.as_str() == b.as_str(),
            (
                Constraint::Range { min: a_min, max: a_max },
                Constraint::Range { min: b_min, max: b_max },
            ) => a_min == b_min && a_max == b_max,
            (Constraint::MinItems(a), Constraint::MinItems(b)) => a == b,
            (Constraint::Fixed(a), Constraint::Fixed(b)) => a == b,
            _ => false,
        }
    }
}

/// 单个字段的定义
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub field_type: FieldType,
    pub required: bool,
    pub constraints: Vec<Constraint>,
}

impl FieldSpec {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: false,
            constraints: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// 固定值，没有固定约束时返回 None
    pub fn fixed_value(&self) -> Option<&str> {
        self.constraints.iter().find_map(|c| match c {
            Constraint::Fixed(v) => Some(v.as_str()),
            _ => None,
        })
    }

    pub fn pattern(&self) -> Option<&str> {
        self.constraints.iter().find_map(|c| match c {
            Constraint::Pattern(re) => Some(re.as_str()),
            _ => None,
        })
    }

    /// 校验并转换单个字段的原始值
    ///
    /// 返回 `Ok(None)` 表示可选字段未提供。
    pub fn coerce(&self, field: &str, raw: Option<&Value>) -> TaskingResult<Option<ParamValue>> {
        let raw = match raw {
            None | Some(Value::Null) => {
                if let Some(fixed) = self.fixed_value() {
                    return Ok(Some(ParamValue::String(fixed.to_string())));
                }
                if self.required {
                    return Err(TaskingError::field_violation(field, "缺少必填字段"));
                }
                return Ok(None);
            }
            Some(raw) => raw,
        };

        let value = match self.field_type {
            FieldType::String => match raw {
                Value::String(s) => ParamValue::String(s.clone()),
                other => {
                    return Err(TaskingError::field_violation(
                        field,
                        format!("必须是字符串，实际为 {other}"),
                    ))
                }
            },
            FieldType::Integer => ParamValue::Integer(coerce_integer(field, raw)?),
            FieldType::DateTime => ParamValue::DateTime(coerce_datetime(field, raw)?),
            FieldType::StringList => ParamValue::StringList(coerce_string_list(field, raw)?),
        };

        for constraint in &self.constraints {
            constraint.check(field, &value)?;
        }

        Ok(Some(value))
    }

    /// 线上表示：JSON Schema 风格的属性描述
    pub fn to_json_schema(&self) -> Value {
        let mut property = Map::new();
        match self.field_type {
            FieldType::String => {
                property.insert("type".to_string(), json!("string"));
            }
            FieldType::Integer => {
                property.insert("type".to_string(), json!("integer"));
            }
            FieldType::DateTime => {
                property.insert("type".to_string(), json!("string"));
                property.insert("format".to_string(), json!("date-time"));
            }
            FieldType::StringList => {
                property.insert("type".to_string(), json!("array"));
                property.insert("items".to_string(), json!({ "type": "string" }));
            }
        }

        for constraint in &self.constraints {
            match constraint {
                Constraint::Pattern(re) => {
                    property.insert("pattern".to_string(), json!(re.as_str()));
                }
                Constraint::Range { min, max } => {
                    if let Some(min) = min {
                        property.insert("minimum".to_string(), json!(min));
                    }
                    if let Some(max) = max {
                        property.insert("maximum".to_string(), json!(max));
                    }
                }
                Constraint::MinItems(n) => {
                    property.insert("minItems".to_string(), json!(n));
                }
                Constraint::Fixed(v) => {
                    property.insert("default".to_string(), json!(v));
                }
            }
        }

        Value::Object(property)
    }
}

fn coerce_integer(field: &str, raw: &Value) -> TaskingResult<i64> {
    match raw {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => {
                    Ok(f as i64)
                }
                _ => Err(TaskingError::field_violation(
                    field,
                    format!("必须是整数，实际为 {n}"),
                )),
            }
        }
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| {
            TaskingError::field_violation(field, format!("必须是整数，实际为 {s:?}"))
        }),
        other => Err(TaskingError::field_violation(
            field,
            format!("必须是整数，实际为 {other}"),
        )),
    }
}

fn coerce_datetime(field: &str, raw: &Value) -> TaskingResult<DateTime<Utc>> {
    match raw {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                TaskingError::field_violation(field, format!("无效的RFC3339时间 {s:?}: {e}"))
            }),
        Value::Number(n) => n
            .as_i64()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .ok_or_else(|| {
                TaskingError::field_violation(field, format!("无效的Unix时间戳 {n}"))
            }),
        other => Err(TaskingError::field_violation(
            field,
            format!("必须是时间字符串，实际为 {other}"),
        )),
    }
}

fn coerce_string_list(field: &str, raw: &Value) -> TaskingResult<Vec<String>> {
    let items = raw.as_array().ok_or_else(|| {
        TaskingError::field_violation(field, format!("必须是字符串数组，实际为 {raw}"))
    })?;

    items
        .iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::String(s) => Ok(s.clone()),
            other => Err(TaskingError::field_violation(
                format!("{field}.{i}"),
                format!("必须是字符串，实际为 {other}"),
            )),
        })
        .collect()
}

/// 字段的来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldOwner {
    Base,
    Extension(String),
}

impl fmt::Display for FieldOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldOwner::Base => write!(f, "base"),
            FieldOwner::Extension(name) => write!(f, "{name}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledField {
    pub spec: FieldSpec,
    pub owner: FieldOwner,
}

/// 编译后的参数模式，归注册表中对应的任务类型独占
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledSchema {
    task_type: String,
    fields: IndexMap<String, CompiledField>,
}

impl CompiledSchema {
    pub fn task_type(&self) -> &str {
        &self.task_type
    }

    pub fn field(&self, name: &str) -> Option<&CompiledField> {
        self.fields.get(name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &CompiledField)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 按模式校验参数，全部通过才产生参数对象
    pub fn validate(self: &Arc<Self>, raw: &Value) -> TaskingResult<WindowParams> {
        let object = raw.as_object().ok_or_else(|| {
            TaskingError::field_violation("params", format!("必须是对象，实际为 {raw}"))
        })?;

        for key in object.keys() {
            if !self.fields.contains_key(key) {
                debug!("任务类型 {} 忽略未知字段: {}", self.task_type, key);
            }
        }

        let mut values = IndexMap::with_capacity(self.fields.len());
        for (name, field) in &self.fields {
            if let Some(value) = field.spec.coerce(name, object.get(name))? {
                values.insert(name.clone(), value);
            }
        }

        Ok(WindowParams::new(Arc::clone(self), values))
    }

    pub fn title(&self) -> String {
        format!("{}_WindowParams", self.task_type.to_uppercase())
    }

    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|(name, field)| (name.clone(), field.spec.to_json_schema()))
            .collect();
        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|(_, field)| field.spec.required)
            .map(|(name, _)| name.as_str())
            .collect();

        json!({
            "title": self.title(),
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// 所有任务类型共享的基础字段
pub fn base_fields(task_type: &TaskTypeName) -> FieldSet {
    let mut fields = FieldSet::new();
    fields.insert(
        DISCRIMINATOR_FIELD.to_string(),
        FieldSpec::new(FieldType::String)
            .with_constraint(Constraint::Fixed(task_type.as_str().to_string())),
    );
    fields.insert(
        START_TIME_FIELD.to_string(),
        FieldSpec::new(FieldType::DateTime).required(),
    );
    fields.insert(
        STOP_TIME_FIELD.to_string(),
        FieldSpec::new(FieldType::DateTime).required(),
    );
    fields.insert(
        DATASOURCES_FIELD.to_string(),
        FieldSpec::new(FieldType::StringList)
            .required()
            .with_constraint(Constraint::MinItems(1)),
    );
    fields
}

pub struct SchemaCompiler<'a> {
    catalog: &'a ExtensionCatalog,
}

impl<'a> SchemaCompiler<'a> {
    pub fn new(catalog: &'a ExtensionCatalog) -> Self {
        Self { catalog }
    }

    /// 按配置顺序合并基础字段和各扩展贡献的字段
    pub fn compile(
        &self,
        task_type: &TaskTypeName,
        extensions: &IndexMap<String, Value>,
    ) -> TaskingResult<CompiledSchema> {
        let mut fields: IndexMap<String, CompiledField> = base_fields(task_type)
            .into_iter()
            .map(|(name, spec)| {
                (
                    name,
                    CompiledField {
                        spec,
                        owner: FieldOwner::Base,
                    },
                )
            })
            .collect();

        for (ext_name, ext_args) in extensions {
            let contributed = self.catalog.instantiate(ext_name, ext_args)?;

            for (field_name, spec) in contributed {
                if let Some(existing) = fields.get(&field_name) {
                    return Err(TaskingError::FieldCollision {
                        field: field_name,
                        first_owner: existing.owner.to_string(),
                        second_owner: ext_name.clone(),
                    });
                }
                fields.insert(
                    field_name,
                    CompiledField {
                        spec,
                        owner: FieldOwner::Extension(ext_name.clone()),
                    },
                );
            }
        }

        debug!(
            "任务类型 {} 编译完成，共 {} 个字段",
            task_type,
            fields.len()
        );

        Ok(CompiledSchema {
            task_type: task_type.as_str().to_string(),
            fields,
        })
    }
}
