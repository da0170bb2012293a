//! 扩展目录
//!
//! 扩展是无状态的字段模板：同一名称配合不同参数会产生不同的字段定义。

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::schema::{Constraint, FieldSpec, FieldType};
use crate::{TaskingError, TaskingResult};

/// 扩展贡献的字段，保持声明顺序
pub type FieldSet = IndexMap<String, FieldSpec>;

pub trait Extension: fmt::Debug + Send + Sync {
    fn field_definitions(&self) -> FieldSet;
}

/// 由配置参数构造扩展实例
pub type ExtensionFactory = fn(&Value) -> TaskingResult<Box<dyn Extension>>;

#[derive(Clone, Default)]
pub struct ExtensionCatalog {
    factories: HashMap<String, ExtensionFactory>,
}

impl fmt::Debug for ExtensionCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionCatalog")
            .field("extensions", &self.names())
            .finish()
    }
}

impl ExtensionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 包含内置扩展 `keynonce` 与 `symbol_set` 的目录
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.factories.insert(
            KeyNonceExtension::NAME.to_string(),
            KeyNonceExtension::factory,
        );
        catalog.factories.insert(
            SymbolSetExtension::NAME.to_string(),
            SymbolSetExtension::factory,
        );
        catalog
    }

    /// 注册扩展工厂，名称重复时报错而不是覆盖
    pub fn register<S: Into<String>>(
        &mut self,
        name: S,
        factory: ExtensionFactory,
    ) -> TaskingResult<()> {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(TaskingError::DuplicateExtension { name });
        }
        debug!("注册扩展: {}", name);
        self.factories.insert(name, factory);
        Ok(())
    }

    pub fn create(&self, name: &str, args: &Value) -> TaskingResult<Box<dyn Extension>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| TaskingError::unknown_extension(name))?;
        factory(args)
    }

    pub fn instantiate(&self, name: &str, args: &Value) -> TaskingResult<FieldSet> {
        Ok(self.create(name, args)?.field_definitions())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// 已注册的扩展名称，按字母排序
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// 解析扩展参数，`null` 视为空参数
fn parse_args<T: DeserializeOwned + Default>(extension: &str, args: &Value) -> TaskingResult<T> {
    match args {
        Value::Null => Ok(T::default()),
        Value::Object(_) => serde_json::from_value(args.clone())
            .map_err(|e| TaskingError::invalid_extension_args(extension, e.to_string())),
        other => Err(TaskingError::invalid_extension_args(
            extension,
            format!("参数必须是对象，实际为 {other}"),
        )),
    }
}

fn hex_pattern(len: i64) -> String {
    if len > 0 {
        format!("^[0-9a-fA-F]{{{len}}}$")
    } else {
        "^[0-9a-fA-F]*$".to_string()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct KeyNonceArgs {
    key_len: Option<i64>,
    nonce_len: Option<i64>,
}

/// 为窗口参数添加十六进制的 `key` 与 `nonce` 字段
///
/// 长度参数缺省为 16；小于等于 0 时不限制长度，最大为 [`KeyNonceExtension::MAX_LEN`]。
#[derive(Debug, Clone)]
pub struct KeyNonceExtension {
    pub key_len: i64,
    pub nonce_len: i64,
    key_pattern: Constraint,
    nonce_pattern: Constraint,
}

impl KeyNonceExtension {
    pub const NAME: &'static str = "keynonce";
    pub const DEFAULT_LEN: i64 = 16;
    pub const MAX_LEN: i64 = 1024;

    pub fn new(key_len: Option<i64>, nonce_len: Option<i64>) -> TaskingResult<Self> {
        let key_len = key_len.unwrap_or(Self::DEFAULT_LEN);
        let nonce_len = nonce_len.unwrap_or(Self::DEFAULT_LEN);
        Ok(Self {
            key_len,
            nonce_len,
            key_pattern: Self::hex_constraint("key_len", key_len)?,
            nonce_pattern: Self::hex_constraint("nonce_len", nonce_len)?,
        })
    }

    fn hex_constraint(arg: &str, len: i64) -> TaskingResult<Constraint> {
        if len > Self::MAX_LEN {
            return Err(TaskingError::invalid_extension_args(
                Self::NAME,
                format!("{arg} 不能超过 {}，实际为 {len}", Self::MAX_LEN),
            ));
        }
        Constraint::pattern(&hex_pattern(len))
            .map_err(|e| TaskingError::invalid_extension_args(Self::NAME, e.to_string()))
    }

    fn factory(args: &Value) -> TaskingResult<Box<dyn Extension>> {
        let args: KeyNonceArgs = parse_args(Self::NAME, args)?;
        Ok(Box::new(Self::new(args.key_len, args.nonce_len)?))
    }
}

impl Extension for KeyNonceExtension {
    fn field_definitions(&self) -> FieldSet {
        let hex_field = |pattern: &Constraint| {
            FieldSpec::new(FieldType::String)
                .required()
                .with_constraint(pattern.clone())
        };
        let mut fields = FieldSet::new();
        fields.insert("key".to_string(), hex_field(&self.key_pattern));
        fields.insert("nonce".to_string(), hex_field(&self.nonce_pattern));
        fields
    }
}

/// 为窗口参数添加整数字段 `symbol_set`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolSetExtension;

impl SymbolSetExtension {
    pub const NAME: &'static str = "symbol_set";

    fn factory(args: &Value) -> TaskingResult<Box<dyn Extension>> {
        match args {
            Value::Null => Ok(Box::new(Self)),
            Value::Object(map) if map.is_empty() => Ok(Box::new(Self)),
            other => Err(TaskingError::invalid_extension_args(
                Self::NAME,
                format!("不接受参数，实际为 {other}"),
            )),
        }
    }
}

impl Extension for SymbolSetExtension {
    fn field_definitions(&self) -> FieldSet {
        let mut fields = FieldSet::new();
        fields.insert(
            "symbol_set".to_string(),
            FieldSpec::new(FieldType::Integer).required(),
        );
        fields
    }
}
