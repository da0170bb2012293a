//! # Tasking Domain
//!
//! 任务类型与观测窗口的核心领域模型。
//!
//! - **extension**: 扩展目录，扩展按名称注册并为任务类型贡献字段
//! - **schema**: 参数模式编译器，把基础字段和扩展字段合并为一个具体模式
//! - **task_type**: 任务类型配置记录及名称格式
//! - **registry**: 任务类型注册表，启动时构建，之后只读共享
//! - **window**: 窗口实体及其状态
//! - **codec**: 窗口与存储文档之间的多态编解码
//! - **repositories**: 文档存储端口

pub mod codec;
pub mod extension;
pub mod registry;
pub mod repositories;
pub mod schema;
pub mod task_type;
pub mod window;

pub use codec::*;
pub use extension::*;
pub use registry::*;
pub use repositories::*;
pub use schema::*;
pub use task_type::*;
pub use window::*;
pub use tasking_errors::{DecodeError, TaskingError, TaskingResult};
