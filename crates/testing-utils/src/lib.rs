//! # Tasking Testing Utils
//!
//! 各 crate 测试共用的工具：
//!
//! - **mocks**: 内存文档存储 `MemoryDocumentStore`
//! - **builders**: 任务类型记录、窗口参数和注册表的构造器
//!
//! ```toml
//! [dev-dependencies]
//! tasking-testing-utils = { path = "../testing-utils" }
//! ```

pub mod builders;
pub mod mocks;

pub use builders::*;
pub use mocks::*;
