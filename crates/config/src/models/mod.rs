pub mod api_observability;
pub mod app_config;
pub mod database;
pub mod logging;
pub mod task_types;

pub use api_observability::*;
pub use app_config::*;
pub use database::*;
pub use logging::*;
pub use task_types::*;
