//! # Tasking API
//!
//! 观测窗口服务的 REST 接口，基于 Axum 构建。
//!
//! ## API 端点
//!
//! - `GET /health` - 健康检查
//! - `POST /windows/{task_type}/create` - 创建窗口，每个已注册的任务类型一个路由
//! - `GET /windows?task_type=&state=` - 列出窗口，无法解码的文档逐条报告在 `failures` 中
//! - `GET /task_types` - 已注册的任务类型及其参数模式
//! - `GET /task_types/{name}` - 单个任务类型
//! - `POST /task_types` - 提交新的任务类型，重启后生效
//!
//! ## 响应格式
//!
//! ```json
//! {
//!   "success": true,
//!   "data": { "id": "…", "params": { "task_type": "foo" }, "state": "open" },
//!   "message": null,
//!   "timestamp": "2024-01-01T00:00:00Z"
//! }
//! ```
//!
//! 错误响应为 `{"error": {"message", "type", "code", "suggestions", "timestamp"}}`。

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;

use axum::{extract::DefaultBodyLimit, Router};
use tasking_config::ApiConfig;
use tower::ServiceBuilder;

use middleware::{cors_layer, request_logging, timeout_layer, trace_layer};
pub use routes::{create_routes, AppState};

/// 创建完整的API应用
pub fn create_app(state: AppState, api_config: &ApiConfig) -> Router {
    let body_limit = (api_config.max_request_size_mb as usize) * 1024 * 1024;

    let app = create_routes(state).layer(
        ServiceBuilder::new()
            .layer(trace_layer())
            .layer(timeout_layer(api_config.request_timeout_seconds))
            .layer(DefaultBodyLimit::max(body_limit))
            .layer(axum::middleware::from_fn(request_logging)),
    );

    if api_config.cors_enabled {
        app.layer(cors_layer())
    } else {
        app
    }
}
