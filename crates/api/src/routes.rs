use axum::{
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;

use tasking_domain::{DocumentStore, TaskTypeRegistry, WindowCodec};
use tasking_infrastructure::{TaskTypeCollection, WindowCollection};
use tracing::debug;

use crate::handlers::{
    health::health_check,
    task_types::{create_task_type, get_task_type, list_task_types},
    windows::{create_window, list_windows},
};

/// API应用状态
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<TaskTypeRegistry>,
    pub windows: WindowCollection,
    pub task_types: TaskTypeCollection,
}

impl AppState {
    pub fn new(registry: Arc<TaskTypeRegistry>, store: Arc<dyn DocumentStore>) -> Self {
        let codec = WindowCodec::new(Arc::clone(&registry));
        Self {
            windows: WindowCollection::new(Arc::clone(&store), codec),
            task_types: TaskTypeCollection::new(store),
            registry,
        }
    }
}

/// 创建API路由
///
/// 每个已注册的任务类型对应一个创建路由，路由持有该类型的编译模式。
pub fn create_routes(state: AppState) -> Router {
    let mut router = Router::new()
        // 健康检查
        .route("/health", get(health_check))
        // 窗口
        .route("/windows", get(list_windows))
        // 任务类型
        .route("/task_types", get(list_task_types).post(create_task_type))
        .route("/task_types/{name}", get(get_task_type));

    for entry in state.registry.all() {
        let path = format!("/windows/{}/create", entry.name());
        debug!("生成窗口创建路由: POST {}", path);
        router = router.route(
            &path,
            post(create_window).layer(Extension(Arc::clone(&entry.schema))),
        );
    }

    router.with_state(state)
}
