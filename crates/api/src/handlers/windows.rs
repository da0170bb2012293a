use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tasking_domain::{CompiledSchema, Window, WindowState};
use tasking_infrastructure::WindowListing;
use tracing::info;

use crate::{
    error::ApiResult,
    response::{created, success},
    routes::AppState,
};

/// 窗口查询参数
#[derive(Debug, Default, Deserialize)]
pub struct WindowQueryParams {
    pub task_type: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WindowFailureView {
    pub id: Option<String>,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct WindowListResponse {
    pub windows: Vec<Window>,
    pub failures: Vec<WindowFailureView>,
}

impl From<WindowListing> for WindowListResponse {
    fn from(listing: WindowListing) -> Self {
        Self {
            windows: listing.windows,
            failures: listing
                .failures
                .into_iter()
                .map(|failure| WindowFailureView {
                    id: failure.id,
                    error: failure.error.to_string(),
                })
                .collect(),
        }
    }
}

/// 创建窗口
///
/// 请求体是窗口参数，`task_type` 可以省略，提供时必须与路由一致。
pub async fn create_window(
    State(state): State<AppState>,
    Extension(schema): Extension<Arc<CompiledSchema>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(body) = payload?;
    let params = schema.validate(&body)?;
    let window = state.windows.insert_one(Window::new(params)).await?;

    info!(
        "窗口已创建: {} ({})",
        window.id.as_deref().unwrap_or_default(),
        window.task_type()
    );
    Ok(created(window))
}

/// 获取窗口列表
pub async fn list_windows(
    State(state): State<AppState>,
    Query(params): Query<WindowQueryParams>,
) -> ApiResult<impl IntoResponse> {
    let window_state = params
        .state
        .as_deref()
        .map(WindowState::from_str)
        .transpose()?;

    let listing = state
        .windows
        .find_by(params.task_type.as_deref(), window_state)
        .await?;

    Ok(success(WindowListResponse::from(listing)))
}
