use std::sync::Arc;

use futures::StreamExt;
use tasking_domain::{
    DocumentFilter, DocumentStore, Window, WindowCodec, WindowState, DISCRIMINATOR_PATH, ID_KEY,
    STATE_KEY,
};
use tasking_errors::{TaskingError, TaskingResult};
use tracing::{debug, instrument, warn};

/// 无法解码的窗口文档
#[derive(Debug, Clone, PartialEq)]
pub struct WindowFailure {
    pub id: Option<String>,
    pub error: TaskingError,
}

/// 列表结果：成功解码的窗口和逐条报告的失败
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowListing {
    pub windows: Vec<Window>,
    pub failures: Vec<WindowFailure>,
}

#[derive(Clone)]
pub struct WindowCollection {
    store: Arc<dyn DocumentStore>,
    codec: WindowCodec,
}

impl WindowCollection {
    pub const COLLECTION: &'static str = "windows";

    pub fn new(store: Arc<dyn DocumentStore>, codec: WindowCodec) -> Self {
        Self { store, codec }
    }

    pub fn codec(&self) -> &WindowCodec {
        &self.codec
    }

    /// 写入窗口，返回带有存储分配标识的窗口
    #[instrument(skip(self, window), fields(task_type = %window.task_type()))]
    pub async fn insert_one(&self, window: Window) -> TaskingResult<Window> {
        let mut document = self.codec.encode(&window);
        document.remove(ID_KEY);

        let id = self.store.insert_one(Self::COLLECTION, document).await?;
        debug!("窗口已创建: {}", id);
        Ok(window.with_id(id))
    }

    /// 查询并解码窗口，单条文档失败不影响其余结果
    #[instrument(skip(self))]
    pub async fn find(&self, filter: &DocumentFilter) -> TaskingResult<WindowListing> {
        filter.validate()?;

        let mut listing = WindowListing::default();
        let mut documents = self.store.find(Self::COLLECTION, filter);

        while let Some(item) = documents.next().await {
            match item {
                Ok(document) => match self.codec.decode(&document) {
                    Ok(window) => listing.windows.push(window),
                    Err(e) => {
                        let id = document
                            .get(ID_KEY)
                            .and_then(|v| v.as_str())
                            .map(str::to_string);
                        warn!("窗口文档 {:?} 解码失败: {}", id, e);
                        listing.failures.push(WindowFailure {
                            id,
                            error: e.into(),
                        });
                    }
                },
                Err(TaskingError::CorruptDocument { id, reason }) => {
                    let error = TaskingError::corrupt_document(id.clone(), reason);
                    warn!("窗口文档无法解析: {}", error);
                    listing.failures.push(WindowFailure {
                        id: Some(id),
                        error,
                    });
                }
                Err(e) => return Err(e),
            }
        }

        debug!(
            "查询到 {} 个窗口，{} 个解码失败",
            listing.windows.len(),
            listing.failures.len()
        );
        Ok(listing)
    }

    pub async fn find_all(&self) -> TaskingResult<WindowListing> {
        self.find(&DocumentFilter::new()).await
    }

    pub async fn find_by(
        &self,
        task_type: Option<&str>,
        state: Option<WindowState>,
    ) -> TaskingResult<WindowListing> {
        let mut filter = DocumentFilter::new();
        if let Some(task_type) = task_type {
            filter = filter.eq(DISCRIMINATOR_PATH, task_type);
        }
        if let Some(state) = state {
            filter = filter.eq(STATE_KEY, state.as_str());
        }
        self.find(&filter).await
    }
}
