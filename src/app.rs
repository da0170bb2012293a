use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tasking_api::{create_app, AppState};
use tasking_config::{AppConfig, TaskTypeSeed};
use tasking_domain::{DocumentStore, InitializationReport, TaskTypeRecord, TaskTypeRegistry};
use tasking_infrastructure::{register_types_from_db, DatabaseManager, TaskTypeCollection};
use tokio::{net::TcpListener, sync::broadcast};
use tracing::{info, warn};

/// 应用实例
///
/// 注册表在构造时一次性建好并冻结，之后只读共享给所有请求。
pub struct Application {
    config: AppConfig,
    database: DatabaseManager,
    registry: Arc<TaskTypeRegistry>,
    report: InitializationReport,
}

impl Application {
    pub async fn new(config: AppConfig) -> Result<Self> {
        info!("连接数据库: {}", config.database.url);
        let database = DatabaseManager::new(&config.database)
            .await
            .context("初始化数据库失败")?;

        let (registry, report) = build_registry(&config.task_types, &database).await?;
        if !report.is_clean() {
            warn!(
                "{} 个任务类型未能注册，对应窗口将无法创建或解码",
                report.rejected.len()
            );
        }

        Ok(Self {
            config,
            database,
            registry: Arc::new(registry),
            report,
        })
    }

    pub fn registry(&self) -> &Arc<TaskTypeRegistry> {
        &self.registry
    }

    pub fn report(&self) -> &InitializationReport {
        &self.report
    }

    pub fn router(&self) -> Router {
        let store: Arc<dyn DocumentStore> = Arc::new(self.database.document_store());
        let state = AppState::new(Arc::clone(&self.registry), store);
        create_app(state, &self.config.api)
    }

    /// 运行API服务器直到收到关闭信号
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        let bind_address = &self.config.api.bind_address;
        let listener = TcpListener::bind(bind_address)
            .await
            .with_context(|| format!("绑定地址失败: {bind_address}"))?;

        info!("API服务器启动在 http://{}", bind_address);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("API服务器收到关闭信号");
            })
            .await
            .context("API服务器运行失败")?;

        self.database.close().await;
        info!("API服务器已停止");
        Ok(())
    }
}

/// 先注册配置文件中的任务类型，再注册数据库中的记录，同名时后者覆盖前者
pub async fn build_registry(
    seeds: &[TaskTypeSeed],
    database: &DatabaseManager,
) -> Result<(TaskTypeRegistry, InitializationReport)> {
    let mut registry = TaskTypeRegistry::default();
    info!("可用扩展: {}", registry.catalog().names().join(", "));

    let mut report = registry.initialize(seeds.iter().map(seed_record));

    let task_types = TaskTypeCollection::new(Arc::new(database.document_store()));
    let persisted = register_types_from_db(&task_types, &mut registry)
        .await
        .context("加载持久化的任务类型失败")?;

    report.registered.extend(persisted.registered);
    report.rejected.extend(persisted.rejected);

    info!(
        "任务类型注册表就绪: {} 个可用 ({})",
        registry.len(),
        report.registered.join(", ")
    );
    Ok((registry, report))
}

fn seed_record(seed: &TaskTypeSeed) -> TaskTypeRecord {
    let mut record = TaskTypeRecord::new(seed.name.clone());
    record.extensions = seed.extensions.clone();
    record
}
