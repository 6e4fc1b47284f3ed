use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};
use tokio_cron_scheduler::JobScheduler;
use tracing::info;

use super::CliOptions;
use crate::core::adapters::AdapterRegistry;
use crate::core::config::{ConfigSource, LayeredConfig, Settings, env_overrides};
use crate::core::keepalive::KeepaliveOrchestrator;
use crate::core::keepalive::scheduler::{KeepaliveScheduler, SchedulerService};
use crate::core::lifecycle::LifecycleManager;
use crate::core::store::{LogSink, Store, TaskStore};
use crate::core::tasks::TaskRegistry;
use crate::core::terminal::{self, print_link, print_status};
use crate::interfaces::web::{ApiServer, ApiServerConfig};
use crate::logging;

/// Everything one process needs to run keepalive calls.
pub(crate) struct Runtime {
    pub settings: Settings,
    pub store: Arc<Store>,
    pub config: Arc<LayeredConfig>,
    pub orchestrator: Arc<KeepaliveOrchestrator>,
}

pub(crate) async fn bootstrap(options: &CliOptions) -> Result<Runtime> {
    let mut settings = Settings::load(options.config.as_deref())?;
    if let Some(db) = &options.db {
        settings.storage.database_path = Some(db.clone());
    }
    if let Some(host) = &options.api_host {
        settings.server.host = host.clone();
    }
    if let Some(port) = options.api_port {
        settings.server.port = port;
    }

    let db_path = settings.database_path();
    let store = Arc::new(
        Store::open(&db_path)
            .await
            .with_context(|| format!("opening database {}", db_path.display()))?,
    );
    info!("Using database {}", db_path.display());

    let config = Arc::new(LayeredConfig::new(
        Some(store.clone() as Arc<dyn ConfigSource>),
        settings.defaults.clone(),
    ));
    let overlay = env_overrides(std::env::vars());
    if !overlay.is_empty() {
        info!("Applying {} runtime override(s) from the environment", overlay.len());
    }
    config.extend_overrides(overlay);

    let adapters = AdapterRegistry::builtin(&settings, config.clone())?;
    let orchestrator = Arc::new(KeepaliveOrchestrator::new(
        TaskRegistry::new(store.clone() as Arc<dyn TaskStore>),
        Arc::new(adapters),
        config.clone(),
        store.clone() as Arc<dyn LogSink>,
    ));

    Ok(Runtime {
        settings,
        store,
        config,
        orchestrator,
    })
}

pub(crate) async fn run_serve(options: &CliOptions) -> Result<()> {
    let (log_tx, _) = broadcast::channel::<String>(500);
    logging::init_tracing(log_tx.clone(), logging::SERVE_LOG_FILTER, false);

    let runtime = bootstrap(options).await?;
    let scheduler = Arc::new(KeepaliveScheduler::new(
        JobScheduler::new().await?,
        runtime.orchestrator.clone(),
    ));

    let server = &runtime.settings.server;
    let api = ApiServer::new(ApiServerConfig {
        orchestrator: runtime.orchestrator.clone(),
        store: runtime.store.clone(),
        config: runtime.config.clone(),
        scheduler: scheduler.clone(),
        log_tx,
        api_host: server.host.clone(),
        api_port: server.port,
        admin_token: server.admin_token.clone(),
    });

    let mut lifecycle = LifecycleManager::new();
    lifecycle.attach(Arc::new(Mutex::new(SchedulerService::new(scheduler.clone()))));
    lifecycle.attach(Arc::new(Mutex::new(api)));
    lifecycle.start().await?;

    terminal::print_banner();
    print_link("Admin API", &format!("http://{}:{}/api", server.host, server.port));
    print_status(
        "Scheduled tasks",
        &scheduler.scheduled_codes().await.join(", "),
    );
    print_status("Stop", "Ctrl+C");

    tokio::signal::ctrl_c().await?;
    lifecycle.shutdown().await?;
    terminal::print_goodbye();
    Ok(())
}
