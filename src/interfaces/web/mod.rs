pub(crate) mod auth;
mod handlers;
mod response;
mod router;

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::{broadcast, oneshot};
use tokio_stream::Stream;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{error, info};

use crate::core::config::LayeredConfig;
use crate::core::keepalive::KeepaliveOrchestrator;
use crate::core::keepalive::scheduler::KeepaliveScheduler;
use crate::core::lifecycle::LifecycleComponent;
use crate::core::store::Store;

pub use router::build_api_router;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) orchestrator: Arc<KeepaliveOrchestrator>,
    pub(crate) store: Arc<Store>,
    pub(crate) config: Arc<LayeredConfig>,
    pub(crate) scheduler: Arc<KeepaliveScheduler>,
    pub(crate) log_tx: broadcast::Sender<String>,
    pub(crate) api_host: String,
    pub(crate) api_port: u16,
    pub(crate) admin_token: Option<String>,
}

pub struct ApiServerConfig {
    pub orchestrator: Arc<KeepaliveOrchestrator>,
    pub store: Arc<Store>,
    pub config: Arc<LayeredConfig>,
    pub scheduler: Arc<KeepaliveScheduler>,
    pub log_tx: broadcast::Sender<String>,
    pub api_host: String,
    pub api_port: u16,
    pub admin_token: Option<String>,
}

/// Admin HTTP API as a lifecycle component.
pub struct ApiServer {
    state: AppState,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl ApiServer {
    pub fn new(config: ApiServerConfig) -> Self {
        Self {
            state: AppState {
                orchestrator: config.orchestrator,
                store: config.store,
                config: config.config,
                scheduler: config.scheduler,
                log_tx: config.log_tx,
                api_host: config.api_host,
                api_port: config.api_port,
                admin_token: config.admin_token.filter(|t| !t.trim().is_empty()),
            },
            shutdown_tx: None,
        }
    }
}

async fn sse_logs_endpoint(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.log_tx.subscribe();
    let stream = BroadcastStream::new(receiver).map(|msg| match msg {
        Ok(line) => Ok(Event::default().data(line)),
        Err(_) => Ok(Event::default().data("Log stream lagged")),
    });
    Sse::new(stream)
}

#[async_trait]
impl LifecycleComponent for ApiServer {
    fn name(&self) -> &str {
        "api-server"
    }

    async fn on_init(&mut self) -> Result<()> {
        if self.state.admin_token.is_none() && !auth::is_loopback_host(&self.state.api_host) {
            tracing::warn!(
                "No admin_token configured while binding {}; API requests will be rejected",
                self.state.api_host
            );
        }
        Ok(())
    }

    async fn on_start(&mut self) -> Result<()> {
        let addr = format!("{}:{}", self.state.api_host, self.state.api_port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind API server on {}", addr))?;
        let app = build_api_router(self.state.clone());
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        self.shutdown_tx = Some(shutdown_tx);

        info!("API Server running at http://{addr}");
        tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            });
            if let Err(e) = server.await {
                error!("API Server crashed: {}", e);
            }
        });
        Ok(())
    }

    async fn on_shutdown(&mut self) -> Result<()> {
        info!("API Server shutting down...");
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        Ok(())
    }
}
