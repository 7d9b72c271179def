//! HTTP transport over the event pipeline and the registrar.

mod routes;

use anyhow::{Context, Result};
use axum::Router;
use axum::routing::{get, post};
use sessionstat_runtime::{PipelineHandle, RegistrarHandle};
use std::net::SocketAddr;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub use routes::{ingest_status, query_status};

#[derive(Clone)]
pub struct AppState {
    registrar: RegistrarHandle,
    events: PipelineHandle,
}

impl AppState {
    pub fn new(registrar: RegistrarHandle, events: PipelineHandle) -> Self {
        Self { registrar, events }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/sessionStarted", post(routes::session_started))
        .route("/sessionEnded", post(routes::session_ended))
        .route("/meanTime", get(routes::mean_time))
        .route("/medianTime", get(routes::median_time))
        .route("/health", get(routes::health))
        .with_state(state)
}

pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<std::io::Result<()>>,
}

impl ServerHandle {
    /// Address actually bound; differs from the requested one for port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting connections and waits for in-flight requests.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.task
            .await
            .context("server task panicked")?
            .context("server terminated with an error")
    }
}

/// Binds `listen` and serves in a background task. Must be called inside a
/// tokio runtime.
pub async fn start(listen: &str, state: AppState) -> Result<ServerHandle> {
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("failed to bind {}", listen))?;
    let local_addr = listener.local_addr()?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let app = router(state);

    let task = tokio::spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await;
        if let Err(err) = &result {
            tracing::error!(error = %err, "http server error");
        }
        result
    });

    Ok(ServerHandle {
        local_addr,
        shutdown_tx: Some(shutdown_tx),
        task,
    })
}
