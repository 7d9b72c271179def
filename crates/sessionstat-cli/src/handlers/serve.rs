use crate::server::{self, AppState};
use anyhow::{Context, Result};
use sessionstat_runtime::{Config, Pipeline, RegistrarService, SystemClock};
use std::sync::Arc;

pub fn handle(config: Config) -> Result<()> {
    config.validate()?;

    let service = RegistrarService::start(config.service_config(), Arc::new(SystemClock))?;
    let pipeline = Pipeline::start(config.pipeline_config(), service.handle())?;
    let state = AppState::new(service.handle(), pipeline.handle());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build async runtime")?;

    runtime.block_on(async {
        let server = server::start(&config.listen_address, state).await?;
        tracing::info!(
            address = %server.local_addr(),
            retention_secs = config.retention_secs,
            buffer_capacity = config.buffer_capacity,
            "sessionstat listening"
        );
        eprintln!("Listening on http://{}", server.local_addr());

        tokio::signal::ctrl_c()
            .await
            .context("failed to listen for shutdown signal")?;
        tracing::info!("shutdown requested");

        server.shutdown().await
    })?;

    // Transport first, then the correlator, then the registrar it feeds.
    pipeline.shutdown()?;
    service.shutdown()?;
    tracing::info!("sessionstat stopped");
    Ok(())
}
