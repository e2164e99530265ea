use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use unmixer::application::services::{SeparationService, StorageOptions};
use unmixer::infrastructure::audio::{SymphoniaDecoder, WavEncoder};
use unmixer::infrastructure::observability::{TracingConfig, init_tracing};
use unmixer::infrastructure::separation::UnmixModelLoader;
use unmixer::presentation::{AppState, Environment, Settings, create_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let environment = Environment::from_env().map_err(anyhow::Error::msg)?;
    let settings = Settings::load(environment).context("Failed to load settings")?;

    init_tracing(
        &TracingConfig::from_settings(environment, &settings.logging),
        settings.server.port,
    );

    std::fs::create_dir_all(&settings.storage.upload_dir)
        .with_context(|| format!("creating {}", settings.storage.upload_dir.display()))?;
    std::fs::create_dir_all(&settings.storage.output_dir)
        .with_context(|| format!("creating {}", settings.storage.output_dir.display()))?;

    let model_settings = settings.model.clone();
    let separation_settings = settings.separation.clone();
    let registry = tokio::task::spawn_blocking(move || {
        UnmixModelLoader::load_registry(&model_settings, &separation_settings)
    })
    .await?
    .context("Failed to load separation models")?;

    tracing::info!(targets = ?registry.targets(), "Models ready");

    let separation_service = Arc::new(SeparationService::new(
        registry,
        Arc::new(SymphoniaDecoder),
        Arc::new(WavEncoder),
        StorageOptions {
            upload_dir: settings.storage.upload_dir.clone(),
            output_dir: settings.storage.output_dir.clone(),
            persist_output: settings.storage.persist_output,
        },
        settings.separation.max_concurrent_jobs,
    ));

    let state = AppState {
        separation_service,
        max_upload_bytes: settings.server.max_upload_bytes(),
    };

    let router = create_router(state);

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .context("Invalid server address")?;
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
