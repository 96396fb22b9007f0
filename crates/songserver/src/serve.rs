//! Server startup and shutdown.

use std::future::Future;

use anyhow::{Context, Result};
use songconf::SongConfig;
use songgen::Generator;
use tokio::net::TcpListener;
use tracing::info;

use crate::web::{router, AppState};

/// Load the corpus, train the model, bind and serve until Ctrl-C or SIGTERM.
pub async fn run(config: SongConfig) -> Result<()> {
    let generation = config.generation.clone();
    let generator = tokio::task::spawn_blocking(move || Generator::from_config(&generation))
        .await
        .context("Model loading task failed")?
        .with_context(|| {
            format!(
                "Failed to load corpus {}",
                config.generation.corpus_file.display()
            )
        })?;

    info!(
        model = generator.model_name(),
        tokens = generator.corpus().len(),
        pitch_vocab = generator.corpus().pitch_vocab.len(),
        dur_vocab = generator.corpus().dur_vocab.len(),
        "model ready"
    );

    let addr = config.infra.bind.socket_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let state = AppState::new(generator, config.generation.output_file.clone());
    serve(listener, state, shutdown_signal()).await?;

    info!("Shutdown complete");
    Ok(())
}

/// Serve the routes on an already bound listener until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr().context("Listener has no local address")?;
    info!("Song server ready");
    info!("   Player: GET http://{}/", addr);
    info!("   Generate: GET http://{}/generate-midi", addr);
    info!("   Health: GET http://{}/health", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("Server error")
}

async fn shutdown_signal() {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received SIGINT, shutting down...");
        }
        _ = terminate() => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            tracing::warn!(error = %e, "SIGTERM handler unavailable");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
