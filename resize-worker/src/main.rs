use resize_worker::health;
use resize_worker::types::environment::Environment;
use resize_worker::worker::ResizeWorker;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = Environment::from_env();

    match env {
        Environment::Production | Environment::Staging => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(EnvFilter::from_default_env())
                .init();
        }
        Environment::Development => {
            tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::from_default_env())
                .init();
        }
    }

    info!("Starting resize worker in {:?} environment", env);

    let worker = ResizeWorker::new(env).await.inspect_err(|e| {
        error!("Failed to create worker: {}", e);
    })?;

    // Single shutdown token for everything
    let shutdown_token = worker.shutdown_token();

    let health_shutdown = shutdown_token.clone();
    tokio::spawn(async move {
        if let Err(e) = health::start_health_server(health_shutdown).await {
            error!("Health server error: {}", e);
        }
    });

    let signal_shutdown = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Received shutdown signal, initiating graceful shutdown...");
        signal_shutdown.cancel();
    });

    if let Err(e) = worker.start().await {
        error!("Worker error: {}", e);
        return Err(e);
    }

    info!("Resize worker stopped");
    Ok(())
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
