//! Process wiring: builds every component, serves HTTP and drains the
//! worker pool on shutdown.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::api::{self, AppState};
use crate::config::Config;
use crate::fetch::{self, FetchError, FetchOptions, Fetcher};
use crate::hub::BroadcastHub;
use crate::ledger::JobLedger;
use crate::observability::Metrics;
use crate::orchestrator::DownloadService;
use crate::progress::ProgressBridge;
use crate::queue::JobQueue;
use crate::worker::{WorkerContext, WorkerError, WorkerPool};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to configure fetcher: {0}")]
    Fetcher(#[from] FetchError),

    #[error(transparent)]
    Worker(#[from] WorkerError),

    #[error("HTTP server error: {0}")]
    Io(#[from] std::io::Error),
}

/// All running components of one service instance.
pub struct Service {
    state: AppState,
    queue: Arc<JobQueue>,
    pool: WorkerPool,
    pump: JoinHandle<()>,
    grace: Duration,
}

impl Service {
    /// Wire hub, bridge, queue, ledger and workers around `fetcher`.
    ///
    /// Must be called inside a tokio runtime; the bridge pump is spawned on it.
    pub fn start(config: Config, fetcher: Arc<dyn Fetcher>) -> Result<Self, ServerError> {
        let metrics = Arc::new(Metrics::new());
        let hub = Arc::new(
            BroadcastHub::new(config.hub.connected_message.clone())
                .with_send_timeout(Duration::from_secs(config.hub.send_timeout_secs)),
        );
        let (bridge, receiver) = ProgressBridge::new();
        let pump = receiver.spawn(Arc::clone(&hub), Arc::clone(&metrics));

        let queue = Arc::new(JobQueue::new());
        let ledger = Arc::new(JobLedger::new(config.ledger.max_records));

        let ctx = WorkerContext {
            queue: Arc::clone(&queue),
            fetcher,
            bridge,
            ledger: Arc::clone(&ledger),
            metrics: Arc::clone(&metrics),
            options: FetchOptions::from(&config.fetcher),
        };
        let pool = WorkerPool::spawn(config.workers.pool_size, ctx)?;
        info!(workers = pool.size(), "Worker pool started");

        let service = Arc::new(DownloadService::new(
            Arc::clone(&queue),
            hub,
            ledger,
            metrics,
            pool.liveness(),
            config.workers.default_folder.clone(),
        ));

        let grace = Duration::from_secs(config.workers.shutdown_grace_secs);
        let state = AppState::new(config, service);

        Ok(Self {
            state,
            queue,
            pool,
            pump,
            grace,
        })
    }

    pub fn router(&self) -> Router {
        api::router(self.state.clone())
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Close the queue, let workers finish what is queued and wait for them
    /// up to the configured grace period.
    pub async fn shutdown(self) {
        self.queue.close();
        info!(
            pending = self.queue.depth(),
            grace_secs = self.grace.as_secs(),
            "Draining worker pool"
        );

        let pool = self.pool;
        let joined = tokio::task::spawn_blocking(move || pool.join());
        match tokio::time::timeout(self.grace, joined).await {
            Ok(Ok(())) => info!("Worker pool stopped"),
            Ok(Err(err)) => error!(error = %err, "Worker pool join failed"),
            Err(_) => warn!("Workers still running after grace period"),
        }

        // Every bridge sender is gone once the workers have exited, so the
        // pump ends after flushing what is left.
        let mut pump = self.pump;
        if tokio::time::timeout(Duration::from_secs(1), &mut pump)
            .await
            .is_err()
        {
            pump.abort();
        }
    }
}

/// Run the service until Ctrl-C or SIGTERM.
pub async fn run(config: Config) -> Result<(), ServerError> {
    let address = config.server.bind_addr;
    let fetcher = fetch::from_config(&config.fetcher)?;
    let service = Service::start(config, fetcher)?;

    let listener = TcpListener::bind(address).await?;
    info!(%address, "fetchcast listening");

    serve(listener, service.router(), shutdown_signal()).await?;

    service.shutdown().await;
    Ok(())
}

async fn serve(
    listener: TcpListener,
    app: Router,
    signal: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(signal)
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

/// Resolve the config path given on the command line, if any.
pub fn load_config(path: Option<PathBuf>) -> Result<Config, crate::config::ConfigError> {
    match path {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    }
}
