use std::sync::Arc;

use crate::config::Config;
use crate::hub::BroadcastHub;
use crate::orchestrator::DownloadService;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub service: Arc<DownloadService>,
}

impl AppState {
    pub fn new(config: Config, service: Arc<DownloadService>) -> Self {
        Self {
            config: Arc::new(config),
            service,
        }
    }

    pub fn hub(&self) -> &Arc<BroadcastHub> {
        self.service.hub()
    }
}
