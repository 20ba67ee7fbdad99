#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use fetchcast::config::Config;
use fetchcast::fetch::{FetchError, FetchRequest, Fetcher, HookStatus};
use fetchcast::server::Service;

/// Reports one 50% tick, then succeeds unless the URL contains "fail".
pub struct FakeFetcher {
    pub delay: Duration,
}

impl Fetcher for FakeFetcher {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn fetch(
        &self,
        request: &FetchRequest,
        hook: &mut dyn FnMut(HookStatus),
    ) -> Result<(), FetchError> {
        hook(HookStatus::Downloading {
            percent: "50.0%".into(),
            speed: "1.00MiB/s".into(),
            eta: "00:01".into(),
        });
        std::thread::sleep(self.delay);

        if request.url.contains("fail") {
            return Err(FetchError::RequestFailed("HTTP 404: Not Found".into()));
        }
        hook(HookStatus::Finished);
        Ok(())
    }
}

pub fn test_config(downloads: &Path, pool_size: usize) -> Config {
    let mut config = Config::default();
    config.workers.pool_size = pool_size;
    config.workers.default_folder = downloads.to_path_buf();
    config.workers.shutdown_grace_secs = 5;
    config
}

pub fn start_service(downloads: &Path, pool_size: usize) -> Service {
    let fetcher = Arc::new(FakeFetcher {
        delay: Duration::from_millis(10),
    });
    Service::start(test_config(downloads, pool_size), fetcher).expect("service starts")
}
