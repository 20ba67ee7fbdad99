//! Plain HTTP(S) fetcher for direct file URLs.

use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use reqwest::Url;
use reqwest::blocking::Client;
use tracing::{debug, warn};

use super::{FetchError, FetchRequest, Fetcher, HookStatus, resolve_template};
use crate::config::FetcherConfig;
use crate::humanize::{estimate_eta, format_percent, format_speed};

const DEFAULT_EXTENSION: &str = "bin";
const MAX_BACKOFF: Duration = Duration::from_secs(30);

pub type Result<T> = std::result::Result<T, FetchError>;

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    pub user_agent: String,
    pub chunk_size: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            user_agent: concat!("fetchcast/", env!("CARGO_PKG_VERSION")).to_string(),
            chunk_size: 64 * 1024,
        }
    }
}

impl From<&FetcherConfig> for HttpConfig {
    fn from(config: &FetcherConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(config.socket_timeout_secs),
            user_agent: config.user_agent.clone(),
            chunk_size: config.chunk_size.as_usize().max(1),
        }
    }
}

/// Streams a URL straight to disk with a blocking client.
pub struct HttpFetcher {
    client: Client,
    config: HttpConfig,
}

impl HttpFetcher {
    pub fn new(config: HttpConfig) -> Result<Self> {
        // No overall timeout: large bodies may legitimately take hours.
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(None::<Duration>)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| FetchError::RequestFailed(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn download_once(
        &self,
        url: &Url,
        request: &FetchRequest,
        hook: &mut dyn FnMut(HookStatus),
    ) -> Result<PathBuf> {
        debug!(%url, "Starting download");

        let mut response = self.client.get(url.clone()).send().map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                code: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let total = response.content_length();
        let path = resolve_template(&request.output_template, &extension_of(url));
        let mut file = File::create(&path)?;

        let started = Instant::now();
        let mut buf = vec![0u8; self.config.chunk_size];
        let mut done: u64 = 0;
        let mut last_reported_pct: Option<u64> = None;

        loop {
            let n = response
                .read(&mut buf)
                .map_err(|e| FetchError::RequestFailed(format!("Failed to read body: {e}")))?;
            if n == 0 {
                break;
            }
            file.write_all(&buf[..n])?;
            done += n as u64;

            // Report at most once per whole percent when the size is known.
            let pct = total.map(|t| done.saturating_mul(100) / t.max(1));
            if pct.is_none() || pct != last_reported_pct {
                last_reported_pct = pct;
                let rate = done as f64 / started.elapsed().as_secs_f64().max(0.001);
                hook(HookStatus::Downloading {
                    percent: format_percent(done, total),
                    speed: format_speed(rate),
                    eta: estimate_eta(done, total, rate),
                });
            }
        }

        file.flush()?;
        debug!(%url, size = done, path = %path.display(), "Download completed");
        Ok(path)
    }
}

impl Fetcher for HttpFetcher {
    fn name(&self) -> &'static str {
        "http"
    }

    fn fetch(
        &self,
        request: &FetchRequest,
        hook: &mut dyn FnMut(HookStatus),
    ) -> Result<()> {
        let url = parse_url(&request.url)?;
        let max_attempts = request.options.retries.max(1);
        let mut attempts = 0;

        loop {
            attempts += 1;

            match self.download_once(&url, request, hook) {
                Ok(_) => {
                    if attempts > 1 {
                        debug!(%url, attempts, "Download succeeded after retry");
                    }
                    hook(HookStatus::Finished);
                    return Ok(());
                }
                Err(e) => {
                    if attempts >= max_attempts || e.is_permanent() {
                        warn!(%url, attempts, error = %e, "Download failed");
                        return Err(e);
                    }

                    warn!(%url, attempts, error = %e, "Download failed, retrying");

                    // Exponential backoff: 1s, 2s, 4s, ... capped.
                    let backoff = Duration::from_secs(1u64 << (attempts - 1).min(5));
                    thread::sleep(backoff.min(MAX_BACKOFF));
                }
            }
        }
    }
}

fn parse_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| FetchError::InvalidUrl(format!("{raw}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(FetchError::InvalidUrl(format!(
            "unsupported scheme '{other}'"
        ))),
    }
}

/// File extension from the last path segment, or `bin`.
fn extension_of(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .filter(|ext| {
            !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_http_config_defaults() {
        let config = HttpConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert_eq!(config.chunk_size, 64 * 1024);
        assert!(config.user_agent.starts_with("fetchcast/"));
    }

    #[test]
    fn test_extension_from_url() {
        let ext = |s: &str| extension_of(&Url::parse(s).unwrap());
        assert_eq!(ext("https://cdn.example.com/media/clip.MP4"), "mp4");
        assert_eq!(ext("https://cdn.example.com/media/clip.mp4?sig=abc"), "mp4");
        assert_eq!(ext("https://cdn.example.com/media/clip"), "bin");
        assert_eq!(ext("https://cdn.example.com/"), "bin");
        assert_eq!(ext("https://cdn.example.com/a.tar.gz"), "gz");
        assert_eq!(ext("https://cdn.example.com/weird.ex-t"), "bin");
    }

    /// Answers every request with `status_line` and counts the requests.
    fn serve_status(status_line: &'static str) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf);
                counter.fetch_add(1, Ordering::SeqCst);
                let _ = write!(
                    stream,
                    "HTTP/1.1 {status_line}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                );
            }
        });

        (format!("http://{addr}/missing.mp4"), hits)
    }

    fn request_for(url: String, dir: &std::path::Path, retries: u32) -> FetchRequest {
        FetchRequest {
            url,
            output_template: crate::fetch::output_template(dir, "clip"),
            options: crate::fetch::FetchOptions {
                format: String::new(),
                retries,
                fragment_retries: retries,
                socket_timeout: Duration::from_secs(5),
            },
        }
    }

    #[test]
    fn test_not_found_fails_without_retry() {
        let (url, hits) = serve_status("404 Not Found");
        let dir = tempfile::TempDir::new().unwrap();
        let fetcher = HttpFetcher::new(HttpConfig::default()).unwrap();

        let started = Instant::now();
        let result = fetcher.fetch(&request_for(url, dir.path(), 4), &mut |_| {});

        match result {
            Err(FetchError::Status { code, .. }) => assert_eq!(code, 404),
            other => panic!("expected 404 status error, got {other:?}"),
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_server_errors_are_retried() {
        let (url, hits) = serve_status("503 Service Unavailable");
        let dir = tempfile::TempDir::new().unwrap();
        let fetcher = HttpFetcher::new(HttpConfig::default()).unwrap();

        let result = fetcher.fetch(&request_for(url, dir.path(), 2), &mut |_| {});

        assert!(matches!(result, Err(FetchError::Status { code: 503, .. })));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_permanent_status_codes() {
        let status = |code| FetchError::Status {
            code,
            reason: String::new(),
        };
        assert!(status(403).is_permanent());
        assert!(status(404).is_permanent());
        assert!(status(410).is_permanent());
        assert!(!status(408).is_permanent());
        assert!(!status(429).is_permanent());
        assert!(!status(500).is_permanent());
        assert!(!FetchError::Timeout.is_permanent());
    }

    #[test]
    fn test_rejects_non_http_urls() {
        assert!(matches!(parse_url("ftp://example.com/f"), Err(FetchError::InvalidUrl(_))));
        assert!(matches!(parse_url("not a url"), Err(FetchError::InvalidUrl(_))));
        assert!(parse_url("https://example.com/f").is_ok());
    }
}
