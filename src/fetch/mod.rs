//! Download collaborators.
//!
//! A [`Fetcher`] performs one blocking download on the calling worker thread
//! and reports progress through a hook closure. The core never looks inside
//! a fetcher; it only sees the hook calls and the final result.

pub mod http;
pub mod ytdlp;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::{FetcherConfig, FetcherKind};

pub use http::{HttpConfig, HttpFetcher};
pub use ytdlp::YtDlpFetcher;

/// Placeholder in an output template that the fetcher replaces with the
/// final file extension.
pub const EXT_PLACEHOLDER: &str = "%(ext)s";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to start fetcher: {0}")]
    Spawn(String),

    #[error("Fetcher exited with status {code:?}: {detail}")]
    Exited { code: Option<i32>, detail: String },

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("HTTP {code}: {reason}")]
    Status { code: u16, reason: String },

    #[error("Connection timeout")]
    Timeout,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Fetcher panicked: {0}")]
    Panicked(String),
}

impl FetchError {
    /// Errors that another attempt cannot fix: bad input, local disk
    /// failures and client-error responses other than 408 and 429.
    pub fn is_permanent(&self) -> bool {
        match self {
            FetchError::InvalidUrl(_) | FetchError::Io(_) => true,
            FetchError::Status { code, .. } => {
                (400..500).contains(code) && *code != 408 && *code != 429
            }
            _ => false,
        }
    }
}

/// Status passed to the progress hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookStatus {
    Downloading {
        percent: String,
        speed: String,
        eta: String,
    },
    Finished,
}

/// Tuning knobs forwarded to the fetcher on every request.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub format: String,
    pub retries: u32,
    pub fragment_retries: u32,
    pub socket_timeout: Duration,
}

impl From<&FetcherConfig> for FetchOptions {
    fn from(config: &FetcherConfig) -> Self {
        Self {
            format: config.format.clone(),
            retries: config.retries,
            fragment_retries: config.fragment_retries,
            socket_timeout: Duration::from_secs(config.socket_timeout_secs),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub output_template: PathBuf,
    pub options: FetchOptions,
}

pub trait Fetcher: Send + Sync {
    fn name(&self) -> &'static str;

    /// Download `request.url`, calling `hook` zero or more times while the
    /// transfer runs. Blocks until the download has finished or failed.
    fn fetch(
        &self,
        request: &FetchRequest,
        hook: &mut dyn FnMut(HookStatus),
    ) -> Result<(), FetchError>;
}

/// `<dir>/<target_name>.%(ext)s`
pub fn output_template(dir: &Path, target_name: &str) -> PathBuf {
    dir.join(format!("{target_name}.{EXT_PLACEHOLDER}"))
}

/// Replace the extension placeholder of `template` with `ext`.
pub fn resolve_template(template: &Path, ext: &str) -> PathBuf {
    PathBuf::from(template.to_string_lossy().replace(EXT_PLACEHOLDER, ext))
}

/// Build the fetcher selected in configuration.
pub fn from_config(config: &FetcherConfig) -> Result<Arc<dyn Fetcher>, FetchError> {
    let fetcher: Arc<dyn Fetcher> = match config.kind {
        FetcherKind::Ytdlp => Arc::new(YtDlpFetcher::new(config.program.clone())),
        FetcherKind::Http => Arc::new(HttpFetcher::new(HttpConfig::from(config))?),
    };
    tracing::info!(fetcher = fetcher.name(), "Fetcher configured");
    Ok(fetcher)
}
