use crate::humanize::ByteSize;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub workers: WorkersConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub hub: HubConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
}

/// HTTP/WebSocket listener
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    /// Largest accepted submission body
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: ByteSize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8000))
}

fn default_max_body_bytes() -> ByteSize {
    ByteSize(64 * 1024)
}

/// Download worker pool
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkersConfig {
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    /// Destination used when a submission names no folder
    #[serde(default = "default_folder")]
    pub default_folder: PathBuf,
    /// How long shutdown waits for workers to drain the queue
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            pool_size: default_pool_size(),
            default_folder: default_folder(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

fn default_pool_size() -> usize {
    3
}

fn default_folder() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_shutdown_grace_secs() -> u64 {
    10
}

/// Which download backend the workers drive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetcherKind {
    #[default]
    Ytdlp,
    Http,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetcherConfig {
    #[serde(default)]
    pub kind: FetcherKind,
    /// Executable for the `ytdlp` kind
    #[serde(default = "default_program")]
    pub program: String,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_retries")]
    pub fragment_retries: u32,
    #[serde(default = "default_socket_timeout_secs")]
    pub socket_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Read buffer for the `http` kind
    #[serde(default = "default_chunk_size")]
    pub chunk_size: ByteSize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            kind: FetcherKind::default(),
            program: default_program(),
            format: default_format(),
            retries: default_retries(),
            fragment_retries: default_retries(),
            socket_timeout_secs: default_socket_timeout_secs(),
            user_agent: default_user_agent(),
            chunk_size: default_chunk_size(),
        }
    }
}

fn default_program() -> String {
    "yt-dlp".to_string()
}

fn default_format() -> String {
    "best[height<=720]".to_string()
}

fn default_retries() -> u32 {
    10
}

fn default_socket_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("fetchcast/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_chunk_size() -> ByteSize {
    ByteSize(64 * 1024)
}

/// Subscriber fan-out
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HubConfig {
    /// Text of the confirmation sent to every new subscriber
    #[serde(default = "default_connected_message")]
    pub connected_message: String,
    /// A subscriber that takes longer than this to accept a frame is dropped
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            connected_message: default_connected_message(),
            send_timeout_secs: default_send_timeout_secs(),
        }
    }
}

fn default_send_timeout_secs() -> u64 {
    5
}

fn default_connected_message() -> String {
    "Connected to download server".to_string()
}

/// In-memory job ledger
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LedgerConfig {
    #[serde(default = "default_max_records")]
    pub max_records: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_records: default_max_records(),
        }
    }
}

fn default_max_records() -> usize {
    1000
}
