use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "fetchcast")]
#[command(about = "Download job server with live WebSocket progress", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP/WebSocket server and the worker pool
    Server(ServerArgs),
}

#[derive(clap::Args, Debug)]
pub struct ServerArgs {
    /// Address to bind the HTTP server to (overrides server.bind_addr)
    #[arg(long)]
    pub address: Option<SocketAddr>,

    /// Number of worker threads (overrides workers.pool_size)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Path to a TOML configuration file (default: $FETCHCAST_CONFIG or config/fetchcast.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,
}
