mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use fetchcast::server;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Server(args) => {
            let mut config = server::load_config(args.config)?;
            if let Some(address) = args.address {
                config.server.bind_addr = address;
            }
            if let Some(workers) = args.workers {
                config.workers.pool_size = workers;
            }
            config.validate()?;

            server::run(config).await?;
        }
    }

    Ok(())
}
