use super::models::{Config, FetcherKind};
use thiserror::Error;

pub const MAX_POOL_SIZE: usize = 64;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("workers.pool_size must be between 1 and 64, got {0}")]
    InvalidPoolSize(usize),

    #[error("workers.default_folder must not be empty")]
    EmptyDefaultFolder,

    #[error("fetcher.program must be set when fetcher.kind is 'ytdlp'")]
    MissingFetcherProgram,

    #[error("{field} must be positive")]
    NonPositive { field: &'static str },
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_workers(config)?;
    validate_fetcher(config)?;
    validate_limits(config)?;
    Ok(())
}

fn validate_workers(config: &Config) -> Result<(), ValidationError> {
    let workers = &config.workers;
    if !(1..=MAX_POOL_SIZE).contains(&workers.pool_size) {
        return Err(ValidationError::InvalidPoolSize(workers.pool_size));
    }
    if workers.default_folder.as_os_str().is_empty() {
        return Err(ValidationError::EmptyDefaultFolder);
    }
    Ok(())
}

fn validate_fetcher(config: &Config) -> Result<(), ValidationError> {
    let fetcher = &config.fetcher;
    if fetcher.kind == FetcherKind::Ytdlp && fetcher.program.trim().is_empty() {
        return Err(ValidationError::MissingFetcherProgram);
    }
    if fetcher.socket_timeout_secs == 0 {
        return Err(ValidationError::NonPositive {
            field: "fetcher.socket_timeout_secs",
        });
    }
    if fetcher.chunk_size.as_u64() == 0 {
        return Err(ValidationError::NonPositive {
            field: "fetcher.chunk_size",
        });
    }
    Ok(())
}

fn validate_limits(config: &Config) -> Result<(), ValidationError> {
    if config.server.max_body_bytes.as_u64() == 0 {
        return Err(ValidationError::NonPositive {
            field: "server.max_body_bytes",
        });
    }
    if config.hub.send_timeout_secs == 0 {
        return Err(ValidationError::NonPositive {
            field: "hub.send_timeout_secs",
        });
    }
    if config.ledger.max_records == 0 {
        return Err(ValidationError::NonPositive {
            field: "ledger.max_records",
        });
    }
    Ok(())
}
