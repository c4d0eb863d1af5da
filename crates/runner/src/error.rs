//! Runner errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Engine error: {0}")]
    Engine(#[from] tradecost_engine::Error),

    #[error("Failed to read feed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("{0}")]
    Usage(String),
}

pub type Result<T> = std::result::Result<T, RunnerError>;
