//! Errors shared by the link queue and logging setup

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The link thread is gone or the queue was shut down
    #[error("Link closed: {0}")]
    LinkClosed(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
