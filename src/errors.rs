// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StepdagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Malformed plan: {0}")]
    MalformedPlan(String),

    #[error("Worker count must be at least 1")]
    NoWorkers,

    #[error("Mailbox '{0}' closed unexpectedly")]
    MailboxClosed(&'static str),

    #[error("Worker thread panicked: {0}")]
    WorkerPanicked(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, StepdagError>;
