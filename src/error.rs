//! Crate-wide error taxonomy.
//!
//! Client-caused failures (malformed request, missing file, ...) never reach
//! this type: they are mapped to an HTTP status inside the session loop and
//! never propagate as a [`ServerError`]. This enum only carries the
//! operational failures of [`ERROR HANDLING DESIGN §7`](crate) — config,
//! bind, and unrecoverable connection IO.

use std::{io, path::PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to bind listener on port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Failures while loading and validating the `KEY=VALUE` config file.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("cannot read config file {path:?}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("missing required key {0}")]
    MissingKey(&'static str),

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("too many VHOST_ entries (max 10)")]
    TooManyVhosts,

    #[error("duplicate vhost hostname {0:?}")]
    DuplicateVhost(String),
}
