//! Error types for the vmbatch command line

use thiserror::Error;
use vmbatch_core::{CoreError, ParseError, RemoteError};

/// Fatal errors that stop the batch before any provisioning
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid flags or environment
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The input file could not be parsed
    #[error("Input error: {0}")]
    InputError(#[from] ParseError),

    /// The engine could not be reached or refused the session
    #[error("Connection error: {0}")]
    ConnectionError(#[from] RemoteError),

    /// Error raised by the batch runtime
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for the command line
pub type CliResult<T> = Result<T, CliError>;
