//! # Graft Core Kernel Errors
//!
//! [`Error`] is what hosts see. Plugin system failures arrive typed through
//! [`Error::PluginSystem`]; everything else a host may want to fold in
//! (configuration, batch files) goes through [`Error::Config`] or
//! [`Error::Other`].
use std::path::PathBuf;
use std::result::Result as StdResult;

use thiserror::Error as ThisError;

use crate::plugin_system::error::PluginSystemError;

#[derive(Debug, ThisError)]
pub enum Error {
    /// Specific, typed plugin system error
    #[error("Plugin system error: {0}")]
    PluginSystem(#[from] PluginSystemError),

    /// Host configuration or batch description could not be used
    #[error("Configuration error in '{}': {message}", path.display())]
    Config {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Generic error with message
    #[error("Error: {0}")]
    Other(String),
}

/// Shorthand for Result with our Error type
pub type Result<T> = StdResult<T, Error>;

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl Error {
    pub fn config(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::Config {
            path: path.into(),
            message: message.into(),
            source: Some(source.into()),
        }
    }
}
