//! Settings for the `sockless` binary: command line, environment and an
//! optional TOML file.

#[allow(clippy::module_inception)]
mod config;

pub mod cli;
pub mod file;
pub mod types;

use std::path::PathBuf;

use thiserror::Error;

use crate::errors::SocklessError;

pub use cli::CliConfig;
pub use config::Config;
pub use file::FileConfig;
pub use types::LogLevel;

// -----------------------------------------------------------------------------
// ----- Errors ----------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting '{0}' (pass it on the command line or in [connection])")]
    MissingField(&'static str),

    #[error("{0}")]
    Address(#[source] SocklessError),

    #[error("read error for {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("toml parse error: {source}")]
    Toml { source: toml::de::Error },
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
