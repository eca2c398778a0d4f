use std::time::Duration;

use super::{ConfigError, cli::CliConfig, file::FileConfig, types::LogLevel};
use crate::{address::Address, net::Mode, net::socket::DEFAULT_TIMEOUT};

// -----------------------------------------------------------------------------
// ----- Config ----------------------------------------------------------------

/// Resolved settings for one client session.
#[derive(Clone, Debug)]
pub struct Config {
    pub address: Address,
    pub mode: Mode,
    pub timeout: Duration,
    pub send: Vec<String>,
    pub until: Option<String>,
    pub log_level: LogLevel,
}

// -----------------------------------------------------------------------------
// ----- Config: Static --------------------------------------------------------

impl Config {
    /// CLI and environment first, then the config file, then defaults.
    pub fn from_args() -> Result<Config, ConfigError> {
        Self::from_cli(CliConfig::from_args())
    }

    pub fn from_cli(cli: CliConfig) -> Result<Config, ConfigError> {
        let file = match cli.config_file_location.as_deref() {
            Some(path) => FileConfig::from_file(path)?,
            None => FileConfig::default(),
        };

        Self::merge(cli, file)
    }
}

// -----------------------------------------------------------------------------
// ----- Config: Private -------------------------------------------------------

impl Config {
    fn merge(cli: CliConfig, file: FileConfig) -> Result<Config, ConfigError> {
        let raw_address = cli
            .address
            .or(file.connection.address)
            .ok_or(ConfigError::MissingField("address"))?;
        let address = Address::parse(&raw_address).map_err(ConfigError::Address)?;

        let send = if cli.send.is_empty() {
            file.session.send
        } else {
            cli.send
        };

        Ok(Config {
            address,
            mode: cli.mode.or(file.connection.mode).unwrap_or_default(),
            timeout: cli
                .timeout
                .or(file.connection.timeout)
                .unwrap_or(DEFAULT_TIMEOUT),
            send,
            until: cli.until.or(file.session.until),
            log_level: cli.log_level.or(file.log_level).unwrap_or_default(),
        })
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
