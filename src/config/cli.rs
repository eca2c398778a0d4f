use clap::Parser;
use std::{ffi::OsString, path::PathBuf, time::Duration};

use super::types::LogLevel;
use crate::net::Mode;

// -----------------------------------------------------------------------------
// ----- CliConfig -------------------------------------------------------------

/// Values given on the command line or through the environment.
/// Everything is optional here; `Config` fills the gaps from the file.
#[derive(Clone, Debug, Default)]
pub struct CliConfig {
    pub address: Option<String>,
    pub config_file_location: Option<PathBuf>,
    pub mode: Option<Mode>,
    pub timeout: Option<Duration>,
    pub send: Vec<String>,
    pub until: Option<String>,
    pub log_level: Option<LogLevel>,
}

impl CliConfig {
    /// Parse the process arguments; exits with usage on error.
    pub fn from_args() -> Self {
        Args::parse().into_cli_config()
    }

    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Ok(Args::try_parse_from(args)?.into_cli_config())
    }
}

// -----------------------------------------------------------------------------
// ----- Args ------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "sockless", version, about = "Line-oriented TCP client")]
struct Args {
    // host:port, e.g. irc.libera.chat:6667 or [::1]:6667.
    #[arg(env = "SOCKLESS_ADDRESS")]
    address: Option<String>,

    // Optional TOML file; CLI values win over it.
    #[arg(long = "config", short = 'c', env = "SOCKLESS_CONFIG_FILE")]
    config_file: Option<PathBuf>,

    // r, w or rw.
    #[arg(long = "mode", short = 'm')]
    mode: Option<Mode>,

    // Connect and I/O timeout, e.g. 30s or 1m. 0s disables it.
    #[arg(long = "timeout", short = 't', value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,

    // Sent in order with "\r\n" appended. Repeatable.
    #[arg(long = "send", short = 's')]
    send: Vec<String>,

    // Stop reading after the first line containing this text.
    #[arg(long = "until", short = 'u')]
    until: Option<String>,

    #[arg(long = "log", env = "SOCKLESS_LOG")]
    log_level: Option<LogLevel>,
}

impl Args {
    fn into_cli_config(self) -> CliConfig {
        CliConfig {
            address: self.address,
            config_file_location: self.config_file,
            mode: self.mode,
            timeout: self.timeout,
            send: self.send,
            until: self.until,
            log_level: self.log_level,
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
