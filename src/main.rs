use std::io::{self, Write};
use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

use sockless::{Config, Socket, SocklessError};

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

const APP_NAME: &str = "sockless";

// -----------------------------------------------------------------------------
// ----- Main ------------------------------------------------------------------

fn main() -> ExitCode {
    let config = match Config::from_args() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{APP_NAME}: {e}");
            return ExitCode::from(2);
        }
    };

    init_tracing(&config);

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Setup -----------------------------------------------------------------

fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_new(config.log_level.as_str()).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

// -----------------------------------------------------------------------------
// ----- Run -------------------------------------------------------------------

fn run(config: &Config) -> Result<(), SocklessError> {
    let mut sock = Socket::new(config.address.clone()).with_timeout(config.timeout);
    sock.open(config.mode)?;

    info!("{} connected to {} (mode {})", APP_NAME, config.address, config.mode);

    for line in &config.send {
        sock.write(format!("{line}\r\n"))?;
    }

    if !sock.readable() {
        return Ok(());
    }

    let mut out = io::stdout().lock();

    for line in &mut sock {
        let line = line?;
        writeln!(out, "{}", line.trim_end_matches(['\r', '\n']))?;

        if let Some(pattern) = config.until.as_deref() {
            if line.contains(pattern) {
                info!("matched {:?}, closing", pattern);
                break;
            }
        }
    }

    out.flush()?;
    Ok(())
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
