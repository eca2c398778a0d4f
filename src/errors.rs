use std::io;

use thiserror::Error;

use crate::address::Address;

// -----------------------------------------------------------------------------
// ----- SocklessError ---------------------------------------------------------

#[derive(Debug, Error)]
pub enum SocklessError {
    #[error("invalid address '{address}': {reason}")]
    InvalidAddress {
        address: String,
        reason: &'static str,
    },

    #[error("invalid mode '{0}' (expected r, w or rw)")]
    InvalidMode(String),

    #[error("could not resolve {address}")]
    AddressNotFound { address: String },

    #[error("connection to {address} refused")]
    ConnectionRefused { address: String },

    #[error("connection to {address} timed out")]
    TimedOut { address: String },

    #[error("could not connect to {address}: {source}")]
    Connect { address: String, source: io::Error },

    #[error("no progress on {address} within the I/O timeout")]
    TransferTimedOut { address: String },

    #[error("connection to {address} broken: {source}")]
    BrokenConnection { address: String, source: io::Error },

    #[error("not connected to {address}")]
    NotConnected { address: String },

    #[error("already connected to {address}")]
    AlreadyOpen { address: String },

    #[error("connection to {address} is closed")]
    Closed { address: String },

    #[error("connection to {address} was not opened for reading")]
    NotReadable { address: String },

    #[error("connection to {address} was not opened for writing")]
    NotWritable { address: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl SocklessError {
    /// Classify a failed `connect` by its `io::ErrorKind`.
    pub(crate) fn from_connect(address: &Address, source: io::Error) -> Self {
        let address = address.to_string();

        match source.kind() {
            io::ErrorKind::ConnectionRefused => SocklessError::ConnectionRefused { address },
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
                SocklessError::TimedOut { address }
            }
            _ => SocklessError::Connect { address, source },
        }
    }

    /// Classify a failed read or write on an established stream.
    pub(crate) fn from_transfer(address: &Address, source: io::Error) -> Self {
        let address = address.to_string();

        match source.kind() {
            io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::UnexpectedEof
            | io::ErrorKind::WriteZero => SocklessError::BrokenConnection { address, source },
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
                SocklessError::TransferTimedOut { address }
            }
            _ => SocklessError::Io(source),
        }
    }

    /// True for every failure that happened while establishing the connection.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            SocklessError::AddressNotFound { .. }
                | SocklessError::ConnectionRefused { .. }
                | SocklessError::TimedOut { .. }
                | SocklessError::Connect { .. }
        )
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
