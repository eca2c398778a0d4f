//! A friendlier interface to TCP sockets.
//!
//! [`Socket`] wraps one blocking connection and gives it a file-like
//! surface: `write`, `read`, `read_line` and line iteration. The connection
//! is closed when the `Socket` goes out of scope.

pub mod address;
pub mod config;
pub mod errors;
pub mod net;

pub use address::Address;
pub use config::Config;
pub use errors::SocklessError;
pub use net::socket::{DEFAULT_TIMEOUT, open, open_with_timeout};
pub use net::{Lines, Mode, Socket};
