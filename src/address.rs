use std::{
    fmt,
    net::{SocketAddr, ToSocketAddrs},
    str::FromStr,
};

use crate::errors::SocklessError;

// -----------------------------------------------------------------------------
// ----- Address ---------------------------------------------------------------

/// A remote endpoint written as `host:port`.
///
/// The port is taken from after the last `:`, so a bracketed IPv6 literal
/// like `[::1]:6667` parses; the brackets are not part of `host`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Address {
    host: String,
    port: u16,
}

// -----------------------------------------------------------------------------
// ----- Address: Static -------------------------------------------------------

impl Address {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn parse(raw: &str) -> Result<Self, SocklessError> {
        let invalid = |reason| SocklessError::InvalidAddress {
            address: raw.to_string(),
            reason,
        };

        let (host, port) = raw.trim().rsplit_once(':').ok_or_else(|| invalid("missing ':port'"))?;

        let host = match host.strip_prefix('[') {
            Some(inner) => inner
                .strip_suffix(']')
                .ok_or_else(|| invalid("unterminated '[' in host"))?,
            None if host.contains(':') => return Err(invalid("IPv6 hosts must be bracketed")),
            None => host,
        };

        if host.is_empty() {
            return Err(invalid("empty host"));
        }

        let port = port.parse::<u16>().map_err(|_| invalid("port must be 0-65535"))?;

        Ok(Self::new(host, port))
    }
}

// -----------------------------------------------------------------------------
// ----- Address: Public -------------------------------------------------------

impl Address {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Every socket address this endpoint resolves to, in resolver order.
    pub fn resolve_dns(&self) -> Result<Vec<SocketAddr>, SocklessError> {
        let not_found = || SocklessError::AddressNotFound {
            address: self.to_string(),
        };

        let addrs: Vec<SocketAddr> = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|_| not_found())?
            .collect();

        if addrs.is_empty() {
            return Err(not_found());
        }

        Ok(addrs)
    }
}

// -----------------------------------------------------------------------------
// ----- Address: Traits -------------------------------------------------------

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for Address {
    type Err = SocklessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s)
    }
}

impl From<SocketAddr> for Address {
    fn from(addr: SocketAddr) -> Self {
        Address::new(addr.ip().to_string(), addr.port())
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
