use std::{
    fmt,
    io::{self, Write},
    iter::FusedIterator,
    mem,
    net::{IpAddr, Shutdown, SocketAddr, TcpStream},
    str::FromStr,
    time::Duration,
};

use bytes::Bytes;
use dns_lookup::{AddrInfoHints, getaddrinfo};
use serde::Deserialize;
use tracing::debug;

use crate::{
    address::Address,
    errors::SocklessError,
    net::line_buffer::{LineBuffer, decode},
};

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

// Same value on Linux, the BSDs, macOS and Windows.
const AI_CANONNAME: i32 = 0x0002;

// -----------------------------------------------------------------------------
// ----- Mode ------------------------------------------------------------------

/// Which directions a [`Socket`] may be used in.
///
/// Accepted spellings, from the CLI and from TOML alike: `r`/`read`,
/// `w`/`write`, `rw`/`wr`/`read-write`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum Mode {
    Read,
    Write,
    #[default]
    ReadWrite,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Read => "r",
            Mode::Write => "w",
            Mode::ReadWrite => "rw",
        }
    }

    pub fn readable(self) -> bool {
        matches!(self, Mode::Read | Mode::ReadWrite)
    }

    pub fn writable(self) -> bool {
        matches!(self, Mode::Write | Mode::ReadWrite)
    }
}

impl FromStr for Mode {
    type Err = SocklessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "r" | "read" => Ok(Mode::Read),
            "w" | "write" => Ok(Mode::Write),
            "rw" | "wr" | "read-write" => Ok(Mode::ReadWrite),
            other => Err(SocklessError::InvalidMode(other.to_string())),
        }
    }
}

impl TryFrom<String> for Mode {
    type Error = SocklessError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// -----------------------------------------------------------------------------
// ----- State -----------------------------------------------------------------

#[derive(Debug)]
enum State {
    Idle,
    Open(TcpStream),
    Closed,
}

impl State {
    fn stream(&self, address: &Address) -> Result<&TcpStream, SocklessError> {
        match self {
            State::Open(stream) => Ok(stream),
            State::Idle => Err(SocklessError::NotConnected {
                address: address.to_string(),
            }),
            State::Closed => Err(SocklessError::Closed {
                address: address.to_string(),
            }),
        }
    }

    fn stream_mut(&mut self, address: &Address) -> Result<&mut TcpStream, SocklessError> {
        match self {
            State::Open(stream) => Ok(stream),
            State::Idle => Err(SocklessError::NotConnected {
                address: address.to_string(),
            }),
            State::Closed => Err(SocklessError::Closed {
                address: address.to_string(),
            }),
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Socket ----------------------------------------------------------------

/// A blocking TCP connection with a file-like surface.
///
/// The lifecycle is one-way: a `Socket` starts idle, is opened once and is
/// closed once. Dropping it closes the connection, so a `Socket` held in a
/// local is released on every exit path of the enclosing scope.
///
/// ```no_run
/// # fn main() -> Result<(), sockless::SocklessError> {
/// let mut sock = sockless::open("irc.libera.chat:6667", sockless::Mode::ReadWrite)?;
/// sock.write("NICK atestbot\r\n")?;
///
/// for line in &mut sock {
///     let line = line?;
///     if line.contains("End of /NAMES list") {
///         break;
///     }
///     println!("{}", line.trim_end());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Socket {
    address: Address,
    timeout: Option<Duration>,
    mode: Mode,
    state: State,
    inbox: LineBuffer,
}

// -----------------------------------------------------------------------------
// ----- Socket: Static --------------------------------------------------------

impl Socket {
    /// Until `open` picks a mode the socket reports itself read-only.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            timeout: Some(DEFAULT_TIMEOUT),
            mode: Mode::Read,
            state: State::Idle,
            inbox: LineBuffer::new(),
        }
    }

    /// Zero disables the timeout entirely.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }
}

// -----------------------------------------------------------------------------
// ----- Socket: Lifecycle -----------------------------------------------------

impl Socket {
    pub fn open(&mut self, mode: Mode) -> Result<(), SocklessError> {
        match self.state {
            State::Idle => {}
            State::Open(_) => {
                return Err(SocklessError::AlreadyOpen {
                    address: self.address.to_string(),
                });
            }
            State::Closed => {
                return Err(SocklessError::Closed {
                    address: self.address.to_string(),
                });
            }
        }

        let stream = self.connect()?;

        stream.set_read_timeout(self.timeout)?;
        stream.set_write_timeout(self.timeout)?;
        let _ = stream.set_nodelay(true);

        debug!("connected to {} (mode {})", self.address, mode);

        self.mode = mode;
        self.state = State::Open(stream);

        Ok(())
    }

    /// Shut the connection down. Safe to call any number of times.
    pub fn close(&mut self) -> Result<(), SocklessError> {
        let State::Open(stream) = mem::replace(&mut self.state, State::Closed) else {
            return Ok(());
        };

        self.inbox.clear();
        debug!("closing connection to {}", self.address);

        match stream.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            // Peer already hung up.
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(SocklessError::Io(e)),
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, State::Open(_))
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, State::Closed)
    }
}

// -----------------------------------------------------------------------------
// ----- Socket: File-like -----------------------------------------------------

impl Socket {
    pub fn readable(&self) -> bool {
        self.mode.readable()
    }

    pub fn writable(&self) -> bool {
        self.mode.writable()
    }

    /// Read up to `size` bytes; fewer come back only at EOF.
    /// `None` reads until the peer closes.
    pub fn read(&mut self, size: Option<usize>) -> Result<Bytes, SocklessError> {
        let Some(size) = size else {
            return self.read_all();
        };

        self.ensure_readable()?;

        while self.inbox.len() < size {
            if self.fill()? == 0 {
                break;
            }
        }

        Ok(self.inbox.take(size).freeze())
    }

    pub fn read_all(&mut self) -> Result<Bytes, SocklessError> {
        self.ensure_readable()?;

        while self.fill()? > 0 {}

        Ok(self.inbox.take_all().freeze())
    }

    /// Next line with its terminator kept. An empty string means EOF.
    pub fn read_line(&mut self) -> Result<String, SocklessError> {
        self.ensure_readable()?;

        loop {
            if let Some(line) = self.inbox.take_line() {
                return Ok(decode(&line));
            }

            if self.fill()? == 0 {
                return Ok(decode(&self.inbox.take_all()));
            }
        }
    }

    pub fn read_lines(&mut self) -> Result<Vec<String>, SocklessError> {
        self.lines().collect()
    }

    pub fn lines(&mut self) -> Lines<'_> {
        Lines {
            socket: self,
            done: false,
        }
    }

    /// Send `data` and flush it.
    pub fn write(&mut self, data: impl AsRef<[u8]>) -> Result<(), SocklessError> {
        let data = data.as_ref();

        self.ensure_writable()?;

        let Socket { address, state, .. } = self;
        let stream = state.stream_mut(address)?;

        stream
            .write_all(data)
            .and_then(|()| stream.flush())
            .map_err(|e| SocklessError::from_transfer(address, e))?;

        debug!("wrote {} bytes to {}", data.len(), address);

        Ok(())
    }
}

// -----------------------------------------------------------------------------
// ----- Socket: Endpoints -----------------------------------------------------

impl Socket {
    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn resolve_dns(&self) -> Result<Vec<SocketAddr>, SocklessError> {
        self.address.resolve_dns()
    }

    /// Name of the local machine.
    pub fn hostname(&self) -> String {
        gethostname::gethostname().to_string_lossy().into_owned()
    }

    /// Canonical name of the local machine, or its plain hostname when the
    /// resolver has none.
    pub fn fqdn(&self) -> String {
        let hostname = self.hostname();
        canonical_name(&hostname).unwrap_or(hostname)
    }

    pub fn fully_qualified_domain_name(&self) -> String {
        self.fqdn()
    }

    pub fn remote_addr(&self) -> Result<SocketAddr, SocklessError> {
        Ok(self.state.stream(&self.address)?.peer_addr()?)
    }

    pub fn remote_ip(&self) -> Result<IpAddr, SocklessError> {
        Ok(self.remote_addr()?.ip())
    }

    pub fn remote_port(&self) -> Result<u16, SocklessError> {
        Ok(self.remote_addr()?.port())
    }

    pub fn local_addr(&self) -> Result<SocketAddr, SocklessError> {
        Ok(self.state.stream(&self.address)?.local_addr()?)
    }

    pub fn local_ip(&self) -> Result<IpAddr, SocklessError> {
        Ok(self.local_addr()?.ip())
    }

    pub fn local_port(&self) -> Result<u16, SocklessError> {
        Ok(self.local_addr()?.port())
    }
}

// -----------------------------------------------------------------------------
// ----- Socket: Private -------------------------------------------------------

impl Socket {
    fn connect(&self) -> Result<TcpStream, SocklessError> {
        let mut last_err = None;

        for addr in self.address.resolve_dns()? {
            let attempt = match self.timeout {
                Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
                None => TcpStream::connect(addr),
            };

            match attempt {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    debug!("connect to {} via {} failed: {}", self.address, addr, e);
                    last_err = Some(e);
                }
            }
        }

        let err = last_err.unwrap_or_else(|| io::Error::from(io::ErrorKind::NotFound));
        Err(SocklessError::from_connect(&self.address, err))
    }

    fn ensure_readable(&self) -> Result<(), SocklessError> {
        self.state.stream(&self.address)?;

        if !self.mode.readable() {
            return Err(SocklessError::NotReadable {
                address: self.address.to_string(),
            });
        }

        Ok(())
    }

    fn ensure_writable(&self) -> Result<(), SocklessError> {
        self.state.stream(&self.address)?;

        if !self.mode.writable() {
            return Err(SocklessError::NotWritable {
                address: self.address.to_string(),
            });
        }

        Ok(())
    }

    /// One read from the stream into the inbox. Returns 0 at EOF.
    fn fill(&mut self) -> Result<usize, SocklessError> {
        let Socket {
            address,
            state,
            inbox,
            ..
        } = self;

        let stream = state.stream_mut(address)?;
        inbox
            .fill_from(stream)
            .map_err(|e| SocklessError::from_transfer(address, e))
    }
}

// -----------------------------------------------------------------------------
// ----- Socket: Traits --------------------------------------------------------

impl Drop for Socket {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            debug!("error closing {} on drop: {}", self.address, e);
        }
    }
}

impl<'a> IntoIterator for &'a mut Socket {
    type Item = Result<String, SocklessError>;
    type IntoIter = Lines<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines()
    }
}

// -----------------------------------------------------------------------------
// ----- Lines -----------------------------------------------------------------

/// Lines read from a [`Socket`] until the peer closes the connection.
///
/// Terminators are kept. The first error ends the iteration.
#[derive(Debug)]
pub struct Lines<'a> {
    socket: &'a mut Socket,
    done: bool,
}

impl Iterator for Lines<'_> {
    type Item = Result<String, SocklessError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.socket.read_line() {
            Ok(line) if line.is_empty() => {
                self.done = true;
                None
            }
            Ok(line) => Some(Ok(line)),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl FusedIterator for Lines<'_> {}

// -----------------------------------------------------------------------------
// ----- Internal: Helpers -----------------------------------------------------

fn canonical_name(host: &str) -> Option<String> {
    let hints = AddrInfoHints {
        flags: AI_CANONNAME,
        ..AddrInfoHints::default()
    };

    getaddrinfo(Some(host), None, Some(hints))
        .ok()?
        .filter_map(Result::ok)
        .find_map(|info| info.canonname)
        .filter(|name| !name.is_empty())
}

// -----------------------------------------------------------------------------
// ----- Public Helpers --------------------------------------------------------

/// Parse `address`, connect with the default timeout and return the open socket.
pub fn open(address: &str, mode: Mode) -> Result<Socket, SocklessError> {
    open_with_timeout(address, mode, DEFAULT_TIMEOUT)
}

pub fn open_with_timeout(
    address: &str,
    mode: Mode,
    timeout: Duration,
) -> Result<Socket, SocklessError> {
    let mut sock = Socket::new(Address::parse(address)?).with_timeout(timeout);
    sock.open(mode)?;
    Ok(sock)
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        io::Read,
        net::TcpListener,
        thread::{self, JoinHandle},
    };

    /// Accept one connection on an ephemeral port and hand it to `f`.
    fn peer<T, F>(f: F) -> (Address, JoinHandle<T>)
    where
        T: Send + 'static,
        F: FnOnce(TcpStream) -> T + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = Address::from(listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            f(stream)
        });
        (addr, handle)
    }

    fn open_to(addr: &Address, mode: Mode) -> Socket {
        let mut sock = Socket::new(addr.clone()).with_timeout(Duration::from_secs(5));
        sock.open(mode).unwrap();
        sock
    }

    #[test]
    fn mode_parses_short_forms() {
        assert_eq!("r".parse::<Mode>().unwrap(), Mode::Read);
        assert_eq!("w".parse::<Mode>().unwrap(), Mode::Write);
        assert_eq!("rw".parse::<Mode>().unwrap(), Mode::ReadWrite);
        assert!(matches!(
            "x".parse::<Mode>(),
            Err(SocklessError::InvalidMode(m)) if m == "x"
        ));
    }

    #[test]
    fn mode_spellings_match_between_str_and_toml() {
        #[derive(Deserialize)]
        struct Doc {
            mode: Mode,
        }

        for (raw, want) in [
            ("r", Mode::Read),
            ("read", Mode::Read),
            ("w", Mode::Write),
            ("write", Mode::Write),
            ("rw", Mode::ReadWrite),
            ("wr", Mode::ReadWrite),
            ("read-write", Mode::ReadWrite),
        ] {
            assert_eq!(raw.parse::<Mode>().unwrap(), want, "{raw}");
            let doc: Doc = toml::from_str(&format!("mode = \"{raw}\"")).unwrap();
            assert_eq!(doc.mode, want, "{raw}");
        }

        assert!(toml::from_str::<Doc>("mode = \"x\"").is_err());
    }

    #[test]
    fn unopened_socket_reports_read_only() {
        let sock = Socket::new(Address::new("127.0.0.1", 1));
        assert!(sock.readable());
        assert!(!sock.writable());
    }

    #[test]
    fn hostname_is_the_machine_name() {
        let sock = Socket::new(Address::new("127.0.0.1", 1));
        let hostname = sock.hostname();

        assert!(!hostname.is_empty());
        assert_eq!(hostname, gethostname::gethostname().to_string_lossy());
    }

    #[test]
    fn fqdn_is_never_empty() {
        let sock = Socket::new(Address::new("127.0.0.1", 1));
        assert!(!sock.fqdn().is_empty());
        assert_eq!(sock.fqdn(), sock.fully_qualified_domain_name());
    }

    #[test]
    fn idle_read_is_a_transfer_timeout() {
        let (addr, server) = peer(|mut s| {
            let mut rest = Vec::new();
            let _ = s.read_to_end(&mut rest);
        });

        let mut sock = Socket::new(addr).with_timeout(Duration::from_millis(50));
        sock.open(Mode::Read).unwrap();

        let err = sock.read_line().unwrap_err();
        assert!(matches!(err, SocklessError::TransferTimedOut { .. }), "got {err:?}");
        assert!(!err.is_connection_error());

        drop(sock);
        server.join().unwrap();
    }

    #[test]
    fn unknown_host_has_no_canonical_name() {
        assert_eq!(canonical_name("does-not-exist.invalid"), None);
    }

    #[test]
    fn iterates_lines_in_order_until_eof() {
        let (addr, server) = peer(|mut s| {
            s.write_all(b"one\r\ntwo\n\nthree").unwrap();
        });

        let mut sock = open_to(&addr, Mode::Read);
        let lines: Vec<String> = sock.lines().map(Result::unwrap).collect();

        assert_eq!(lines, vec!["one\r\n", "two\n", "\n", "three"]);
        assert_eq!(sock.read_line().unwrap(), "");
        server.join().unwrap();
    }

    #[test]
    fn write_reaches_peer() {
        let (addr, server) = peer(|mut s| {
            let mut got = String::new();
            s.read_to_string(&mut got).unwrap();
            got
        });

        let mut sock = open_to(&addr, Mode::Write);
        sock.write("NICK atestbot\r\n").unwrap();
        sock.write(b"JOIN #testbot\r\n").unwrap();
        sock.close().unwrap();

        assert_eq!(server.join().unwrap(), "NICK atestbot\r\nJOIN #testbot\r\n");
    }

    #[test]
    fn write_after_close_fails() {
        let (addr, server) = peer(|_| ());

        let mut sock = open_to(&addr, Mode::ReadWrite);
        sock.close().unwrap();

        assert!(matches!(sock.write("late"), Err(SocklessError::Closed { .. })));
        assert!(matches!(sock.read_line(), Err(SocklessError::Closed { .. })));
        server.join().unwrap();
    }

    #[test]
    fn close_is_idempotent() {
        let (addr, server) = peer(|_| ());

        let mut sock = open_to(&addr, Mode::ReadWrite);
        assert!(sock.is_open());
        sock.close().unwrap();
        sock.close().unwrap();
        assert!(sock.is_closed());
        server.join().unwrap();
    }

    #[test]
    fn drop_closes_connection() {
        let (addr, server) = peer(|mut s| {
            let mut rest = Vec::new();
            s.read_to_end(&mut rest).unwrap();
            rest
        });

        {
            let mut sock = open_to(&addr, Mode::Write);
            sock.write("bye\n").unwrap();
        }

        assert_eq!(server.join().unwrap(), b"bye\n");
    }

    #[test]
    fn cannot_reopen_or_open_twice() {
        let (addr, server) = peer(|_| ());

        let mut sock = open_to(&addr, Mode::Read);
        assert!(matches!(
            sock.open(Mode::Read),
            Err(SocklessError::AlreadyOpen { .. })
        ));

        sock.close().unwrap();
        assert!(matches!(sock.open(Mode::Read), Err(SocklessError::Closed { .. })));
        server.join().unwrap();
    }

    #[test]
    fn unopened_socket_is_not_connected() {
        let mut sock = Socket::new(Address::new("127.0.0.1", 1));
        assert!(matches!(sock.write("x"), Err(SocklessError::NotConnected { .. })));
        assert!(matches!(sock.remote_addr(), Err(SocklessError::NotConnected { .. })));
        sock.close().unwrap();
    }

    #[test]
    fn mode_is_enforced() {
        let (addr, server) = peer(|_| ());

        let mut sock = open_to(&addr, Mode::Write);
        assert!(!sock.readable());
        assert!(sock.writable());
        assert!(matches!(sock.read_line(), Err(SocklessError::NotReadable { .. })));
        drop(sock);

        server.join().unwrap();

        let (addr, server) = peer(|_| ());
        let mut sock = open_to(&addr, Mode::Read);
        assert!(matches!(sock.write("x"), Err(SocklessError::NotWritable { .. })));
        drop(sock);

        server.join().unwrap();
    }

    #[test]
    fn sized_read_waits_for_enough_bytes() {
        let (addr, server) = peer(|mut s| {
            s.write_all(b"abc").unwrap();
            s.flush().unwrap();
            thread::sleep(Duration::from_millis(20));
            s.write_all(b"defgh").unwrap();
        });

        let mut sock = open_to(&addr, Mode::Read);
        assert_eq!(&sock.read(Some(5)).unwrap()[..], b"abcde");
        assert_eq!(&sock.read(None).unwrap()[..], b"fgh");
        assert_eq!(&sock.read(Some(5)).unwrap()[..], b"");
        server.join().unwrap();
    }

    #[test]
    fn closed_port_is_a_connection_error() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let err = open(&format!("127.0.0.1:{port}"), Mode::ReadWrite).unwrap_err();
        assert!(err.is_connection_error(), "got {err:?}");
    }

    #[test]
    fn reports_endpoints() {
        let (addr, server) = peer(|s| s.peer_addr().unwrap());

        let sock = open_to(&addr, Mode::Read);
        assert_eq!(sock.remote_port().unwrap(), addr.port());
        assert_eq!(sock.remote_ip().unwrap().to_string(), "127.0.0.1");
        assert_eq!(sock.local_addr().unwrap(), server.join().unwrap());
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
