//! net/line_buffer.rs
//!
//! Inbound scratch buffer for a single connection.
//! Bytes are appended by `fill_from` and split off again as whole lines,
//! fixed-size chunks, or everything that is left.

use std::io::{self, Read};

use bytes::BytesMut;
use memchr::memchr;

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

const READ_CHUNK: usize = 4 * 1024;

// -----------------------------------------------------------------------------
// ----- LineBuffer ------------------------------------------------------------

#[derive(Debug)]
pub struct LineBuffer {
    inbox: BytesMut,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self {
            inbox: BytesMut::with_capacity(READ_CHUNK),
        }
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// -----------------------------------------------------------------------------
// ----- LineBuffer: Public Methods --------------------------------------------

impl LineBuffer {
    /// One read of at most READ_CHUNK bytes. Returns 0 at EOF.
    pub fn fill_from<R: Read>(&mut self, reader: &mut R) -> io::Result<usize> {
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            match reader.read(&mut chunk) {
                Ok(n) => {
                    self.inbox.extend_from_slice(&chunk[..n]);
                    return Ok(n);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Split off the first complete line, terminator included.
    #[inline]
    pub fn take_line(&mut self) -> Option<BytesMut> {
        let newline = memchr(b'\n', &self.inbox)?;
        Some(self.inbox.split_to(newline + 1))
    }

    /// Split off at most `n` bytes.
    #[inline]
    pub fn take(&mut self, n: usize) -> BytesMut {
        let n = n.min(self.inbox.len());
        self.inbox.split_to(n)
    }

    #[inline]
    pub fn take_all(&mut self) -> BytesMut {
        self.inbox.split()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inbox.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inbox.is_empty()
    }

    pub fn clear(&mut self) {
        self.inbox.clear();
    }
}

// -----------------------------------------------------------------------------
// ----- Helpers ---------------------------------------------------------------

/// Lossy UTF-8; invalid sequences become U+FFFD.
pub fn decode(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
