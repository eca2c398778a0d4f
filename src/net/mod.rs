// net/mod.rs
//! Networking layer: the blocking socket wrapper and its read buffer.

pub mod line_buffer;
pub mod socket;

pub use line_buffer::LineBuffer;
pub use socket::{Lines, Mode, Socket};
