//! Byte-transport abstraction for serial-style links.
//!
//! A transport delivers an ordered, reliable byte stream with no message
//! boundaries. Everything above this layer (preamble search, frame assembly,
//! acknowledgements) is expressed in terms of the [`ByteTransport`] trait:
//! - [`SerialDevice`]: a character device such as a USB gadget serial port (unix)
//! - [`StreamTransport`]: any `Read` + `Write` pair (pipes, sockets, captures)
//! - [`MemoryTransport`]: scripted inbound bytes with captured outbound bytes

pub mod error;
pub mod memory;
pub mod traits;

#[cfg(unix)]
pub mod serial;

pub use error::{Result, TransportError};
pub use memory::MemoryTransport;
pub use traits::{ByteTransport, StreamTransport};

#[cfg(unix)]
pub use serial::SerialDevice;
