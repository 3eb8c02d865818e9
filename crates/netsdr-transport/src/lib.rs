//! Frame-oriented transports for the NetSDR protocol.
//!
//! A transport delivers whole frames: the boundary of every buffer handed to
//! the codec is decided here, never by the protocol's header length field.
//! - [`UdpTransport`]: one datagram is one frame
//! - [`MemoryTransport`]: connected in-process endpoints, used by test doubles
//!
//! Both split into a [`FrameSink`] and a [`FrameSource`] so that sending and
//! receiving can live in the same task without borrowing conflicts.

pub mod error;
pub mod memory;
pub mod traits;
pub mod udp;

pub use error::{Result, TransportError};
pub use memory::{MemorySink, MemorySource, MemoryTransport};
pub use traits::{FrameSink, FrameSource, Transport};
pub use udp::{
    UdpSink, UdpSource, UdpTransport, DEFAULT_CONTROL_PORT, DEFAULT_DATA_PORT, MAX_DATAGRAM_SIZE,
};
