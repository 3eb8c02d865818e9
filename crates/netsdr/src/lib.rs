//! Client-side protocol engine for NetSDR-class software-defined radio receivers.
//!
//! # Crate Structure
//!
//! - [`codec`]: wire format for control and data items, sample decoding
//! - [`transport`]: frame-oriented transports (UDP, in-memory)
//! - [`session`]: command correlation, stream ingest and the dispatcher task

/// Re-export codec types.
pub mod codec {
    pub use netsdr_codec::*;
}

/// Re-export transport types.
pub mod transport {
    pub use netsdr_transport::*;
}

/// Re-export session types.
pub mod session {
    pub use netsdr_session::*;
}
