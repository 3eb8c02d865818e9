//! Session layer for NetSDR receivers.
//!
//! Two pipelines share one transport:
//! - commands: single-flight request/response, correlated by item code
//! - data: sequenced sample frames, decoded and handed to a consumer
//!
//! A dispatcher task reads every inbound frame and routes it to the
//! [`CommandSession`] or to the [`StreamIngest`] task. Callers issue commands
//! through a cloneable [`SessionHandle`] and read samples from the
//! notification receiver of the [`Connection`].

pub mod config;
pub mod connector;
pub mod control;
pub mod dispatch;
pub mod error;
pub mod ingest;
pub mod session;

pub use config::SessionConfig;
pub use connector::{connect, connect_with_config};
pub use control::{CaptureMode, ReceiverCommand, MAX_FREQUENCY_HZ};
pub use dispatch::{spawn, Connection, SessionHandle};
pub use error::{Result, SessionError};
pub use ingest::{SequenceGap, StreamIngest, StreamNotification, StreamOutcome, StreamStats};
pub use session::{CommandSession, FrameDisposition, SessionState};
