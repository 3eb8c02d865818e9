use std::future::Future;

use bytes::Bytes;

use crate::error::Result;

/// Accepts encoded frames for transmission.
pub trait FrameSink: Send {
    /// Send one complete frame.
    fn send_frame(&mut self, frame: Bytes) -> impl Future<Output = Result<()>> + Send;
}

/// Delivers complete inbound frames, one buffer per frame.
pub trait FrameSource: Send {
    /// Wait for the next frame.
    ///
    /// Must be cancel safe: dropping the future before it completes loses no
    /// frame. The dispatcher polls it inside `tokio::select!`.
    fn recv_frame(&mut self) -> impl Future<Output = Result<Bytes>> + Send;
}

/// A bidirectional connection to a receiver.
pub trait Transport {
    type Sink: FrameSink + 'static;
    type Source: FrameSource + 'static;

    /// Split into independently owned sending and receiving halves.
    fn split(self) -> (Self::Sink, Self::Source);
}
