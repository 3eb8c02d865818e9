use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::{Result, TransportError};
use crate::traits::{FrameSink, FrameSource, Transport};

/// One end of an in-process frame pipe.
///
/// Frames sent on one end arrive, whole and in order, on the other. Dropping
/// an end is seen by its partner as [`TransportError::ConnectionLost`].
#[derive(Debug)]
pub struct MemoryTransport {
    tx: mpsc::Sender<Bytes>,
    rx: mpsc::Receiver<Bytes>,
}

impl MemoryTransport {
    /// Create two connected endpoints, each buffering up to `capacity` frames.
    pub fn pair(capacity: usize) -> (Self, Self) {
        let (a_tx, a_rx) = mpsc::channel(capacity.max(1));
        let (b_tx, b_rx) = mpsc::channel(capacity.max(1));
        (Self { tx: a_tx, rx: b_rx }, Self { tx: b_tx, rx: a_rx })
    }
}

impl FrameSink for MemoryTransport {
    async fn send_frame(&mut self, frame: Bytes) -> Result<()> {
        send(&self.tx, frame).await
    }
}

impl FrameSource for MemoryTransport {
    async fn recv_frame(&mut self) -> Result<Bytes> {
        recv(&mut self.rx).await
    }
}

impl Transport for MemoryTransport {
    type Sink = MemorySink;
    type Source = MemorySource;

    fn split(self) -> (MemorySink, MemorySource) {
        (MemorySink { tx: self.tx }, MemorySource { rx: self.rx })
    }
}

/// Sending half of a [`MemoryTransport`].
#[derive(Debug, Clone)]
pub struct MemorySink {
    tx: mpsc::Sender<Bytes>,
}

impl FrameSink for MemorySink {
    async fn send_frame(&mut self, frame: Bytes) -> Result<()> {
        send(&self.tx, frame).await
    }
}

/// Receiving half of a [`MemoryTransport`].
#[derive(Debug)]
pub struct MemorySource {
    rx: mpsc::Receiver<Bytes>,
}

impl FrameSource for MemorySource {
    async fn recv_frame(&mut self) -> Result<Bytes> {
        recv(&mut self.rx).await
    }
}

async fn send(tx: &mpsc::Sender<Bytes>, frame: Bytes) -> Result<()> {
    tx.send(frame)
        .await
        .map_err(|_| TransportError::ConnectionLost("memory peer closed".to_string()))
}

async fn recv(rx: &mut mpsc::Receiver<Bytes>) -> Result<Bytes> {
    rx.recv()
        .await
        .ok_or_else(|| TransportError::ConnectionLost("memory peer closed".to_string()))
}
