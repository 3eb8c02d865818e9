use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::{FrameSink, FrameSource, Transport};

/// Port the receiver streams data items to by convention.
pub const DEFAULT_DATA_PORT: u16 = 60000;

/// Port the receiver accepts control items on by convention.
pub const DEFAULT_CONTROL_PORT: u16 = 50000;

/// Largest datagram the transport will receive.
pub const MAX_DATAGRAM_SIZE: usize = 65_535;

/// UDP transport: one datagram carries exactly one frame.
///
/// The socket is connected to the receiver's address, so datagrams from other
/// senders are filtered by the kernel and ICMP errors surface as
/// [`TransportError::ConnectionLost`].
#[derive(Debug)]
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
    peer: SocketAddr,
}

impl UdpTransport {
    /// Bind `local` and connect to the receiver at `remote`.
    pub async fn connect(local: SocketAddr, remote: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(local)
            .await
            .map_err(|source| TransportError::Bind {
                addr: local,
                source,
            })?;
        socket
            .connect(remote)
            .await
            .map_err(|source| TransportError::Connect {
                addr: remote,
                source,
            })?;

        info!(local = ?socket.local_addr().ok(), %remote, "udp transport connected");

        Ok(Self {
            socket: Arc::new(socket),
            peer: remote,
        })
    }

    /// The locally bound address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr().map_err(Into::into)
    }

    /// The receiver's address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        "udp"
    }
}

impl Transport for UdpTransport {
    type Sink = UdpSink;
    type Source = UdpSource;

    fn split(self) -> (UdpSink, UdpSource) {
        let sink = UdpSink {
            socket: Arc::clone(&self.socket),
        };
        let source = UdpSource {
            socket: self.socket,
            buf: vec![0u8; MAX_DATAGRAM_SIZE],
        };
        (sink, source)
    }
}

/// Sending half of a [`UdpTransport`].
#[derive(Debug)]
pub struct UdpSink {
    socket: Arc<UdpSocket>,
}

impl FrameSink for UdpSink {
    async fn send_frame(&mut self, frame: Bytes) -> Result<()> {
        loop {
            match self.socket.send(&frame).await {
                Ok(sent) if sent == frame.len() => return Ok(()),
                Ok(sent) => {
                    return Err(TransportError::Io(std::io::Error::new(
                        ErrorKind::WriteZero,
                        format!("short datagram write ({sent} of {} bytes)", frame.len()),
                    )))
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::from_io(err)),
            }
        }
    }
}

/// Receiving half of a [`UdpTransport`].
#[derive(Debug)]
pub struct UdpSource {
    socket: Arc<UdpSocket>,
    buf: Vec<u8>,
}

impl FrameSource for UdpSource {
    async fn recv_frame(&mut self) -> Result<Bytes> {
        loop {
            match self.socket.recv(&mut self.buf).await {
                Ok(n) => {
                    debug!(len = n, "datagram received");
                    return Ok(Bytes::copy_from_slice(&self.buf[..n]));
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::from_io(err)),
            }
        }
    }
}
