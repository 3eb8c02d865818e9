use std::net::SocketAddr;

use netsdr_transport::UdpTransport;

use crate::config::SessionConfig;
use crate::dispatch::{spawn, Connection};
use crate::error::Result;

/// Connect to a receiver over UDP with the default configuration.
///
/// Binds an ephemeral port on all interfaces.
pub async fn connect(remote: SocketAddr) -> Result<Connection> {
    let local = SocketAddr::from(([0, 0, 0, 0], 0));
    connect_with_config(local, remote, &SessionConfig::default()).await
}

/// Connect with an explicit local address and configuration.
pub async fn connect_with_config(
    local: SocketAddr,
    remote: SocketAddr,
    config: &SessionConfig,
) -> Result<Connection> {
    config.validate()?;
    let transport = UdpTransport::connect(local, remote).await?;
    spawn(transport, config)
}
