use std::{
    io,
    net::{IpAddr, SocketAddr},
};

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::{TcpSocket, TcpStream};

use crate::{connection::config::ConnectionConfig, sharding::ShardingInfo};

/// Opens a TCP stream to `address`.
///
/// With `shard`, `address` is assumed to be the node shard-aware port, and the socket is
/// bound to a source port that the node maps to the shard.
pub(crate) async fn connect(
    address: SocketAddr,
    shard: Option<&ShardingInfo>,
    config: &ConnectionConfig,
) -> io::Result<TcpStream> {
    let mut socket = Socket::new(Domain::for_address(address), Type::STREAM, Some(Protocol::TCP))?;
    config.configure_socket(&mut socket)?;
    socket.set_nonblocking(true)?;
    let socket = TcpSocket::from_std_stream(socket.into());
    if let Some(shard) = shard {
        let ip_zero = match address.ip() {
            IpAddr::V4(_) => IpAddr::from([0; 4]),
            IpAddr::V6(_) => IpAddr::from([0; 16]),
        };
        let cannot_use = |error: &io::Error| {
            matches!(
                error.kind(),
                io::ErrorKind::AddrInUse | io::ErrorKind::PermissionDenied
            )
        };
        for port in shard.shard_aware_source_ports() {
            match socket.bind(SocketAddr::new(ip_zero, port)) {
                Err(err) if cannot_use(&err) => {}
                _ => break,
            }
        }
    }
    socket.connect(address).await
}
