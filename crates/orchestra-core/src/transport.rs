//! Socket setup shared by the musician and the auditor.
//!
//! Everything here is startup work: a failure means the process cannot take
//! part in the orchestra and should exit. The only per-message operation is
//! `send_datagram`, whose error the caller logs and moves past.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::{TcpListener, UdpSocket};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("failed to join multicast group {group} on {interface}: {source}")]
    Join {
        group: Ipv4Addr,
        interface: Ipv4Addr,
        #[source]
        source: io::Error,
    },
    #[error("failed to send to {dest}: {source}")]
    Send {
        dest: SocketAddr,
        #[source]
        source: io::Error,
    },
}

/// Create a UDP socket bound to `port` on all interfaces and joined to `group`.
///
/// SO_REUSEADDR is set so several auditors on one host can each keep an
/// independent view of the same group.
pub fn multicast_listener(
    group: Ipv4Addr,
    port: u16,
    interface: Ipv4Addr,
) -> Result<UdpSocket, TransportError> {
    let bind_addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port);
    let bind_err = |source| TransportError::Bind {
        addr: bind_addr.into(),
        source,
    };

    if !group.is_multicast() {
        return Err(TransportError::Join {
            group,
            interface,
            source: io::Error::new(io::ErrorKind::InvalidInput, "not a multicast address"),
        });
    }

    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).map_err(bind_err)?;
    socket.set_reuse_address(true).map_err(bind_err)?;
    socket.set_nonblocking(true).map_err(bind_err)?;
    socket.bind(&bind_addr.into()).map_err(bind_err)?;
    socket
        .join_multicast_v4(&group, &interface)
        .map_err(|source| TransportError::Join {
            group,
            interface,
            source,
        })?;

    UdpSocket::from_std(socket.into()).map_err(bind_err)
}

/// Create a UDP socket suitable for sending IPv4 multicast.
///
/// Loopback is left on so a musician and an auditor on the same host can
/// hear each other.
pub fn multicast_sender(interface: Ipv4Addr, ttl: u32) -> Result<UdpSocket, TransportError> {
    let bind_addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0);
    let bind_err = |source| TransportError::Bind {
        addr: bind_addr.into(),
        source,
    };

    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).map_err(bind_err)?;
    socket.set_multicast_ttl_v4(ttl).map_err(bind_err)?;
    socket.set_multicast_loop_v4(true).map_err(bind_err)?;
    if !interface.is_unspecified() {
        socket.set_multicast_if_v4(&interface).map_err(bind_err)?;
    }
    socket.set_nonblocking(true).map_err(bind_err)?;
    socket.bind(&bind_addr.into()).map_err(bind_err)?;

    UdpSocket::from_std(socket.into()).map_err(bind_err)
}

/// Bind a TCP listener, mapping failure to `TransportError::Bind`.
pub async fn bind_tcp(addr: SocketAddr) -> Result<TcpListener, TransportError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| TransportError::Bind { addr, source })
}

/// Send one datagram. Fire-and-forget: no acknowledgement is expected.
pub async fn send_datagram(
    socket: &UdpSocket,
    payload: &[u8],
    dest: SocketAddr,
) -> Result<usize, TransportError> {
    socket
        .send_to(payload, dest)
        .await
        .map_err(|source| TransportError::Send { dest, source })
}
