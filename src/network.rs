//! UDP socket construction.
//!
//! All sockets are built through `socket2` so the options are set before the
//! bind, then handed to tokio. SO_REUSEADDR everywhere lets the emulator
//! restart without waiting out lingering sockets.

use std::io;
use std::net::{SocketAddr, SocketAddrV4};

use tokio::net::UdpSocket;

// this will be common for all our sockets
fn new_socket() -> io::Result<socket2::Socket> {
    let socket = socket2::Socket::new(
        socket2::Domain::IPV4,
        socket2::Type::DGRAM,
        Some(socket2::Protocol::UDP),
    )?;

    // tokio requires the socket to be non-blocking before from_std
    socket.set_nonblocking(true)?;
    socket.set_reuse_address(true)?;

    Ok(socket)
}

/// Bind a listening socket. `broadcast` additionally enables SO_BROADCAST
/// for the discovery endpoint, which receives (and answers) broadcasts.
pub fn create_udp_listen(addr: &SocketAddrV4, broadcast: bool) -> io::Result<UdpSocket> {
    let socket = new_socket()?;

    if broadcast {
        socket.set_broadcast(true)?;
    }
    socket.bind(&socket2::SockAddr::from(SocketAddr::V4(*addr)))?;
    log::trace!("Binding socket to {}", addr);

    UdpSocket::from_std(socket.into())
}

/// Bind a sending socket on a fixed source port, so the peer sees data
/// arriving from the advertised device port.
pub fn create_udp_send(bind: &SocketAddrV4) -> io::Result<UdpSocket> {
    let socket = new_socket()?;

    socket.bind(&socket2::SockAddr::from(SocketAddr::V4(*bind)))?;
    log::trace!("Binding send socket to {}", bind);

    UdpSocket::from_std(socket.into())
}
