//! Local network address discovery.

use std::net::{IpAddr, Ipv4Addr, UdpSocket};

/// The address of the interface carrying the default route.
///
/// Connecting a UDP socket sends nothing; it only makes the kernel pick a
/// source address. Falls back to loopback when there is no route.
pub fn local_ip() -> IpAddr {
    route_source_ip().unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

fn route_source_ip() -> std::io::Result<IpAddr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
    socket.connect((Ipv4Addr::new(192, 168, 255, 255), 1))?;
    Ok(socket.local_addr()?.ip())
}
