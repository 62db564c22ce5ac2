//! Datagram transports the session layer sends through.

use std::io::{ErrorKind, Result};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::time::{Duration, Instant};

use netboot_types::dhcp::{CLIENT_PORT, SERVER_PORT};

/// Where a session hands its packets to.
///
/// Implementations must not block: `send` queues or transmits and
/// returns. `close` is called once, when the owning session finishes.
pub trait DatagramTransport {
    /// Transmits one datagram.
    ///
    /// # Errors
    ///
    /// Fails if the datagram could not be handed to the medium; the
    /// session logs and retries on its own schedule.
    fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Releases the endpoint. Events arriving afterwards are dropped by
    /// the caller, not the transport.
    fn close(&mut self) {}
}

/// Broadcast UDP endpoint on the conventional BOOTP ports.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    /// Opens a broadcast-capable socket bound to the client port.
    ///
    /// # Errors
    ///
    /// Fails if the port is taken or broadcast cannot be enabled.
    pub fn open() -> Result<UdpTransport> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, CLIENT_PORT))?;
        socket.set_broadcast(true)?;
        Ok(UdpTransport { socket })
    }

    /// A second handle to the same endpoint, for the receive side of a
    /// poll loop.
    ///
    /// # Errors
    ///
    /// Fails if the underlying socket cannot be duplicated.
    pub fn try_clone(&self) -> Result<UdpTransport> {
        Ok(UdpTransport {
            socket: self.socket.try_clone()?,
        })
    }

    /// Waits for one datagram until `deadline` (or 100 ms when no
    /// deadline is pending). Returns `None` on timeout.
    ///
    /// # Errors
    ///
    /// Fails on socket errors other than the timeout itself.
    pub fn recv_deadline(&self, buf: &mut [u8], deadline: Option<Instant>) -> Result<Option<usize>> {
        let wait = match deadline {
            Some(deadline) => deadline
                .saturating_duration_since(Instant::now())
                .max(Duration::from_millis(1)),
            None => Duration::from_millis(100),
        };
        self.socket.set_read_timeout(Some(wait))?;
        match self.socket.recv_from(buf) {
            Ok((n, _)) => Ok(Some(n)),
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl DatagramTransport for UdpTransport {
    fn send(&mut self, data: &[u8]) -> Result<()> {
        let server = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::BROADCAST, SERVER_PORT));
        self.socket.send_to(data, server)?;
        Ok(())
    }
}
