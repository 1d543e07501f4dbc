use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io::{self, Read};
use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::{Duration, Instant};

use crate::error::PingError;

/// Largest IPv4 datagram, so a reply is never cut short whatever the payload.
pub const MAX_DATAGRAM_LEN: usize = 65535;

/// Outcome of one bounded wait on the transport.
#[derive(Debug)]
pub enum Received {
    Packet { received_at: Instant, bytes: Vec<u8> },
    Timeout,
}

/// A channel able to send raw ICMP messages and receive raw IPv4 datagrams.
pub trait Transport {
    /// Send `packet` to `destination`, returning the moment it left.
    fn send(&mut self, packet: &[u8], destination: Ipv4Addr) -> io::Result<Instant>;

    /// Wait at most `budget` for a single datagram.
    fn receive_with_deadline(&mut self, budget: Duration) -> io::Result<Received>;

    /// Clock used to measure how much of a receive budget has been spent.
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Raw ICMPv4 socket. Every ICMP datagram delivered to the host arrives here,
/// IP header included.
pub struct IcmpSocket {
    socket: Socket,
    buffer: Vec<u8>,
}

impl IcmpSocket {
    pub fn open() -> Result<Self, PingError> {
        let socket = Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4))
            .map_err(PingError::TransportUnavailable)?;

        socket
            .set_nonblocking(false)
            .map_err(PingError::TransportUnavailable)?;

        Ok(Self {
            socket,
            buffer: vec![0u8; MAX_DATAGRAM_LEN],
        })
    }

    pub fn set_ttl(&self, ttl: u32) -> anyhow::Result<()> {
        self.socket
            .set_ttl(ttl)
            .map_err(|e| anyhow::anyhow!("Failed to set IPv4 TTL: {}", e))
    }

    pub fn bind_to_source(&self, source_addr: Ipv4Addr) -> anyhow::Result<()> {
        let bind_addr = SockAddr::from(SocketAddrV4::new(source_addr, 0));
        self.socket.bind(&bind_addr)?;
        Ok(())
    }
}

impl Transport for IcmpSocket {
    fn send(&mut self, packet: &[u8], destination: Ipv4Addr) -> io::Result<Instant> {
        // Port is meaningless for ICMP
        let target = SockAddr::from(SocketAddrV4::new(destination, 0));

        log::debug!("Sending ICMP packet to {}: {} bytes", destination, packet.len());
        let sent_at = Instant::now();
        self.socket.send_to(packet, &target)?;
        Ok(sent_at)
    }

    fn receive_with_deadline(&mut self, budget: Duration) -> io::Result<Received> {
        let socket = &self.socket;
        receive_within(budget, &mut self.buffer, |buf, left| {
            socket.set_read_timeout(Some(left))?;
            (&*socket).read(buf)
        })
    }
}

/// Wait up to `budget` for one datagram, calling `read` with the time left.
/// Reads cut short by a signal are retried until the budget runs out.
fn receive_within<F>(budget: Duration, buffer: &mut [u8], mut read: F) -> io::Result<Received>
where
    F: FnMut(&mut [u8], Duration) -> io::Result<usize>,
{
    let started = Instant::now();

    loop {
        let left = budget.saturating_sub(started.elapsed());
        // A zero timeval would block forever
        if left < Duration::from_micros(1) {
            return Ok(Received::Timeout);
        }

        match read(buffer, left) {
            Ok(len) => {
                let received_at = Instant::now();
                log::debug!("Received {} bytes", len);
                return Ok(Received::Packet {
                    received_at,
                    bytes: buffer[..len].to_vec(),
                });
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                log::debug!("Receive interrupted with {:?} left, retrying", left);
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                log::debug!("No datagram within {:?}", budget);
                return Ok(Received::Timeout);
            }
            Err(e) => return Err(e),
        }
    }
}
