use std::io;
use std::net::Ipv4Addr;
use std::time::Duration;

use crate::icmp::{self, DecodeError, EchoReply, Received, Transport};

/// Result of a single echo exchange.
#[derive(Debug)]
pub enum Attempt {
    Replied { delay: Duration, reply: EchoReply },
    TimedOut,
    SendFailed(io::Error),
}

impl Attempt {
    pub fn delay(&self) -> Option<Duration> {
        match self {
            Attempt::Replied { delay, .. } => Some(*delay),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub identifier: u16,
    pub payload_size: usize,
    pub timeout: Duration,
    pub strict: bool,
}

/// Echo exchanges with one already-resolved destination over one transport.
pub struct PingSession<T> {
    transport: T,
    destination: Ipv4Addr,
    options: SessionOptions,
}

impl<T: Transport> PingSession<T> {
    pub fn new(transport: T, destination: Ipv4Addr, options: SessionOptions) -> Self {
        Self {
            transport,
            destination,
            options,
        }
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn run_one(&mut self, sequence: u16) -> Attempt {
        let packet = icmp::encode_request(self.options.identifier, sequence, self.options.payload_size);

        let sent_at = match self.transport.send(&packet, self.destination) {
            Ok(sent_at) => sent_at,
            Err(e) => {
                log::debug!("Send of icmp_seq={} failed: {}", sequence, e);
                return Attempt::SendFailed(e);
            }
        };

        let mut remaining = self.options.timeout;
        loop {
            let wait_started = self.transport.now();

            let (received_at, bytes) = match self.transport.receive_with_deadline(remaining) {
                Ok(Received::Packet { received_at, bytes }) => (received_at, bytes),
                Ok(Received::Timeout) => return Attempt::TimedOut,
                Err(e) => {
                    log::warn!("Receive failed while waiting for icmp_seq={}: {}", sequence, e);
                    return Attempt::TimedOut;
                }
            };

            match self.decode(&bytes) {
                Ok(reply) if reply.identifier() == self.options.identifier => {
                    return Attempt::Replied {
                        delay: received_at.saturating_duration_since(sent_at),
                        reply,
                    };
                }
                Ok(reply) => {
                    log::debug!(
                        "Ignoring ICMP type {} from {} with identifier {}",
                        reply.icmp.icmp_type,
                        reply.source(),
                        reply.identifier()
                    );
                }
                Err(e) => log::debug!("Dropping datagram: {}", e),
            }

            remaining = remaining.saturating_sub(received_at.saturating_duration_since(wait_started));
            if remaining.is_zero() {
                return Attempt::TimedOut;
            }
        }
    }

    fn decode(&self, bytes: &[u8]) -> Result<EchoReply, DecodeError> {
        if self.options.strict {
            icmp::decode_reply_strict(bytes)
        } else {
            icmp::decode_reply(bytes)
        }
    }
}
