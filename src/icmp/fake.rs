//! Scripted in-memory transport with a virtual clock.

use std::collections::VecDeque;
use std::io;
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use crate::icmp::packet::{self, IcmpHeader, ICMP_HEADER_LEN};
use crate::icmp::socket::{Received, Transport};
use crate::probe::ShutdownTrigger;

pub const PEER: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 1);
const LOCAL: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 2);

/// A request as the fake saw it on the wire.
#[derive(Debug, Clone)]
pub struct SentRequest {
    pub header: IcmpHeader,
    pub payload_len: usize,
}

/// Decides what arrives after each request: `(delay after send, datagram)`.
type Responder = Box<dyn FnMut(&SentRequest, &[u8]) -> Vec<(Duration, Vec<u8>)> + Send>;

pub struct FakeTransport {
    clock: Instant,
    inbox: VecDeque<(Instant, Vec<u8>)>,
    responder: Responder,
    pub sent: Vec<SentRequest>,
    fail_sends: bool,
    cancel: Option<(usize, ShutdownTrigger)>,
}

impl FakeTransport {
    pub fn new<F>(responder: F) -> Self
    where
        F: FnMut(&SentRequest, &[u8]) -> Vec<(Duration, Vec<u8>)> + Send + 'static,
    {
        Self {
            clock: Instant::now(),
            inbox: VecDeque::new(),
            responder: Box::new(responder),
            sent: Vec::new(),
            fail_sends: false,
            cancel: None,
        }
    }

    /// Echoes every request back after `delay`.
    pub fn echoing(delay: Duration) -> Self {
        Self::new(move |_, request| vec![(delay, echo_datagram(request))])
    }

    /// Never answers.
    pub fn silent() -> Self {
        Self::new(|_, _| Vec::new())
    }

    pub fn failing_sends(mut self) -> Self {
        self.fail_sends = true;
        self
    }

    /// Fire `trigger` once `sends` requests have gone out.
    pub fn cancel_after(mut self, sends: usize, trigger: ShutdownTrigger) -> Self {
        self.cancel = Some((sends, trigger));
        self
    }
}

impl Transport for FakeTransport {
    fn send(&mut self, bytes: &[u8], _destination: Ipv4Addr) -> io::Result<Instant> {
        let header = IcmpHeader {
            icmp_type: bytes[0],
            code: bytes[1],
            checksum: u16::from_be_bytes([bytes[2], bytes[3]]),
            identifier: u16::from_be_bytes([bytes[4], bytes[5]]),
            sequence: u16::from_be_bytes([bytes[6], bytes[7]]),
        };
        let request = SentRequest {
            header,
            payload_len: bytes.len() - ICMP_HEADER_LEN,
        };

        let sent_at = self.clock;
        let outcome = if self.fail_sends {
            Err(io::Error::other("network is unreachable"))
        } else {
            for (delay, datagram) in (self.responder)(&request, bytes) {
                self.inbox.push_back((sent_at + delay, datagram));
            }
            self.inbox.make_contiguous().sort_by_key(|(at, _)| *at);
            Ok(sent_at)
        };

        self.sent.push(request);
        if let Some((sends, trigger)) = &self.cancel {
            if self.sent.len() >= *sends {
                trigger.trigger();
            }
        }
        outcome
    }

    fn receive_with_deadline(&mut self, budget: Duration) -> io::Result<Received> {
        let deadline = self.clock + budget;
        let due = self.inbox.front().is_some_and(|(at, _)| *at <= deadline);
        if due {
            if let Some((at, bytes)) = self.inbox.pop_front() {
                self.clock = self.clock.max(at);
                return Ok(Received::Packet { received_at: self.clock, bytes });
            }
        }
        self.clock = deadline;
        Ok(Received::Timeout)
    }

    fn now(&self) -> Instant {
        self.clock
    }
}

/// The datagram a well-behaved peer would send back for `request`.
pub fn echo_datagram(request: &[u8]) -> Vec<u8> {
    packet::wrap_in_ipv4(&packet::reply_for_request(request), PEER, LOCAL, 64)
}

/// An echo reply for `request` rewritten to carry someone else's identifier.
pub fn foreign_datagram(request: &[u8], identifier: u16) -> Vec<u8> {
    let mut reply = request.to_vec();
    reply[4..6].copy_from_slice(&identifier.to_be_bytes());
    echo_datagram(&reply)
}
