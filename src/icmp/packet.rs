use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;
use std::net::Ipv4Addr;

use crate::icmp::checksum;

pub const ICMP_ECHO_REQUEST: u8 = 8;
pub const ICMP_ECHO_REPLY: u8 = 0;
pub const IPPROTO_ICMP: u8 = 1;

pub const IPV4_HEADER_LEN: usize = 20;
pub const ICMP_HEADER_LEN: usize = 8;
/// Smallest datagram a raw socket can hand us that still carries an echo header.
pub const MIN_REPLY_LEN: usize = IPV4_HEADER_LEN + ICMP_HEADER_LEN;

pub const DEFAULT_PAYLOAD_SIZE: usize = 56;
const PAYLOAD_START: u8 = 0x42;

/// Fixed 8-byte ICMP echo header, all multi-byte fields in network order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IcmpHeader {
    pub icmp_type: u8,
    pub code: u8,
    pub checksum: u16,
    pub identifier: u16,
    pub sequence: u16,
}

impl IcmpHeader {
    pub fn echo_request(identifier: u16, sequence: u16) -> Self {
        Self {
            icmp_type: ICMP_ECHO_REQUEST,
            code: 0,
            checksum: 0,
            identifier,
            sequence,
        }
    }

    pub fn write_to(&self, buf: &mut Vec<u8>) {
        // Writes into a Vec cannot fail
        buf.write_u8(self.icmp_type).unwrap();
        buf.write_u8(self.code).unwrap();
        buf.write_u16::<BigEndian>(self.checksum).unwrap();
        buf.write_u16::<BigEndian>(self.identifier).unwrap();
        buf.write_u16::<BigEndian>(self.sequence).unwrap();
    }

    fn read_from(cursor: &mut Cursor<&[u8]>) -> std::io::Result<Self> {
        Ok(Self {
            icmp_type: cursor.read_u8()?,
            code: cursor.read_u8()?,
            checksum: cursor.read_u16::<BigEndian>()?,
            identifier: cursor.read_u16::<BigEndian>()?,
            sequence: cursor.read_u16::<BigEndian>()?,
        })
    }
}

/// Fixed 20-byte IPv4 header (options are not decoded).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Header {
    pub version_ihl: u8,
    pub tos: u8,
    pub total_length: u16,
    pub id: u16,
    pub flags_fragment: u16,
    pub ttl: u8,
    pub protocol: u8,
    pub checksum: u16,
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
}

impl Ipv4Header {
    pub fn version(&self) -> u8 {
        self.version_ihl >> 4
    }

    /// Header length in 32-bit words.
    pub fn ihl(&self) -> u8 {
        self.version_ihl & 0x0F
    }

    #[cfg(test)]
    pub fn write_to(&self, buf: &mut Vec<u8>) {
        buf.write_u8(self.version_ihl).unwrap();
        buf.write_u8(self.tos).unwrap();
        buf.write_u16::<BigEndian>(self.total_length).unwrap();
        buf.write_u16::<BigEndian>(self.id).unwrap();
        buf.write_u16::<BigEndian>(self.flags_fragment).unwrap();
        buf.write_u8(self.ttl).unwrap();
        buf.write_u8(self.protocol).unwrap();
        buf.write_u16::<BigEndian>(self.checksum).unwrap();
        buf.write_u32::<BigEndian>(u32::from(self.source)).unwrap();
        buf.write_u32::<BigEndian>(u32::from(self.destination)).unwrap();
    }

    fn read_from(cursor: &mut Cursor<&[u8]>) -> std::io::Result<Self> {
        Ok(Self {
            version_ihl: cursor.read_u8()?,
            tos: cursor.read_u8()?,
            total_length: cursor.read_u16::<BigEndian>()?,
            id: cursor.read_u16::<BigEndian>()?,
            flags_fragment: cursor.read_u16::<BigEndian>()?,
            ttl: cursor.read_u8()?,
            protocol: cursor.read_u8()?,
            checksum: cursor.read_u16::<BigEndian>()?,
            source: Ipv4Addr::from(cursor.read_u32::<BigEndian>()?),
            destination: Ipv4Addr::from(cursor.read_u32::<BigEndian>()?),
        })
    }
}

/// An inbound echo datagram as read from a raw IPv4 socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoReply {
    pub ip: Ipv4Header,
    pub icmp: IcmpHeader,
    pub payload_size: usize,
}

impl EchoReply {
    pub fn source(&self) -> Ipv4Addr {
        self.ip.source
    }

    pub fn ttl(&self) -> u8 {
        self.ip.ttl
    }

    pub fn identifier(&self) -> u16 {
        self.icmp.identifier
    }

    pub fn sequence(&self) -> u16 {
        self.icmp.sequence
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    Truncated(usize),
    UnsupportedIpHeader { version: u8, ihl: u8 },
    NotIcmp(u8),
    NotEchoReply { icmp_type: u8, code: u8 },
    BadChecksum,
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::Truncated(len) => {
                write!(f, "datagram too short: {} bytes, need at least {}", len, MIN_REPLY_LEN)
            }
            DecodeError::UnsupportedIpHeader { version, ihl } => {
                write!(f, "unsupported IP header: version {}, ihl {}", version, ihl)
            }
            DecodeError::NotIcmp(protocol) => write!(f, "IP protocol {} is not ICMP", protocol),
            DecodeError::NotEchoReply { icmp_type, code } => {
                write!(f, "not an echo reply: type {}, code {}", icmp_type, code)
            }
            DecodeError::BadChecksum => write!(f, "ICMP checksum mismatch"),
        }
    }
}

impl std::error::Error for DecodeError {}

/// The payload byte at position `index`: 0x42, 0x43, ... wrapping at 0xFF.
fn payload_byte(index: usize) -> u8 {
    PAYLOAD_START.wrapping_add(index as u8)
}

/// Build an ICMP Echo Request with its checksum patched in.
pub fn encode_request(identifier: u16, sequence: u16, payload_len: usize) -> Vec<u8> {
    let mut header = IcmpHeader::echo_request(identifier, sequence);
    let payload: Vec<u8> = (0..payload_len).map(payload_byte).collect();

    let mut packet = Vec::with_capacity(ICMP_HEADER_LEN + payload_len);
    header.write_to(&mut packet);
    packet.extend_from_slice(&payload);
    header.checksum = checksum::compute(&packet);

    let mut bytes = Vec::with_capacity(packet.len());
    header.write_to(&mut bytes);
    bytes.extend_from_slice(&payload);
    bytes
}

/// Decode an IPv4 datagram carrying an ICMP echo message.
///
/// Only the length is checked: header checksums and message type are left
/// to the caller, so anything with a matching identifier counts.
pub fn decode_reply(bytes: &[u8]) -> Result<EchoReply, DecodeError> {
    if bytes.len() < MIN_REPLY_LEN {
        return Err(DecodeError::Truncated(bytes.len()));
    }

    let mut cursor = Cursor::new(bytes);
    // Length was checked above, so the fixed-size reads cannot run short
    let ip = Ipv4Header::read_from(&mut cursor).map_err(|_| DecodeError::Truncated(bytes.len()))?;
    let icmp = IcmpHeader::read_from(&mut cursor).map_err(|_| DecodeError::Truncated(bytes.len()))?;

    Ok(EchoReply {
        ip,
        icmp,
        payload_size: bytes.len() - MIN_REPLY_LEN,
    })
}

/// Like [`decode_reply`], but also rejects IP options, non-ICMP datagrams,
/// non-reply messages and corrupted ICMP checksums.
pub fn decode_reply_strict(bytes: &[u8]) -> Result<EchoReply, DecodeError> {
    let reply = decode_reply(bytes)?;

    if reply.ip.version() != 4 || reply.ip.ihl() != 5 {
        return Err(DecodeError::UnsupportedIpHeader {
            version: reply.ip.version(),
            ihl: reply.ip.ihl(),
        });
    }

    if reply.ip.protocol != IPPROTO_ICMP {
        return Err(DecodeError::NotIcmp(reply.ip.protocol));
    }

    if reply.icmp.icmp_type != ICMP_ECHO_REPLY || reply.icmp.code != 0 {
        return Err(DecodeError::NotEchoReply {
            icmp_type: reply.icmp.icmp_type,
            code: reply.icmp.code,
        });
    }

    if !checksum::verify(&bytes[IPV4_HEADER_LEN..]) {
        return Err(DecodeError::BadChecksum);
    }

    Ok(reply)
}

/// Wrap an ICMP message the way a raw IPv4 socket delivers it.
#[cfg(test)]
pub fn wrap_in_ipv4(icmp: &[u8], source: Ipv4Addr, destination: Ipv4Addr, ttl: u8) -> Vec<u8> {
    let ip = Ipv4Header {
        version_ihl: 0x45,
        tos: 0,
        total_length: (IPV4_HEADER_LEN + icmp.len()) as u16,
        id: 0x1c46,
        flags_fragment: 0x4000,
        ttl,
        protocol: IPPROTO_ICMP,
        checksum: 0,
        source,
        destination,
    };
    let mut datagram = Vec::with_capacity(IPV4_HEADER_LEN + icmp.len());
    ip.write_to(&mut datagram);
    datagram.extend_from_slice(icmp);
    datagram
}

/// Turn an encoded echo request into the matching echo reply message.
#[cfg(test)]
pub fn reply_for_request(request: &[u8]) -> Vec<u8> {
    let mut reply = request.to_vec();
    reply[0] = ICMP_ECHO_REPLY;
    reply[2] = 0;
    reply[3] = 0;
    let sum = checksum::compute(&reply);
    reply[2..4].copy_from_slice(&sum.to_be_bytes());
    reply
}
