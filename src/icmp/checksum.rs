//! Internet checksum (RFC 1071) for ICMP messages.

/// Compute the one's-complement checksum of `data`.
///
/// Words are summed in host byte order and the result is converted to
/// network order, so writing the returned value big-endian into the header
/// produces the correct wire bytes on any host.
pub fn compute(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;

    let mut words = data.chunks_exact(2);
    for word in &mut words {
        sum = sum.wrapping_add(u16::from_ne_bytes([word[0], word[1]]) as u32);
    }

    // Odd trailing byte is padded with a zero byte
    if let [last] = words.remainder() {
        sum = sum.wrapping_add(u16::from_ne_bytes([*last, 0]) as u32);
    }

    sum = (sum >> 16) + (sum & 0xFFFF);
    sum += sum >> 16;

    (!(sum as u16)).to_be()
}

/// True when a complete message, checksum field included, sums to zero.
pub fn verify(data: &[u8]) -> bool {
    compute(data) == 0
}
