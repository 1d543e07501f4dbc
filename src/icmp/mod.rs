pub mod checksum;
pub mod packet;
pub mod socket;

#[cfg(test)]
pub mod fake;

pub use packet::*;
pub use socket::*;
