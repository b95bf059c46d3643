use thiserror::Error;

use std::net::Ipv4Addr;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("prefix length {0} outside valid IPv4 range 0-32")]
    InvalidPrefix(u8),
}

/// Dotted-quad netmask with the highest `prefix` bits set.
pub fn netmask(prefix: u8) -> Result<Ipv4Addr, Error> {
    let bits = match prefix {
        0 => 0u32,
        p if p <= 32 => (u32::MAX >> (32 - u32::from(p))) << (32 - u32::from(p)),
        p => return Err(Error::InvalidPrefix(p)),
    };
    Ok(Ipv4Addr::from(bits))
}

/// Prefix length of a netmask, or `None` if the set bits are not contiguous
/// from the top.
pub fn prefix_len(mask: Ipv4Addr) -> Option<u8> {
    let bits = u32::from(mask);
    let ones = bits.leading_ones();
    if bits.checked_shl(ones).unwrap_or(0) == 0 {
        Some(ones as u8)
    } else {
        None
    }
}
