//! Minimal IPv4 CIDR expansion. No external networking crate is pulled
//! in for this; the arithmetic is small enough to own directly.

use std::net::Ipv4Addr;

use crate::error::AdaptersError;

/// Expands `a.b.c.d/n` into every host address in the block, excluding
/// the network and broadcast addresses for prefixes shorter than /31.
pub fn expand_ipv4_cidr(cidr: &str) -> Result<Vec<Ipv4Addr>, AdaptersError> {
    let (addr_part, prefix_part) = cidr
        .split_once('/')
        .ok_or_else(|| AdaptersError::InvalidCidr(cidr.to_string()))?;

    let base: Ipv4Addr = addr_part
        .parse()
        .map_err(|_| AdaptersError::InvalidCidr(cidr.to_string()))?;
    let prefix: u32 = prefix_part
        .parse()
        .map_err(|_| AdaptersError::InvalidCidr(cidr.to_string()))?;
    if prefix > 32 {
        return Err(AdaptersError::InvalidCidr(cidr.to_string()));
    }

    let host_bits = 32 - prefix;
    let base_u32 = u32::from(base);
    let mask = if host_bits == 32 { 0 } else { !0u32 << host_bits };
    let network = base_u32 & mask;
    let host_count = 1u64 << host_bits;

    if host_bits <= 1 {
        return Ok((0..host_count).map(|i| Ipv4Addr::from(network + i as u32)).collect());
    }

    let first_host = network + 1;
    let last_host = network + (host_count as u32) - 2;
    Ok((first_host..=last_host).map(Ipv4Addr::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slash_thirty_excludes_network_and_broadcast() {
        let hosts = expand_ipv4_cidr("192.168.1.0/30").unwrap();
        assert_eq!(hosts, vec![Ipv4Addr::new(192, 168, 1, 1), Ipv4Addr::new(192, 168, 1, 2)]);
    }

    #[test]
    fn slash_thirty_one_keeps_both_addresses() {
        let hosts = expand_ipv4_cidr("10.0.0.0/31").unwrap();
        assert_eq!(hosts.len(), 2);
    }

    #[test]
    fn invalid_cidr_is_rejected() {
        assert!(expand_ipv4_cidr("not-an-address").is_err());
    }
}
