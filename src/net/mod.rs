//! Network address math and subnet scoping
//!
//! Octet-wise network-address computation, the broadcast-netmask
//! normalization workaround, and the scope policy that decides which
//! discovered candidates belong to the local segment.

pub mod resolver;

pub use resolver::InterfaceResolver;

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// Broadcast-style netmask reported by some cloud environments
const BROADCAST_MASK: Ipv4Addr = Ipv4Addr::new(255, 255, 255, 255);

/// Replacement mask applied when the broadcast mask is reported
const FALLBACK_MASK: Ipv4Addr = Ipv4Addr::new(255, 255, 255, 0);

/// Normalize a reported netmask before any network computation.
///
/// A mask of 255.255.255.255 is a known misreport on some cloud interfaces
/// and is treated as /24.
pub fn normalize_netmask(netmask: Ipv4Addr) -> Ipv4Addr {
    if netmask == BROADCAST_MASK {
        FALLBACK_MASK
    } else {
        netmask
    }
}

/// Compute the network address as the octet-wise AND of ip and mask.
///
/// The mask is normalized first, so callers can pass the raw reported value.
pub fn network_address(ip: Ipv4Addr, netmask: Ipv4Addr) -> Ipv4Addr {
    let mask = normalize_netmask(netmask);
    let ip_octets = ip.octets();
    let mask_octets = mask.octets();

    Ipv4Addr::new(
        ip_octets[0] & mask_octets[0],
        ip_octets[1] & mask_octets[1],
        ip_octets[2] & mask_octets[2],
        ip_octets[3] & mask_octets[3],
    )
}

/// Parse a dotted-decimal IPv4 address from a discovery source.
///
/// Failure indicates bad data from the source and is fatal for the run.
pub fn parse_ipv4(raw: &str) -> Result<Ipv4Addr> {
    raw.trim()
        .parse::<Ipv4Addr>()
        .map_err(|e| AppError::invalid_address(format!("'{}': {}", raw.trim(), e)))
}

/// Local interface addressing, computed once per run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceInfo {
    /// IPv4 address of the local interface
    pub ip: Ipv4Addr,
    /// Netmask as reported by the OS, already normalized
    pub netmask: Ipv4Addr,
}

impl InterfaceInfo {
    /// Create interface info, normalizing the reported netmask
    pub fn new(ip: Ipv4Addr, netmask: Ipv4Addr) -> Self {
        Self {
            ip,
            netmask: normalize_netmask(netmask),
        }
    }

    /// Network address of the local segment
    pub fn network_address(&self) -> Ipv4Addr {
        network_address(self.ip, self.netmask)
    }
}

/// Subnet membership policy for discovered candidates.
///
/// An explicit override target is measured regardless of subnet, so the
/// override path carries `Unrestricted` instead of repeating a skip flag in
/// every phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkScope {
    /// Candidate must satisfy `(ip & netmask) == network`
    Subnet {
        network: Ipv4Addr,
        netmask: Ipv4Addr,
    },
    /// Membership check bypassed (explicit override target)
    Unrestricted,
}

impl NetworkScope {
    /// Build the subnet scope of the local interface
    pub fn from_interface(info: &InterfaceInfo) -> Self {
        Self::Subnet {
            network: info.network_address(),
            netmask: info.netmask,
        }
    }

    /// Whether the candidate belongs to this scope
    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        match self {
            Self::Subnet { network, netmask } => network_address(ip, *netmask) == *network,
            Self::Unrestricted => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_address_is_octet_wise_and() {
        let ip = Ipv4Addr::new(10, 0, 0, 5);
        let mask = Ipv4Addr::new(255, 255, 255, 0);
        assert_eq!(network_address(ip, mask), Ipv4Addr::new(10, 0, 0, 0));

        let ip = Ipv4Addr::new(192, 168, 13, 77);
        let mask = Ipv4Addr::new(255, 255, 0, 0);
        assert_eq!(network_address(ip, mask), Ipv4Addr::new(192, 168, 0, 0));
    }

    #[test]
    fn test_network_address_is_idempotent() {
        let ip = Ipv4Addr::new(172, 16, 4, 200);
        let mask = Ipv4Addr::new(255, 255, 252, 0);
        let first = network_address(ip, mask);
        let second = network_address(first, mask);
        assert_eq!(first, second);
    }

    #[test]
    fn test_broadcast_mask_is_normalized() {
        assert_eq!(
            normalize_netmask(Ipv4Addr::new(255, 255, 255, 255)),
            Ipv4Addr::new(255, 255, 255, 0)
        );
        assert_eq!(
            normalize_netmask(Ipv4Addr::new(255, 255, 254, 0)),
            Ipv4Addr::new(255, 255, 254, 0)
        );

        // Normalization applies before the AND as well
        let ip = Ipv4Addr::new(10, 0, 0, 5);
        assert_eq!(
            network_address(ip, Ipv4Addr::new(255, 255, 255, 255)),
            Ipv4Addr::new(10, 0, 0, 0)
        );
    }

    #[test]
    fn test_interface_info_normalizes_on_construction() {
        let info = InterfaceInfo::new(
            Ipv4Addr::new(10, 0, 0, 5),
            Ipv4Addr::new(255, 255, 255, 255),
        );
        assert_eq!(info.netmask, Ipv4Addr::new(255, 255, 255, 0));
        assert_eq!(info.network_address(), Ipv4Addr::new(10, 0, 0, 0));
    }

    #[test]
    fn test_subnet_scope_membership() {
        let info = InterfaceInfo::new(
            Ipv4Addr::new(10, 0, 0, 5),
            Ipv4Addr::new(255, 255, 255, 0),
        );
        let scope = NetworkScope::from_interface(&info);

        assert!(scope.contains(Ipv4Addr::new(10, 0, 0, 7)));
        assert!(scope.contains(Ipv4Addr::new(10, 0, 0, 254)));
        assert!(!scope.contains(Ipv4Addr::new(192, 168, 1, 2)));
        assert!(!scope.contains(Ipv4Addr::new(10, 0, 1, 7)));
    }

    #[test]
    fn test_unrestricted_scope_accepts_everything() {
        let scope = NetworkScope::Unrestricted;
        assert!(scope.contains(Ipv4Addr::new(192, 168, 1, 2)));
        assert!(scope.contains(Ipv4Addr::new(8, 8, 8, 8)));
    }

    #[test]
    fn test_parse_ipv4_rejects_malformed() {
        assert!(parse_ipv4("10.0.0.9").is_ok());
        assert!(parse_ipv4(" 10.0.0.9 ").is_ok());

        let err = parse_ipv4("10.0.0").unwrap_err();
        assert_eq!(err.category(), "ADDRESS");
        assert!(!err.is_recoverable());
    }
}
