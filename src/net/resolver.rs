//! Local interface address resolution via ifconfig

use crate::command::CommandRunner;
use crate::error::{AppError, Result};
use crate::net::InterfaceInfo;
use regex::Regex;
use std::sync::{Arc, LazyLock};

static INET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"inet (\d+\.\d+\.\d+\.\d+)").expect("static regex"));
static NETMASK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"netmask (\d+\.\d+\.\d+\.\d+)").expect("static regex"));

/// Resolves the IPv4 address and netmask of a named local interface.
///
/// Failure here is fatal: without the local subnet nothing can be scoped or
/// measured.
pub struct InterfaceResolver {
    runner: Arc<dyn CommandRunner>,
}

impl InterfaceResolver {
    /// Create a resolver over the given command runner
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Query the OS for the interface's IPv4 address and netmask
    pub async fn resolve(&self, interface: &str) -> Result<InterfaceInfo> {
        let output = self
            .runner
            .run("ifconfig", &[interface.to_string()])
            .await
            .map_err(|e| AppError::interface_query(format!("ifconfig {}: {}", interface, e)))?;

        if !output.success() {
            return Err(AppError::interface_query(format!(
                "ifconfig {} exited with {:?}: {}",
                interface,
                output.status,
                output.stderr.trim()
            )));
        }

        Self::parse_ifconfig(interface, &output.stdout)
    }

    /// Extract the inet and netmask tokens from ifconfig output
    fn parse_ifconfig(interface: &str, output: &str) -> Result<InterfaceInfo> {
        let ip = INET_RE
            .captures(output)
            .and_then(|c| c.get(1))
            .ok_or_else(|| {
                AppError::interface_query(format!(
                    "no IPv4 address found for interface {}",
                    interface
                ))
            })?;

        let netmask = NETMASK_RE
            .captures(output)
            .and_then(|c| c.get(1))
            .ok_or_else(|| {
                AppError::interface_query(format!("no netmask found for interface {}", interface))
            })?;

        Ok(InterfaceInfo::new(
            crate::net::parse_ipv4(ip.as_str())?,
            crate::net::parse_ipv4(netmask.as_str())?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    const IFCONFIG_OUTPUT: &str = "\
ib0: flags=4163<UP,BROADCAST,RUNNING,MULTICAST>  mtu 2044
        inet 10.0.0.5  netmask 255.255.255.0  broadcast 10.0.0.255
        inet6 fe80::ba59:9f03:fc:6a81  prefixlen 64  scopeid 0x20<link>
        unspec 00-00-10-86-FE-80-00-00-00-00-00-00-00-00-00-00  txqueuelen 256  (UNSPEC)
";

    #[test]
    fn test_parse_ifconfig_output() {
        let info = InterfaceResolver::parse_ifconfig("ib0", IFCONFIG_OUTPUT).unwrap();
        assert_eq!(info.ip, Ipv4Addr::new(10, 0, 0, 5));
        assert_eq!(info.netmask, Ipv4Addr::new(255, 255, 255, 0));
    }

    #[test]
    fn test_parse_ifconfig_normalizes_broadcast_mask() {
        let output = "ib0: flags=...\n        inet 10.128.0.12  netmask 255.255.255.255\n";
        let info = InterfaceResolver::parse_ifconfig("ib0", output).unwrap();
        assert_eq!(info.netmask, Ipv4Addr::new(255, 255, 255, 0));
        assert_eq!(info.network_address(), Ipv4Addr::new(10, 128, 0, 0));
    }

    #[test]
    fn test_parse_ifconfig_missing_inet_fails() {
        let output = "lo: flags=73<UP,LOOPBACK,RUNNING>  mtu 65536\n";
        let err = InterfaceResolver::parse_ifconfig("lo", output).unwrap_err();
        assert_eq!(err.category(), "INTERFACE");
    }

    #[test]
    fn test_parse_ifconfig_missing_netmask_fails() {
        let output = "ib0:\n        inet 10.0.0.5  broadcast 10.0.0.255\n";
        let err = InterfaceResolver::parse_ifconfig("ib0", output).unwrap_err();
        assert_eq!(err.category(), "INTERFACE");
        assert!(err.to_string().contains("netmask"));
    }
}
