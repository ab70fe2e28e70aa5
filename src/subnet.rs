//! Subnet derivation and input records

use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// CIDR block used as the unit of resolution and reporting
///
/// Always stored in canonical (truncated) form, so two IPs of the same
/// block produce equal subnets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Subnet(IpNet);

impl Subnet {
    /// Derive the subnet containing `ip` at the given prefix lengths
    ///
    /// Returns `None` if the prefix length is out of range for the
    /// address family.
    pub fn containing(ip: IpAddr, prefixes: PrefixLengths) -> Option<Self> {
        let net = match ip {
            IpAddr::V4(v4) => IpNet::V4(Ipv4Net::new(v4, prefixes.ipv4).ok()?.trunc()),
            IpAddr::V6(v6) => IpNet::V6(Ipv6Net::new(v6, prefixes.ipv6).ok()?.trunc()),
        };
        Some(Subnet(net))
    }

    /// The underlying network
    pub fn net(&self) -> IpNet {
        self.0
    }

    /// Check whether an address falls inside this subnet
    pub fn contains(&self, ip: &IpAddr) -> bool {
        self.0.contains(ip)
    }

    /// Network address of the block
    pub fn network(&self) -> IpAddr {
        self.0.network()
    }
}

impl fmt::Display for Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Subnet {
    type Err = ipnet::AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Subnet(s.trim().parse::<IpNet>()?.trunc()))
    }
}

impl From<Subnet> for String {
    fn from(subnet: Subnet) -> Self {
        subnet.to_string()
    }
}

impl TryFrom<String> for Subnet {
    type Error = ipnet::AddrParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Prefix lengths applied when grouping addresses into subnets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixLengths {
    /// Prefix length for IPv4 addresses
    pub ipv4: u8,
    /// Prefix length for IPv6 addresses
    pub ipv6: u8,
}

impl Default for PrefixLengths {
    fn default() -> Self {
        Self {
            ipv4: crate::config::timing::DEFAULT_IPV4_PREFIX_LEN,
            ipv6: crate::config::timing::DEFAULT_IPV6_PREFIX_LEN,
        }
    }
}

/// One input line that carried a valid IP address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpRecord {
    /// Raw source text of the line
    pub original_line: String,
    /// Address found on the line
    pub ip: IpAddr,
    /// Subnet the address belongs to
    pub subnet: Subnet,
}

impl IpRecord {
    /// Build a record, deriving its subnet
    pub fn new(
        original_line: impl Into<String>,
        ip: IpAddr,
        prefixes: PrefixLengths,
    ) -> Option<Self> {
        Some(Self {
            original_line: original_line.into(),
            ip,
            subnet: Subnet::containing(ip, prefixes)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subnet_derivation_v4() {
        let prefixes = PrefixLengths::default();
        let a = Subnet::containing("45.164.77.202".parse().unwrap(), prefixes).unwrap();
        let b = Subnet::containing("45.164.88.10".parse().unwrap(), prefixes).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "45.164.0.0/16");
        assert!(a.contains(&"45.164.255.1".parse().unwrap()));
        assert!(!a.contains(&"45.165.0.1".parse().unwrap()));
    }

    #[test]
    fn test_subnet_derivation_custom_prefix() {
        let prefixes = PrefixLengths { ipv4: 24, ipv6: 32 };
        let s = Subnet::containing("8.8.4.4".parse().unwrap(), prefixes).unwrap();
        assert_eq!(s.to_string(), "8.8.4.0/24");

        let s = Subnet::containing("2001:db8:1234::1".parse().unwrap(), prefixes).unwrap();
        assert_eq!(s.to_string(), "2001:db8::/32");
    }

    #[test]
    fn test_invalid_prefix_rejected() {
        let prefixes = PrefixLengths { ipv4: 33, ipv6: 48 };
        assert!(Subnet::containing("1.2.3.4".parse().unwrap(), prefixes).is_none());
    }

    #[test]
    fn test_parse_canonicalizes() {
        let s: Subnet = "10.1.2.3/16".parse().unwrap();
        assert_eq!(s.to_string(), "10.1.0.0/16");
        assert!("not-a-subnet".parse::<Subnet>().is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let s: Subnet = "45.164.0.0/16".parse().unwrap();
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, "\"45.164.0.0/16\"");
        let back: Subnet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }
}
