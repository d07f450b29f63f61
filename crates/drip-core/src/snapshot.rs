//! IPv4 snapshot model
//!
//! A snapshot is one interface's IPv4 configuration at a point in time: one
//! address, a prefix length, an optional default gateway and up to two DNS
//! servers. Parsing is strict; file contents are never trusted as-is.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Which of the three per-interface snapshots a record is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotKind {
    /// The steady-state configuration
    Production,
    /// The operator-provisioned disaster-recovery configuration
    Dr,
    /// The configuration observed at the end of the last pass
    Previous,
}

impl SnapshotKind {
    /// File name for this kind at the given 1-based slot
    pub fn file_name(self, slot: usize) -> String {
        match self {
            Self::Production => format!("ipconfig-{slot}.csv"),
            Self::Dr => format!("dr_ipconfig-{slot}.csv"),
            Self::Previous => format!("previous_ipconfig-{slot}.csv"),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Dr => "dr",
            Self::Previous => "previous",
        }
    }
}

impl fmt::Display for SnapshotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// DNS servers of a snapshot: always a primary and a secondary
///
/// When the OS reports a single server it fills both slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DnsServers {
    pub primary: Ipv4Addr,
    pub secondary: Ipv4Addr,
}

impl DnsServers {
    /// Both servers set
    pub fn pair(primary: Ipv4Addr, secondary: Ipv4Addr) -> Self {
        Self {
            primary,
            secondary,
        }
    }

    /// Build from an OS-reported server list, keeping at most the first two
    pub fn from_list(servers: &[Ipv4Addr]) -> Option<Self> {
        let primary = *servers.first()?;
        Some(Self {
            primary,
            secondary: servers.get(1).copied().unwrap_or(primary),
        })
    }

    /// Distinct servers in priority order
    pub fn to_vec(&self) -> Vec<Ipv4Addr> {
        if self.secondary == self.primary {
            vec![self.primary]
        } else {
            vec![self.primary, self.secondary]
        }
    }
}

/// One interface's IPv4 configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv4Snapshot {
    /// Interface address
    pub address: Ipv4Addr,
    /// Prefix length, 0..=32
    pub prefix_length: u8,
    /// Default gateway; `None` means no default route is configured
    pub gateway: Option<Ipv4Addr>,
    /// DNS servers; `None` means DNS is not configured
    pub dns: Option<DnsServers>,
}

impl Ipv4Snapshot {
    /// Create a snapshot, validating the prefix length
    pub fn new(address: Ipv4Addr, prefix_length: u8) -> Result<Self> {
        if prefix_length > 32 {
            return Err(Error::invalid_snapshot(format!(
                "prefix length {prefix_length} is out of range 0..=32"
            )));
        }

        Ok(Self {
            address,
            prefix_length,
            gateway: None,
            dns: None,
        })
    }

    /// Set the default gateway
    pub fn with_gateway(mut self, gateway: Ipv4Addr) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Set both DNS servers
    pub fn with_dns(mut self, primary: Ipv4Addr, secondary: Ipv4Addr) -> Self {
        self.dns = Some(DnsServers::pair(primary, secondary));
        self
    }

    /// The snapshot reported for an interface with no IPv4 address
    pub fn unconfigured() -> Self {
        Self {
            address: Ipv4Addr::UNSPECIFIED,
            prefix_length: 0,
            gateway: None,
            dns: None,
        }
    }

    /// Whether both snapshots carry the same interface address
    ///
    /// Decisions compare addresses only; gateway and DNS differences do not
    /// make two snapshots "different states".
    pub fn same_address(&self, other: &Ipv4Snapshot) -> bool {
        self.address == other.address
    }

    /// Parse a snapshot from its five textual fields
    ///
    /// Empty strings stand for absent values. The address and prefix length
    /// are required. DNS servers come in pairs: a row with only one of them
    /// is rejected.
    pub fn parse_fields(
        address: &str,
        prefix_length: &str,
        gateway: &str,
        primary_dns: &str,
        secondary_dns: &str,
    ) -> Result<Self> {
        let address = parse_addr("IPAddress", address)?
            .ok_or_else(|| Error::invalid_snapshot("IPAddress is required"))?;

        let prefix_length = prefix_length.trim();
        let prefix_length: u8 = prefix_length.parse().map_err(|_| {
            Error::invalid_snapshot(format!("PrefixLength '{prefix_length}' is not a number"))
        })?;

        let mut snapshot = Self::new(address, prefix_length)?;
        snapshot.gateway = parse_addr("IPv4DefaultGateway", gateway)?;

        let primary = parse_addr("PrimaryDNSServer", primary_dns)?;
        let secondary = parse_addr("SecondaryDNSServer", secondary_dns)?;
        snapshot.dns = match (primary, secondary) {
            (Some(primary), Some(secondary)) => Some(DnsServers::pair(primary, secondary)),
            (None, None) => None,
            (Some(_), None) => {
                return Err(Error::invalid_snapshot(
                    "PrimaryDNSServer is set but SecondaryDNSServer is empty",
                ));
            }
            (None, Some(_)) => {
                return Err(Error::invalid_snapshot(
                    "SecondaryDNSServer is set but PrimaryDNSServer is empty",
                ));
            }
        };

        Ok(snapshot)
    }
}

fn parse_addr(column: &str, value: &str) -> Result<Option<Ipv4Addr>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }

    Ipv4Addr::from_str(value).map(Some).map_err(|_| {
        Error::invalid_snapshot(format!("{column} '{value}' is not a dotted-quad IPv4 address"))
    })
}

impl fmt::Display for Ipv4Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_length)?;
        if let Some(gateway) = self.gateway {
            write!(f, " via {gateway}")?;
        }
        if let Some(dns) = self.dns {
            write!(f, " dns {},{}", dns.primary, dns.secondary)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_row() {
        let snapshot =
            Ipv4Snapshot::parse_fields("10.0.0.5", "24", "10.0.0.1", "10.0.0.2", "10.0.0.3")
                .unwrap();

        assert_eq!(snapshot.address, Ipv4Addr::new(10, 0, 0, 5));
        assert_eq!(snapshot.prefix_length, 24);
        assert_eq!(snapshot.gateway, Some(Ipv4Addr::new(10, 0, 0, 1)));
        assert_eq!(
            snapshot.dns,
            Some(DnsServers::pair(
                Ipv4Addr::new(10, 0, 0, 2),
                Ipv4Addr::new(10, 0, 0, 3)
            ))
        );
    }

    #[test]
    fn empty_gateway_means_no_default_route() {
        let snapshot = Ipv4Snapshot::parse_fields("192.168.1.10", "24", "", "", "").unwrap();
        assert_eq!(snapshot.gateway, None);
        assert_eq!(snapshot.dns, None);
    }

    #[test]
    fn rejects_out_of_range_prefix() {
        let err = Ipv4Snapshot::parse_fields("10.0.0.5", "33", "", "", "").unwrap_err();
        assert!(matches!(err, Error::InvalidSnapshot(_)));

        assert!(Ipv4Snapshot::parse_fields("10.0.0.5", "-1", "", "", "").is_err());
        assert!(Ipv4Snapshot::parse_fields("10.0.0.5", "abc", "", "", "").is_err());
    }

    #[test]
    fn rejects_non_dotted_quad_addresses() {
        assert!(Ipv4Snapshot::parse_fields("10.0.0", "24", "", "", "").is_err());
        assert!(Ipv4Snapshot::parse_fields("10.0.0.256", "24", "", "", "").is_err());
        assert!(Ipv4Snapshot::parse_fields("fe80::1", "64", "", "", "").is_err());
        assert!(Ipv4Snapshot::parse_fields("10.0.0.5", "24", "gateway", "", "").is_err());
        assert!(Ipv4Snapshot::parse_fields("", "24", "", "", "").is_err());
    }

    #[test]
    fn rejects_secondary_dns_without_primary() {
        let err =
            Ipv4Snapshot::parse_fields("10.0.0.5", "24", "", "", "10.0.0.3").unwrap_err();
        assert!(err.to_string().contains("PrimaryDNSServer"));
    }

    #[test]
    fn rejects_primary_dns_without_secondary() {
        let err = Ipv4Snapshot::parse_fields("10.0.0.5", "24", "10.0.0.1", "10.0.0.2", "")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSnapshot(_)));
        assert!(err.to_string().contains("SecondaryDNSServer"));
    }

    #[test]
    fn single_live_dns_server_fills_both_slots() {
        let dns = DnsServers::from_list(&[Ipv4Addr::new(10, 0, 0, 2)]).unwrap();
        assert_eq!(dns, DnsServers::pair(Ipv4Addr::new(10, 0, 0, 2), Ipv4Addr::new(10, 0, 0, 2)));
        assert_eq!(dns.to_vec(), vec![Ipv4Addr::new(10, 0, 0, 2)]);
    }

    #[test]
    fn same_address_ignores_gateway_and_dns() {
        let a = Ipv4Snapshot::new(Ipv4Addr::new(10, 0, 0, 5), 24)
            .unwrap()
            .with_gateway(Ipv4Addr::new(10, 0, 0, 1));
        let b = Ipv4Snapshot::new(Ipv4Addr::new(10, 0, 0, 5), 16).unwrap();
        assert!(a.same_address(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn dns_from_list_keeps_first_two() {
        let servers = [
            Ipv4Addr::new(1, 1, 1, 1),
            Ipv4Addr::new(8, 8, 8, 8),
            Ipv4Addr::new(9, 9, 9, 9),
        ];
        let dns = DnsServers::from_list(&servers).unwrap();
        assert_eq!(dns.to_vec(), servers[..2].to_vec());
        assert_eq!(DnsServers::from_list(&[]), None);
    }

    #[test]
    fn file_names_follow_slot() {
        assert_eq!(SnapshotKind::Production.file_name(1), "ipconfig-1.csv");
        assert_eq!(SnapshotKind::Dr.file_name(2), "dr_ipconfig-2.csv");
        assert_eq!(SnapshotKind::Previous.file_name(3), "previous_ipconfig-3.csv");
    }

    #[test]
    fn display_is_compact() {
        let snapshot = Ipv4Snapshot::new(Ipv4Addr::new(10, 0, 0, 5), 24)
            .unwrap()
            .with_gateway(Ipv4Addr::new(10, 0, 0, 1))
            .with_dns(Ipv4Addr::new(10, 0, 0, 2), Ipv4Addr::new(10, 0, 0, 3));
        assert_eq!(
            snapshot.to_string(),
            "10.0.0.5/24 via 10.0.0.1 dns 10.0.0.2,10.0.0.3"
        );
    }
}
