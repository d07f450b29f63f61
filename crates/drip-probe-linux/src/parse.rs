//! Parsers for `ip -j` JSON and `resolvectl` text output

use serde::Deserialize;
use std::net::Ipv4Addr;

/// One entry of `ip -j link show`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Link {
    pub ifindex: u32,
    pub ifname: String,
    #[serde(default)]
    pub flags: Vec<String>,
    #[serde(default)]
    pub operstate: String,
}

impl Link {
    pub fn is_loopback(&self) -> bool {
        self.has_flag("LOOPBACK")
    }

    /// Operationally up
    ///
    /// Some virtual NICs never report an operstate; for those an
    /// administratively up link with carrier counts as up.
    pub fn is_up(&self) -> bool {
        match self.operstate.as_str() {
            "UP" => true,
            "UNKNOWN" => self.has_flag("UP") && self.has_flag("LOWER_UP"),
            _ => false,
        }
    }

    fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }
}

/// The first IPv4 address of an interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressInfo {
    pub address: Ipv4Addr,
    pub prefix_length: u8,
    /// Lease-managed (`dynamic` flag), i.e. obtained through DHCP
    pub dynamic: bool,
}

#[derive(Debug, Deserialize)]
struct AddrEntry {
    #[serde(default)]
    addr_info: Vec<AddrInfo>,
}

#[derive(Debug, Deserialize)]
struct AddrInfo {
    #[serde(default)]
    family: String,
    local: Option<String>,
    prefixlen: Option<u8>,
    #[serde(default)]
    dynamic: bool,
}

#[derive(Debug, Deserialize)]
struct Route {
    gateway: Option<String>,
}

/// `ip -j` prints nothing at all for some empty results
fn parse_list<T: for<'de> Deserialize<'de>>(json: &str) -> serde_json::Result<Vec<T>> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(json)
}

/// Up, non-loopback links sorted by interface index
pub fn active_links(json: &str) -> serde_json::Result<Vec<Link>> {
    let mut links: Vec<Link> = parse_list(json)?
        .into_iter()
        .filter(|l: &Link| l.is_up() && !l.is_loopback())
        .collect();
    links.sort_by_key(|l| l.ifindex);
    Ok(links)
}

/// First IPv4 address in `ip -j -4 addr show dev <name>`
pub fn first_ipv4_address(json: &str) -> serde_json::Result<Option<AddressInfo>> {
    let entries: Vec<AddrEntry> = parse_list(json)?;

    Ok(entries
        .iter()
        .flat_map(|e| e.addr_info.iter())
        .filter(|a| a.family == "inet")
        .find_map(|a| {
            let address = a.local.as_deref()?.parse().ok()?;
            Some(AddressInfo {
                address,
                prefix_length: a.prefixlen?,
                dynamic: a.dynamic,
            })
        }))
}

/// Gateway of the first default route in `ip -j -4 route show default dev <name>`
pub fn default_gateway(json: &str) -> serde_json::Result<Option<Ipv4Addr>> {
    let routes: Vec<Route> = parse_list(json)?;

    Ok(routes
        .iter()
        .find_map(|r| r.gateway.as_deref()?.parse().ok()))
}

/// IPv4 servers listed by `resolvectl dns <name>`
///
/// The output looks like `Link 2 (eth0): 10.0.0.2 10.0.0.3 fe80::1`.
/// IPv6 servers are skipped.
pub fn resolvectl_dns(output: &str) -> Vec<Ipv4Addr> {
    output
        .lines()
        .filter_map(|line| line.split_once("):").map(|(_, servers)| servers))
        .flat_map(str::split_whitespace)
        .filter_map(|token| token.parse().ok())
        .collect()
}
