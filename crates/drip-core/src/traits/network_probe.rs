// # Network Probe Trait
//
// Defines the capability interface over the host OS network stack.
//
// ## Implementations
//
// - Linux (iproute2 + systemd-resolved): `drip-probe-linux` crate
// - Tests: a recording fake in `drip-core/tests/common`
//
// ## Usage
//
// ```rust,ignore
// use drip_core::NetworkProbe;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let probe = /* NetworkProbe implementation */;
//
//     for handle in probe.list_active_interfaces().await? {
//         let live = probe.read_ipv4(&handle).await?;
//         println!("{}: {} (dhcp: {})", handle, live.snapshot, live.is_dhcp);
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::fmt;
use std::net::Ipv4Addr;

use crate::snapshot::Ipv4Snapshot;

/// One active interface, identified by its slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceHandle {
    /// 1-based position in the index-sorted list of "up" interfaces
    pub slot: usize,
    /// Interface index as reported by the OS
    pub os_index: u32,
    /// Interface name (not stable across reboots)
    pub name: String,
}

impl InterfaceHandle {
    pub fn new(slot: usize, os_index: u32, name: impl Into<String>) -> Self {
        Self {
            slot,
            os_index,
            name: name.into(),
        }
    }
}

impl fmt::Display for InterfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {} (index {})", self.slot, self.name, self.os_index)
    }
}

/// Live IPv4 configuration read from the OS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveIpv4 {
    /// What is configured right now
    pub snapshot: Ipv4Snapshot,
    /// Whether the address was obtained through DHCP
    pub is_dhcp: bool,
}

impl LiveIpv4 {
    pub fn new(snapshot: Ipv4Snapshot, is_dhcp: bool) -> Self {
        Self { snapshot, is_dhcp }
    }
}

/// Trait for network probe implementations
///
/// The probe is an **executor**, not a decision-maker: it reports what the
/// OS says and does what it is told.
///
/// ## Allowed Capabilities
/// - ✅ Platform-specific I/O (netlink, iproute2, WMI, resolver APIs)
/// - ✅ Sending ICMP echo requests
///
/// ## Forbidden Capabilities
/// - ❌ Access the config store (owned by the `Reconciler`)
/// - ❌ Retry failed applies (the run is fail-fast)
/// - ❌ Sleep between steps (settle delays belong to `GatewayProbe`)
/// - ❌ Roll back a partially applied configuration
#[async_trait]
pub trait NetworkProbe: Send + Sync {
    /// List interfaces in the "up" state, sorted by OS interface index
    ///
    /// Slots are assigned 1..=n in that order. Loopback interfaces are not
    /// listed.
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<InterfaceHandle>)`: At least one interface
    /// - `Err(Error::NoActiveInterface)`: Nothing is up
    async fn list_active_interfaces(&self) -> Result<Vec<InterfaceHandle>, crate::Error>;

    /// Read an interface's current IPv4 configuration
    ///
    /// An interface without an IPv4 address reports
    /// [`Ipv4Snapshot::unconfigured`].
    ///
    /// # Returns
    ///
    /// - `Ok(LiveIpv4)`: The live configuration and its DHCP flag
    /// - `Err(Error::ProbeRead)`: Any OS-level failure
    async fn read_ipv4(&self, interface: &InterfaceHandle) -> Result<LiveIpv4, crate::Error>;

    /// Apply a static configuration
    ///
    /// Clears existing routes and addresses, sets address and prefix (and
    /// the default route when the snapshot has a gateway), then sets DNS.
    /// If the address step fails DNS is not attempted. If DNS fails the new
    /// address stays in place and the error is returned.
    async fn apply_static(
        &self,
        interface: &InterfaceHandle,
        snapshot: &Ipv4Snapshot,
    ) -> Result<(), crate::Error>;

    /// Clear routes, enable DHCP and reset DNS to automatic
    async fn apply_dhcp(&self, interface: &InterfaceHandle) -> Result<(), crate::Error>;

    /// Send a single echo request
    ///
    /// Returns `true` if a reply came back. Probe failures count as
    /// unreachable.
    async fn ping(&self, address: Ipv4Addr) -> bool;

    /// Test reachability with up to `attempts` echo requests
    ///
    /// An absent or unspecified address is unreachable without probing.
    async fn reachable(&self, address: Option<Ipv4Addr>, attempts: u32) -> bool {
        let Some(address) = address.filter(|a| !a.is_unspecified()) else {
            return false;
        };

        for _ in 0..attempts {
            if self.ping(address).await {
                return true;
            }
        }
        false
    }
}
