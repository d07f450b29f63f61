//! iproute2 / systemd-resolved implementation of [`NetworkProbe`]

use async_trait::async_trait;
use std::net::Ipv4Addr;
use tracing::{debug, warn};

use drip_core::traits::{InterfaceHandle, LiveIpv4, NetworkProbe};
use drip_core::{DnsServers, Error, Ipv4Snapshot, Result};

use crate::command::{CommandRunner, SystemCommandRunner, render};
use crate::error::ProbeError;
use crate::parse;

/// Seconds `ping` waits for a single reply
pub const DEFAULT_PING_TIMEOUT_SECS: u32 = 1;

/// Interface name reported when listing links fails
const ALL_LINKS: &str = "*";

/// Network probe backed by the `ip`, `resolvectl`, `dhclient` and `ping` tools
pub struct LinuxNetworkProbe {
    runner: Box<dyn CommandRunner>,
    ping_timeout_secs: u32,
}

impl LinuxNetworkProbe {
    /// Probe that runs the real system tools
    pub fn new() -> Self {
        Self::with_runner(Box::new(SystemCommandRunner))
    }

    pub fn with_runner(runner: Box<dyn CommandRunner>) -> Self {
        Self {
            runner,
            ping_timeout_secs: DEFAULT_PING_TIMEOUT_SECS,
        }
    }

    /// Run a read-side command; failures become [`Error::ProbeRead`]
    async fn read(&self, interface: &str, program: &str, args: &[&str]) -> Result<String> {
        self.runner
            .output(program, args)
            .await
            .map_err(|e| Error::probe_read(interface, e.to_string()))
    }

    /// Run a write-side command; failures become [`Error::Apply`]
    async fn change(&self, interface: &str, program: &str, args: &[&str]) -> Result<()> {
        debug!("{}: {}", interface, render(program, args));
        self.runner
            .output(program, args)
            .await
            .map(|_| ())
            .map_err(|e| Error::apply(interface, e.to_string()))
    }

    /// Whether a `dhclient` instance is managing the interface
    async fn dhcp_client_running(&self, interface: &str) -> bool {
        let pattern = format!("dhclient.*[[:space:]]{interface}([[:space:]]|$)");
        self.runner.succeeds("pgrep", &["-f", &pattern]).await
    }

    /// Remove every IPv4 route and address from the interface
    async fn flush(&self, interface: &str) -> Result<()> {
        self.change(interface, "ip", &["-4", "route", "flush", "dev", interface])
            .await?;
        self.change(interface, "ip", &["-4", "addr", "flush", "dev", interface])
            .await
    }
}

impl Default for LinuxNetworkProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NetworkProbe for LinuxNetworkProbe {
    async fn list_active_interfaces(&self) -> Result<Vec<InterfaceHandle>> {
        let json = self
            .runner
            .output("ip", &["-j", "link", "show"])
            .await
            .map_err(|e| Error::probe_read(ALL_LINKS, e.to_string()))?;

        let links = parse::active_links(&json).map_err(|e| {
            Error::probe_read(ALL_LINKS, ProbeError::parse("ip -j link show", e).to_string())
        })?;

        if links.is_empty() {
            return Err(Error::NoActiveInterface);
        }

        Ok(links
            .into_iter()
            .enumerate()
            .map(|(i, link)| InterfaceHandle::new(i + 1, link.ifindex, link.ifname))
            .collect())
    }

    async fn read_ipv4(&self, interface: &InterfaceHandle) -> Result<LiveIpv4> {
        let name = interface.name.as_str();
        let parse_err = |command: &str, e: serde_json::Error| {
            Error::probe_read(name, ProbeError::parse(command, e).to_string())
        };

        let json = self
            .read(name, "ip", &["-j", "-4", "addr", "show", "dev", name])
            .await?;
        let address = parse::first_ipv4_address(&json).map_err(|e| parse_err("ip addr show", e))?;

        let Some(address) = address else {
            // No lease yet still counts as DHCP while a client is running
            let is_dhcp = self.dhcp_client_running(name).await;
            debug!("{} has no IPv4 address (dhcp: {})", interface, is_dhcp);
            return Ok(LiveIpv4::new(Ipv4Snapshot::unconfigured(), is_dhcp));
        };

        let mut snapshot = Ipv4Snapshot::new(address.address, address.prefix_length)?;

        let json = self
            .read(name, "ip", &["-j", "-4", "route", "show", "default", "dev", name])
            .await?;
        snapshot.gateway = parse::default_gateway(&json).map_err(|e| parse_err("ip route show", e))?;

        let dns = self.read(name, "resolvectl", &["dns", name]).await?;
        snapshot.dns = DnsServers::from_list(&parse::resolvectl_dns(&dns));

        Ok(LiveIpv4::new(snapshot, address.dynamic))
    }

    async fn apply_static(&self, interface: &InterfaceHandle, snapshot: &Ipv4Snapshot) -> Result<()> {
        let name = interface.name.as_str();

        if self.dhcp_client_running(name).await
            && !self.runner.succeeds("dhclient", &["-r", name]).await
        {
            warn!("{}: failed to release DHCP lease, continuing", interface);
        }

        self.flush(name).await?;

        if !snapshot.address.is_unspecified() {
            let cidr = format!("{}/{}", snapshot.address, snapshot.prefix_length);
            self.change(name, "ip", &["-4", "addr", "add", &cidr, "dev", name])
                .await?;
        }

        if let Some(gateway) = snapshot.gateway.filter(|g| !g.is_unspecified()) {
            let gateway = gateway.to_string();
            self.change(
                name,
                "ip",
                &["-4", "route", "add", "default", "via", &gateway, "dev", name],
            )
            .await?;
        }

        match &snapshot.dns {
            Some(dns) => {
                let servers: Vec<String> = dns.to_vec().iter().map(ToString::to_string).collect();
                let mut args = vec!["dns", name];
                args.extend(servers.iter().map(String::as_str));
                self.change(name, "resolvectl", &args).await
            }
            None => self.change(name, "resolvectl", &["revert", name]).await,
        }
    }

    async fn apply_dhcp(&self, interface: &InterfaceHandle) -> Result<()> {
        let name = interface.name.as_str();

        self.change(name, "resolvectl", &["revert", name]).await?;
        self.flush(name).await?;
        self.change(name, "dhclient", &[name]).await
    }

    async fn ping(&self, address: Ipv4Addr) -> bool {
        let timeout = self.ping_timeout_secs.to_string();
        let address = address.to_string();
        self.runner
            .succeeds("ping", &["-c", "1", "-q", "-W", &timeout, &address])
            .await
    }
}
