// # Linux Network Probe
//
// This crate provides a [`NetworkProbe`](drip_core::NetworkProbe) for Linux
// hosts, driving the standard userland tools:
//
// - `ip` (iproute2) for links, addresses and routes, using its JSON output
// - `resolvectl` (systemd-resolved) for per-link DNS servers
// - `dhclient` for enabling and releasing DHCP
// - `ping` for gateway reachability
//
// ## Interface Slots
//
// Links whose operational state is up are sorted by interface index and
// numbered from 1. Loopback is never listed.
//
// ## Privileges
//
// Reading works as any user. Applying a configuration needs CAP_NET_ADMIN
// (in practice: root).

pub mod command;
pub mod error;
pub mod parse;
pub mod probe;

pub use command::{CommandRunner, SystemCommandRunner};
pub use error::ProbeError;
pub use probe::LinuxNetworkProbe;
