//! Core traits for the reconciler
//!
//! This module defines the abstract interfaces the decision logic runs against.
//!
//! - [`NetworkProbe`]: Read and change the host's IPv4 configuration
//! - [`ConfigStore`]: Persistent production/dr/previous snapshots

pub mod config_store;
pub mod network_probe;

pub use config_store::{ConfigStore, PersistedState};
pub use network_probe::{InterfaceHandle, LiveIpv4, NetworkProbe};
