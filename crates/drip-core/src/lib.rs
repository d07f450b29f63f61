// # drip-core
//
// Core library for the DR IP-configuration reconciler.
//
// ## Architecture Overview
//
// On every invocation the reconciler decides, per active interface, whether
// that interface should run its production address, its DR address, or
// DHCP:
// - **NetworkProbe**: Trait over the host OS (list, read, apply, ping)
// - **ConfigStore**: Trait for the per-interface production/dr/previous snapshots
// - **GatewayProbe**: Ping-with-settle-delay policy used while escalating
// - **Reconciler**: The per-interface decision state machine
// - **Orchestrator**: Iterates interfaces and dispatches forced or automatic passes
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Decision logic never touches the OS directly
// 2. **Sequential**: One interface at a time, each pass runs to completion
// 3. **Fail-Fast**: OS failures end the run; persistence failures do not
// 4. **Library-First**: The binary is a thin wrapper around this crate

pub mod config;
pub mod error;
pub mod gateway;
pub mod orchestrator;
pub mod reconciler;
pub mod snapshot;
pub mod store;
pub mod traits;

// Re-export core types for convenience
pub use config::{DripConfig, GatewayConfig, StoreConfig};
pub use error::{Error, Result};
pub use gateway::GatewayProbe;
pub use orchestrator::{InterfaceSelector, Orchestrator, RunReport, RunRequest};
pub use reconciler::{Change, Mode, Outcome, PassReport, ReconciliationContext, Reconciler, Target};
pub use snapshot::{DnsServers, Ipv4Snapshot, SnapshotKind};
pub use store::{CsvConfigStore, MemoryConfigStore};
pub use traits::{ConfigStore, InterfaceHandle, LiveIpv4, NetworkProbe, PersistedState};
