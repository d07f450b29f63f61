//! Test doubles and common utilities for reconciler contract tests
//!
//! The fake probe keeps a live configuration per interface, applies changes
//! to it the way an OS would, answers pings from a set of reachable
//! addresses, and records every call.

#![allow(dead_code)]

use drip_core::error::{Error, Result};
use drip_core::snapshot::{Ipv4Snapshot, SnapshotKind};
use drip_core::traits::{ConfigStore, InterfaceHandle, LiveIpv4, NetworkProbe};
use drip_core::{DripConfig, MemoryConfigStore, Orchestrator};
use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};

/// A call received by the fake probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeCall {
    List,
    Read(usize),
    ApplyStatic(usize, Ipv4Snapshot),
    ApplyDhcp(usize),
    Ping(Ipv4Addr),
}

struct FakeState {
    interfaces: Vec<(InterfaceHandle, LiveIpv4)>,
    reachable: HashSet<Ipv4Addr>,
    dhcp_lease: Ipv4Snapshot,
    failing_apply: Option<Ipv4Addr>,
    failing_read: Option<usize>,
    calls: Vec<ProbeCall>,
}

/// In-memory network probe; clones share state
#[derive(Clone)]
pub struct FakeNetworkProbe {
    inner: Arc<Mutex<FakeState>>,
}

impl FakeNetworkProbe {
    /// A host with no interfaces up
    pub fn empty() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeState {
                interfaces: Vec::new(),
                reachable: HashSet::new(),
                dhcp_lease: Ipv4Snapshot::unconfigured(),
                failing_apply: None,
                failing_read: None,
                calls: Vec::new(),
            })),
        }
    }

    /// A host with one interface in the given state
    pub fn single(live: Ipv4Snapshot, is_dhcp: bool) -> Self {
        Self::empty().with_interface(live, is_dhcp)
    }

    /// Add an interface; it takes the next slot
    pub fn with_interface(self, live: Ipv4Snapshot, is_dhcp: bool) -> Self {
        {
            let mut state = self.inner.lock().unwrap();
            let slot = state.interfaces.len() + 1;
            let handle = InterfaceHandle::new(slot, slot as u32 + 1, format!("eth{}", slot - 1));
            state.interfaces.push((handle, LiveIpv4::new(live, is_dhcp)));
        }
        self
    }

    /// Make an address answer pings
    pub fn with_reachable(self, address: Ipv4Addr) -> Self {
        self.inner.lock().unwrap().reachable.insert(address);
        self
    }

    /// What `apply_dhcp` leaves on the interface
    pub fn with_dhcp_lease(self, lease: Ipv4Snapshot) -> Self {
        self.inner.lock().unwrap().dhcp_lease = lease;
        self
    }

    /// Fail any `apply_static` of this address
    pub fn failing_apply_of(self, address: Ipv4Addr) -> Self {
        self.inner.lock().unwrap().failing_apply = Some(address);
        self
    }

    /// Fail any `read_ipv4` of this slot
    pub fn failing_read_of(self, slot: usize) -> Self {
        self.inner.lock().unwrap().failing_read = Some(slot);
        self
    }

    /// Change the live configuration behind the reconciler's back
    pub fn set_live(&self, slot: usize, live: Ipv4Snapshot, is_dhcp: bool) {
        let mut state = self.inner.lock().unwrap();
        state.interfaces[slot - 1].1 = LiveIpv4::new(live, is_dhcp);
    }

    pub fn live(&self, slot: usize) -> LiveIpv4 {
        self.inner.lock().unwrap().interfaces[slot - 1].1.clone()
    }

    pub fn handle(&self, slot: usize) -> InterfaceHandle {
        self.inner.lock().unwrap().interfaces[slot - 1].0.clone()
    }

    pub fn calls(&self) -> Vec<ProbeCall> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().unwrap().calls.clear();
    }

    /// Every configuration change, in order
    pub fn applies(&self) -> Vec<ProbeCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, ProbeCall::ApplyStatic(..) | ProbeCall::ApplyDhcp(_)))
            .collect()
    }

    pub fn ping_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, ProbeCall::Ping(_)))
            .count()
    }

    pub fn read_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, ProbeCall::Read(_)))
            .count()
    }
}

#[async_trait::async_trait]
impl NetworkProbe for FakeNetworkProbe {
    async fn list_active_interfaces(&self) -> Result<Vec<InterfaceHandle>> {
        let mut state = self.inner.lock().unwrap();
        state.calls.push(ProbeCall::List);
        if state.interfaces.is_empty() {
            return Err(Error::NoActiveInterface);
        }
        Ok(state.interfaces.iter().map(|(h, _)| h.clone()).collect())
    }

    async fn read_ipv4(&self, interface: &InterfaceHandle) -> Result<LiveIpv4> {
        let mut state = self.inner.lock().unwrap();
        state.calls.push(ProbeCall::Read(interface.slot));
        if state.failing_read == Some(interface.slot) {
            return Err(Error::probe_read(&interface.name, "simulated read failure"));
        }
        Ok(state.interfaces[interface.slot - 1].1.clone())
    }

    async fn apply_static(&self, interface: &InterfaceHandle, snapshot: &Ipv4Snapshot) -> Result<()> {
        let mut state = self.inner.lock().unwrap();
        state
            .calls
            .push(ProbeCall::ApplyStatic(interface.slot, snapshot.clone()));
        if state.failing_apply == Some(snapshot.address) {
            return Err(Error::apply(&interface.name, "simulated apply failure"));
        }
        state.interfaces[interface.slot - 1].1 = LiveIpv4::new(snapshot.clone(), false);
        Ok(())
    }

    async fn apply_dhcp(&self, interface: &InterfaceHandle) -> Result<()> {
        let mut state = self.inner.lock().unwrap();
        state.calls.push(ProbeCall::ApplyDhcp(interface.slot));
        let lease = state.dhcp_lease.clone();
        state.interfaces[interface.slot - 1].1 = LiveIpv4::new(lease, true);
        Ok(())
    }

    async fn ping(&self, address: Ipv4Addr) -> bool {
        let mut state = self.inner.lock().unwrap();
        state.calls.push(ProbeCall::Ping(address));
        state.reachable.contains(&address)
    }
}

/// A store whose writes always fail
#[derive(Clone, Default)]
pub struct ReadOnlyStore {
    pub inner: MemoryConfigStore,
}

#[async_trait::async_trait]
impl ConfigStore for ReadOnlyStore {
    async fn load(&self, slot: usize, kind: SnapshotKind) -> Result<Option<Ipv4Snapshot>> {
        self.inner.load(slot, kind).await
    }

    async fn save(&self, _slot: usize, _kind: SnapshotKind, _snapshot: &Ipv4Snapshot) -> Result<()> {
        Err(Error::persist("simulated read-only filesystem"))
    }
}

pub const PROD_GW: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);
pub const DR_GW: Ipv4Addr = Ipv4Addr::new(172, 16, 0, 1);

/// Production snapshot used across tests
pub fn prod() -> Ipv4Snapshot {
    Ipv4Snapshot::new(Ipv4Addr::new(10, 0, 0, 5), 24)
        .unwrap()
        .with_gateway(PROD_GW)
        .with_dns(Ipv4Addr::new(10, 0, 0, 2), Ipv4Addr::new(10, 0, 0, 3))
}

/// DR snapshot used across tests
pub fn dr() -> Ipv4Snapshot {
    Ipv4Snapshot::new(Ipv4Addr::new(172, 16, 0, 5), 16)
        .unwrap()
        .with_gateway(DR_GW)
        .with_dns(Ipv4Addr::new(172, 16, 0, 2), Ipv4Addr::new(172, 16, 0, 3))
}

/// A static configuration that matches neither production nor DR
pub fn stray() -> Ipv4Snapshot {
    Ipv4Snapshot::new(Ipv4Addr::new(10, 0, 0, 99), 24)
        .unwrap()
        .with_gateway(PROD_GW)
}

/// A DHCP lease
pub fn lease() -> Ipv4Snapshot {
    Ipv4Snapshot::new(Ipv4Addr::new(192, 168, 50, 23), 24)
        .unwrap()
        .with_gateway(Ipv4Addr::new(192, 168, 50, 1))
}

/// Config with no settle delay
pub fn test_config() -> DripConfig {
    let mut config = DripConfig::default();
    config.gateway.settle_delay_secs = 0;
    config
}

/// Store pre-populated for slot 1
pub async fn store_with(
    production: Option<Ipv4Snapshot>,
    dr: Option<Ipv4Snapshot>,
    previous: Option<Ipv4Snapshot>,
) -> MemoryConfigStore {
    let store = MemoryConfigStore::new();
    for (kind, snapshot) in [
        (SnapshotKind::Production, production),
        (SnapshotKind::Dr, dr),
        (SnapshotKind::Previous, previous),
    ] {
        if let Some(snapshot) = snapshot {
            store.save(1, kind, &snapshot).await.unwrap();
        }
    }
    store
}

/// Orchestrator over shared handles to the fake probe and a store
pub fn orchestrator<S>(probe: &FakeNetworkProbe, store: &S) -> Orchestrator
where
    S: ConfigStore + Clone + 'static,
{
    Orchestrator::new(Box::new(probe.clone()), Box::new(store.clone()), &test_config())
        .expect("orchestrator construction succeeds")
}
