// # Memory Config Store
//
// In-memory implementation of ConfigStore.
//
// ## Purpose
//
// Holds snapshots in a map instead of files. Useful for tests and for
// embedding the reconciler where snapshots come from elsewhere (for example
// a provisioning system that pushes the dr snapshot at boot).
//
// ## Crash Behavior
//
// - All snapshots are lost on restart
// - The first run after a restart bootstraps production from live

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::snapshot::{Ipv4Snapshot, SnapshotKind};
use crate::traits::config_store::ConfigStore;

/// In-memory config store
///
/// Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigStore {
    inner: Arc<RwLock<HashMap<(usize, SnapshotKind), Ipv4Snapshot>>>,
}

impl MemoryConfigStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of stored snapshots
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Remove one snapshot
    pub async fn remove(&self, slot: usize, kind: SnapshotKind) -> Option<Ipv4Snapshot> {
        self.inner.write().await.remove(&(slot, kind))
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn load(&self, slot: usize, kind: SnapshotKind) -> Result<Option<Ipv4Snapshot>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.get(&(slot, kind)).cloned())
    }

    async fn save(
        &self,
        slot: usize,
        kind: SnapshotKind,
        snapshot: &Ipv4Snapshot,
    ) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.insert((slot, kind), snapshot.clone());
        Ok(())
    }
}
