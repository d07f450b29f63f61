// # Config Store Trait
//
// Defines the interface for the per-interface snapshot files.
//
// ## Purpose
//
// Each interface slot owns three independently optional snapshots:
// - `production`: captured on first sight, refreshed only by self-heal
// - `dr`: supplied by an operator, never written here
// - `previous`: rewritten at the end of every pass
//
// `previous` is the only memory of what the last run left behind, and the
// sole signal used to tell a failover trigger from a recovery trigger.
//
// ## Implementations
//
// - CSV files: `CsvConfigStore`
// - In-memory: `MemoryConfigStore`

use async_trait::async_trait;

use crate::snapshot::{Ipv4Snapshot, SnapshotKind};

/// The three snapshots of one slot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedState {
    pub production: Option<Ipv4Snapshot>,
    pub dr: Option<Ipv4Snapshot>,
    pub previous: Option<Ipv4Snapshot>,
}

impl PersistedState {
    /// Borrow the snapshot of the given kind
    pub fn get(&self, kind: SnapshotKind) -> Option<&Ipv4Snapshot> {
        match kind {
            SnapshotKind::Production => self.production.as_ref(),
            SnapshotKind::Dr => self.dr.as_ref(),
            SnapshotKind::Previous => self.previous.as_ref(),
        }
    }
}

/// Trait for config store implementations
///
/// ## Allowed Capabilities
/// - ✅ I/O against its own storage
///
/// ## Forbidden Capabilities
/// - ❌ Decide which snapshot to write (owned by the `Reconciler`)
/// - ❌ Touch the network configuration
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Load one snapshot
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Ipv4Snapshot))`: The stored snapshot
    /// - `Ok(None)`: Nothing stored for this slot and kind
    /// - `Err(Error::InvalidSnapshot)`: Stored contents are malformed
    async fn load(
        &self,
        slot: usize,
        kind: SnapshotKind,
    ) -> Result<Option<Ipv4Snapshot>, crate::Error>;

    /// Overwrite one snapshot
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Written
    /// - `Err(Error::Persist)`: Storage error (callers log and continue)
    async fn save(
        &self,
        slot: usize,
        kind: SnapshotKind,
        snapshot: &Ipv4Snapshot,
    ) -> Result<(), crate::Error>;

    /// Load all three snapshots of a slot
    async fn load_all(&self, slot: usize) -> Result<PersistedState, crate::Error> {
        Ok(PersistedState {
            production: self.load(slot, SnapshotKind::Production).await?,
            dr: self.load(slot, SnapshotKind::Dr).await?,
            previous: self.load(slot, SnapshotKind::Previous).await?,
        })
    }
}
