//! Per-interface decision state machine
//!
//! The Reconciler decides, for one interface slot, whether to keep the
//! current configuration or switch to production, DR or DHCP. It issues at
//! most one change per pass (escalation aside) and always ends by recording
//! the live configuration as `previous`.
//!
//! ## Decision Table
//!
//! ```text
//! live DHCP ──┬─ no dr ──┬─ prod ─────────────► apply prod
//!             │          └─ no prod ──────────► no-op
//!             └─ dr ─────┬─ prod/prev missing ► no-op
//!                        ├─ prev == prod ─────► apply dr
//!                        ├─ prev == dr ───────► apply prod
//!                        └─ unknown ──────────► gw? dr ─ gw? prod
//!
//! live static ┬─ prod+dr ┬─ prev missing ─────► no-op
//!             │          ├─ gateway up ───────► no-op
//!             │          ├─ prev == prod ─────► apply dr
//!             │          ├─ prev == dr ───────► apply prod
//!             │          └─ unknown ──────────► prod ─ gw? dr ─ gw? restore live
//!             ├─ no address ──────────────────► no-op
//!             ├─ no prod ─────────────────────► capture prod = live
//!             └─ prod, no dr, address differs ► refresh prod = live
//! ```
//!
//! The two "unknown" chains differ on purpose: the DHCP chain ends on
//! production, the static chain ends by restoring what was observed.

use std::fmt;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::gateway::GatewayProbe;
use crate::snapshot::{Ipv4Snapshot, SnapshotKind};
use crate::traits::{ConfigStore, InterfaceHandle, LiveIpv4, NetworkProbe, PersistedState};

/// What a pass is asked to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Run the decision state machine
    #[default]
    Automatic,
    /// Apply the given target unconditionally
    Force(Target),
}

/// A configuration an operator can force
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Dhcp,
    Production,
    Dr,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Target::Dhcp => "dhcp",
            Target::Production => "production",
            Target::Dr => "dr",
        })
    }
}

/// One configuration change issued during a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Change {
    /// DHCP enabled
    Dhcp,
    /// Production snapshot applied
    Production,
    /// DR snapshot applied
    Dr,
    /// The configuration observed at the start of the pass re-applied
    Restored,
}

impl From<Target> for Change {
    fn from(target: Target) -> Self {
        match target {
            Target::Dhcp => Change::Dhcp,
            Target::Production => Change::Production,
            Target::Dr => Change::Dr,
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Change::Dhcp => "dhcp",
            Change::Production => "production",
            Change::Dr => "dr",
            Change::Restored => "restored",
        })
    }
}

/// Which branch a pass ended in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing to do: gateway reachable or production already current
    Unchanged,
    /// On DHCP with no stored static configuration
    NoBaseline,
    /// DR is provisioned but production or previous is missing
    Ambiguous,
    /// Static with no IPv4 address; production neither captured nor refreshed
    Unaddressed,
    /// On DHCP with no DR snapshot; production re-applied
    DhcpCorrected,
    /// Production → DR
    FailedOver,
    /// DR → production
    Recovered,
    /// Previous state unknown; the escalation chain ended on `settled_on`
    Escalated { settled_on: Change },
    /// First static sighting; production snapshot created from live
    ProductionCaptured,
    /// Live static address changed with no DR in play; production refreshed
    ProductionRefreshed,
    /// Operator-forced target applied
    Forced(Target),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Unchanged => f.write_str("unchanged"),
            Outcome::NoBaseline => f.write_str("no stored configuration, left on DHCP"),
            Outcome::Ambiguous => f.write_str("cannot tell failover from recovery, left as is"),
            Outcome::Unaddressed => f.write_str("no IPv4 address, production left as is"),
            Outcome::DhcpCorrected => f.write_str("DHCP replaced by production"),
            Outcome::FailedOver => f.write_str("failed over to DR"),
            Outcome::Recovered => f.write_str("recovered to production"),
            Outcome::Escalated { settled_on } => write!(f, "escalated, settled on {settled_on}"),
            Outcome::ProductionCaptured => f.write_str("production snapshot captured"),
            Outcome::ProductionRefreshed => f.write_str("production snapshot refreshed"),
            Outcome::Forced(target) => write!(f, "forced {target}"),
        }
    }
}

/// Result of one pass over one interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub interface: InterfaceHandle,
    pub outcome: Outcome,
    /// Every change issued, in order
    pub changes: Vec<Change>,
    /// Whether the `previous` snapshot was written
    pub previous_recorded: bool,
}

impl PassReport {
    /// Whether the pass changed the interface configuration
    pub fn changed(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// Everything an automatic pass decides on
///
/// Built by the orchestrator for one interface; the reconciler holds no
/// state between passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationContext {
    pub interface: InterfaceHandle,
    /// Live configuration at the start of the pass
    pub live: LiveIpv4,
    /// Stored snapshots at the start of the pass
    pub state: PersistedState,
}

impl ReconciliationContext {
    pub fn new(interface: InterfaceHandle, live: LiveIpv4, state: PersistedState) -> Self {
        Self {
            interface,
            live,
            state,
        }
    }

    fn slot(&self) -> usize {
        self.interface.slot
    }
}

/// Per-interface decision state machine
pub struct Reconciler<'a> {
    probe: &'a dyn NetworkProbe,
    store: &'a dyn ConfigStore,
    gateway: GatewayProbe,
}

impl<'a> Reconciler<'a> {
    pub fn new(probe: &'a dyn NetworkProbe, store: &'a dyn ConfigStore, gateway: GatewayProbe) -> Self {
        Self {
            probe,
            store,
            gateway,
        }
    }

    /// Run the automatic decision state machine for one interface
    ///
    /// # Returns
    ///
    /// - `Ok(PassReport)`: The pass completed (persistence failures included)
    /// - `Err(Error::Apply | Error::ProbeRead)`: The pass was aborted
    pub async fn reconcile(&self, ctx: ReconciliationContext) -> Result<PassReport> {
        debug!(
            "Reconciling {}: live {} (dhcp: {}), production: {}, dr: {}, previous: {}",
            ctx.interface,
            ctx.live.snapshot,
            ctx.live.is_dhcp,
            describe(ctx.state.production.as_ref()),
            describe(ctx.state.dr.as_ref()),
            describe(ctx.state.previous.as_ref()),
        );

        let mut changes = Vec::new();
        let outcome = if ctx.live.is_dhcp {
            self.reconcile_dhcp(&ctx, &mut changes).await?
        } else {
            self.reconcile_static(&ctx, &mut changes).await?
        };

        info!("{}: {}", ctx.interface, outcome);
        let previous_recorded = self.record_previous(&ctx.interface).await?;

        Ok(PassReport {
            interface: ctx.interface,
            outcome,
            changes,
            previous_recorded,
        })
    }

    /// Apply an operator-forced target, bypassing the state machine
    ///
    /// A missing production or DR snapshot fails before any OS call.
    pub async fn force(
        &self,
        interface: &InterfaceHandle,
        state: &PersistedState,
        target: Target,
    ) -> Result<PassReport> {
        match target {
            Target::Dhcp => {
                info!("{}: forcing DHCP", interface);
                self.probe.apply_dhcp(interface).await?;
            }
            Target::Production | Target::Dr => {
                let kind = match target {
                    Target::Production => SnapshotKind::Production,
                    _ => SnapshotKind::Dr,
                };
                let snapshot = state
                    .get(kind)
                    .ok_or_else(|| Error::missing_snapshot(interface.slot, kind))?;

                info!("{}: forcing {} configuration {}", interface, kind, snapshot);
                self.probe.apply_static(interface, snapshot).await?;
            }
        }

        let previous_recorded = self.record_previous(interface).await?;

        Ok(PassReport {
            interface: interface.clone(),
            outcome: Outcome::Forced(target),
            changes: vec![target.into()],
            previous_recorded,
        })
    }

    /// Branch A: the interface is on DHCP
    async fn reconcile_dhcp(
        &self,
        ctx: &ReconciliationContext,
        changes: &mut Vec<Change>,
    ) -> Result<Outcome> {
        let state = &ctx.state;

        let Some(dr) = &state.dr else {
            return match &state.production {
                Some(prod) => {
                    info!("{} is on DHCP with no DR snapshot, re-applying production", ctx.interface);
                    self.apply(&ctx.interface, Change::Production, prod, changes).await?;
                    Ok(Outcome::DhcpCorrected)
                }
                None => {
                    debug!("{} is on DHCP with no stored static configuration", ctx.interface);
                    Ok(Outcome::NoBaseline)
                }
            };
        };

        let (Some(prod), Some(prev)) = (&state.production, &state.previous) else {
            warn!(
                "{} has a DR snapshot but no {} snapshot, cannot tell failover from recovery",
                ctx.interface,
                if state.production.is_none() { "production" } else { "previous" }
            );
            return Ok(Outcome::Ambiguous);
        };

        if prev.same_address(prod) {
            info!("{} dropped to DHCP while on production, failing over to DR", ctx.interface);
            self.apply(&ctx.interface, Change::Dr, dr, changes).await?;
            Ok(Outcome::FailedOver)
        } else if prev.same_address(dr) {
            info!("{} dropped to DHCP while on DR, recovering to production", ctx.interface);
            self.apply(&ctx.interface, Change::Production, prod, changes).await?;
            Ok(Outcome::Recovered)
        } else {
            self.escalate_from_dhcp(ctx, prod, dr, changes).await
        }
    }

    /// Unknown previous state on DHCP: live gateway, then DR, then production
    async fn escalate_from_dhcp(
        &self,
        ctx: &ReconciliationContext,
        prod: &Ipv4Snapshot,
        dr: &Ipv4Snapshot,
        changes: &mut Vec<Change>,
    ) -> Result<Outcome> {
        if self.gateway.is_reachable(self.probe, ctx.live.snapshot.gateway).await {
            debug!("{}: previous state unknown but DHCP gateway answers", ctx.interface);
            return Ok(Outcome::Unchanged);
        }

        warn!("{}: previous state unknown and gateway unreachable, trying DR", ctx.interface);
        if self.apply_and_verify(&ctx.interface, Change::Dr, dr, changes).await? {
            return Ok(Outcome::Escalated { settled_on: Change::Dr });
        }

        warn!("{}: DR gateway unreachable, falling back to production", ctx.interface);
        self.apply(&ctx.interface, Change::Production, prod, changes).await?;
        Ok(Outcome::Escalated {
            settled_on: Change::Production,
        })
    }

    /// Branch B: the interface is statically configured
    async fn reconcile_static(
        &self,
        ctx: &ReconciliationContext,
        changes: &mut Vec<Change>,
    ) -> Result<Outcome> {
        let live = &ctx.live.snapshot;

        match (&ctx.state.production, &ctx.state.dr) {
            (Some(prod), Some(dr)) => self.reconcile_static_with_dr(ctx, prod, dr, changes).await,
            (None, _) | (Some(_), None) if live.address.is_unspecified() => {
                warn!(
                    "{} is up with no IPv4 address, not recording it as production",
                    ctx.interface
                );
                Ok(Outcome::Unaddressed)
            }
            (None, _) => {
                info!("{}: no production snapshot, capturing live {}", ctx.interface, live);
                self.save_best_effort(ctx.slot(), SnapshotKind::Production, live).await;
                Ok(Outcome::ProductionCaptured)
            }
            (Some(prod), None) if !prod.same_address(live) => {
                // Silently adopts the new address as the production baseline
                warn!(
                    "{}: live address {} differs from production {} and no DR snapshot exists, \
                     refreshing production",
                    ctx.interface, live.address, prod.address
                );
                self.save_best_effort(ctx.slot(), SnapshotKind::Production, live).await;
                Ok(Outcome::ProductionRefreshed)
            }
            (Some(_), None) => Ok(Outcome::Unchanged),
        }
    }

    /// Branch B.1: production and DR both provisioned
    async fn reconcile_static_with_dr(
        &self,
        ctx: &ReconciliationContext,
        prod: &Ipv4Snapshot,
        dr: &Ipv4Snapshot,
        changes: &mut Vec<Change>,
    ) -> Result<Outcome> {
        let Some(prev) = &ctx.state.previous else {
            warn!(
                "{} has a DR snapshot but no previous snapshot, cannot tell failover from recovery",
                ctx.interface
            );
            return Ok(Outcome::Ambiguous);
        };

        if self.gateway.is_reachable(self.probe, ctx.live.snapshot.gateway).await {
            return Ok(Outcome::Unchanged);
        }

        if prev.same_address(prod) {
            info!("{}: gateway unreachable on production, failing over to DR", ctx.interface);
            self.apply(&ctx.interface, Change::Dr, dr, changes).await?;
            Ok(Outcome::FailedOver)
        } else if prev.same_address(dr) {
            info!("{}: gateway unreachable on DR, recovering to production", ctx.interface);
            self.apply(&ctx.interface, Change::Production, prod, changes).await?;
            Ok(Outcome::Recovered)
        } else {
            self.escalate_from_static(ctx, prod, dr, changes).await
        }
    }

    /// Unknown previous state, static, gateway down: production, DR, restore
    async fn escalate_from_static(
        &self,
        ctx: &ReconciliationContext,
        prod: &Ipv4Snapshot,
        dr: &Ipv4Snapshot,
        changes: &mut Vec<Change>,
    ) -> Result<Outcome> {
        warn!("{}: previous state unknown and gateway unreachable, trying production", ctx.interface);
        if self.apply_and_verify(&ctx.interface, Change::Production, prod, changes).await? {
            return Ok(Outcome::Escalated {
                settled_on: Change::Production,
            });
        }

        warn!("{}: production gateway unreachable, trying DR", ctx.interface);
        if self.apply_and_verify(&ctx.interface, Change::Dr, dr, changes).await? {
            return Ok(Outcome::Escalated { settled_on: Change::Dr });
        }

        warn!(
            "{}: DR gateway unreachable, restoring observed configuration {}",
            ctx.interface, ctx.live.snapshot
        );
        self.apply(&ctx.interface, Change::Restored, &ctx.live.snapshot, changes).await?;
        Ok(Outcome::Escalated {
            settled_on: Change::Restored,
        })
    }

    /// Apply a static snapshot and log the change
    async fn apply(
        &self,
        interface: &InterfaceHandle,
        change: Change,
        snapshot: &Ipv4Snapshot,
        changes: &mut Vec<Change>,
    ) -> Result<()> {
        info!("{}: applying {} configuration {}", interface, change, snapshot);
        self.probe.apply_static(interface, snapshot).await?;
        changes.push(change);
        Ok(())
    }

    /// Apply, settle, and report whether the new gateway answers
    async fn apply_and_verify(
        &self,
        interface: &InterfaceHandle,
        change: Change,
        snapshot: &Ipv4Snapshot,
        changes: &mut Vec<Change>,
    ) -> Result<bool> {
        info!("{}: applying {} configuration {}", interface, change, snapshot);
        let reachable = self
            .gateway
            .apply_and_verify(self.probe, interface, snapshot)
            .await?;
        changes.push(change);
        Ok(reachable)
    }

    /// Record the live configuration, read fresh, as `previous`
    ///
    /// A read failure aborts the pass; a write failure is logged.
    async fn record_previous(&self, interface: &InterfaceHandle) -> Result<bool> {
        let live = self.probe.read_ipv4(interface).await?;
        Ok(self
            .save_best_effort(interface.slot, SnapshotKind::Previous, &live.snapshot)
            .await)
    }

    async fn save_best_effort(&self, slot: usize, kind: SnapshotKind, snapshot: &Ipv4Snapshot) -> bool {
        match self.store.save(slot, kind, snapshot).await {
            Ok(()) => {
                debug!("Saved {} snapshot for interface {}: {}", kind, slot, snapshot);
                true
            }
            Err(e) => {
                warn!("Failed to save {} snapshot for interface {}: {}", kind, slot, e);
                false
            }
        }
    }
}

fn describe(snapshot: Option<&Ipv4Snapshot>) -> String {
    snapshot.map_or_else(|| "none".to_string(), |s| s.to_string())
}
