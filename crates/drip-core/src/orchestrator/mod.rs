//! Run orchestration
//!
//! The Orchestrator is responsible for:
//! - Listing active interfaces via NetworkProbe
//! - Selecting the interfaces a request targets
//! - Loading each slot's snapshots from ConfigStore
//! - Dispatching a forced or automatic pass to the Reconciler
//!
//! ## Flow
//!
//! ```text
//! ┌──────────────┐   list    ┌──────────────┐
//! │ Orchestrator │──────────►│ NetworkProbe │
//! └──────────────┘           └──────────────┘
//!        │ for each selected interface, in slot order
//!        ▼
//! ┌──────────────┐  load_all ┌──────────────┐
//! │  per slot    │──────────►│ ConfigStore  │
//! └──────────────┘           └──────────────┘
//!        │
//!        ▼
//! ┌──────────────┐  read / apply / ping / save
//! │  Reconciler  │──────────► NetworkProbe, ConfigStore
//! └──────────────┘
//! ```
//!
//! Interfaces are processed strictly one after another. The first fatal
//! error ends the run; changes already made to earlier interfaces stay.

use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

use crate::config::DripConfig;
use crate::error::{Error, Result};
use crate::gateway::GatewayProbe;
use crate::reconciler::{Mode, PassReport, ReconciliationContext, Reconciler};
use crate::traits::{ConfigStore, InterfaceHandle, NetworkProbe};

/// Which interfaces a run touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterfaceSelector {
    /// Every active interface, in slot order
    #[default]
    All,
    /// One interface by 1-based slot
    Slot(usize),
}

impl FromStr for InterfaceSelector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }

        match s.parse::<usize>() {
            Ok(slot) if slot >= 1 => Ok(Self::Slot(slot)),
            _ => Err(Error::config(format!(
                "Interface must be 'all' or a slot number starting at 1. Got: '{s}'"
            ))),
        }
    }
}

impl fmt::Display for InterfaceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Slot(slot) => write!(f, "{slot}"),
        }
    }
}

/// One invocation's request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunRequest {
    pub mode: Mode,
    pub interface: InterfaceSelector,
}

impl RunRequest {
    /// Automatic reconciliation of every active interface
    pub fn automatic() -> Self {
        Self::default()
    }

    pub fn new(mode: Mode, interface: InterfaceSelector) -> Self {
        Self { mode, interface }
    }
}

/// Result of a completed run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// One report per processed interface, in slot order
    pub passes: Vec<PassReport>,
}

impl RunReport {
    /// Number of passes that changed an interface
    pub fn changed_count(&self) -> usize {
        self.passes.iter().filter(|p| p.changed()).count()
    }
}

/// Top-level driver of a reconciliation run
///
/// ## Lifecycle
///
/// 1. Create with [`Orchestrator::new()`]
/// 2. Call [`Orchestrator::run()`] once per invocation
pub struct Orchestrator {
    /// Network probe for the host
    probe: Box<dyn NetworkProbe>,

    /// Snapshot store
    store: Box<dyn ConfigStore>,

    /// Gateway probing policy
    gateway: GatewayProbe,
}

impl Orchestrator {
    /// Create a new orchestrator
    ///
    /// # Returns
    ///
    /// - `Ok(Orchestrator)`: Ready to run
    /// - `Err(Error::Config)`: The configuration is invalid
    pub fn new(
        probe: Box<dyn NetworkProbe>,
        store: Box<dyn ConfigStore>,
        config: &DripConfig,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            probe,
            store,
            gateway: GatewayProbe::from_config(&config.gateway),
        })
    }

    /// Run one invocation
    ///
    /// # Returns
    ///
    /// - `Ok(RunReport)`: Every selected interface was processed
    /// - `Err(Error)`: The first fatal error; later interfaces were skipped
    pub async fn run(&self, request: RunRequest) -> Result<RunReport> {
        let interfaces = self.probe.list_active_interfaces().await?;
        if interfaces.is_empty() {
            return Err(Error::NoActiveInterface);
        }
        debug!("{} active interface(s)", interfaces.len());

        let selected = select(interfaces, request.interface)?;
        let reconciler = Reconciler::new(self.probe.as_ref(), self.store.as_ref(), self.gateway);

        let mut report = RunReport::default();
        for interface in selected {
            let pass = self.process(&reconciler, interface, request.mode).await?;
            report.passes.push(pass);
        }

        info!(
            "Run complete: {} interface(s) processed, {} changed",
            report.passes.len(),
            report.changed_count()
        );
        Ok(report)
    }

    /// Process one interface to completion
    async fn process(
        &self,
        reconciler: &Reconciler<'_>,
        interface: InterfaceHandle,
        mode: Mode,
    ) -> Result<PassReport> {
        let state = self.store.load_all(interface.slot).await?;

        match mode {
            Mode::Force(target) => reconciler.force(&interface, &state, target).await,
            Mode::Automatic => {
                let live = self.probe.read_ipv4(&interface).await?;
                let ctx = ReconciliationContext::new(interface, live, state);
                reconciler.reconcile(ctx).await
            }
        }
    }
}

/// Narrow the interface list to the requested selector
fn select(
    interfaces: Vec<InterfaceHandle>,
    selector: InterfaceSelector,
) -> Result<Vec<InterfaceHandle>> {
    match selector {
        InterfaceSelector::All => Ok(interfaces),
        InterfaceSelector::Slot(slot) => {
            let available = interfaces.len();
            interfaces
                .into_iter()
                .find(|i| i.slot == slot)
                .map(|i| vec![i])
                .ok_or(Error::UnknownInterface {
                    requested: slot,
                    available,
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interfaces() -> Vec<InterfaceHandle> {
        vec![
            InterfaceHandle::new(1, 2, "eth0"),
            InterfaceHandle::new(2, 3, "eth1"),
        ]
    }

    #[test]
    fn parses_interface_selector() {
        assert_eq!("all".parse::<InterfaceSelector>().unwrap(), InterfaceSelector::All);
        assert_eq!("ALL".parse::<InterfaceSelector>().unwrap(), InterfaceSelector::All);
        assert_eq!("2".parse::<InterfaceSelector>().unwrap(), InterfaceSelector::Slot(2));
        assert!("0".parse::<InterfaceSelector>().is_err());
        assert!("eth0".parse::<InterfaceSelector>().is_err());
    }

    #[test]
    fn selects_by_slot() {
        let selected = select(interfaces(), InterfaceSelector::Slot(2)).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "eth1");

        assert_eq!(select(interfaces(), InterfaceSelector::All).unwrap().len(), 2);
    }

    #[test]
    fn unknown_slot_is_an_error() {
        let err = select(interfaces(), InterfaceSelector::Slot(3)).unwrap_err();
        assert!(matches!(
            err,
            Error::UnknownInterface {
                requested: 3,
                available: 2
            }
        ));
    }
}
