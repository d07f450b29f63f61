//! Gateway probing policy
//!
//! Wraps [`NetworkProbe::reachable`] with the attempt count and the settle
//! delay used while escalating through production, DR and restore.

use std::net::Ipv4Addr;
use std::time::Duration;
use tracing::debug;

use crate::config::GatewayConfig;
use crate::error::Result;
use crate::snapshot::Ipv4Snapshot;
use crate::traits::{InterfaceHandle, NetworkProbe};

/// Ping-N-times policy with a fixed settle delay after changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayProbe {
    attempts: u32,
    settle_delay: Duration,
}

impl GatewayProbe {
    pub fn new(attempts: u32, settle_delay: Duration) -> Self {
        Self {
            attempts,
            settle_delay,
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(config.ping_attempts, config.settle_delay())
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    /// Whether the gateway answers within the configured attempts
    pub async fn is_reachable(&self, probe: &dyn NetworkProbe, gateway: Option<Ipv4Addr>) -> bool {
        let reachable = probe.reachable(gateway, self.attempts).await;
        match gateway {
            Some(gateway) => debug!(
                "Gateway {} {} after up to {} attempt(s)",
                gateway,
                if reachable { "reachable" } else { "unreachable" },
                self.attempts
            ),
            None => debug!("No gateway configured, treating as unreachable"),
        }
        reachable
    }

    /// Wait for the network stack to converge after a change
    pub async fn settle(&self) {
        if !self.settle_delay.is_zero() {
            debug!("Waiting {:?} for the interface to settle", self.settle_delay);
            tokio::time::sleep(self.settle_delay).await;
        }
    }

    /// Apply a static configuration, settle, then probe its gateway
    ///
    /// # Returns
    ///
    /// - `Ok(true)`: The new gateway answers
    /// - `Ok(false)`: Applied, but the gateway is still unreachable
    /// - `Err(Error::Apply)`: The apply failed
    pub async fn apply_and_verify(
        &self,
        probe: &dyn NetworkProbe,
        interface: &InterfaceHandle,
        snapshot: &Ipv4Snapshot,
    ) -> Result<bool> {
        probe.apply_static(interface, snapshot).await?;
        self.settle().await;
        Ok(self.is_reachable(probe, snapshot.gateway).await)
    }
}

impl Default for GatewayProbe {
    fn default() -> Self {
        Self::from_config(&GatewayConfig::default())
    }
}
