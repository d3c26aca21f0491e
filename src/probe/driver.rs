// One probe cycle, as run by the external scheduler

use super::{HealthCheck, Readiness, ReadinessDecision, TcpHealthCheck};
use crate::config::Config;
use crate::lease::{ClaimProtocol, LeaseRecord, ParamsError, ReleaseOutcome};
use crate::util;
use lease_storage::{ConnectingLeaseStore, LeaseStore};
use std::sync::Arc;
use tracing::info;

/// What `lease-probe show` reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseView {
    pub raw: Option<String>,
    pub record: Option<LeaseRecord>,
    pub expired: bool,
    pub held_by_self: bool,
}

#[derive(Debug)]
pub struct Driver {
    decision: ReadinessDecision,
    clock: fn() -> u64,
}

impl Driver {
    pub fn new(decision: ReadinessDecision) -> Self {
        Self {
            decision,
            clock: util::epoch_seconds,
        }
    }

    /// Wire up the control-plane store and the TCP health check.
    pub fn from_config(config: &Config) -> Result<Self, ParamsError> {
        let store: Arc<dyn LeaseStore> = Arc::new(ConnectingLeaseStore::new(config.control_plane()));
        let health: Arc<dyn HealthCheck> = Arc::new(TcpHealthCheck::new(config.health_addr));
        let protocol = ClaimProtocol::new(store, config.identity.clone(), config.claim)?;
        Ok(Self::new(ReadinessDecision::new(health, protocol)))
    }

    /// Replace the wall clock, mainly for tests.
    pub fn with_clock(mut self, clock: fn() -> u64) -> Self {
        self.clock = clock;
        self
    }

    pub fn identity(&self) -> &str {
        self.decision.protocol().identity()
    }

    pub async fn run_once(&self) -> Readiness {
        let now = (self.clock)();
        info!("Probe cycle for {} at {}", self.identity(), now);
        let readiness = self.decision.decide(now).await;
        info!("Verdict for {}: {}", self.identity(), readiness);
        readiness
    }

    /// Give up the lease if this replica holds it.
    pub async fn release(&self) -> ReleaseOutcome {
        self.decision.protocol().release_if_held().await
    }

    /// Read the stored lease without writing anything.
    pub async fn inspect(&self) -> lease_storage::Result<LeaseView> {
        let protocol = self.decision.protocol();
        let raw = protocol.store().get().await?;
        let record = raw.as_deref().and_then(LeaseRecord::decode);
        let now = (self.clock)();
        Ok(LeaseView {
            expired: record
                .as_ref()
                .is_some_and(|r| r.is_expired(now, protocol.params().lease_duration)),
            held_by_self: record
                .as_ref()
                .is_some_and(|r| r.is_held_by(protocol.identity())),
            raw,
            record,
        })
    }
}
