// Combine local health with the lease claim into one verdict

use super::HealthCheck;
use crate::lease::{ClaimOutcome, ClaimProtocol, ClaimStep};
use std::fmt;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotReadyReason {
    /// Local endpoint did not accept a connection. `released` is true when
    /// we held the lease and the clear went through.
    Unhealthy { released: bool },
    /// Another replica holds a fresh lease
    Standby { holder: String },
    /// Our takeover write was overwritten before the confirming read
    LostTakeover { holder: Option<String> },
    /// The store could not be reached or refused the call
    StoreUnavailable { step: ClaimStep },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    NotReady(NotReadyReason),
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready)
    }

    /// 0 when ready, 1 otherwise.
    pub fn exit_code(&self) -> ExitCode {
        if self.is_ready() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }
}

impl fmt::Display for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Readiness::Ready => write!(f, "ready"),
            Readiness::NotReady(NotReadyReason::Unhealthy { released }) => {
                write!(f, "not ready: local endpoint unhealthy")?;
                if *released {
                    write!(f, " (lease released)")?;
                }
                Ok(())
            }
            Readiness::NotReady(NotReadyReason::Standby { holder }) => {
                write!(f, "not ready: standby, lease held by {holder}")
            }
            Readiness::NotReady(NotReadyReason::LostTakeover { holder }) => write!(
                f,
                "not ready: lost takeover to {}",
                holder.as_deref().unwrap_or("<nobody>")
            ),
            Readiness::NotReady(NotReadyReason::StoreUnavailable { step }) => {
                write!(f, "not ready: lease store {step} failed")
            }
        }
    }
}

/// One probe cycle's decision. Holds no state between cycles; everything
/// that persists lives in the store.
#[derive(Debug, Clone)]
pub struct ReadinessDecision {
    health: Arc<dyn HealthCheck>,
    protocol: ClaimProtocol,
}

impl ReadinessDecision {
    pub fn new(health: Arc<dyn HealthCheck>, protocol: ClaimProtocol) -> Self {
        Self { health, protocol }
    }

    pub fn protocol(&self) -> &ClaimProtocol {
        &self.protocol
    }

    pub async fn decide(&self, now: u64) -> Readiness {
        if !self.health.is_healthy().await {
            warn!("Local endpoint unhealthy, giving up the lease if held");
            let released = self.protocol.release_if_held().await.is_released();
            return Readiness::NotReady(NotReadyReason::Unhealthy { released });
        }

        let decision = self.protocol.evaluate(now).await;
        let reason = match decision.outcome {
            ClaimOutcome::Created | ClaimOutcome::Renewed | ClaimOutcome::TookOver => {
                return Readiness::Ready
            }
            ClaimOutcome::Standby { holder } => NotReadyReason::Standby { holder },
            ClaimOutcome::LostTakeover { holder } => NotReadyReason::LostTakeover { holder },
            ClaimOutcome::StoreFailed { step, .. } => NotReadyReason::StoreUnavailable { step },
        };
        info!("Staying on standby: {:?}", reason);
        Readiness::NotReady(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lease::ClaimParams;
    use crate::probe::StaticHealthCheck;
    use lease_storage::test_utils::{Faults, RecordingStore, StoreOp};

    fn decision(healthy: bool, store: &Arc<RecordingStore>) -> ReadinessDecision {
        ReadinessDecision::new(
            Arc::new(StaticHealthCheck(healthy)),
            ClaimProtocol::new(store.clone(), "pod-1", ClaimParams::default()).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_unhealthy_holder_releases() {
        let store = Arc::new(RecordingStore::with_value("pod-1:1005"));
        let readiness = decision(false, &store).decide(1006).await;

        assert_eq!(
            readiness,
            Readiness::NotReady(NotReadyReason::Unhealthy { released: true })
        );
        assert_eq!(store.value(), None);
        assert_eq!(store.ops(), vec![StoreOp::Get, StoreOp::Clear]);
    }

    #[tokio::test]
    async fn test_unhealthy_standby_leaves_lease_alone() {
        let store = Arc::new(RecordingStore::with_value("pod-2:1005"));
        let readiness = decision(false, &store).decide(1006).await;

        assert_eq!(
            readiness,
            Readiness::NotReady(NotReadyReason::Unhealthy { released: false })
        );
        assert_eq!(store.value().as_deref(), Some("pod-2:1005"));
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn test_failed_release_is_swallowed() {
        let store = Arc::new(RecordingStore::with_value("pod-1:1005"));
        store.set_faults(Faults {
            clear: true,
            ..Faults::default()
        });
        let readiness = decision(false, &store).decide(1006).await;
        assert_eq!(
            readiness,
            Readiness::NotReady(NotReadyReason::Unhealthy { released: false })
        );
    }

    #[tokio::test]
    async fn test_healthy_claims() {
        let store = Arc::new(RecordingStore::new(Default::default()));
        let readiness = decision(true, &store).decide(1000).await;
        assert_eq!(readiness, Readiness::Ready);
        assert!(readiness.is_ready());
        assert_eq!(store.value().as_deref(), Some("pod-1:1000"));
    }

    #[tokio::test]
    async fn test_healthy_standby_does_not_release() {
        let store = Arc::new(RecordingStore::with_value("pod-2:1000"));
        let readiness = decision(true, &store).decide(1005).await;
        assert_eq!(
            readiness,
            Readiness::NotReady(NotReadyReason::Standby {
                holder: "pod-2".to_string()
            })
        );
        assert!(!readiness.is_ready());
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn test_store_down_is_not_ready() {
        let store = Arc::new(RecordingStore::new(Default::default()));
        store.set_faults(Faults {
            get: true,
            set: true,
            clear: true,
        });
        let readiness = decision(true, &store).decide(1000).await;
        assert_eq!(
            readiness,
            Readiness::NotReady(NotReadyReason::StoreUnavailable {
                step: ClaimStep::Read
            })
        );
    }
}
