// Claim / renew / take over the readiness lease

use super::{ClaimState, LeaseRecord, DELIMITER};
use lease_storage::LeaseStore;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default lease duration (30 seconds)
pub const DEFAULT_LEASE_DURATION: Duration = Duration::from_secs(30);

/// Default wait between a takeover write and its confirming read
pub const DEFAULT_GRACE_DELAY: Duration = Duration::from_secs(2);

/// Timing of the protocol.
///
/// `lease_duration` should be several probe intervals long (5x or more) so a
/// healthy holder always renews before anyone else may take over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimParams {
    pub lease_duration: Duration,
    pub grace_delay: Duration,
}

impl Default for ClaimParams {
    fn default() -> Self {
        Self {
            lease_duration: DEFAULT_LEASE_DURATION,
            grace_delay: DEFAULT_GRACE_DELAY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamsError {
    #[error("lease duration must be at least one second")]
    ZeroDuration,
    #[error("grace delay {grace:?} must be shorter than the lease duration {duration:?}")]
    GraceTooLong { grace: Duration, duration: Duration },
    #[error("identity {0:?} cannot be stored in a lease value")]
    InvalidIdentity(String),
}

/// Accepts identities that survive the `<claimant>:<epoch>` round trip
/// unchanged: non-empty, without the delimiter or surrounding whitespace.
pub fn validate_identity(identity: &str) -> Result<(), ParamsError> {
    if identity.is_empty() || identity.contains(DELIMITER) || identity.trim() != identity {
        return Err(ParamsError::InvalidIdentity(identity.to_string()));
    }
    Ok(())
}

impl ClaimParams {
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.lease_duration.as_secs() == 0 {
            return Err(ParamsError::ZeroDuration);
        }
        if self.grace_delay >= self.lease_duration {
            return Err(ParamsError::GraceTooLong {
                grace: self.grace_delay,
                duration: self.lease_duration,
            });
        }
        Ok(())
    }
}

/// Store call that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimStep {
    Read,
    Write,
    Clear,
}

impl fmt::Display for ClaimStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ClaimStep::Read => "read",
            ClaimStep::Write => "write",
            ClaimStep::Clear => "clear",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// No (parsable) lease existed and ours was written
    Created,
    /// Our fresh lease was rewritten with the current time
    Renewed,
    /// Someone else holds a fresh lease; nothing written
    Standby { holder: String },
    /// Expired lease replaced and the re-read confirmed us
    TookOver,
    /// Expired lease replaced but the re-read shows another value
    LostTakeover { holder: Option<String> },
    /// A store call failed; no retry within this evaluation
    StoreFailed { step: ClaimStep, error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimDecision {
    pub claimed: bool,
    /// State observed on the first read, `None` if that read failed
    pub state: Option<ClaimState>,
    pub outcome: ClaimOutcome,
}

impl ClaimDecision {
    fn claimed(state: ClaimState, outcome: ClaimOutcome) -> Self {
        Self {
            claimed: true,
            state: Some(state),
            outcome,
        }
    }

    fn not_claimed(state: Option<ClaimState>, outcome: ClaimOutcome) -> Self {
        Self {
            claimed: false,
            state,
            outcome,
        }
    }
}

/// Result of [`ClaimProtocol::release_if_held`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Released,
    /// The lease is absent, malformed or names someone else
    NotHeld,
    Failed { step: ClaimStep, error: String },
}

impl ReleaseOutcome {
    pub fn is_released(&self) -> bool {
        matches!(self, ReleaseOutcome::Released)
    }
}

/// Runs the claim protocol for one identity against one store.
#[derive(Debug, Clone)]
pub struct ClaimProtocol {
    store: Arc<dyn LeaseStore>,
    identity: String,
    params: ClaimParams,
}

impl ClaimProtocol {
    /// Fails when `params` are inconsistent or `identity` could not be read
    /// back from the stored lease.
    pub fn new(
        store: Arc<dyn LeaseStore>,
        identity: impl Into<String>,
        params: ClaimParams,
    ) -> Result<Self, ParamsError> {
        let identity = identity.into();
        validate_identity(&identity)?;
        params.validate()?;
        Ok(Self {
            store,
            identity,
            params,
        })
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn params(&self) -> ClaimParams {
        self.params
    }

    pub fn store(&self) -> &Arc<dyn LeaseStore> {
        &self.store
    }

    /// Decide whether this replica holds the lease at `now` (epoch seconds),
    /// writing to the store as needed. Store failures never escape: they
    /// yield `claimed == false`.
    pub async fn evaluate(&self, now: u64) -> ClaimDecision {
        let current = match self.store.get().await {
            Ok(value) => value,
            Err(e) => return self.store_failed(None, ClaimStep::Read, &e),
        };

        let record = current.as_deref().and_then(LeaseRecord::decode);
        if record.is_none() {
            if let Some(raw) = &current {
                debug!("Ignoring malformed lease value {:?}", raw);
            }
        }

        let state = ClaimState::classify(
            record.as_ref(),
            &self.identity,
            now,
            self.params.lease_duration,
        );
        debug!(
            "Lease {:?} is {} for {} at {}",
            current.as_deref().unwrap_or(""),
            state,
            self.identity,
            now
        );

        match state {
            ClaimState::NoLease => self.write_own(state, now, ClaimOutcome::Created).await,
            ClaimState::HeldBySelf => self.write_own(state, now, ClaimOutcome::Renewed).await,
            ClaimState::HeldByOtherFresh => {
                let holder = record.map(|r| r.claimant).unwrap_or_default();
                debug!("Standing by: lease held by {}", holder);
                ClaimDecision::not_claimed(Some(state), ClaimOutcome::Standby { holder })
            }
            ClaimState::HeldByOtherExpired => self.take_over(state, now, record).await,
        }
    }

    /// Single read: does the stored lease name this replica?
    pub async fn holds_lease(&self) -> bool {
        match self.read_holds().await {
            Ok(held) => held,
            Err(e) => {
                warn!("Could not read lease: {}", e);
                false
            }
        }
    }

    async fn read_holds(&self) -> lease_storage::Result<bool> {
        Ok(self
            .store
            .get()
            .await?
            .as_deref()
            .and_then(LeaseRecord::decode)
            .is_some_and(|r| r.is_held_by(&self.identity)))
    }

    /// Clear the lease if, on a fresh read, it names this replica.
    /// Never retries; a failed call is logged and returned as `Failed`.
    pub async fn release_if_held(&self) -> ReleaseOutcome {
        match self.read_holds().await {
            Ok(true) => {}
            Ok(false) => return ReleaseOutcome::NotHeld,
            Err(e) => {
                warn!("Could not read lease before release: {}", e);
                return ReleaseOutcome::Failed {
                    step: ClaimStep::Read,
                    error: e.to_string(),
                };
            }
        }
        match self.store.clear().await {
            Ok(()) => {
                info!("Released lease held by {}", self.identity);
                ReleaseOutcome::Released
            }
            Err(e) => {
                warn!("Could not release lease held by {}: {}", self.identity, e);
                ReleaseOutcome::Failed {
                    step: ClaimStep::Clear,
                    error: e.to_string(),
                }
            }
        }
    }

    fn own_value(&self, now: u64) -> String {
        LeaseRecord::new(self.identity.clone(), now).encode()
    }

    async fn write_own(&self, state: ClaimState, now: u64, outcome: ClaimOutcome) -> ClaimDecision {
        let value = self.own_value(now);
        if let Err(e) = self.store.set(&value).await {
            return self.store_failed(Some(state), ClaimStep::Write, &e);
        }
        match outcome {
            ClaimOutcome::Created => info!("Claimed free lease as {}", value),
            _ => debug!("Renewed lease as {}", value),
        }
        ClaimDecision::claimed(state, outcome)
    }

    async fn take_over(
        &self,
        state: ClaimState,
        now: u64,
        previous: Option<LeaseRecord>,
    ) -> ClaimDecision {
        if let Some(previous) = &previous {
            info!("Lease {} expired, taking over as {}", previous, self.identity);
        }

        if let Err(e) = self.store.clear().await {
            return self.store_failed(Some(state), ClaimStep::Clear, &e);
        }
        let value = self.own_value(now);
        if let Err(e) = self.store.set(&value).await {
            return self.store_failed(Some(state), ClaimStep::Write, &e);
        }

        // Give a renewal already in flight from the previous holder time to
        // land, then see whose value survived.
        tokio::time::sleep(self.params.grace_delay).await;

        let confirmed = match self.store.get().await {
            Ok(value) => value.as_deref().and_then(LeaseRecord::decode),
            Err(e) => return self.store_failed(Some(state), ClaimStep::Read, &e),
        };

        match confirmed {
            Some(record) if record.is_held_by(&self.identity) => {
                info!("Took over lease as {}", value);
                ClaimDecision::claimed(state, ClaimOutcome::TookOver)
            }
            other => {
                let holder = other.map(|r| r.claimant);
                info!(
                    "Lost lease takeover to {}",
                    holder.as_deref().unwrap_or("<nobody>")
                );
                ClaimDecision::not_claimed(Some(state), ClaimOutcome::LostTakeover { holder })
            }
        }
    }

    fn store_failed(
        &self,
        state: Option<ClaimState>,
        step: ClaimStep,
        error: &lease_storage::Error,
    ) -> ClaimDecision {
        warn!("Lease {} failed for {}: {}", step, self.identity, error);
        ClaimDecision::not_claimed(
            state,
            ClaimOutcome::StoreFailed {
                step,
                error: error.to_string(),
            },
        )
    }
}
