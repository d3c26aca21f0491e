pub use std::{
    sync::Arc,
    time::Duration,
};

pub use lease_storage::{LeaseStore, MemoryLeaseStore};

#[allow(unused)]
pub use tracing::{debug, error, info, warn};

pub use crate::config::Config;
pub use crate::lease::{
    ClaimDecision, ClaimOutcome, ClaimParams, ClaimProtocol, ClaimState, LeaseRecord,
    ReleaseOutcome,
};
pub use crate::probe::{Driver, HealthCheck, NotReadyReason, Readiness, ReadinessDecision};
