// Classification of the stored lease from one replica's point of view

use super::LeaseRecord;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimState {
    /// Nothing stored, or the stored value did not parse
    NoLease,
    /// Fresh lease written by this replica
    HeldBySelf,
    /// Fresh lease written by another replica
    HeldByOtherFresh,
    /// Expired lease. A stale lease carrying our own name lands here too:
    /// its holder missed the renewal window and has to win it back like
    /// anyone else.
    HeldByOtherExpired,
}

impl ClaimState {
    pub fn classify(
        record: Option<&LeaseRecord>,
        identity: &str,
        now: u64,
        duration: Duration,
    ) -> Self {
        match record {
            None => ClaimState::NoLease,
            Some(record) if record.is_expired(now, duration) => ClaimState::HeldByOtherExpired,
            Some(record) if record.is_held_by(identity) => ClaimState::HeldBySelf,
            Some(_) => ClaimState::HeldByOtherFresh,
        }
    }
}

impl fmt::Display for ClaimState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClaimState::NoLease => "no-lease",
            ClaimState::HeldBySelf => "held-by-self",
            ClaimState::HeldByOtherFresh => "held-by-other",
            ClaimState::HeldByOtherExpired => "expired",
        };
        f.write_str(name)
    }
}
