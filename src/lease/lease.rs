// Wire form of the lease value

use std::fmt;
use std::time::Duration;

/// Separator between claimant and timestamp.
pub const DELIMITER: char = ':';

/// A decoded lease value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseRecord {
    /// Identity of the replica that wrote the lease
    pub claimant: String,
    /// Seconds since the Unix epoch. `None` when the stored timestamp field
    /// was empty; such a lease is always expired.
    pub claimed_at: Option<u64>,
}

impl LeaseRecord {
    pub fn new(claimant: impl Into<String>, claimed_at: u64) -> Self {
        Self {
            claimant: claimant.into(),
            claimed_at: Some(claimed_at),
        }
    }

    /// Render as `<claimant>:<epoch-seconds>`.
    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Parse a stored value.
    ///
    /// Anything that is not exactly two `:`-separated fields with a
    /// non-empty claimant and a numeric (or empty) timestamp is treated as no
    /// lease at all.
    pub fn decode(value: &str) -> Option<Self> {
        let value = value.trim();
        let mut fields = value.split(DELIMITER);
        let claimant = fields.next()?;
        let claimed_at = fields.next()?;
        if fields.next().is_some() || claimant.is_empty() {
            return None;
        }

        let claimed_at = if claimed_at.is_empty() {
            None
        } else {
            Some(claimed_at.parse::<u64>().ok()?)
        };

        Some(Self {
            claimant: claimant.to_string(),
            claimed_at,
        })
    }

    pub fn is_held_by(&self, identity: &str) -> bool {
        self.claimant == identity
    }

    /// Seconds since the lease was written. A timestamp in the future (clock
    /// skew between replicas) counts as age zero.
    pub fn age(&self, now: u64) -> Option<u64> {
        self.claimed_at.map(|at| now.saturating_sub(at))
    }

    /// Expired iff the timestamp is missing or `now - claimed_at > duration`.
    pub fn is_expired(&self, now: u64, duration: Duration) -> bool {
        match self.age(now) {
            Some(age) => age > duration.as_secs(),
            None => true,
        }
    }
}

impl fmt::Display for LeaseRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.claimed_at {
            Some(at) => write!(f, "{}{}{}", self.claimant, DELIMITER, at),
            None => write!(f, "{}{}", self.claimant, DELIMITER),
        }
    }
}
