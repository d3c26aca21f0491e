// Readiness lease over a last-write-wins store
//
// One replica at a time considers itself leader by keeping a
// "<claimant>:<epoch-seconds>" value fresh in a shared store:
// - created when no lease exists
// - renewed in place by its holder on every probe
// - taken over (clear, write, wait, re-read) once it expires
//
// The store has no compare-and-swap. A renewal issued just before the old
// holder noticed expiry can still land after a takeover write and restore
// the old holder; the grace-delay re-read narrows that window but does not
// close it.

pub mod claim;
pub mod lease;
pub mod state;

pub use claim::{
    validate_identity, ClaimDecision, ClaimOutcome, ClaimParams, ClaimProtocol, ClaimStep,
    ParamsError, ReleaseOutcome,
};
pub use lease::{LeaseRecord, DELIMITER};
pub use state::ClaimState;
