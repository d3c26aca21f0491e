// Properties of the claim protocol over arbitrary leases and clocks

use lease_probe::lease::{ClaimOutcome, ClaimParams, ClaimProtocol, LeaseRecord};
use lease_storage::test_utils::{RecordingStore, StoreOp};
use proptest::prelude::*;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

const SELF: &str = "pod-self";

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap()
        .block_on(future)
}

fn protocol(store: &Arc<RecordingStore>, duration: u64) -> ClaimProtocol {
    ClaimProtocol::new(
        store.clone(),
        SELF,
        ClaimParams {
            lease_duration: Duration::from_secs(duration),
            grace_delay: Duration::from_millis(500),
        },
    )
    .unwrap()
}

fn other_claimant() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,15}".prop_filter("must differ from self", |c| c != SELF)
}

proptest! {
    #[test]
    fn fresh_own_lease_renews_with_one_write(
        duration in 1u64..3600,
        claimed_at in 0u64..2_000_000_000,
        age_frac in 0.0f64..=1.0,
    ) {
        let age = (duration as f64 * age_frac) as u64;
        let now = claimed_at + age;
        let store = Arc::new(RecordingStore::with_value(LeaseRecord::new(SELF, claimed_at).encode()));

        let decision = block_on(protocol(&store, duration).evaluate(now));

        prop_assert!(decision.claimed);
        prop_assert_eq!(decision.outcome, ClaimOutcome::Renewed);
        prop_assert_eq!(store.writes(), vec![StoreOp::Set(format!("{SELF}:{now}"))]);
    }

    #[test]
    fn fresh_foreign_lease_is_never_written(
        holder in other_claimant(),
        duration in 1u64..3600,
        claimed_at in 0u64..2_000_000_000,
        age_frac in 0.0f64..=1.0,
    ) {
        let age = (duration as f64 * age_frac) as u64;
        let now = claimed_at + age;
        let value = LeaseRecord::new(holder.clone(), claimed_at).encode();
        let store = Arc::new(RecordingStore::with_value(value.clone()));

        let decision = block_on(protocol(&store, duration).evaluate(now));

        prop_assert!(!decision.claimed);
        prop_assert_eq!(decision.outcome, ClaimOutcome::Standby { holder });
        prop_assert!(store.writes().is_empty());
        prop_assert_eq!(store.value(), Some(value));
    }

    #[test]
    fn expired_lease_is_cleared_set_and_reverified(
        holder in prop_oneof![Just(SELF.to_string()), other_claimant()],
        duration in 1u64..3600,
        claimed_at in 0u64..2_000_000_000,
        overdue in 1u64..100_000,
        late_writer in proptest::option::of(other_claimant()),
    ) {
        let now = claimed_at + duration + overdue;
        let store = Arc::new(RecordingStore::with_value(LeaseRecord::new(holder, claimed_at).encode()));
        if let Some(late) = &late_writer {
            store.overwrite_after_next_set(LeaseRecord::new(late.clone(), now).encode());
        }

        let decision = block_on(protocol(&store, duration).evaluate(now));

        prop_assert_eq!(
            store.ops(),
            vec![
                StoreOp::Get,
                StoreOp::Clear,
                StoreOp::Set(format!("{SELF}:{now}")),
                StoreOp::Get,
            ]
        );
        let reread = store.value().as_deref().and_then(LeaseRecord::decode).unwrap();
        prop_assert_eq!(decision.claimed, reread.claimant == SELF);
        prop_assert_eq!(decision.claimed, late_writer.is_none());
    }

    #[test]
    fn uncontested_renewals_only_move_the_timestamp(
        duration in 2u64..3600,
        start in 0u64..2_000_000_000,
        step_fracs in proptest::collection::vec(0.0f64..=1.0, 1..20),
    ) {
        let store = Arc::new(RecordingStore::new(Default::default()));
        let protocol = protocol(&store, duration);

        let mut now = start;
        prop_assert!(block_on(protocol.evaluate(now)).claimed);
        for frac in step_fracs {
            now += (duration as f64 * frac) as u64;
            let decision = block_on(protocol.evaluate(now));
            prop_assert!(decision.claimed);
            let record = store.value().as_deref().and_then(LeaseRecord::decode).unwrap();
            prop_assert_eq!(record.claimant.as_str(), SELF);
            prop_assert_eq!(record.claimed_at, Some(now));
        }
    }

    #[test]
    fn record_round_trips(claimant in "[A-Za-z0-9._-]{1,40}", epoch in any::<u64>()) {
        let encoded = LeaseRecord::new(claimant.clone(), epoch).encode();
        let decoded = LeaseRecord::decode(&encoded).unwrap();
        prop_assert_eq!(decoded.claimant, claimant);
        prop_assert_eq!(decoded.claimed_at, Some(epoch));
    }

    #[test]
    fn values_without_delimiter_are_no_lease(value in "[A-Za-z0-9._-]{0,40}") {
        prop_assert_eq!(LeaseRecord::decode(&value), None);
    }
}
