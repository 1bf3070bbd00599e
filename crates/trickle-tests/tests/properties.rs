//! Property-based tests for the engine's accounting invariants.
//!
//! Random sequences of claims, clock advances, pause toggles and rebinding
//! are applied to a deployed engine. After every step the suite checks:
//! - no requester ever exceeds the lifetime cap
//! - consecutive successful claims are at least one cooldown apart
//! - remaining allowance matches the claim count exactly
//! - `can_claim` predicts the outcome of the next claim exactly
//! - ledger balances match the engine's claim counts

use std::collections::HashMap;

use proptest::prelude::*;
use trickle_core::{Address, FaucetError, FaucetPolicy, Ledger};
use trickle_tests::helpers::*;

const COOLDOWN: u64 = 100;
const MAX_CLAIMS: u32 = 3;
const REQUESTERS: u8 = 4;

#[derive(Clone, Debug)]
enum Op {
    Claim(u8),
    Advance(u64),
    Pause(bool),
    /// A non-administrator attempts to pause.
    RoguePause(u8),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (1..=REQUESTERS).prop_map(Op::Claim),
        4 => (0..=2 * COOLDOWN).prop_map(Op::Advance),
        1 => any::<bool>().prop_map(Op::Pause),
        1 => (1..=REQUESTERS).prop_map(Op::RoguePause),
    ]
}

fn small_policy() -> FaucetPolicy {
    policy_with(5, COOLDOWN, MAX_CLAIMS)
}

/// Check the per-requester invariants for every requester.
fn check_invariants(f: &Fixture, policy: &FaucetPolicy) -> Result<(), TestCaseError> {
    for seed in 1..=REQUESTERS {
        let who = requester(seed);
        let record = f.engine.record(who);
        prop_assert!(record.total_claimed_count <= policy.max_claims);
        prop_assert_eq!(
            f.engine.remaining_allowance(who),
            policy.claim_amount * u128::from(policy.max_claims - record.total_claimed_count)
        );
        prop_assert_eq!(
            f.balance(who),
            policy.claim_amount * u128::from(record.total_claimed_count)
        );
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn accounting_invariants_hold(ops in prop::collection::vec(op(), 1..80)) {
        let policy = small_policy();
        let f = deploy(policy);
        let mut last_success: HashMap<Address, u64> = HashMap::new();

        for op in ops {
            match op {
                Op::Claim(seed) => {
                    let who = requester(seed);
                    let now = f.engine.now();
                    let predicted = f.engine.can_claim_at(who, now);
                    let outcome = f.engine.request_claim_at(who, now);
                    prop_assert_eq!(predicted, outcome.is_ok(), "can_claim disagreed: {:?}", outcome);

                    if outcome.is_ok() {
                        if let Some(prev) = last_success.insert(who, now) {
                            prop_assert!(now - prev >= COOLDOWN, "claims {} and {} too close", prev, now);
                        }
                    }
                }
                Op::Advance(secs) => {
                    f.clock.advance(secs);
                }
                Op::Pause(paused) => {
                    prop_assert!(f.engine.set_paused(admin(), paused).is_ok());
                    prop_assert_eq!(f.engine.is_paused(), paused);
                }
                Op::RoguePause(seed) => {
                    let before = f.engine.is_paused();
                    let result = f.engine.set_paused(requester(seed), !before);
                    let is_unauthorized = matches!(result, Err(FaucetError::Unauthorized { .. }));
                    prop_assert!(is_unauthorized);
                    prop_assert_eq!(f.engine.is_paused(), before);
                }
            }
            check_invariants(&f, &policy)?;
        }

        let total: u128 = (1..=REQUESTERS).map(|s| f.balance(requester(s))).sum();
        prop_assert_eq!(f.token.total_supply(), total);
    }

    #[test]
    fn can_claim_matches_outcome_at_arbitrary_times(
        claims in prop::collection::vec(0..10 * COOLDOWN, 1..12),
        probe in 0..12 * COOLDOWN,
        paused in any::<bool>(),
    ) {
        let f = deploy(small_policy());
        let who = requester(1);
        let mut sorted = claims;
        sorted.sort_unstable();
        for offset in sorted {
            let _ = f.engine.request_claim_at(who, START + offset);
        }
        f.engine.set_paused(admin(), paused).unwrap();

        let at = START + probe;
        let predicted = f.engine.can_claim_at(who, at);
        let before = f.engine.record(who);
        let outcome = f.engine.request_claim_at(who, at);
        prop_assert_eq!(predicted, outcome.is_ok());
        if outcome.is_err() {
            prop_assert_eq!(f.engine.record(who), before);
        }
    }

    #[test]
    fn set_paused_is_idempotent(value in any::<bool>(), repeats in 1usize..5) {
        let f = deploy(small_policy());
        for _ in 0..repeats {
            prop_assert!(f.engine.set_paused(admin(), value).is_ok());
            prop_assert_eq!(f.engine.is_paused(), value);
        }
    }

    #[test]
    fn unbound_engine_never_mutates(seeds in prop::collection::vec(1..=REQUESTERS, 1..20)) {
        let f = deploy_unbound(small_policy());
        for seed in seeds {
            let who = requester(seed);
            prop_assert_eq!(f.engine.request_claim(who), Err(FaucetError::NotBound));
            prop_assert!(!f.engine.can_claim(who));
        }
        prop_assert_eq!(f.engine.requester_count(), 0);
        prop_assert_eq!(f.token.total_supply(), 0);
    }
}
