//! Concurrent requesters against one engine.
//!
//! Claims by the same requester must serialize: at a fixed timestamp only
//! one can pass the cooldown check, and across any interleaving the lifetime
//! cap holds. Claims by different requesters must not interfere.

use std::sync::{Arc, Barrier};
use std::thread;

use rand::Rng;
use trickle_core::constants::TOKEN_UNIT;
use trickle_core::{FaucetError, Ledger};
use trickle_tests::helpers::*;

const THREADS: usize = 16;

#[test]
fn same_requester_same_instant_claims_once() {
    let f = deploy(policy());
    let alice = requester(1);
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let engine = f.engine.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                engine.request_claim_at(alice, START)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(matches!(err, FaucetError::CooldownActive { .. }));
    }
    assert_eq!(f.engine.record(alice).total_claimed_count, 1);
    assert_eq!(f.balance(alice), 100 * TOKEN_UNIT);
}

#[test]
fn lifetime_cap_holds_under_contention() {
    let f = deploy(policy_with(1, 10, 5));
    let alice = requester(1);
    let barrier = Arc::new(Barrier::new(THREADS));

    // Every thread claims at a spread of timestamps far enough apart to clear
    // the cooldown, so only the lifetime cap limits the total.
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let engine = f.engine.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                let mut rng = rand::thread_rng();
                let mut won = 0u32;
                for step in 0..20u64 {
                    let jitter = rng.gen_range(0..5);
                    if engine.request_claim_at(alice, START + step * 10 + jitter).is_ok() {
                        won += 1;
                    }
                }
                won
            })
        })
        .collect();

    let total: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert!(total <= 5, "{total} claims exceeded the cap of 5");
    let record = f.engine.record(alice);
    assert_eq!(record.total_claimed_count, total);
    assert_eq!(f.balance(alice), u128::from(total) * TOKEN_UNIT);
}

#[test]
fn distinct_requesters_all_succeed() {
    let f = deploy(policy());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let engine = f.engine.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                engine.request_claim(requester(i as u8 + 1))
            })
        })
        .collect();

    for h in handles {
        assert!(h.join().unwrap().is_ok());
    }
    assert_eq!(f.engine.requester_count(), THREADS);
    assert_eq!(
        f.token.total_supply(),
        THREADS as u128 * 100 * TOKEN_UNIT
    );
}

#[test]
fn pause_races_with_claims_without_partial_state() {
    let f = deploy(policy());
    let barrier = Arc::new(Barrier::new(THREADS + 1));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let engine = f.engine.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                engine.request_claim(requester(i as u8 + 1)).is_ok()
            })
        })
        .collect();

    barrier.wait();
    f.engine.set_paused(admin(), true).unwrap();

    let successes = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();
    assert_eq!(f.engine.requester_count(), successes);
    assert_eq!(
        f.token.total_supply(),
        successes as u128 * 100 * TOKEN_UNIT
    );
    assert!(f.engine.is_paused());
}
