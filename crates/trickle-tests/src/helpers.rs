//! Shared fixtures for the integration suites.

use std::sync::Arc;

use trickle_core::constants::TOKEN_UNIT;
use trickle_core::{Address, DistributionEngine, FaucetPolicy, Ledger, ManualClock, TokenLedger};

/// Start time for every fixture clock (2023-11-14T22:13:20Z).
pub const START: u64 = 1_700_000_000;

/// The deploying administrator.
pub fn admin() -> Address {
    Address::repeat_byte(0xAD)
}

/// A distinct requester per seed byte. Seed `0` is avoided since it is the
/// zero address.
pub fn requester(seed: u8) -> Address {
    Address::repeat_byte(seed.max(1))
}

/// The default policy: 100 tokens, one-day cooldown, ten claims.
pub fn policy() -> FaucetPolicy {
    FaucetPolicy::default()
}

/// Policy with explicit parameters.
pub fn policy_with(claim_tokens: u128, cooldown_secs: u64, max_claims: u32) -> FaucetPolicy {
    FaucetPolicy {
        claim_amount: claim_tokens * TOKEN_UNIT,
        cooldown_secs,
        max_claims,
    }
}

/// A deployed engine, its token ledger and the clock driving it.
pub struct Fixture {
    pub engine: Arc<DistributionEngine>,
    pub token: Arc<TokenLedger>,
    pub clock: Arc<ManualClock>,
}

impl Fixture {
    /// Ledger balance of `account`.
    pub fn balance(&self, account: Address) -> u128 {
        self.token.balance_of(account)
    }

    /// Advance the clock by one full cooldown.
    pub fn wait_cooldown(&self) -> u64 {
        self.clock.advance(self.engine.policy().cooldown_secs)
    }
}

/// Two-phase deployment, left unbound: the engine first, then a ledger
/// that names the engine as its minter.
pub fn deploy_unbound(policy: FaucetPolicy) -> Fixture {
    let clock = Arc::new(ManualClock::new(START));
    let engine = DistributionEngine::new(Address::random(), admin(), policy, None)
        .expect("valid policy")
        .with_clock(clock.clone());
    let token = Arc::new(TokenLedger::new(Address::random(), engine.address()));
    Fixture {
        engine: Arc::new(engine),
        token,
        clock,
    }
}

/// Two-phase deployment with the ledger bound by the administrator.
pub fn deploy(policy: FaucetPolicy) -> Fixture {
    let fixture = deploy_unbound(policy);
    fixture
        .engine
        .bind_ledger(admin(), fixture.token.clone())
        .expect("admin can bind");
    fixture
}

/// Claim `count` times for `who`, waiting out the cooldown before each
/// claim after the first.
pub fn claim_times(fixture: &Fixture, who: Address, count: u32) {
    for i in 0..count {
        if i > 0 {
            fixture.wait_cooldown();
        }
        fixture
            .engine
            .request_claim(who)
            .unwrap_or_else(|e| panic!("claim {} for {who} failed: {e}", i + 1));
    }
}
