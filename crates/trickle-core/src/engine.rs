//! The distribution engine: claim eligibility, accounting and admin controls.
//!
//! # Atomicity
//!
//! One mutex guards the pause flag, the ledger binding and every requester
//! record. Each state-changing operation holds it from its first check to its
//! last event, so operations are totally ordered and no caller ever observes
//! a half-applied claim.
//!
//! A claim runs credit-then-mutate: eligibility is checked, the ledger is
//! credited, and only once the credit has succeeded is the requester's
//! record advanced and the event emitted. A failing ledger therefore leaves
//! the record untouched. Because the lock is held across the credit, two
//! concurrent claims by the same requester cannot both pass the lifetime
//! check.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::address::Address;
use crate::clock::{Clock, SystemClock};
use crate::error::{FaucetError, PolicyError, SnapshotError};
use crate::events::{EventObserver, FaucetEvent};
use crate::ledger::Ledger;
use crate::policy::FaucetPolicy;
use crate::snapshot::EngineSnapshot;
use crate::types::{ClaimReceipt, ClaimStatus, RequesterRecord};

struct EngineState {
    ledger: Option<Arc<dyn Ledger>>,
    paused: bool,
    records: HashMap<Address, RequesterRecord>,
}

/// Rate-limited, lifetime-capped token distribution.
pub struct DistributionEngine {
    address: Address,
    administrator: Address,
    policy: FaucetPolicy,
    clock: Arc<dyn Clock>,
    state: Mutex<EngineState>,
    observers: RwLock<Vec<Arc<dyn EventObserver>>>,
}

impl DistributionEngine {
    /// Construct an engine deployed by `administrator`.
    ///
    /// `address` is the engine's own identity, which it presents to the
    /// ledger when crediting. `ledger` may be `None` for a two-phase
    /// deployment where the ledger is created afterwards and bound with
    /// [`bind_ledger`](Self::bind_ledger). Starts unpaused, on the system clock.
    pub fn new(
        address: Address,
        administrator: Address,
        policy: FaucetPolicy,
        ledger: Option<Arc<dyn Ledger>>,
    ) -> Result<Self, PolicyError> {
        policy.validate()?;
        info!(
            engine = %address,
            %administrator,
            ledger = ?ledger.as_ref().map(|l| l.address()),
            claim_amount = %policy.claim_amount,
            cooldown_secs = policy.cooldown_secs,
            max_claims = policy.max_claims,
            "engine: constructed"
        );
        Ok(Self {
            address,
            administrator,
            policy,
            clock: Arc::new(SystemClock),
            state: Mutex::new(EngineState {
                ledger,
                paused: false,
                records: HashMap::new(),
            }),
            observers: RwLock::new(Vec::new()),
        })
    }

    /// Replace the clock used by the ambient-time operations.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Register an observer for all subsequent events.
    pub fn subscribe(&self, observer: Arc<dyn EventObserver>) {
        self.observers.write().push(observer);
    }

    // -------------------------------------------------------------------------
    // Claims
    // -------------------------------------------------------------------------

    /// Claim at the clock's current time.
    pub fn request_claim(&self, requester: Address) -> Result<ClaimReceipt, FaucetError> {
        self.request_claim_at(requester, self.clock.now())
    }

    /// Claim `claim_amount` for `requester` at `now`.
    ///
    /// Checks, in order: ledger bound, not paused, lifetime cap, cooldown.
    pub fn request_claim_at(&self, requester: Address, now: u64) -> Result<ClaimReceipt, FaucetError> {
        let mut state = self.state.lock();
        let (ledger, record) = match self.eligibility(&state, requester, now) {
            Ok(eligible) => eligible,
            Err(e) => {
                debug!(%requester, now, error = %e, "engine: claim rejected");
                return Err(e);
            }
        };

        let amount = self.policy.claim_amount;
        if let Err(e) = ledger.credit(self.address, requester, amount) {
            warn!(%requester, ledger = %ledger.address(), error = %e, "engine: ledger credit failed");
            return Err(e.into());
        }

        let updated = record.after_claim(now);
        state.records.insert(requester, updated);
        info!(
            %requester,
            amount = %amount,
            claims = updated.total_claimed_count,
            max_claims = self.policy.max_claims,
            "engine: claim succeeded"
        );
        self.emit(&FaucetEvent::ClaimSucceeded {
            requester,
            amount,
            timestamp: now,
        });

        Ok(ClaimReceipt {
            requester,
            amount,
            timestamp: now,
            record: updated,
        })
    }

    /// Whether [`request_claim`](Self::request_claim) would succeed right now.
    pub fn can_claim(&self, requester: Address) -> bool {
        self.can_claim_at(requester, self.clock.now())
    }

    /// Whether [`request_claim_at`](Self::request_claim_at) with the same
    /// arguments would succeed. Never mutates.
    pub fn can_claim_at(&self, requester: Address, now: u64) -> bool {
        let state = self.state.lock();
        match self.eligibility(&state, requester, now) {
            Ok((ledger, _)) => ledger
                .check_credit(self.address, requester, self.policy.claim_amount)
                .is_ok(),
            Err(_) => false,
        }
    }

    /// Shared by claim and query paths so they can never disagree.
    fn eligibility(
        &self,
        state: &EngineState,
        requester: Address,
        now: u64,
    ) -> Result<(Arc<dyn Ledger>, RequesterRecord), FaucetError> {
        let ledger = state.ledger.clone().ok_or(FaucetError::NotBound)?;
        if state.paused {
            return Err(FaucetError::Paused);
        }
        let record = state.records.get(&requester).copied().unwrap_or_default();
        if record.total_claimed_count >= self.policy.max_claims {
            return Err(FaucetError::LifetimeLimitReached {
                max_claims: self.policy.max_claims,
            });
        }
        if record.in_cooldown(now, self.policy.cooldown_secs) {
            let next_claim_at = record
                .cooldown_ends_at(self.policy.cooldown_secs)
                .unwrap_or(now);
            return Err(FaucetError::CooldownActive { next_claim_at });
        }
        Ok((ledger, record))
    }

    // -------------------------------------------------------------------------
    // Administration
    // -------------------------------------------------------------------------

    /// Set the global pause flag. Administrator only; setting the current
    /// value again is allowed and still emits an event.
    pub fn set_paused(&self, caller: Address, paused: bool) -> Result<(), FaucetError> {
        self.ensure_administrator(caller, "set_paused")?;
        let mut state = self.state.lock();
        state.paused = paused;
        info!(paused, "engine: pause state changed");
        self.emit(&FaucetEvent::PauseStateChanged { paused });
        Ok(())
    }

    /// Bind (or rebind) the ledger credited on claims. Administrator only.
    ///
    /// Requester records are kept across rebinding, so lifetime caps count
    /// claims made against every ledger the engine has used.
    pub fn bind_ledger(&self, caller: Address, ledger: Arc<dyn Ledger>) -> Result<(), FaucetError> {
        self.ensure_administrator(caller, "bind_ledger")?;
        let new_address = ledger.address();
        let mut state = self.state.lock();
        if let Some(previous) = state.ledger.as_ref().map(|l| l.address()) {
            if previous != new_address {
                warn!(%previous, ledger = %new_address, "engine: rebinding ledger");
            }
        }
        state.ledger = Some(ledger);
        info!(ledger = %new_address, "engine: ledger bound");
        self.emit(&FaucetEvent::LedgerBound { ledger: new_address });
        Ok(())
    }

    fn ensure_administrator(&self, caller: Address, operation: &str) -> Result<(), FaucetError> {
        if caller != self.administrator {
            warn!(%caller, operation, "engine: unauthorized admin call");
            return Err(FaucetError::Unauthorized { caller });
        }
        Ok(())
    }

    fn emit(&self, event: &FaucetEvent) {
        for observer in self.observers.read().iter() {
            observer.on_event(event);
        }
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Base units the requester can still receive over its lifetime.
    ///
    /// Ignores cooldown and pause state.
    pub fn remaining_allowance(&self, requester: Address) -> u128 {
        let claims = self.record(requester).total_claimed_count;
        self.policy.remaining_allowance(claims)
    }

    /// The requester's record; the zero record if it never claimed.
    pub fn record(&self, requester: Address) -> RequesterRecord {
        self.state
            .lock()
            .records
            .get(&requester)
            .copied()
            .unwrap_or_default()
    }

    /// When the cooldown after the last claim ends. `None` if the requester
    /// never claimed or can never claim again.
    pub fn next_claim_at(&self, requester: Address) -> Option<u64> {
        let record = self.record(requester);
        if record.total_claimed_count >= self.policy.max_claims {
            return None;
        }
        record.cooldown_ends_at(self.policy.cooldown_secs)
    }

    /// Per-requester state at `now`, ignoring pause and binding.
    pub fn claim_status_at(&self, requester: Address, now: u64) -> ClaimStatus {
        let record = self.record(requester);
        if record.total_claimed_count >= self.policy.max_claims {
            return ClaimStatus::LifetimeExhausted;
        }
        match record.cooldown_ends_at(self.policy.cooldown_secs) {
            None => ClaimStatus::NeverClaimed,
            Some(until) if record.in_cooldown(now, self.policy.cooldown_secs) => {
                ClaimStatus::InCooldown { until }
            }
            Some(_) => ClaimStatus::Eligible,
        }
    }

    pub fn claim_status(&self, requester: Address) -> ClaimStatus {
        self.claim_status_at(requester, self.clock.now())
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    pub fn administrator(&self) -> Address {
        self.administrator
    }

    /// The engine's own identity.
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn policy(&self) -> &FaucetPolicy {
        &self.policy
    }

    pub fn ledger_address(&self) -> Option<Address> {
        self.state.lock().ledger.as_ref().map(|l| l.address())
    }

    pub fn ledger(&self) -> Option<Arc<dyn Ledger>> {
        self.state.lock().ledger.clone()
    }

    /// Number of requesters with at least one successful claim.
    pub fn requester_count(&self) -> usize {
        self.state.lock().records.len()
    }

    /// Current time according to the engine's clock.
    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    // -------------------------------------------------------------------------
    // Snapshots
    // -------------------------------------------------------------------------

    pub fn snapshot(&self) -> EngineSnapshot {
        let state = self.state.lock();
        EngineSnapshot {
            address: self.address,
            administrator: self.administrator,
            ledger: state.ledger.as_ref().map(|l| l.address()),
            paused: state.paused,
            policy: self.policy,
            records: state
                .records
                .iter()
                .map(|(k, v)| (*k, *v))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    /// Rebuild an engine from a snapshot.
    ///
    /// If the snapshot was bound, `ledger` must be the ledger it was bound
    /// to. Passing a ledger for an unbound snapshot binds it.
    pub fn restore(
        snapshot: EngineSnapshot,
        ledger: Option<Arc<dyn Ledger>>,
    ) -> Result<Self, SnapshotError> {
        snapshot.policy.validate()?;
        for (requester, record) in &snapshot.records {
            if record.total_claimed_count > snapshot.policy.max_claims {
                return Err(SnapshotError::RecordOverCap {
                    requester: *requester,
                    claims: record.total_claimed_count,
                    max_claims: snapshot.policy.max_claims,
                });
            }
        }
        if let Some(expected) = snapshot.ledger {
            let found = ledger.as_ref().map(|l| l.address());
            if found != Some(expected) {
                return Err(SnapshotError::LedgerMismatch { expected, found });
            }
        }

        let engine = Self::new(snapshot.address, snapshot.administrator, snapshot.policy, ledger)?;
        {
            let mut state = engine.state.lock();
            state.paused = snapshot.paused;
            state.records = snapshot.records.into_iter().collect();
        }
        Ok(engine)
    }
}
