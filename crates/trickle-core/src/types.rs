//! Per-requester accounting types.

use serde::{Deserialize, Serialize};

use crate::address::Address;

/// Claim history of one requester.
///
/// A requester that never claimed has the default record: no last claim
/// and a zero count.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequesterRecord {
    /// Unix time of the most recent successful claim, `None` if never claimed.
    pub last_claim_time: Option<u64>,
    /// Number of successful claims. Never decreases.
    pub total_claimed_count: u32,
}

impl RequesterRecord {
    /// Earliest time the cooldown after the last claim has elapsed.
    pub fn cooldown_ends_at(&self, cooldown_secs: u64) -> Option<u64> {
        self.last_claim_time
            .map(|last| last.saturating_add(cooldown_secs))
    }

    /// Whether the cooldown still blocks a claim at `now`.
    ///
    /// A `now` earlier than the last claim counts as still cooling down.
    pub fn in_cooldown(&self, now: u64, cooldown_secs: u64) -> bool {
        match self.last_claim_time {
            None => false,
            Some(last) => now < last || now - last < cooldown_secs,
        }
    }

    /// The record after one more successful claim at `now`.
    pub fn after_claim(&self, now: u64) -> Self {
        Self {
            last_claim_time: Some(now),
            total_claimed_count: self.total_claimed_count.saturating_add(1),
        }
    }
}

/// Where a requester stands in the claim state machine at a given time.
///
/// `NeverClaimed → Eligible ⇄ InCooldown → … → LifetimeExhausted`. The pause
/// flag is orthogonal and not reflected here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ClaimStatus {
    NeverClaimed,
    Eligible,
    InCooldown { until: u64 },
    LifetimeExhausted,
}

/// Serde adapter writing `u128` amounts as decimal strings.
///
/// JSON consumers commonly parse numbers as doubles, which cannot hold
/// 18-decimal token amounts.
pub mod amount_str {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(amount: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(amount)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// [`amount_str`] for optional amounts; `None` is written as `null`.
pub mod opt_amount_str {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(amount: &Option<u128>, serializer: S) -> Result<S::Ok, S::Error> {
        match amount {
            Some(amount) => serializer.collect_str(amount),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u128>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|s| s.parse().map_err(serde::de::Error::custom))
            .transpose()
    }
}

/// Result of a successful claim.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimReceipt {
    pub requester: Address,
    #[serde(with = "amount_str")]
    pub amount: u128,
    pub timestamp: u64,
    /// The requester's record after the claim.
    pub record: RequesterRecord,
}
