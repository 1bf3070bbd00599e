//! Distribution policy: how much, how often, how many times.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_CLAIM_AMOUNT, DEFAULT_COOLDOWN_SECS, DEFAULT_MAX_CLAIMS};
use crate::error::PolicyError;

/// Immutable claim policy handed to the engine at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaucetPolicy {
    /// Base units credited per successful claim.
    #[serde(with = "crate::types::amount_str")]
    pub claim_amount: u128,
    /// Minimum seconds between two claims by the same requester.
    pub cooldown_secs: u64,
    /// Successful claims a requester may ever make.
    pub max_claims: u32,
}

impl Default for FaucetPolicy {
    fn default() -> Self {
        Self {
            claim_amount: DEFAULT_CLAIM_AMOUNT,
            cooldown_secs: DEFAULT_COOLDOWN_SECS,
            max_claims: DEFAULT_MAX_CLAIMS,
        }
    }
}

impl FaucetPolicy {
    /// Reject zero values and a lifetime cap that does not fit in `u128`.
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.claim_amount == 0 {
            return Err(PolicyError::ZeroClaimAmount);
        }
        if self.cooldown_secs == 0 {
            return Err(PolicyError::ZeroCooldown);
        }
        if self.max_claims == 0 {
            return Err(PolicyError::ZeroMaxClaims);
        }
        self.claim_amount
            .checked_mul(self.max_claims as u128)
            .ok_or(PolicyError::LifetimeCapOverflow {
                claim_amount: self.claim_amount,
                max_claims: self.max_claims,
            })?;
        Ok(())
    }

    /// Total a single requester can ever receive.
    ///
    /// Saturates for policies that did not pass [`validate`](Self::validate).
    pub fn lifetime_cap(&self) -> u128 {
        self.claim_amount.saturating_mul(self.max_claims as u128)
    }

    /// Budget left for a requester who has made `claims` successful claims.
    pub fn remaining_allowance(&self, claims: u32) -> u128 {
        let left = self.max_claims.saturating_sub(claims);
        self.claim_amount.saturating_mul(left as u128)
    }
}
