//! Error types for the Trickle faucet.
use thiserror::Error;

use crate::address::Address;

/// Reasons a faucet operation is refused.
///
/// Every variant aborts the whole operation with no state change.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FaucetError {
    #[error("caller {caller} is not the administrator")]
    Unauthorized { caller: Address },
    #[error("no ledger is bound to the faucet")]
    NotBound,
    #[error("faucet is paused")]
    Paused,
    #[error("cooldown period not elapsed: next claim at {next_claim_at}")]
    CooldownActive { next_claim_at: u64 },
    #[error("lifetime claim limit reached ({max_claims} claims)")]
    LifetimeLimitReached { max_claims: u32 },
    #[error("ledger credit failed: {0}")]
    Ledger(#[from] LedgerError),
}

impl FaucetError {
    /// Stable snake_case identifier, used by transport layers.
    pub fn kind(&self) -> &'static str {
        match self {
            FaucetError::Unauthorized { .. } => "unauthorized",
            FaucetError::NotBound => "not_bound",
            FaucetError::Paused => "paused",
            FaucetError::CooldownActive { .. } => "cooldown_active",
            FaucetError::LifetimeLimitReached { .. } => "lifetime_limit_reached",
            FaucetError::Ledger(_) => "ledger",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("caller {caller} is not the minter")] NotMinter { caller: Address },
    #[error("supply cap exceeded: {supply} + {amount} > {cap}")] SupplyCapExceeded { supply: u128, amount: u128, cap: u128 },
    #[error("balance overflow")] Overflow,
    #[error("ledger unavailable: {0}")] Unavailable(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("claim amount must be greater than zero")] ZeroClaimAmount,
    #[error("cooldown must be greater than zero")] ZeroCooldown,
    #[error("max claims must be greater than zero")] ZeroMaxClaims,
    #[error("lifetime cap overflows: {claim_amount} * {max_claims}")] LifetimeCapOverflow { claim_amount: u128, max_claims: u32 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("missing 0x prefix")] MissingPrefix,
    #[error("invalid length: {0} hex digits")] InvalidLength(usize),
    #[error("invalid hex: {0}")] InvalidHex(String),
}

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error(transparent)] Policy(#[from] PolicyError),
    #[error("record for {requester} has {claims} claims, above max {max_claims}")] RecordOverCap { requester: Address, claims: u32, max_claims: u32 },
    #[error("snapshot is bound to ledger {expected}, got {found:?}")] LedgerMismatch { expected: Address, found: Option<Address> },
    #[error("ledger supply {recorded} does not match sum of balances {computed}")] SupplyMismatch { recorded: u128, computed: u128 },
    #[error("unsupported state file version {found}, expected {expected}")] UnsupportedVersion { expected: u32, found: u32 },
    #[error("serialization: {0}")] Serialization(#[from] serde_json::Error),
    #[error("io: {0}")] Io(#[from] std::io::Error),
}
