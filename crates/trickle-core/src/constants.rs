//! Faucet constants. All token amounts are in base units (1 token = 10^18 units).

/// Number of decimal places of the distributed token.
pub const TOKEN_DECIMALS: u8 = 18;

/// Base units in one whole token.
pub const TOKEN_UNIT: u128 = 1_000_000_000_000_000_000;

/// Tokens credited per successful claim.
pub const DEFAULT_CLAIM_AMOUNT: u128 = 100 * TOKEN_UNIT;

/// Minimum time between two claims by the same requester (24 hours).
pub const DEFAULT_COOLDOWN_SECS: u64 = 24 * 60 * 60;

/// Successful claims a single requester may ever make.
pub const DEFAULT_MAX_CLAIMS: u32 = 10;

/// Upper bound on the token's total supply.
pub const DEFAULT_MAX_SUPPLY: u128 = 1_000_000 * TOKEN_UNIT;

/// Token name used by the in-memory ledger.
pub const DEFAULT_TOKEN_NAME: &str = "Faucet Token";

/// Token symbol used by the in-memory ledger.
pub const DEFAULT_TOKEN_SYMBOL: &str = "FTK";

/// Number of events retained by [`EventLog::default`](crate::events::EventLog).
pub const DEFAULT_EVENT_LOG_CAPACITY: usize = 256;

/// Render a base-unit amount as a decimal token string, trimming trailing zeros.
///
/// # Examples
///
/// ```
/// use trickle_core::constants::{format_tokens, TOKEN_UNIT};
/// assert_eq!(format_tokens(100 * TOKEN_UNIT), "100");
/// assert_eq!(format_tokens(TOKEN_UNIT / 2), "0.5");
/// ```
pub fn format_tokens(amount: u128) -> String {
    let whole = amount / TOKEN_UNIT;
    let frac = amount % TOKEN_UNIT;
    if frac == 0 {
        return whole.to_string();
    }
    let digits = format!("{frac:0width$}", width = TOKEN_DECIMALS as usize);
    format!("{whole}.{}", digits.trim_end_matches('0'))
}
