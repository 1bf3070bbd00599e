//! Faucet configuration loaded from environment variables.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use trickle_core::constants::{
    DEFAULT_COOLDOWN_SECS, DEFAULT_MAX_CLAIMS, TOKEN_UNIT,
};
use trickle_core::{Address, FaucetPolicy};

#[derive(Clone, Debug)]
pub struct Config {
    /// Address to bind the HTTP server.
    pub bind_addr: String,
    /// Administrator identity.
    pub admin_address: Address,
    /// Bearer token that maps a request to the administrator identity.
    pub admin_token: String,
    /// Amount credited per claim, in base units.
    pub claim_amount: u128,
    /// Cooldown between claims per requester, in seconds.
    pub cooldown_secs: u64,
    /// Lifetime claim count per requester.
    pub max_claims: u32,
    /// Ledger supply cap in base units; `None` means uncapped.
    pub max_supply: Option<u128>,
    /// Where engine and ledger state are persisted.
    pub state_path: PathBuf,
    /// Bind the freshly deployed ledger at start-up.
    pub auto_bind: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bind_addr = var("FAUCET_BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string());

        let admin_address: Address = var("FAUCET_ADMIN_ADDRESS")
            .context("FAUCET_ADMIN_ADDRESS is required")?
            .trim()
            .parse()
            .context("FAUCET_ADMIN_ADDRESS must be a 0x-prefixed 20-byte hex address")?;
        if admin_address.is_zero() {
            bail!("FAUCET_ADMIN_ADDRESS must not be the zero address");
        }

        let admin_token = var("FAUCET_ADMIN_TOKEN").context("FAUCET_ADMIN_TOKEN is required")?;
        if admin_token.trim().is_empty() {
            bail!("FAUCET_ADMIN_TOKEN must not be empty");
        }

        let amount_tokens: u128 = var("FAUCET_AMOUNT_TOKENS")
            .unwrap_or_else(|| "100".to_string())
            .parse()
            .context("FAUCET_AMOUNT_TOKENS must be a positive integer")?;
        let claim_amount = amount_tokens
            .checked_mul(TOKEN_UNIT)
            .context("FAUCET_AMOUNT_TOKENS overflow")?;

        let cooldown_secs: u64 = var("FAUCET_COOLDOWN_SECS")
            .unwrap_or_else(|| DEFAULT_COOLDOWN_SECS.to_string())
            .parse()
            .context("FAUCET_COOLDOWN_SECS must be a positive integer")?;

        let max_claims: u32 = var("FAUCET_MAX_CLAIMS")
            .unwrap_or_else(|| DEFAULT_MAX_CLAIMS.to_string())
            .parse()
            .context("FAUCET_MAX_CLAIMS must be a positive integer")?;

        let max_supply_tokens: u128 = var("FAUCET_MAX_SUPPLY_TOKENS")
            .unwrap_or_else(|| "1000000".to_string())
            .parse()
            .context("FAUCET_MAX_SUPPLY_TOKENS must be a non-negative integer")?;
        let max_supply = match max_supply_tokens {
            0 => None,
            n => Some(
                n.checked_mul(TOKEN_UNIT)
                    .context("FAUCET_MAX_SUPPLY_TOKENS overflow")?,
            ),
        };

        let state_path = var("FAUCET_STATE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".trickle")
                    .join("faucet-state.json")
            });

        let auto_bind = match var("FAUCET_AUTO_BIND").as_deref().map(str::trim) {
            None | Some("true") | Some("1") => true,
            Some("false") | Some("0") => false,
            Some(other) => bail!("FAUCET_AUTO_BIND must be true or false, got {other:?}"),
        };

        let config = Config {
            bind_addr,
            admin_address,
            admin_token,
            claim_amount,
            cooldown_secs,
            max_claims,
            max_supply,
            state_path,
            auto_bind,
        };
        config
            .policy()
            .validate()
            .context("Invalid faucet policy")?;
        Ok(config)
    }

    /// The claim policy this configuration describes.
    pub fn policy(&self) -> FaucetPolicy {
        FaucetPolicy {
            claim_amount: self.claim_amount,
            cooldown_secs: self.cooldown_secs,
            max_claims: self.max_claims,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn admin_hex() -> String {
        format!("0x{}", "ad".repeat(20))
    }

    fn load(pairs: &[(&str, &str)]) -> Result<Config> {
        let mut vars: HashMap<String, String> = HashMap::new();
        vars.insert("FAUCET_ADMIN_ADDRESS".into(), admin_hex());
        vars.insert("FAUCET_ADMIN_TOKEN".into(), "secret".into());
        for (k, v) in pairs {
            vars.insert(k.to_string(), v.to_string());
        }
        Config::from_vars(|k| vars.get(k).cloned())
    }

    #[test]
    fn defaults_match_reference_deployment() {
        let cfg = load(&[]).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080");
        assert_eq!(cfg.policy(), FaucetPolicy::default());
        assert_eq!(cfg.max_supply, Some(1_000_000 * TOKEN_UNIT));
        assert!(cfg.auto_bind);
        assert!(cfg.state_path.ends_with("faucet-state.json"));
    }

    #[test]
    fn admin_address_is_required() {
        let err = Config::from_vars(|k| (k == "FAUCET_ADMIN_TOKEN").then(|| "t".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("FAUCET_ADMIN_ADDRESS"));
    }

    #[test]
    fn zero_admin_is_rejected() {
        let zero = format!("0x{}", "00".repeat(20));
        assert!(load(&[("FAUCET_ADMIN_ADDRESS", &zero)]).is_err());
    }

    #[test]
    fn zero_cooldown_is_rejected() {
        assert!(load(&[("FAUCET_COOLDOWN_SECS", "0")]).is_err());
    }

    #[test]
    fn zero_max_supply_means_uncapped() {
        let cfg = load(&[("FAUCET_MAX_SUPPLY_TOKENS", "0")]).unwrap();
        assert_eq!(cfg.max_supply, None);
    }

    #[test]
    fn custom_values() {
        let cfg = load(&[
            ("FAUCET_AMOUNT_TOKENS", "5"),
            ("FAUCET_COOLDOWN_SECS", "60"),
            ("FAUCET_MAX_CLAIMS", "3"),
            ("FAUCET_STATE_PATH", "/tmp/trickle/state.json"),
            ("FAUCET_AUTO_BIND", "false"),
        ])
        .unwrap();
        assert_eq!(cfg.claim_amount, 5 * TOKEN_UNIT);
        assert_eq!(cfg.cooldown_secs, 60);
        assert_eq!(cfg.max_claims, 3);
        assert_eq!(cfg.state_path, PathBuf::from("/tmp/trickle/state.json"));
        assert!(!cfg.auto_bind);
    }

    #[test]
    fn malformed_auto_bind_is_rejected() {
        assert!(load(&[("FAUCET_AUTO_BIND", "maybe")]).is_err());
    }
}
