//! Balance ledger collaborator.
//!
//! The engine only ever asks a ledger to credit an account; it never reads or
//! writes ledger internals. [`TokenLedger`] is the in-memory fungible token
//! used by the faucet service and tests: zero initial supply, 18 decimals,
//! minting restricted to a single minter (the engine) and an optional cap on
//! total supply.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::address::Address;
use crate::constants::{DEFAULT_MAX_SUPPLY, DEFAULT_TOKEN_NAME, DEFAULT_TOKEN_SYMBOL, TOKEN_DECIMALS};
use crate::error::{LedgerError, SnapshotError};
use crate::snapshot::{LedgerBalance, LedgerSnapshot};

/// A balance ledger the engine can credit.
///
/// `credit` must be atomic: it either applies fully or returns an error and
/// leaves every balance unchanged.
pub trait Ledger: Send + Sync {
    /// Identity of this ledger.
    fn address(&self) -> Address;

    /// Increase `account`'s balance by `amount` on behalf of `caller`.
    fn credit(&self, caller: Address, account: Address, amount: u128) -> Result<(), LedgerError>;

    /// Whether `credit` with the same arguments would currently succeed.
    ///
    /// Default implementation accepts everything; ledgers with credit
    /// restrictions should override it so eligibility queries stay exact.
    fn check_credit(&self, _caller: Address, _account: Address, _amount: u128) -> Result<(), LedgerError> {
        Ok(())
    }

    /// Current balance of `account`. Unknown accounts hold zero.
    fn balance_of(&self, account: Address) -> u128;

    /// Sum of all balances.
    fn total_supply(&self) -> u128;
}

/// Descriptive token metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl Default for TokenMetadata {
    fn default() -> Self {
        Self {
            name: DEFAULT_TOKEN_NAME.to_string(),
            symbol: DEFAULT_TOKEN_SYMBOL.to_string(),
            decimals: TOKEN_DECIMALS,
        }
    }
}

#[derive(Debug, Default)]
struct Balances {
    accounts: HashMap<Address, u128>,
    total_supply: u128,
}

/// In-memory mintable token.
pub struct TokenLedger {
    address: Address,
    minter: Address,
    metadata: TokenMetadata,
    /// `None` means uncapped.
    max_supply: Option<u128>,
    balances: RwLock<Balances>,
}

impl TokenLedger {
    /// Deploy a token at `address` that only `minter` may credit.
    ///
    /// Starts with zero supply and the default metadata and supply cap.
    pub fn new(address: Address, minter: Address) -> Self {
        Self {
            address,
            minter,
            metadata: TokenMetadata::default(),
            max_supply: Some(DEFAULT_MAX_SUPPLY),
            balances: RwLock::new(Balances::default()),
        }
    }

    /// Replace the supply cap. `None` removes it.
    pub fn with_max_supply(mut self, max_supply: Option<u128>) -> Self {
        self.max_supply = max_supply;
        self
    }

    pub fn with_metadata(mut self, metadata: TokenMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn minter(&self) -> Address {
        self.minter
    }

    pub fn metadata(&self) -> &TokenMetadata {
        &self.metadata
    }

    pub fn max_supply(&self) -> Option<u128> {
        self.max_supply
    }

    /// Number of accounts with a recorded balance.
    pub fn holder_count(&self) -> usize {
        self.balances.read().accounts.len()
    }

    fn validate_credit(&self, balances: &Balances, caller: Address, account: Address, amount: u128) -> Result<(u128, u128), LedgerError> {
        if caller != self.minter {
            return Err(LedgerError::NotMinter { caller });
        }
        let new_supply = balances
            .total_supply
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        if let Some(cap) = self.max_supply {
            if new_supply > cap {
                return Err(LedgerError::SupplyCapExceeded {
                    supply: balances.total_supply,
                    amount,
                    cap,
                });
            }
        }
        let current = balances.accounts.get(&account).copied().unwrap_or(0);
        let new_balance = current.checked_add(amount).ok_or(LedgerError::Overflow)?;
        Ok((new_balance, new_supply))
    }

    /// Serializable copy of the full ledger state.
    pub fn snapshot(&self) -> LedgerSnapshot {
        let balances = self.balances.read();
        let mut entries: Vec<LedgerBalance> = balances
            .accounts
            .iter()
            .map(|(account, amount)| LedgerBalance {
                account: *account,
                amount: *amount,
            })
            .collect();
        entries.sort_by_key(|entry| entry.account);
        LedgerSnapshot {
            address: self.address,
            minter: self.minter,
            metadata: self.metadata.clone(),
            max_supply: self.max_supply,
            total_supply: balances.total_supply,
            balances: entries,
        }
    }

    /// Rebuild a ledger from a snapshot, checking that its supply adds up.
    pub fn restore(snapshot: LedgerSnapshot) -> Result<Self, SnapshotError> {
        let mut accounts = HashMap::with_capacity(snapshot.balances.len());
        let mut computed: u128 = 0;
        for entry in &snapshot.balances {
            computed = computed.saturating_add(entry.amount);
            accounts.insert(entry.account, entry.amount);
        }
        if computed != snapshot.total_supply {
            return Err(SnapshotError::SupplyMismatch {
                recorded: snapshot.total_supply,
                computed,
            });
        }
        Ok(Self {
            address: snapshot.address,
            minter: snapshot.minter,
            metadata: snapshot.metadata,
            max_supply: snapshot.max_supply,
            balances: RwLock::new(Balances {
                accounts,
                total_supply: computed,
            }),
        })
    }
}

impl Ledger for TokenLedger {
    fn address(&self) -> Address {
        self.address
    }

    fn credit(&self, caller: Address, account: Address, amount: u128) -> Result<(), LedgerError> {
        let mut balances = self.balances.write();
        let (new_balance, new_supply) = self.validate_credit(&balances, caller, account, amount)?;
        balances.accounts.insert(account, new_balance);
        balances.total_supply = new_supply;
        debug!(ledger = %self.address, %account, amount = %amount, "ledger: credited");
        Ok(())
    }

    fn check_credit(&self, caller: Address, account: Address, amount: u128) -> Result<(), LedgerError> {
        let balances = self.balances.read();
        self.validate_credit(&balances, caller, account, amount).map(|_| ())
    }

    fn balance_of(&self, account: Address) -> u128 {
        self.balances
            .read()
            .accounts
            .get(&account)
            .copied()
            .unwrap_or(0)
    }

    fn total_supply(&self) -> u128 {
        self.balances.read().total_supply
    }
}
