//! # trickle-core
//! Claim eligibility and accounting engine for the Trickle faucet.
//!
//! - [`engine::DistributionEngine`]: per-requester cooldown and lifetime-cap
//!   enforcement, pause flag, ledger binding
//! - [`ledger::Ledger`]: the balance ledger collaborator credited on each claim,
//!   with [`ledger::TokenLedger`] as the in-memory implementation
//! - [`events`]: typed notifications delivered to registered observers
//! - [`snapshot`]: serializable engine and ledger state

pub mod address;
pub mod clock;
pub mod constants;
pub mod engine;
pub mod error;
pub mod events;
pub mod ledger;
pub mod policy;
pub mod snapshot;
pub mod types;

pub use address::Address;
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::DistributionEngine;
pub use error::{FaucetError, LedgerError, PolicyError};
pub use events::{EventLog, EventObserver, FaucetEvent};
pub use ledger::{Ledger, TokenLedger};
pub use policy::FaucetPolicy;
pub use types::{ClaimReceipt, ClaimStatus, RequesterRecord};
