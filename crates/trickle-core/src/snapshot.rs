//! Serializable engine and ledger state, and the on-disk state file.
//!
//! The state file is pretty-printed JSON tagged with a format version. It is
//! written to a sibling temporary file and renamed into place so a crash
//! mid-write never leaves a truncated file behind.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::SnapshotError;
use crate::ledger::TokenMetadata;
use crate::policy::FaucetPolicy;
use crate::types::{amount_str, opt_amount_str, RequesterRecord};

/// Current state file format version.
pub const STATE_FILE_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub address: Address,
    pub administrator: Address,
    pub ledger: Option<Address>,
    pub paused: bool,
    pub policy: FaucetPolicy,
    pub records: BTreeMap<Address, RequesterRecord>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerBalance {
    pub account: Address,
    #[serde(with = "amount_str")]
    pub amount: u128,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub address: Address,
    pub minter: Address,
    pub metadata: TokenMetadata,
    #[serde(with = "opt_amount_str")]
    pub max_supply: Option<u128>,
    #[serde(with = "amount_str")]
    pub total_supply: u128,
    pub balances: Vec<LedgerBalance>,
}

/// Everything the faucet service persists.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateFile {
    pub version: u32,
    pub engine: EngineSnapshot,
    pub ledger: Option<LedgerSnapshot>,
}

impl StateFile {
    pub fn new(engine: EngineSnapshot, ledger: Option<LedgerSnapshot>) -> Self {
        Self {
            version: STATE_FILE_VERSION,
            engine,
            ledger,
        }
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), SnapshotError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_vec_pretty(self)?;
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self, SnapshotError> {
        let data = std::fs::read(path)?;
        let file: StateFile = serde_json::from_slice(&data)?;
        if file.version != STATE_FILE_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                expected: STATE_FILE_VERSION,
                found: file.version,
            });
        }
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_snapshot() -> EngineSnapshot {
        let mut records = BTreeMap::new();
        records.insert(
            Address::repeat_byte(1),
            RequesterRecord {
                last_claim_time: Some(1_700_000_000),
                total_claimed_count: 3,
            },
        );
        EngineSnapshot {
            address: Address::repeat_byte(0xFA),
            administrator: Address::repeat_byte(0xAD),
            ledger: Some(Address::repeat_byte(0x70)),
            paused: true,
            policy: FaucetPolicy::default(),
            records,
        }
    }

    fn ledger_snapshot() -> LedgerSnapshot {
        LedgerSnapshot {
            address: Address::repeat_byte(0x70),
            minter: Address::repeat_byte(0xFA),
            metadata: TokenMetadata::default(),
            max_supply: None,
            total_supply: 5,
            balances: vec![LedgerBalance {
                account: Address::repeat_byte(1),
                amount: 5,
            }],
        }
    }

    #[test]
    fn state_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");
        let file = StateFile::new(engine_snapshot(), Some(ledger_snapshot()));
        file.save_to_file(&path).unwrap();
        let loaded = StateFile::load_from_file(&path).unwrap();
        assert_eq!(loaded, file);
    }

    #[test]
    fn records_are_keyed_by_hex_address() {
        let json = serde_json::to_value(engine_snapshot()).unwrap();
        let key = format!("0x{}", "01".repeat(20));
        assert_eq!(json["records"][&key]["total_claimed_count"], 3);
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut file = StateFile::new(engine_snapshot(), None);
        file.version = 99;
        std::fs::write(&path, serde_json::to_vec(&file).unwrap()).unwrap();
        assert!(matches!(
            StateFile::load_from_file(&path),
            Err(SnapshotError::UnsupportedVersion { expected: 1, found: 99 })
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = StateFile::load_from_file(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, SnapshotError::Io(_)));
    }
}
