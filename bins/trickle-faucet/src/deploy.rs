//! Two-phase deployment and state persistence.
//!
//! On first start the engine is created unbound, the token ledger is created
//! with the engine as its minter, and the ledger is then bound to the engine.
//! Afterwards both are restored from the state file.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tracing::{info, warn};

use trickle_core::snapshot::StateFile;
use trickle_core::{Address, DistributionEngine, EventObserver, FaucetEvent, Ledger, TokenLedger};

use crate::config::Config;

/// Logs every engine event.
pub struct TracingObserver;

impl EventObserver for TracingObserver {
    fn on_event(&self, event: &FaucetEvent) {
        match event {
            FaucetEvent::ClaimSucceeded { requester, amount, timestamp } => {
                info!(%requester, amount = %amount, timestamp, "event: claim succeeded")
            }
            FaucetEvent::PauseStateChanged { paused } => {
                info!(paused, "event: pause state changed")
            }
            FaucetEvent::LedgerBound { ledger } => info!(%ledger, "event: ledger bound"),
        }
    }
}

/// The deployed engine and the token ledger it mints.
pub struct Deployment {
    pub engine: Arc<DistributionEngine>,
    pub token: Arc<TokenLedger>,
    save_lock: Mutex<()>,
}

impl Deployment {
    /// Restore from `config.state_path` if it exists, otherwise deploy fresh.
    pub fn load_or_deploy(config: &Config) -> Result<Self> {
        if config.state_path.exists() {
            let deployment = Self::restore(config)?;
            info!(
                path = %config.state_path.display(),
                requesters = deployment.engine.requester_count(),
                "Restored faucet state"
            );
            return Ok(deployment);
        }
        let deployment = Self::deploy(config)?;
        deployment.save(&config.state_path)?;
        Ok(deployment)
    }

    /// Fresh two-phase deployment.
    pub fn deploy(config: &Config) -> Result<Self> {
        let engine = DistributionEngine::new(
            Address::random(),
            config.admin_address,
            config.policy(),
            None,
        )
        .context("Failed to construct distribution engine")?;
        info!(engine = %engine.address(), "Deployed distribution engine");

        let token = Arc::new(
            TokenLedger::new(Address::random(), engine.address())
                .with_max_supply(config.max_supply),
        );
        info!(ledger = %token.address(), minter = %token.minter(), "Deployed token ledger");

        if config.auto_bind {
            engine
                .bind_ledger(config.admin_address, token.clone())
                .context("Failed to bind ledger")?;
        } else {
            warn!("Ledger not bound; claims fail until an administrator binds it");
        }

        Ok(Self::assemble(engine, token))
    }

    fn restore(config: &Config) -> Result<Self> {
        let file = StateFile::load_from_file(&config.state_path)
            .with_context(|| format!("Failed to load state from {}", config.state_path.display()))?;

        if file.engine.administrator != config.admin_address {
            warn!(
                stored = %file.engine.administrator,
                configured = %config.admin_address,
                "Administrator is fixed at deployment; ignoring FAUCET_ADMIN_ADDRESS"
            );
        }
        if file.engine.policy != config.policy() {
            warn!("Policy is fixed at deployment; ignoring configured policy");
        }

        let token = match file.ledger {
            Some(snapshot) => Arc::new(
                TokenLedger::restore(snapshot).context("Corrupt ledger state")?,
            ),
            None => Arc::new(
                TokenLedger::new(Address::random(), file.engine.address)
                    .with_max_supply(config.max_supply),
            ),
        };

        let bound = file.engine.ledger.is_some();
        let ledger = bound.then(|| token.clone() as Arc<dyn Ledger>);
        let engine =
            DistributionEngine::restore(file.engine, ledger).context("Corrupt engine state")?;

        if !bound && config.auto_bind {
            let admin = engine.administrator();
            engine
                .bind_ledger(admin, token.clone())
                .context("Failed to bind ledger")?;
        }

        Ok(Self::assemble(engine, token))
    }

    fn assemble(engine: DistributionEngine, token: Arc<TokenLedger>) -> Self {
        engine.subscribe(Arc::new(TracingObserver));
        Self {
            engine: Arc::new(engine),
            token,
            save_lock: Mutex::new(()),
        }
    }

    /// Persist engine and ledger state.
    ///
    /// Snapshots are taken under the save lock so concurrent saves land in
    /// the order their snapshots were taken.
    pub fn save(&self, path: &Path) -> Result<()> {
        let _guard = self.save_lock.lock();
        let file = StateFile::new(self.engine.snapshot(), Some(self.token.snapshot()));
        file.save_to_file(path)
            .with_context(|| format!("Failed to save state to {}", path.display()))
    }
}
