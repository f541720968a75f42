// 8.0 engine/core.rs: main engine. owns the store, the clock and the mission catalog.
// every mutating operation is read-plan-commit and goes through `with_retry`.

use super::results::LedgerError;
use crate::account::Account;
use crate::clock::{Clock, SystemClock};
use crate::config::EconomyConfig;
use crate::marketplace::default_items;
use crate::mission::{default_missions, Mission};
use crate::session::Session;
use crate::store::{ChangeSet, MemoryStore, NewAccount, Store, StoreError};
use crate::types::{AccountId, Amount, MissionId, Timestamp, UserId};
use std::sync::Arc;
use tracing::{debug, info, warn};

/** 8.1: main engine struct. holds no balances itself, the store is the only source of truth */
pub struct Engine<S: Store = MemoryStore> {
    pub(super) config: EconomyConfig,
    pub(super) store: S,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) missions: Vec<Mission>,
}

impl Engine<MemoryStore> {
    /// In-process engine on the wall clock, catalog seeded.
    pub fn in_memory(config: EconomyConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: EconomyConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(config, MemoryStore::with_items(default_items()), clock)
    }
}

impl<S: Store> Engine<S> {
    pub fn new(config: EconomyConfig, store: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            store,
            clock,
            missions: default_missions(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EconomyConfig {
        &self.config
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn missions(&self) -> &[Mission] {
        &self.missions
    }

    pub fn mission(&self, id: &MissionId) -> Option<&Mission> {
        self.missions.iter().find(|m| &m.id == id)
    }

    /// Map an identity to its account, opening it with the starting grant on first sight.
    pub fn login(&self, user: &UserId) -> Result<Session, LedgerError> {
        if let Some(account) = self.store.account_by_user(user) {
            debug!(user = %user, account = %account.id, "existing account");
            return Ok(Session::new(user.clone(), account.id, self.now()));
        }

        let now = self.now();
        let changes = ChangeSet::new().open_account(NewAccount {
            user: user.clone(),
            opening_balance: self.config.starting_balance,
            created_at: now,
        });

        match self.store.commit(changes) {
            Ok(receipt) => {
                let account = receipt
                    .account
                    .ok_or_else(|| LedgerError::Store("commit did not report the new account".to_string()))?;
                info!(
                    user = %user,
                    account = %account.id,
                    grant = %account.opening_balance,
                    "account opened"
                );
                Ok(Session::new(user.clone(), account.id, now))
            }
            // another session opened it first
            Err(StoreError::DuplicateAccount(_)) => self
                .store
                .account_by_user(user)
                .map(|account| Session::new(user.clone(), account.id, now))
                .ok_or_else(|| LedgerError::UnknownUser(user.clone())),
            Err(e) => Err(e.into()),
        }
    }

    pub(super) fn load_account(&self, id: AccountId) -> Result<Account, LedgerError> {
        self.store.account(id).ok_or(LedgerError::UnknownAccount(id))
    }

    // zero is never a valid movement; above i64::MAX cannot be expressed as a delta
    pub(super) fn ensure_amount(&self, amount: Amount) -> Result<(), LedgerError> {
        if amount.is_zero() {
            return Err(LedgerError::InvalidAmount("amount must be positive".to_string()));
        }
        if amount.value() > i64::MAX as u64 {
            return Err(LedgerError::InvalidAmount(format!("{} is too large", amount)));
        }
        Ok(())
    }

    /// 8.2: run one read-plan-commit attempt until it stops conflicting or the policy runs out.
    pub(super) fn with_retry<T>(
        &self,
        op: &'static str,
        mut attempt: impl FnMut() -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let policy = &self.config.retry;
        let mut failures = 0u32;
        loop {
            match attempt() {
                Err(LedgerError::Conflict { account, .. }) => {
                    failures += 1;
                    if failures >= policy.max_attempts {
                        warn!(op, account = %account, attempts = failures, "giving up after repeated conflicts");
                        return Err(LedgerError::Conflict {
                            account,
                            attempts: failures,
                        });
                    }
                    let delay = policy.backoff(failures);
                    debug!(op, account = %account, attempt = failures, ?delay, "version conflict, retrying");
                    if delay.is_zero() {
                        std::thread::yield_now();
                    } else {
                        std::thread::sleep(delay);
                    }
                }
                other => return other,
            }
        }
    }
}
