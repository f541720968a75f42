//! Account-to-account transfers and house credits.

use super::core::Engine;
use super::results::LedgerError;
use crate::journal::{EntryKind, LedgerEntry, NewEntry};
use crate::store::{BalanceDelta, ChangeSet, Store};
use crate::types::{AccountId, Amount, SignedAmount};
use tracing::info;

impl<S: Store> Engine<S> {
    /// Move `amount` from one account to another. Debit, credit and the paired
    /// entry land in a single commit.
    pub fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Amount,
        note: Option<String>,
    ) -> Result<LedgerEntry, LedgerError> {
        self.ensure_amount(amount)?;
        if from == to {
            return Err(LedgerError::SelfTransfer(from));
        }

        let entry = self.with_retry("transfer", || {
            let sender = self.load_account(from)?;
            let recipient = self.load_account(to)?;
            if !sender.can_cover(amount) {
                return Err(LedgerError::InsufficientFunds {
                    account: from,
                    requested: amount,
                    available: sender.balance,
                });
            }

            let changes = ChangeSet::new()
                .delta(BalanceDelta::for_account(&sender, SignedAmount::debit(amount)))
                .delta(BalanceDelta::for_account(&recipient, SignedAmount::credit(amount)))
                .entry(NewEntry::transfer(from, to, amount, note.clone(), self.now()));

            let receipt = self.store.commit(changes)?;
            single_entry(receipt.entries)
        })?;

        info!(from = %from, to = %to, amount = %amount, entry = entry.id.0, "transfer committed");
        Ok(entry)
    }

    /// Credit from the house, journaled under `reason`.
    pub fn grant_reward(&self, account: AccountId, amount: Amount, reason: EntryKind) -> Result<LedgerEntry, LedgerError> {
        self.ensure_amount(amount)?;

        let entry = self.with_retry("grant_reward", || {
            let current = self.load_account(account)?;
            let changes = ChangeSet::new()
                .delta(BalanceDelta::for_account(&current, SignedAmount::credit(amount)))
                .entry(NewEntry::credit(reason, account, amount, self.now()));
            let receipt = self.store.commit(changes)?;
            single_entry(receipt.entries)
        })?;

        info!(account = %account, amount = %amount, reason = ?reason, "reward granted");
        Ok(entry)
    }
}

// every engine operation writes exactly one journal entry
pub(super) fn single_entry(entries: Vec<LedgerEntry>) -> Result<LedgerEntry, LedgerError> {
    let mut entries = entries.into_iter();
    match (entries.next(), entries.next()) {
        (Some(entry), None) => Ok(entry),
        _ => Err(LedgerError::Store("expected exactly one journal entry".to_string())),
    }
}
