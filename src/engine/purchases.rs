//! Marketplace purchases.

use super::core::Engine;
use super::results::{LedgerError, Purchase};
use super::transfers::single_entry;
use crate::journal::{EntryKind, EntryRef, NewEntry};
use crate::marketplace::NewInventoryEntry;
use crate::store::{BalanceDelta, ChangeSet, Store};
use crate::types::{AccountId, ItemId, SignedAmount};
use tracing::info;

impl<S: Store> Engine<S> {
    /// Debit the item price and hand over one inventory copy, atomically.
    pub fn purchase(&self, account: AccountId, item_id: ItemId) -> Result<Purchase, LedgerError> {
        let item = self.store.item(item_id).ok_or(LedgerError::UnknownItem(item_id))?;
        self.ensure_amount(item.price)?;

        let purchase = self.with_retry("purchase", || {
            let current = self.load_account(account)?;
            if !current.can_cover(item.price) {
                return Err(LedgerError::InsufficientFunds {
                    account,
                    requested: item.price,
                    available: current.balance,
                });
            }

            let now = self.now();
            let changes = ChangeSet::new()
                .delta(BalanceDelta::for_account(&current, SignedAmount::debit(item.price)))
                .entry(
                    NewEntry::debit(EntryKind::Purchase, account, item.price, now)
                        .with_note(format!("Bought {}", item.name))
                        .with_reference(EntryRef::Item { item_id }),
                )
                .inventory(NewInventoryEntry::for_item(account, &item, now));
            let receipt = self.store.commit(changes)?;
            let inventory = receipt
                .inventory
                .ok_or_else(|| LedgerError::Store("commit did not report the inventory entry".to_string()))?;
            let entry = single_entry(receipt.entries)?;
            Ok(Purchase { entry, inventory })
        })?;

        info!(account = %account, item = %item_id, price = %item.price, "item purchased");
        Ok(purchase)
    }
}
