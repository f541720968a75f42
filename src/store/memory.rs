//! In-process store.
//!
//! All tables sit behind one `RwLock`. Readers see either all of a commit or
//! none of it; `commit` validates the entire change set before touching
//! anything, so a rejected change set leaves no trace.

use super::{ChangeSet, Receipt, Snapshot, StakeWrite, Store, StoreError};
use crate::account::{Account, AccountError};
use crate::journal::LedgerEntry;
use crate::marketplace::{InventoryEntry, Item};
use crate::mission::MissionCompletion;
use crate::staking::{Stake, StakeStatus};
use crate::types::{AccountId, Amount, EntryId, ItemId, MissionId, StakeId, UserId, Version};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
struct Tables {
    accounts: BTreeMap<AccountId, Account>,
    users: HashMap<UserId, AccountId>,
    entries: Vec<LedgerEntry>,
    stakes: BTreeMap<StakeId, Stake>,
    completions: HashMap<(AccountId, MissionId), MissionCompletion>,
    inventory: Vec<InventoryEntry>,
    items: BTreeMap<ItemId, Item>,
    next_account_id: u64,
    next_inventory_id: u64,
}

#[derive(Debug)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    next_stake_id: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables {
                next_account_id: 1,
                next_inventory_id: 1,
                ..Default::default()
            }),
            next_stake_id: AtomicU64::new(1),
        }
    }

    pub fn with_items(items: Vec<Item>) -> Self {
        let store = Self::new();
        for item in items {
            store.put_item(item);
        }
        store
    }

    pub fn entry_count(&self) -> usize {
        self.tables.read().entries.len()
    }
}

// 4.1: everything that can fail is checked here, before any write.
fn validate(tables: &Tables, changes: &ChangeSet) -> Result<Vec<(AccountId, Account)>, StoreError> {
    if let Some(new_account) = &changes.open_account {
        if tables.users.contains_key(&new_account.user) {
            return Err(StoreError::DuplicateAccount(new_account.user.clone()));
        }
    }

    let mut seen = HashSet::new();
    let mut updated = Vec::with_capacity(changes.deltas.len());
    for delta in &changes.deltas {
        if !seen.insert(delta.account_id) {
            return Err(StoreError::InvalidChangeSet(format!(
                "two deltas for {}",
                delta.account_id
            )));
        }
        let current = tables
            .accounts
            .get(&delta.account_id)
            .ok_or(StoreError::UnknownAccount(delta.account_id))?;
        if current.version != delta.expected_version {
            return Err(StoreError::Conflict {
                account: delta.account_id,
                expected: delta.expected_version,
                found: current.version,
            });
        }
        let mut next = current.clone();
        next.apply(delta.amount).map_err(|e| match e {
            AccountError::InsufficientBalance { requested, available } => StoreError::InsufficientFunds {
                account: delta.account_id,
                requested,
                available,
            },
            AccountError::BalanceOverflow { balance, credit } => StoreError::BalanceOverflow {
                account: delta.account_id,
                balance,
                credit,
            },
        })?;
        updated.push((delta.account_id, next));
    }

    for entry in &changes.entries {
        for party in [entry.debit, entry.credit].into_iter().flatten() {
            if !tables.accounts.contains_key(&party) {
                return Err(StoreError::UnknownAccount(party));
            }
        }
    }

    match &changes.stake {
        Some(StakeWrite::Open(stake)) => {
            if tables.stakes.contains_key(&stake.id) {
                return Err(StoreError::DuplicateStake(stake.id));
            }
            if !tables.accounts.contains_key(&stake.owner) {
                return Err(StoreError::UnknownAccount(stake.owner));
            }
        }
        Some(StakeWrite::Claim { stake_id, .. }) => {
            let stake = tables.stakes.get(stake_id).ok_or(StoreError::UnknownStake(*stake_id))?;
            if stake.status != StakeStatus::Active {
                return Err(StoreError::StakeNotActive(*stake_id));
            }
        }
        None => {}
    }

    if let Some(completion) = &changes.completion {
        let key = (completion.account_id, completion.mission_id.clone());
        if tables.completions.contains_key(&key) {
            return Err(StoreError::DuplicateCompletion {
                account: completion.account_id,
                mission: completion.mission_id.clone(),
            });
        }
    }

    if let Some(inventory) = &changes.inventory {
        if !tables.accounts.contains_key(&inventory.owner) {
            return Err(StoreError::UnknownAccount(inventory.owner));
        }
    }

    Ok(updated)
}

impl Store for MemoryStore {
    fn account(&self, id: AccountId) -> Option<Account> {
        self.tables.read().accounts.get(&id).cloned()
    }

    fn account_by_user(&self, user: &UserId) -> Option<Account> {
        let tables = self.tables.read();
        tables
            .users
            .get(user)
            .and_then(|id| tables.accounts.get(id))
            .cloned()
    }

    fn accounts(&self) -> Vec<Account> {
        self.tables.read().accounts.values().cloned().collect()
    }

    fn entries(&self) -> Vec<LedgerEntry> {
        self.tables.read().entries.clone()
    }

    fn entries_for(&self, account: AccountId) -> Vec<LedgerEntry> {
        self.tables
            .read()
            .entries
            .iter()
            .filter(|e| e.touches(account))
            .cloned()
            .collect()
    }

    fn stake(&self, id: StakeId) -> Option<Stake> {
        self.tables.read().stakes.get(&id).cloned()
    }

    fn stakes_for(&self, account: AccountId) -> Vec<Stake> {
        self.tables
            .read()
            .stakes
            .values()
            .filter(|s| s.owner == account)
            .cloned()
            .collect()
    }

    fn next_stake_id(&self) -> StakeId {
        StakeId(self.next_stake_id.fetch_add(1, Ordering::Relaxed))
    }

    fn completion(&self, account: AccountId, mission: &MissionId) -> Option<MissionCompletion> {
        self.tables
            .read()
            .completions
            .get(&(account, mission.clone()))
            .cloned()
    }

    fn completions_for(&self, account: AccountId) -> Vec<MissionCompletion> {
        let mut out: Vec<MissionCompletion> = self
            .tables
            .read()
            .completions
            .values()
            .filter(|c| c.account_id == account)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.completed_at.cmp(&b.completed_at).then(a.mission_id.cmp(&b.mission_id)));
        out
    }

    fn inventory_for(&self, account: AccountId) -> Vec<InventoryEntry> {
        self.tables
            .read()
            .inventory
            .iter()
            .filter(|i| i.owner == account)
            .cloned()
            .collect()
    }

    fn item(&self, id: ItemId) -> Option<Item> {
        self.tables.read().items.get(&id).cloned()
    }

    fn items(&self) -> Vec<Item> {
        self.tables.read().items.values().cloned().collect()
    }

    fn put_item(&self, item: Item) {
        self.tables.write().items.insert(item.id, item);
    }

    fn snapshot(&self) -> Snapshot {
        let tables = self.tables.read();
        Snapshot {
            accounts: tables.accounts.values().cloned().collect(),
            entries: tables.entries.clone(),
            stakes: tables.stakes.values().cloned().collect(),
        }
    }

    fn commit(&self, changes: ChangeSet) -> Result<Receipt, StoreError> {
        let mut tables = self.tables.write();
        let updated = validate(&tables, &changes)?;

        let mut receipt = Receipt::default();

        if let Some(new_account) = changes.open_account {
            let id = AccountId(tables.next_account_id);
            tables.next_account_id += 1;
            let account = Account::new(id, new_account.user.clone(), new_account.opening_balance, new_account.created_at);
            tables.users.insert(new_account.user, id);
            tables.accounts.insert(id, account.clone());
            receipt.versions.push((id, Version::initial()));
            receipt.account = Some(account);
        }

        for (id, account) in updated {
            receipt.versions.push((id, account.version));
            tables.accounts.insert(id, account);
        }

        for draft in changes.entries {
            let id = EntryId(tables.entries.len() as u64 + 1);
            let entry = draft.into_entry(id);
            tables.entries.push(entry.clone());
            receipt.entries.push(entry);
        }

        match changes.stake {
            Some(StakeWrite::Open(stake)) => {
                tables.stakes.insert(stake.id, stake.clone());
                receipt.stake = Some(stake);
            }
            Some(StakeWrite::Claim { stake_id, claimed_at }) => {
                if let Some(stake) = tables.stakes.get_mut(&stake_id) {
                    stake.status = StakeStatus::Claimed;
                    stake.claimed_at = Some(claimed_at);
                    receipt.stake = Some(stake.clone());
                }
            }
            None => {}
        }

        if let Some(completion) = changes.completion {
            tables
                .completions
                .insert((completion.account_id, completion.mission_id.clone()), completion);
        }

        if let Some(draft) = changes.inventory {
            let id = tables.next_inventory_id;
            tables.next_inventory_id += 1;
            let entry = draft.into_entry(id);
            tables.inventory.push(entry.clone());
            receipt.inventory = Some(entry);
        }

        Ok(receipt)
    }
}

impl MemoryStore {
    /// Total of all balances. Used by conservation checks.
    pub fn total_balances(&self) -> Option<Amount> {
        Amount::checked_sum(self.tables.read().accounts.values().map(|a| a.balance))
    }
}
