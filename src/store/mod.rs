// 4.0: persistence seam. the engine only ever talks to a Store.
//
// reads are plain lookups. writes go through `commit`, which applies a whole
// ChangeSet or nothing: every balance delta is compare-and-swapped on the
// account version, stake claims are compare-and-swapped on status, and mission
// completions and user accounts are unique. a store that cannot give those
// guarantees cannot back the engine.

mod memory;

pub use memory::MemoryStore;

use crate::account::Account;
use crate::journal::{LedgerEntry, NewEntry};
use crate::marketplace::{InventoryEntry, Item, NewInventoryEntry};
use crate::mission::MissionCompletion;
use crate::staking::Stake;
use crate::types::{AccountId, Amount, ItemId, MissionId, SignedAmount, StakeId, Timestamp, UserId, Version};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceDelta {
    pub account_id: AccountId,
    pub amount: SignedAmount,
    pub expected_version: Version,
}

impl BalanceDelta {
    pub fn for_account(account: &Account, amount: SignedAmount) -> Self {
        Self {
            account_id: account.id,
            amount,
            expected_version: account.version,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub user: UserId,
    pub opening_balance: Amount,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StakeWrite {
    Open(Stake),
    /// Only succeeds while the stake is still active.
    Claim { stake_id: StakeId, claimed_at: Timestamp },
}

/// Everything one operation wants to write. Committed atomically.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub open_account: Option<NewAccount>,
    pub deltas: Vec<BalanceDelta>,
    pub entries: Vec<NewEntry>,
    pub stake: Option<StakeWrite>,
    pub completion: Option<MissionCompletion>,
    pub inventory: Option<NewInventoryEntry>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delta(mut self, delta: BalanceDelta) -> Self {
        self.deltas.push(delta);
        self
    }

    pub fn entry(mut self, entry: NewEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn stake(mut self, write: StakeWrite) -> Self {
        self.stake = Some(write);
        self
    }

    pub fn completion(mut self, completion: MissionCompletion) -> Self {
        self.completion = Some(completion);
        self
    }

    pub fn inventory(mut self, entry: NewInventoryEntry) -> Self {
        self.inventory = Some(entry);
        self
    }

    pub fn open_account(mut self, account: NewAccount) -> Self {
        self.open_account = Some(account);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.open_account.is_none()
            && self.deltas.is_empty()
            && self.entries.is_empty()
            && self.stake.is_none()
            && self.completion.is_none()
            && self.inventory.is_none()
    }
}

/// What a successful commit produced, with store-assigned ids filled in.
#[derive(Debug, Clone, Default)]
pub struct Receipt {
    pub account: Option<Account>,
    pub versions: Vec<(AccountId, Version)>,
    pub entries: Vec<LedgerEntry>,
    pub stake: Option<Stake>,
    pub inventory: Option<InventoryEntry>,
}

impl Receipt {
    pub fn version_of(&self, account: AccountId) -> Option<Version> {
        self.versions.iter().find(|(id, _)| *id == account).map(|(_, v)| *v)
    }
}

/// Consistent view of the money-bearing tables, taken under one read.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub accounts: Vec<Account>,
    pub entries: Vec<LedgerEntry>,
    pub stakes: Vec<Stake>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Version conflict on {account}: expected {expected:?}, found {found:?}")]
    Conflict {
        account: AccountId,
        expected: Version,
        found: Version,
    },

    #[error("Insufficient funds in {account}: requested {requested}, available {available}")]
    InsufficientFunds {
        account: AccountId,
        requested: Amount,
        available: Amount,
    },

    #[error("Balance of {account} would overflow: {balance} + {credit}")]
    BalanceOverflow {
        account: AccountId,
        balance: Amount,
        credit: Amount,
    },

    #[error("Account {0} not found")]
    UnknownAccount(AccountId),

    #[error("Stake {0} not found")]
    UnknownStake(StakeId),

    #[error("Stake {0} is no longer active")]
    StakeNotActive(StakeId),

    #[error("Stake {0} already exists")]
    DuplicateStake(StakeId),

    #[error("Mission {mission} already completed by {account}")]
    DuplicateCompletion { account: AccountId, mission: MissionId },

    #[error("User {0} already has an account")]
    DuplicateAccount(UserId),

    #[error("Malformed change set: {0}")]
    InvalidChangeSet(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub trait Store: Send + Sync {
    fn account(&self, id: AccountId) -> Option<Account>;
    fn account_by_user(&self, user: &UserId) -> Option<Account>;
    fn accounts(&self) -> Vec<Account>;

    /// Whole journal, oldest first.
    fn entries(&self) -> Vec<LedgerEntry>;
    /// Entries where the account is either party, oldest first.
    fn entries_for(&self, account: AccountId) -> Vec<LedgerEntry>;

    fn stake(&self, id: StakeId) -> Option<Stake>;
    fn stakes_for(&self, account: AccountId) -> Vec<Stake>;
    fn next_stake_id(&self) -> StakeId;

    fn completion(&self, account: AccountId, mission: &MissionId) -> Option<MissionCompletion>;
    fn completions_for(&self, account: AccountId) -> Vec<MissionCompletion>;

    fn inventory_for(&self, account: AccountId) -> Vec<InventoryEntry>;

    fn item(&self, id: ItemId) -> Option<Item>;
    fn items(&self) -> Vec<Item>;
    fn put_item(&self, item: Item);

    fn snapshot(&self) -> Snapshot;

    fn commit(&self, changes: ChangeSet) -> Result<Receipt, StoreError>;

    fn get_balance(&self, id: AccountId) -> Result<Amount, StoreError> {
        self.account(id)
            .map(|a| a.balance)
            .ok_or(StoreError::UnknownAccount(id))
    }

    /// Raw balance mutation with no journal entry. The engine never calls this;
    /// it pairs every delta with an entry in one change set.
    fn apply_delta(&self, id: AccountId, amount: SignedAmount, expected_version: Version) -> Result<Version, StoreError> {
        let receipt = self.commit(ChangeSet::new().delta(BalanceDelta {
            account_id: id,
            amount,
            expected_version,
        }))?;
        receipt
            .version_of(id)
            .ok_or_else(|| StoreError::InvalidChangeSet(format!("no version reported for {}", id)))
    }
}
