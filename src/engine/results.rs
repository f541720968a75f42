// 8.0.2: result types and errors for engine operations.

use crate::account::Account;
use crate::journal::LedgerEntry;
use crate::marketplace::InventoryEntry;
use crate::mission::{Mission, MissionCompletion, Progress};
use crate::store::StoreError;
use crate::types::{AccountId, Amount, ItemId, MissionId, StakeId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub entry: LedgerEntry,
    pub inventory: InventoryEntry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardRow {
    pub rank: usize,
    pub account_id: AccountId,
    pub user: UserId,
    pub balance: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionStatus {
    pub mission: Mission,
    pub completion: Option<MissionCompletion>,
    pub progress: Progress,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub account: Account,
    pub inventory_count: usize,
    pub active_stakes: usize,
    pub staked_principal: Amount,
    pub missions_completed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    pub accounts: usize,
    pub entries: usize,
    pub total_balances: Amount,
    /// Principal locked in active stakes
    pub outstanding_principal: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Cannot transfer from {0} to itself")]
    SelfTransfer(AccountId),

    #[error("Insufficient funds in {account}: requested {requested}, available {available}")]
    InsufficientFunds {
        account: AccountId,
        requested: Amount,
        available: Amount,
    },

    #[error("Account {0} not found")]
    UnknownAccount(AccountId),

    #[error("No account for user {0}")]
    UnknownUser(UserId),

    #[error("Stake {0} not found")]
    UnknownStake(StakeId),

    #[error("Mission {0} not found")]
    UnknownMission(MissionId),

    #[error("Item {0} not found")]
    UnknownItem(ItemId),

    #[error("Instrument {0} not found")]
    UnknownInstrument(String),

    #[error("Stake {0} already claimed")]
    AlreadyClaimed(StakeId),

    #[error("Mission {mission} already completed by {account}")]
    AlreadyCompleted { account: AccountId, mission: MissionId },

    #[error("Stake {stake} matures at {matures_at}")]
    NotMature { stake: StakeId, matures_at: Timestamp },

    #[error("Mission {mission} requirement not met: {}/{}", .progress.current, .progress.target)]
    RequirementNotMet { mission: MissionId, progress: Progress },

    #[error("Concurrent update on {account}, gave up after {attempts} attempts")]
    Conflict { account: AccountId, attempts: u32 },

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Store error: {0}")]
    Store(String),
}

impl LedgerError {
    /// Only version conflicts are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Conflict { .. })
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { account, .. } => LedgerError::Conflict { account, attempts: 1 },
            StoreError::InsufficientFunds {
                account,
                requested,
                available,
            } => LedgerError::InsufficientFunds {
                account,
                requested,
                available,
            },
            err @ StoreError::BalanceOverflow { .. } => LedgerError::InvalidAmount(err.to_string()),
            StoreError::UnknownAccount(id) => LedgerError::UnknownAccount(id),
            StoreError::UnknownStake(id) => LedgerError::UnknownStake(id),
            StoreError::StakeNotActive(id) => LedgerError::AlreadyClaimed(id),
            StoreError::DuplicateCompletion { account, mission } => LedgerError::AlreadyCompleted { account, mission },
            other @ (StoreError::DuplicateStake(_)
            | StoreError::DuplicateAccount(_)
            | StoreError::InvalidChangeSet(_)
            | StoreError::Unavailable(_)) => LedgerError::Store(other.to_string()),
        }
    }
}
