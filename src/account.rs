//! Account records.
//!
//! An account is the per-user balance. Every balance change goes through
//! [`Account::apply`], which refuses to go negative and bumps the version used
//! for optimistic concurrency.

use crate::types::{AccountId, Amount, BalanceError, SignedAmount, Timestamp, UserId, Version};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub user: UserId,
    pub balance: Amount,
    /// Starting grant. Journal entries explain everything above or below it.
    pub opening_balance: Amount,
    pub version: Version,
    pub created_at: Timestamp,
}

impl Account {
    pub fn new(id: AccountId, user: UserId, opening_balance: Amount, timestamp: Timestamp) -> Self {
        Self {
            id,
            user,
            balance: opening_balance,
            opening_balance,
            version: Version::initial(),
            created_at: timestamp,
        }
    }

    pub fn apply(&mut self, delta: SignedAmount) -> Result<Version, AccountError> {
        let next = self.balance.apply(delta).map_err(|e| match e {
            BalanceError::Negative => AccountError::InsufficientBalance {
                requested: delta.magnitude(),
                available: self.balance,
            },
            BalanceError::Overflow => AccountError::BalanceOverflow {
                balance: self.balance,
                credit: delta.magnitude(),
            },
        })?;
        self.balance = next;
        self.version = self.version.next();
        Ok(self.version)
    }

    pub fn can_cover(&self, amount: Amount) -> bool {
        self.balance >= amount
    }

    /// Net movement since the opening grant.
    pub fn net_change(&self) -> i128 {
        i128::from(self.balance.value()) - i128::from(self.opening_balance.value())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountError {
    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: Amount, available: Amount },

    #[error("Balance overflow: {balance} + {credit} exceeds the maximum")]
    BalanceOverflow { balance: Amount, credit: Amount },
}
