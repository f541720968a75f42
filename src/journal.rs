// 3.0: the journal. every committed balance change produces exactly one entry.
// entries are append-only; the store hands out ids in commit order.

use crate::market::MarketKind;
use crate::types::{AccountId, Amount, EntryId, ItemId, MissionId, Price, Side, SignedAmount, StakeId, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Transfer,
    Trade,
    Stake,
    Unstake,
    MissionReward,
    Purchase,
}

/// What the entry was for, beyond its kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntryRef {
    Trade(TradeFill),
    Stake { stake_id: StakeId },
    Mission { mission_id: MissionId },
    Item { item_id: ItemId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeFill {
    pub symbol: String,
    pub market: MarketKind,
    pub side: Side,
    pub quantity: Decimal,
    pub unit_price: Price,
}

/// An entry before the store assigns its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEntry {
    pub kind: EntryKind,
    pub debit: Option<AccountId>,
    pub credit: Option<AccountId>,
    pub amount: Amount,
    pub note: Option<String>,
    pub reference: Option<EntryRef>,
    pub created_at: Timestamp,
}

impl NewEntry {
    // paired entry: one side loses what the other gains
    pub fn transfer(from: AccountId, to: AccountId, amount: Amount, note: Option<String>, at: Timestamp) -> Self {
        Self {
            kind: EntryKind::Transfer,
            debit: Some(from),
            credit: Some(to),
            amount,
            note,
            reference: None,
            created_at: at,
        }
    }

    // single-sided entry against the house
    pub fn debit(kind: EntryKind, account: AccountId, amount: Amount, at: Timestamp) -> Self {
        Self {
            kind,
            debit: Some(account),
            credit: None,
            amount,
            note: None,
            reference: None,
            created_at: at,
        }
    }

    pub fn credit(kind: EntryKind, account: AccountId, amount: Amount, at: Timestamp) -> Self {
        Self {
            kind,
            debit: None,
            credit: Some(account),
            amount,
            note: None,
            reference: None,
            created_at: at,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_reference(mut self, reference: EntryRef) -> Self {
        self.reference = Some(reference);
        self
    }

    pub fn into_entry(self, id: EntryId) -> LedgerEntry {
        LedgerEntry {
            id,
            kind: self.kind,
            debit: self.debit,
            credit: self.credit,
            amount: self.amount,
            note: self.note,
            reference: self.reference,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub kind: EntryKind,
    pub debit: Option<AccountId>,
    pub credit: Option<AccountId>,
    pub amount: Amount,
    pub note: Option<String>,
    pub reference: Option<EntryRef>,
    pub created_at: Timestamp,
}

impl LedgerEntry {
    pub fn touches(&self, account: AccountId) -> bool {
        self.debit == Some(account) || self.credit == Some(account)
    }

    /// Balance effect of this entry on `account`. Zero if it is not a party.
    pub fn signed_for(&self, account: AccountId) -> SignedAmount {
        let mut net = 0i64;
        if self.debit == Some(account) {
            net -= SignedAmount::credit(self.amount).value();
        }
        if self.credit == Some(account) {
            net += SignedAmount::credit(self.amount).value();
        }
        SignedAmount::new(net)
    }

    pub fn trade(&self) -> Option<&TradeFill> {
        match &self.reference {
            Some(EntryRef::Trade(fill)) => Some(fill),
            _ => None,
        }
    }

    pub fn stake_id(&self) -> Option<StakeId> {
        match &self.reference {
            Some(EntryRef::Stake { stake_id }) => Some(*stake_id),
            _ => None,
        }
    }
}
