// 5.0: missions. a static catalog of one-time tasks with fixed rewards.
// requirements are checked against the account's own journal, so there is no
// separate progress table to drift out of sync.

use crate::journal::{EntryKind, LedgerEntry};
use crate::market::MarketKind;
use crate::types::{AccountId, Amount, MissionId, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Requirement {
    /// Cumulative principal locked across all stakes
    StakedAtLeast { amount: Amount },
    /// Cumulative notional traded in crypto, either side
    CryptoVolumeAtLeast { amount: Amount },
    /// Number of outgoing transfers
    TransfersSent { count: u32 },
    /// Number of forex trades, either side
    ForexTrades { count: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mission {
    pub id: MissionId,
    pub title: String,
    pub description: String,
    pub reward: Amount,
    pub requirement: Requirement,
}

pub fn default_missions() -> Vec<Mission> {
    vec![
        Mission {
            id: MissionId::new("mission-1"),
            title: "Stake $10,000,000".to_string(),
            description: "Stake at least $10M in any staking option".to_string(),
            reward: Amount::new(100_000_000),
            requirement: Requirement::StakedAtLeast {
                amount: Amount::new(10_000_000),
            },
        },
        Mission {
            id: MissionId::new("mission-2"),
            title: "Trade $5,000,000 in Crypto".to_string(),
            description: "Buy or sell at least $5M worth of cryptocurrency".to_string(),
            reward: Amount::new(50_000_000),
            requirement: Requirement::CryptoVolumeAtLeast {
                amount: Amount::new(5_000_000),
            },
        },
        Mission {
            id: MissionId::new("mission-3"),
            title: "Send Money to a Friend".to_string(),
            description: "Send any amount of money to another user".to_string(),
            reward: Amount::new(25_000_000),
            requirement: Requirement::TransfersSent { count: 1 },
        },
        Mission {
            id: MissionId::new("mission-4"),
            title: "Trade Forex".to_string(),
            description: "Make at least one forex trade of any amount".to_string(),
            reward: Amount::new(30_000_000),
            requirement: Requirement::ForexTrades { count: 1 },
        },
    ]
}

/// How far along an account is, in the requirement's own unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub current: u64,
    pub target: u64,
}

impl Progress {
    pub fn is_met(&self) -> bool {
        self.current >= self.target
    }
}

pub fn progress(requirement: &Requirement, account: AccountId, entries: &[LedgerEntry]) -> Progress {
    let mine = entries.iter().filter(|e| e.touches(account));
    match requirement {
        Requirement::StakedAtLeast { amount } => Progress {
            current: mine
                .filter(|e| e.kind == EntryKind::Stake && e.debit == Some(account))
                .fold(0u64, |acc, e| acc.saturating_add(e.amount.value())),
            target: amount.value(),
        },
        Requirement::CryptoVolumeAtLeast { amount } => Progress {
            current: mine
                .filter(|e| e.trade().is_some_and(|t| t.market == MarketKind::Crypto))
                .fold(0u64, |acc, e| acc.saturating_add(e.amount.value())),
            target: amount.value(),
        },
        Requirement::TransfersSent { count } => Progress {
            current: mine
                .filter(|e| e.kind == EntryKind::Transfer && e.debit == Some(account))
                .count() as u64,
            target: u64::from(*count),
        },
        Requirement::ForexTrades { count } => Progress {
            current: mine
                .filter(|e| e.trade().is_some_and(|t| t.market == MarketKind::Forex))
                .count() as u64,
            target: u64::from(*count),
        },
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionCompletion {
    pub account_id: AccountId,
    pub mission_id: MissionId,
    pub title: String,
    pub reward: Amount,
    pub completed_at: Timestamp,
}
