//! Stake terms and lifecycle.
//!
//! A stake locks principal for a fixed duration at a flat rate. Interest is
//! computed once, at open, and the total return is credited on claim.

use crate::types::{AccountId, Amount, Bps, StakeId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

const HOUR_MS: i64 = 3_600_000;
const DAY_MS: i64 = 24 * HOUR_MS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StakeDuration {
    #[serde(rename = "24h")]
    Day,
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
}

impl StakeDuration {
    pub const ALL: [StakeDuration; 3] = [StakeDuration::Day, StakeDuration::Week, StakeDuration::Month];

    pub fn millis(&self) -> i64 {
        match self {
            StakeDuration::Day => DAY_MS,
            StakeDuration::Week => 7 * DAY_MS,
            StakeDuration::Month => 30 * DAY_MS,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StakeDuration::Day => "24h",
            StakeDuration::Week => "7d",
            StakeDuration::Month => "30d",
        }
    }
}

impl fmt::Display for StakeDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Flat rate per lock duration, in basis points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeRates {
    pub day_bps: u32,
    pub week_bps: u32,
    pub month_bps: u32,
}

impl Default for StakeRates {
    fn default() -> Self {
        Self {
            day_bps: 10,    // 0.1%
            week_bps: 100,  // 1%
            month_bps: 500, // 5%
        }
    }
}

impl StakeRates {
    pub fn rate(&self, duration: StakeDuration) -> Bps {
        match duration {
            StakeDuration::Day => Bps::new(self.day_bps),
            StakeDuration::Week => Bps::new(self.week_bps),
            StakeDuration::Month => Bps::new(self.month_bps),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StakeStatus {
    Active,
    Claimed,
}

/// Numbers fixed at open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StakeTerms {
    pub principal: Amount,
    pub duration: StakeDuration,
    pub rate: Bps,
    pub interest: Amount,
    pub total_return: Amount,
    pub start: Timestamp,
    pub maturity: Timestamp,
}

pub fn stake_terms(principal: Amount, duration: StakeDuration, rates: &StakeRates, start: Timestamp) -> Option<StakeTerms> {
    let rate = rates.rate(duration);
    let interest = rate.apply_floor(principal);
    let total_return = principal.checked_add(interest)?;
    Some(StakeTerms {
        principal,
        duration,
        rate,
        interest,
        total_return,
        start,
        maturity: start.plus_millis(duration.millis()),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stake {
    pub id: StakeId,
    pub owner: AccountId,
    pub principal: Amount,
    pub duration: StakeDuration,
    pub rate: Bps,
    pub interest: Amount,
    pub total_return: Amount,
    pub start: Timestamp,
    pub maturity: Timestamp,
    pub status: StakeStatus,
    pub claimed_at: Option<Timestamp>,
}

impl Stake {
    pub fn from_terms(id: StakeId, owner: AccountId, terms: StakeTerms) -> Self {
        Self {
            id,
            owner,
            principal: terms.principal,
            duration: terms.duration,
            rate: terms.rate,
            interest: terms.interest,
            total_return: terms.total_return,
            start: terms.start,
            maturity: terms.maturity,
            status: StakeStatus::Active,
            claimed_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == StakeStatus::Active
    }

    // maturity is inclusive: claimable at exactly the maturity instant
    pub fn is_mature(&self, now: Timestamp) -> bool {
        now >= self.maturity
    }

    pub fn remaining_millis(&self, now: Timestamp) -> i64 {
        (self.maturity.as_millis() - now.as_millis()).max(0)
    }
}
