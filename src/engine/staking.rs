//! Stake lifecycle: open locks principal, claim pays principal plus interest once.

use super::core::Engine;
use super::results::LedgerError;
use super::transfers::single_entry;
use crate::journal::{EntryKind, EntryRef, LedgerEntry, NewEntry};
use crate::staking::{stake_terms, Stake, StakeDuration};
use crate::store::{BalanceDelta, ChangeSet, StakeWrite, Store};
use crate::types::{AccountId, Amount, SignedAmount, StakeId};
use tracing::info;

impl<S: Store> Engine<S> {
    /// Debit `principal` and record the stake in one commit.
    pub fn open_stake(&self, account: AccountId, principal: Amount, duration: StakeDuration) -> Result<Stake, LedgerError> {
        self.ensure_amount(principal)?;
        // the id is reserved once; a retried attempt reuses it
        let stake_id = self.store.next_stake_id();

        let stake = self.with_retry("open_stake", || {
            let current = self.load_account(account)?;
            if !current.can_cover(principal) {
                return Err(LedgerError::InsufficientFunds {
                    account,
                    requested: principal,
                    available: current.balance,
                });
            }

            let now = self.now();
            let terms = stake_terms(principal, duration, &self.config.staking, now)
                .ok_or_else(|| LedgerError::InvalidAmount(format!("return on {} overflows", principal)))?;
            self.ensure_amount(terms.total_return)?;
            let stake = Stake::from_terms(stake_id, account, terms);

            let changes = ChangeSet::new()
                .delta(BalanceDelta::for_account(&current, SignedAmount::debit(principal)))
                .entry(
                    NewEntry::debit(EntryKind::Stake, account, principal, now)
                        .with_note(format!("Locked for {}", duration))
                        .with_reference(EntryRef::Stake { stake_id }),
                )
                .stake(StakeWrite::Open(stake.clone()));
            self.store.commit(changes)?;
            Ok(stake)
        })?;

        info!(
            account = %account,
            stake = %stake.id,
            principal = %principal,
            duration = %duration,
            maturity = %stake.maturity,
            "stake opened"
        );
        Ok(stake)
    }

    /// Pay out a mature stake. The store only lets the active -> claimed
    /// transition happen once, so a racing claim sees `AlreadyClaimed`.
    pub fn claim_stake(&self, stake_id: StakeId) -> Result<LedgerEntry, LedgerError> {
        let entry = self.with_retry("claim_stake", || {
            let stake = self.store.stake(stake_id).ok_or(LedgerError::UnknownStake(stake_id))?;
            if !stake.is_active() {
                return Err(LedgerError::AlreadyClaimed(stake_id));
            }
            let now = self.now();
            if !stake.is_mature(now) {
                return Err(LedgerError::NotMature {
                    stake: stake_id,
                    matures_at: stake.maturity,
                });
            }

            let owner = self.load_account(stake.owner)?;
            let changes = ChangeSet::new()
                .delta(BalanceDelta::for_account(&owner, SignedAmount::credit(stake.total_return)))
                .entry(
                    NewEntry::credit(EntryKind::Unstake, stake.owner, stake.total_return, now)
                        .with_note(format!("Principal {} + interest {}", stake.principal, stake.interest))
                        .with_reference(EntryRef::Stake { stake_id }),
                )
                .stake(StakeWrite::Claim {
                    stake_id,
                    claimed_at: now,
                });
            let receipt = self.store.commit(changes)?;
            single_entry(receipt.entries)
        })?;

        info!(stake = %stake_id, amount = %entry.amount, "stake claimed");
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::config::EconomyConfig;
    use crate::staking::StakeStatus;
    use crate::types::{Timestamp, UserId};
    use std::sync::Arc;

    const DAY_MS: i64 = 24 * 60 * 60 * 1000;

    fn setup() -> (Engine, ManualClock, AccountId) {
        let clock = ManualClock::new(Timestamp::from_millis(1_000));
        let engine = Engine::with_clock(EconomyConfig::testing(), Arc::new(clock.clone()));
        let alice = engine.login(&UserId::new("alice")).unwrap().account_id;
        (engine, clock, alice)
    }

    #[test]
    fn open_locks_principal() {
        let (engine, _, alice) = setup();
        let stake = engine.open_stake(alice, Amount::new(1_000_000), StakeDuration::Week).unwrap();

        assert_eq!(stake.interest, Amount::new(10_000));
        assert_eq!(stake.total_return, Amount::new(1_010_000));
        assert_eq!(stake.maturity, Timestamp::from_millis(1_000 + 7 * DAY_MS));
        assert_eq!(engine.store().get_balance(alice).unwrap(), Amount::new(999_000_000));

        let entry = &engine.store().entries()[0];
        assert_eq!(entry.kind, EntryKind::Stake);
        assert_eq!(entry.stake_id(), Some(stake.id));
        assert_eq!(entry.note.as_deref(), Some("Locked for 7d"));
    }

    #[test]
    fn open_rejects_zero_and_overdraft() {
        let (engine, _, alice) = setup();
        assert!(matches!(
            engine.open_stake(alice, Amount::ZERO, StakeDuration::Day),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(matches!(
            engine.open_stake(alice, Amount::new(1_000_000_001), StakeDuration::Day),
            Err(LedgerError::InsufficientFunds { .. })
        ));
        assert!(engine.store().stakes_for(alice).is_empty());
    }

    #[test]
    fn claim_at_maturity_pays_once() {
        let (engine, clock, alice) = setup();
        let stake = engine.open_stake(alice, Amount::new(1_000_000), StakeDuration::Day).unwrap();

        clock.advance(DAY_MS);
        let entry = engine.claim_stake(stake.id).unwrap();
        assert_eq!(entry.amount, Amount::new(1_001_000));
        assert_eq!(engine.store().get_balance(alice).unwrap(), Amount::new(1_000_001_000));

        assert_eq!(engine.claim_stake(stake.id), Err(LedgerError::AlreadyClaimed(stake.id)));
        let stored = engine.store().stake(stake.id).unwrap();
        assert_eq!(stored.status, StakeStatus::Claimed);
        assert_eq!(stored.claimed_at, Some(clock.now()));
    }

    #[test]
    fn claim_before_maturity_refused() {
        let (engine, clock, alice) = setup();
        let stake = engine.open_stake(alice, Amount::new(1_000_000), StakeDuration::Month).unwrap();
        clock.advance(DAY_MS);
        assert!(matches!(engine.claim_stake(stake.id), Err(LedgerError::NotMature { .. })));
        assert_eq!(engine.claim_stake(StakeId(404)), Err(LedgerError::UnknownStake(StakeId(404))));
    }
}
