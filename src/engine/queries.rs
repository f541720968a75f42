//! Read models and the journal audit.

use super::core::Engine;
use super::results::{AuditReport, LeaderboardRow, LedgerError, MissionStatus, Profile};
use crate::account::Account;
use crate::journal::{EntryKind, LedgerEntry};
use crate::marketplace::{Category, InventoryEntry, Item};
use crate::mission::{progress, MissionCompletion};
use crate::staking::Stake;
use crate::store::Store;
use crate::types::{AccountId, Amount, StakeId};
use std::collections::HashMap;
use tracing::warn;

impl<S: Store> Engine<S> {
    pub fn balance(&self, account: AccountId) -> Result<Amount, LedgerError> {
        Ok(self.store.get_balance(account)?)
    }

    pub fn account(&self, account: AccountId) -> Result<Account, LedgerError> {
        self.load_account(account)
    }

    /// Newest first. `None` uses the configured page size.
    pub fn history(&self, account: AccountId, limit: Option<usize>) -> Result<Vec<LedgerEntry>, LedgerError> {
        self.load_account(account)?;
        let limit = limit.unwrap_or(self.config.history_limit);
        let mut entries = self.store.entries_for(account);
        entries.reverse();
        entries.truncate(limit);
        Ok(entries)
    }

    /// Richest first; ties go to the older account.
    pub fn leaderboard(&self, limit: Option<usize>) -> Vec<LeaderboardRow> {
        let limit = limit.unwrap_or(self.config.leaderboard_size);
        let mut accounts = self.store.accounts();
        accounts.sort_by(|a, b| {
            b.balance
                .cmp(&a.balance)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });
        accounts
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(i, account)| LeaderboardRow {
                rank: i + 1,
                account_id: account.id,
                user: account.user,
                balance: account.balance,
            })
            .collect()
    }

    /// Sum of every balance. Locked principal is not counted.
    pub fn total_in_circulation(&self) -> Result<Amount, LedgerError> {
        self.total("balances", self.store.accounts().iter().map(|a| a.balance))
    }

    pub fn outstanding_principal(&self) -> Result<Amount, LedgerError> {
        let stakes = self.store.snapshot().stakes;
        self.total("locked principal", stakes.iter().filter(|s| s.is_active()).map(|s| s.principal))
    }

    pub fn stakes(&self, account: AccountId) -> Vec<Stake> {
        self.store.stakes_for(account)
    }

    pub fn completions(&self, account: AccountId) -> Vec<MissionCompletion> {
        self.store.completions_for(account)
    }

    /// Every mission with this account's completion and progress.
    pub fn mission_board(&self, account: AccountId) -> Result<Vec<MissionStatus>, LedgerError> {
        self.load_account(account)?;
        let entries = self.store.entries_for(account);
        Ok(self
            .missions
            .iter()
            .map(|mission| MissionStatus {
                mission: mission.clone(),
                completion: self.store.completion(account, &mission.id),
                progress: progress(&mission.requirement, account, &entries),
            })
            .collect())
    }

    pub fn inventory(&self, account: AccountId) -> Vec<InventoryEntry> {
        self.store.inventory_for(account)
    }

    /// Cheapest first.
    pub fn catalog(&self, category: Option<Category>) -> Vec<Item> {
        let mut items: Vec<Item> = self
            .store
            .items()
            .into_iter()
            .filter(|item| category.map_or(true, |c| item.category == c))
            .collect();
        items.sort_by(|a, b| a.price.cmp(&b.price).then(a.id.cmp(&b.id)));
        items
    }

    pub fn profile(&self, account: AccountId) -> Result<Profile, LedgerError> {
        let account = self.load_account(account)?;
        let active: Vec<Stake> = self
            .store
            .stakes_for(account.id)
            .into_iter()
            .filter(|s| s.is_active())
            .collect();
        Ok(Profile {
            inventory_count: self.store.inventory_for(account.id).len(),
            active_stakes: active.len(),
            staked_principal: self.total("staked principal", active.iter().map(|s| s.principal))?,
            missions_completed: self.store.completions_for(account.id).len(),
            account,
        })
    }

    /// 8.3: replay the journal against every balance and every stake.
    pub fn audit(&self) -> Result<AuditReport, LedgerError> {
        let snapshot = self.store.snapshot();

        let mut net: HashMap<AccountId, i128> = HashMap::new();
        let mut stake_entries: HashMap<StakeId, (usize, usize, Amount)> = HashMap::new();
        for entry in &snapshot.entries {
            for party in [entry.debit, entry.credit].into_iter().flatten() {
                *net.entry(party).or_default() += i128::from(entry.signed_for(party).value());
            }
            if let Some(stake_id) = entry.stake_id() {
                let counts = stake_entries.entry(stake_id).or_insert((0, 0, Amount::ZERO));
                match entry.kind {
                    EntryKind::Stake => counts.0 += 1,
                    EntryKind::Unstake => {
                        counts.1 += 1;
                        counts.2 = entry.amount;
                    }
                    _ => {}
                }
            }
        }

        for account in &snapshot.accounts {
            let journal = net.get(&account.id).copied().unwrap_or(0);
            if journal != account.net_change() {
                return Err(self.violation(format!(
                    "{}: journal nets {} but balance moved {}",
                    account.id,
                    journal,
                    account.net_change()
                )));
            }
        }

        for stake in &snapshot.stakes {
            let (opened, claimed, paid) = stake_entries.get(&stake.id).copied().unwrap_or((0, 0, Amount::ZERO));
            if opened != 1 {
                return Err(self.violation(format!("{} has {} stake entries", stake.id, opened)));
            }
            let expected_claims = usize::from(!stake.is_active());
            if claimed != expected_claims {
                return Err(self.violation(format!("{} has {} unstake entries", stake.id, claimed)));
            }
            if claimed == 1 && paid != stake.total_return {
                return Err(self.violation(format!(
                    "{} paid {} instead of {}",
                    stake.id, paid, stake.total_return
                )));
            }
        }

        Ok(AuditReport {
            accounts: snapshot.accounts.len(),
            entries: snapshot.entries.len(),
            total_balances: self.total("balances", snapshot.accounts.iter().map(|a| a.balance))?,
            outstanding_principal: self.total(
                "locked principal",
                snapshot.stakes.iter().filter(|s| s.is_active()).map(|s| s.principal),
            )?,
        })
    }

    fn total(&self, what: &str, amounts: impl Iterator<Item = Amount>) -> Result<Amount, LedgerError> {
        Amount::checked_sum(amounts).ok_or_else(|| self.violation(format!("total {} exceeds {}", what, u64::MAX)))
    }

    fn violation(&self, detail: String) -> LedgerError {
        warn!(detail = %detail, "audit failed");
        LedgerError::InvariantViolation(detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::EconomyConfig;
    use crate::staking::StakeDuration;
    use crate::store::{BalanceDelta, ChangeSet};
    use crate::types::{SignedAmount, Timestamp, UserId};
    use std::sync::Arc;

    fn engine() -> (Engine, ManualClock) {
        let clock = ManualClock::new(Timestamp::from_millis(0));
        (Engine::with_clock(EconomyConfig::testing(), Arc::new(clock.clone())), clock)
    }

    #[test]
    fn history_is_newest_first_and_limited() {
        let (engine, clock) = engine();
        let alice = engine.login(&UserId::new("alice")).unwrap().account_id;
        let bob = engine.login(&UserId::new("bob")).unwrap().account_id;
        for i in 1..=5 {
            clock.advance(1);
            engine.transfer(alice, bob, Amount::new(i), None).unwrap();
        }

        let page = engine.history(alice, Some(3)).unwrap();
        let amounts: Vec<u64> = page.iter().map(|e| e.amount.value()).collect();
        assert_eq!(amounts, vec![5, 4, 3]);
        assert_eq!(engine.history(bob, None).unwrap().len(), 5);
        assert!(matches!(
            engine.history(AccountId(42), None),
            Err(LedgerError::UnknownAccount(_))
        ));
    }

    #[test]
    fn leaderboard_orders_by_balance() {
        let (engine, clock) = engine();
        let alice = engine.login(&UserId::new("alice")).unwrap().account_id;
        clock.advance(1);
        let bob = engine.login(&UserId::new("bob")).unwrap().account_id;
        clock.advance(1);
        let carol = engine.login(&UserId::new("carol")).unwrap().account_id;
        clock.advance(1);
        let dave = engine.login(&UserId::new("dave")).unwrap().account_id;
        engine.transfer(alice, carol, Amount::new(10), None).unwrap();

        let board = engine.leaderboard(None);
        let order: Vec<AccountId> = board.iter().map(|r| r.account_id).collect();
        // bob and dave tie on balance, bob is older
        assert_eq!(order, vec![carol, bob, dave, alice]);
        assert_eq!(board[0].rank, 1);
        assert_eq!(engine.leaderboard(Some(1)).len(), 1);
    }

    #[test]
    fn catalog_filters_and_sorts() {
        let (engine, _) = engine();
        let gadgets = engine.catalog(Some(Category::Gadgets));
        let names: Vec<&str> = gadgets.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Smartwatch", "Smartphone"]);
        assert_eq!(engine.catalog(None).len(), 8);
    }

    #[test]
    fn profile_and_circulation() {
        let (engine, _) = engine();
        let alice = engine.login(&UserId::new("alice")).unwrap().account_id;
        engine.open_stake(alice, Amount::new(5_000), StakeDuration::Day).unwrap();
        engine.purchase(alice, crate::types::ItemId(8)).unwrap();

        let profile = engine.profile(alice).unwrap();
        assert_eq!(profile.active_stakes, 1);
        assert_eq!(profile.staked_principal, Amount::new(5_000));
        assert_eq!(profile.inventory_count, 1);
        assert_eq!(profile.account.balance, Amount::new(1_000_000_000 - 5_000 - 700));

        assert_eq!(engine.outstanding_principal().unwrap(), Amount::new(5_000));
        assert_eq!(engine.total_in_circulation().unwrap(), Amount::new(1_000_000_000 - 5_700));
    }

    #[test]
    fn audit_passes_on_engine_writes() {
        let (engine, clock) = engine();
        let alice = engine.login(&UserId::new("alice")).unwrap().account_id;
        let bob = engine.login(&UserId::new("bob")).unwrap().account_id;
        engine.transfer(alice, bob, Amount::new(100), None).unwrap();
        let stake = engine.open_stake(bob, Amount::new(1_000_000), StakeDuration::Day).unwrap();
        clock.advance(StakeDuration::Day.millis());
        engine.claim_stake(stake.id).unwrap();

        let report = engine.audit().unwrap();
        assert_eq!(report.accounts, 2);
        assert_eq!(report.entries, 3);
        assert_eq!(report.outstanding_principal, Amount::ZERO);
    }

    #[test]
    fn totals_past_max_are_violations_not_caps() {
        let mut config = EconomyConfig::testing();
        config.starting_balance = Amount::new(u64::MAX / 2 + 1);
        let engine = Engine::with_clock(config, Arc::new(ManualClock::new(Timestamp::from_millis(0))));
        engine.login(&UserId::new("alice")).unwrap();
        assert!(engine.total_in_circulation().is_ok());

        engine.login(&UserId::new("bob")).unwrap();
        assert!(matches!(engine.total_in_circulation(), Err(LedgerError::InvariantViolation(_))));
        assert!(matches!(engine.audit(), Err(LedgerError::InvariantViolation(_))));
    }

    #[test]
    fn audit_catches_unjournaled_mutation() {
        let (engine, _) = engine();
        let alice = engine.login(&UserId::new("alice")).unwrap().account_id;
        let account = engine.account(alice).unwrap();
        engine
            .store()
            .commit(ChangeSet::new().delta(BalanceDelta::for_account(&account, SignedAmount::new(5))))
            .unwrap();

        assert!(matches!(engine.audit(), Err(LedgerError::InvariantViolation(_))));
    }
}
