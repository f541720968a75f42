//! End-to-end lifecycle tests.
//!
//! Drives the engine through whole user journeys with a manual clock, and
//! through a store that fails on demand to check that nothing half-commits.

use dreamworld_ledger::*;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

fn setup() -> (Engine, ManualClock) {
    let clock = ManualClock::new(Timestamp::from_millis(1_700_000_000_000));
    (Engine::with_clock(EconomyConfig::testing(), Arc::new(clock.clone())), clock)
}

/// Store that refuses every commit while `failing` is set.
struct FailingStore {
    inner: MemoryStore,
    failing: AtomicBool,
}

impl FailingStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            failing: AtomicBool::new(false),
        }
    }

    fn fail(&self, on: bool) {
        self.failing.store(on, Ordering::SeqCst);
    }
}

impl Store for FailingStore {
    fn account(&self, id: AccountId) -> Option<Account> {
        self.inner.account(id)
    }
    fn account_by_user(&self, user: &UserId) -> Option<Account> {
        self.inner.account_by_user(user)
    }
    fn accounts(&self) -> Vec<Account> {
        self.inner.accounts()
    }
    fn entries(&self) -> Vec<LedgerEntry> {
        self.inner.entries()
    }
    fn entries_for(&self, account: AccountId) -> Vec<LedgerEntry> {
        self.inner.entries_for(account)
    }
    fn stake(&self, id: StakeId) -> Option<Stake> {
        self.inner.stake(id)
    }
    fn stakes_for(&self, account: AccountId) -> Vec<Stake> {
        self.inner.stakes_for(account)
    }
    fn next_stake_id(&self) -> StakeId {
        self.inner.next_stake_id()
    }
    fn completion(&self, account: AccountId, mission: &MissionId) -> Option<MissionCompletion> {
        self.inner.completion(account, mission)
    }
    fn completions_for(&self, account: AccountId) -> Vec<MissionCompletion> {
        self.inner.completions_for(account)
    }
    fn inventory_for(&self, account: AccountId) -> Vec<InventoryEntry> {
        self.inner.inventory_for(account)
    }
    fn item(&self, id: ItemId) -> Option<Item> {
        self.inner.item(id)
    }
    fn items(&self) -> Vec<Item> {
        self.inner.items()
    }
    fn put_item(&self, item: Item) {
        self.inner.put_item(item)
    }
    fn snapshot(&self) -> Snapshot {
        self.inner.snapshot()
    }
    fn commit(&self, changes: ChangeSet) -> Result<Receipt, StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected failure".to_string()));
        }
        self.inner.commit(changes)
    }
}

#[test]
fn claim_gated_on_maturity() {
    let (engine, clock) = setup();
    let saver = engine.login(&UserId::new("saver")).unwrap();
    let stake = engine.stake(&saver, Amount::new(1_000_000), StakeDuration::Day).unwrap();

    clock.advance(DAY_MS - 1_000);
    let err = engine.claim(&saver, stake.id).unwrap_err();
    assert_eq!(
        err,
        LedgerError::NotMature {
            stake: stake.id,
            matures_at: stake.maturity,
        }
    );
    assert_eq!(engine.my_balance(&saver).unwrap(), Amount::new(999_000_000));

    clock.advance(1_000);
    let entry = engine.claim(&saver, stake.id).unwrap();
    assert_eq!(entry.amount, Amount::new(1_001_000));
    assert_eq!(engine.my_balance(&saver).unwrap(), Amount::new(1_000_001_000));
}

#[test]
fn transfer_is_atomic_when_commit_fails() {
    let clock = ManualClock::new(Timestamp::from_millis(0));
    let engine = Engine::new(EconomyConfig::testing(), FailingStore::new(), Arc::new(clock));
    let alice = engine.login(&UserId::new("alice")).unwrap();
    let bob = engine.login(&UserId::new("bob")).unwrap();

    engine.store().fail(true);
    let result = engine.send(&alice, bob.account_id, Amount::new(1_000), None);
    assert!(matches!(result, Err(LedgerError::Store(_))));
    assert!(!result.unwrap_err().is_retryable());

    assert_eq!(engine.my_balance(&alice).unwrap(), Amount::new(1_000_000_000));
    assert_eq!(engine.my_balance(&bob).unwrap(), Amount::new(1_000_000_000));
    assert!(engine.store().entries().is_empty());

    engine.store().fail(false);
    engine.send(&alice, bob.account_id, Amount::new(1_000), None).unwrap();
    assert_eq!(engine.store().entries().len(), 1);
    engine.audit().unwrap();
}

#[test]
fn stake_and_claim_are_atomic_when_commit_fails() {
    let clock = ManualClock::new(Timestamp::from_millis(0));
    let engine = Engine::new(EconomyConfig::testing(), FailingStore::new(), Arc::new(clock.clone()));
    let saver = engine.login(&UserId::new("saver")).unwrap();

    engine.store().fail(true);
    assert!(engine.stake(&saver, Amount::new(500), StakeDuration::Day).is_err());
    assert!(engine.store().stakes_for(saver.account_id).is_empty());
    assert_eq!(engine.my_balance(&saver).unwrap(), Amount::new(1_000_000_000));

    engine.store().fail(false);
    let stake = engine.stake(&saver, Amount::new(500), StakeDuration::Day).unwrap();
    clock.advance(DAY_MS);

    engine.store().fail(true);
    assert!(engine.claim(&saver, stake.id).is_err());
    assert!(engine.store().stake(stake.id).unwrap().is_active());

    engine.store().fail(false);
    engine.claim(&saver, stake.id).unwrap();
    engine.audit().unwrap();
}

#[test]
fn mission_three_pays_once() {
    let (engine, _) = setup();
    let player = engine.login(&UserId::new("player")).unwrap();
    let friend = engine.login(&UserId::new("friend")).unwrap();
    engine.send(&player, friend.account_id, Amount::new(10), None).unwrap();
    let before = engine.my_balance(&player).unwrap();

    let mission = MissionId::new("mission-3");
    engine.complete(&player, &mission).unwrap();
    let second = engine.complete(&player, &mission);
    assert!(matches!(second, Err(LedgerError::AlreadyCompleted { .. })));

    assert_eq!(
        engine.my_balance(&player).unwrap(),
        before.checked_add(Amount::new(25_000_000)).unwrap()
    );
}

#[test]
fn missions_track_progress() {
    let (engine, clock) = setup();
    let player = engine.login(&UserId::new("player")).unwrap();
    let mut board = MarketBoard::seeded(default_instruments(), &engine.config().market, clock.now(), 11);

    // forex trade of any size completes mission-4
    engine.trade(&player, &mut board, "USD/JPY", Side::Buy, dec!(1)).unwrap();
    engine.complete(&player, &MissionId::new("mission-4")).unwrap();

    // crypto volume accumulates across trades
    engine.trade(&player, &mut board, "BTC", Side::Buy, dec!(40)).unwrap();
    let board_status = engine.my_missions(&player).unwrap();
    let volume = board_status
        .iter()
        .find(|s| s.mission.id == MissionId::new("mission-2"))
        .unwrap();
    assert_eq!(volume.progress.current, 2_600_000);
    assert!(matches!(
        engine.complete(&player, &MissionId::new("mission-2")),
        Err(LedgerError::RequirementNotMet { .. })
    ));

    engine.trade(&player, &mut board, "BTC", Side::Sell, dec!(40)).unwrap();
    engine.complete(&player, &MissionId::new("mission-2")).unwrap();

    // stake requirement is cumulative principal
    engine.stake(&player, Amount::new(6_000_000), StakeDuration::Day).unwrap();
    engine.stake(&player, Amount::new(4_000_000), StakeDuration::Week).unwrap();
    engine.complete(&player, &MissionId::new("mission-1")).unwrap();

    let profile = engine.my_profile(&player).unwrap();
    assert_eq!(profile.missions_completed, 3);
    assert_eq!(profile.active_stakes, 2);
    engine.audit().unwrap();
}

#[test]
fn shopping_trip() {
    let (engine, _) = setup();
    let shopper = engine.login(&UserId::new("shopper")).unwrap();

    let cars = engine.catalog(Some(Category::Cars));
    assert_eq!(cars.len(), 2);
    assert!(cars[0].price <= cars[1].price);

    let first = engine.buy(&shopper, cars[0].id).unwrap();
    let second = engine.buy(&shopper, cars[0].id).unwrap();
    assert_ne!(first.inventory.id, second.inventory.id);
    assert_eq!(first.entry.kind, EntryKind::Purchase);

    let owned = engine.inventory(shopper.account_id);
    assert_eq!(owned.len(), 2);
    assert_eq!(
        engine.my_balance(&shopper).unwrap(),
        Amount::new(1_000_000_000 - 2 * cars[0].price.value())
    );
}

#[test]
fn history_and_leaderboard() {
    let (engine, clock) = setup();
    let rich = engine.login(&UserId::new("rich")).unwrap();
    let poor = engine.login(&UserId::new("poor")).unwrap();

    for _ in 0..60 {
        clock.advance(1);
        engine.send(&poor, rich.account_id, Amount::new(1_000), None).unwrap();
    }

    let history = engine.history(poor.account_id, None).unwrap();
    assert_eq!(history.len(), 50);
    assert!(history.windows(2).all(|w| w[0].id > w[1].id));
    assert!(history.iter().all(|e| e.signed_for(poor.account_id).is_debit()));

    let board = engine.leaderboard(None);
    assert_eq!(board[0].user, UserId::new("rich"));
    assert_eq!(board[0].balance, Amount::new(1_000_060_000));
    assert_eq!(board[1].rank, 2);
}

#[test]
fn login_is_idempotent_per_identity() {
    let (engine, _) = setup();
    let first = engine.login(&UserId::new("alice")).unwrap();
    engine.send_to_user(&first, &UserId::new("alice"), Amount::new(1), None).unwrap_err();
    let again = engine.login(&UserId::new("alice")).unwrap();

    assert_eq!(first.account_id, again.account_id);
    assert_eq!(engine.total_in_circulation().unwrap(), Amount::new(1_000_000_000));
}

#[test]
fn config_from_toml_drives_engine() {
    let config = EconomyConfig::from_toml_str(
        r#"
        starting_balance = 5000

        [staking]
        day_bps = 200
        week_bps = 300
        month_bps = 400

        [retry]
        max_attempts = 10
        base_backoff_ms = 0
        max_backoff_ms = 0
        "#,
    )
    .unwrap();

    let clock = ManualClock::new(Timestamp::from_millis(0));
    let engine = Engine::with_clock(config, Arc::new(clock.clone()));
    let user = engine.login(&UserId::new("configured")).unwrap();
    assert_eq!(engine.my_balance(&user).unwrap(), Amount::new(5_000));

    let stake = engine.stake(&user, Amount::new(1_000), StakeDuration::Day).unwrap();
    assert_eq!(stake.interest, Amount::new(20));
}
