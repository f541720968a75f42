//! Virtual economy simulation.
//!
//! Walks through the ledger lifecycle: account grants, transfers, simulated
//! trading, staking, missions, shopping, and concurrent load with an audit.

use dreamworld_ledger::*;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    println!("Dreamworld Ledger Simulation");
    println!("Starting grant, journaled money movement, atomic commits\n");

    let scenarios: [(&str, fn() -> Result<(), LedgerError>); 7] = [
        ("Scenario 1: Accounts and Transfers", scenario_1_transfers),
        ("Scenario 2: Simulated Markets", scenario_2_trading),
        ("Scenario 3: Staking Lifecycle", scenario_3_staking),
        ("Scenario 4: Missions", scenario_4_missions),
        ("Scenario 5: Marketplace", scenario_5_marketplace),
        ("Scenario 6: Concurrent Load", scenario_6_concurrency),
        ("Scenario 7: Leaderboard and Audit", scenario_7_leaderboard),
    ];

    for (title, run) in scenarios {
        println!("{}\n", title);
        if let Err(e) = run() {
            eprintln!("  {} failed: {}", title, e);
            std::process::exit(1);
        }
        println!();
    }

    println!("All simulations completed successfully.");
}

fn manual_engine() -> (Engine, ManualClock) {
    let clock = ManualClock::new(Timestamp::from_millis(1_700_000_000_000));
    let engine = Engine::with_clock(EconomyConfig::development(), Arc::new(clock.clone()));
    (engine, clock)
}

fn scenario_1_transfers() -> Result<(), LedgerError> {
    let (engine, _) = manual_engine();
    let alice = engine.login(&UserId::new("alice@example.com"))?;
    let bob = engine.login(&UserId::new("bob@example.com"))?;

    println!("  Alice and Bob sign in and receive ${} each", engine.config().starting_balance);

    let entry = engine.send(&alice, bob.account_id, Amount::new(2_500_000), Some("dinner".to_string()))?;
    println!("  Alice sends Bob ${} (entry #{})", entry.amount, entry.id.0);

    let entry = engine.send_to_user(&bob, &UserId::new("alice@example.com"), Amount::new(500_000), None)?;
    println!("  Bob sends ${} back by email", entry.amount);

    match engine.send(&alice, alice.account_id, Amount::new(1), None) {
        Err(e) => println!("  Alice pays herself: {}", e),
        Ok(_) => println!("  Alice pays herself: accepted?"),
    }
    match engine.send(&alice, bob.account_id, Amount::new(5_000_000_000), None) {
        Err(e) => println!("  Alice sends $5B: {}", e),
        Ok(_) => println!("  Alice sends $5B: accepted?"),
    }

    println!("  Balances: alice ${}, bob ${}", engine.my_balance(&alice)?, engine.my_balance(&bob)?);
    Ok(())
}

fn scenario_2_trading() -> Result<(), LedgerError> {
    let (engine, clock) = manual_engine();
    let trader = engine.login(&UserId::new("trader"))?;
    let mut board = MarketBoard::seeded(default_instruments(), &engine.config().market, clock.now(), 2024);

    board.advance_to(clock.now());
    for tick in board.quotes(MarketKind::Crypto) {
        println!("  {:<8} ${}", tick.symbol, tick.price);
    }

    let entry = engine.trade(&trader, &mut board, "BTC", Side::Buy, dec!(10))?;
    println!("\n  Buy 10 BTC for ${}", entry.amount);

    clock.advance(60_000);
    let generated = board.advance_to(clock.now());
    println!("  One minute later, {} ticks generated", generated);
    if let Some(tick) = board.quote("BTC") {
        println!("  BTC now ${} ({:.2}% since open)", tick.price, tick.change * dec!(100));
    }

    let entry = engine.trade(&trader, &mut board, "BTC", Side::Sell, dec!(10))?;
    println!("  Sell 10 BTC for ${}", entry.amount);

    let entry = engine.trade(&trader, &mut board, "EUR/USD", Side::Buy, dec!(1000000))?;
    println!("  Buy 1,000,000 EUR/USD for ${}", entry.amount);

    println!("  Balance after trading: ${}", engine.my_balance(&trader)?);
    Ok(())
}

fn scenario_3_staking() -> Result<(), LedgerError> {
    let (engine, clock) = manual_engine();
    let saver = engine.login(&UserId::new("saver"))?;

    for duration in StakeDuration::ALL {
        let stake = engine.stake(&saver, Amount::new(1_000_000), duration)?;
        println!(
            "  {} stake of ${} at {} returns ${} at {}",
            duration, stake.principal, stake.rate, stake.total_return, stake.maturity
        );
    }

    let stakes = engine.stakes(saver.account_id);
    let day = &stakes[0];

    clock.advance(DAY_MS - 1_000);
    match engine.claim(&saver, day.id) {
        Err(e) => println!("\n  One second early: {}", e),
        Ok(_) => println!("\n  One second early: paid?"),
    }

    clock.advance(1_000);
    let entry = engine.claim(&saver, day.id)?;
    println!("  At maturity: credited ${}", entry.amount);

    match engine.claim(&saver, day.id) {
        Err(e) => println!("  Claiming again: {}", e),
        Ok(_) => println!("  Claiming again: paid twice?"),
    }

    clock.advance(30 * DAY_MS);
    for stake in &stakes[1..] {
        let entry = engine.claim(&saver, stake.id)?;
        println!("  {} stake paid ${}", stake.duration, entry.amount);
    }

    println!("  Balance: ${}", engine.my_balance(&saver)?);
    Ok(())
}

fn scenario_4_missions() -> Result<(), LedgerError> {
    let (engine, _) = manual_engine();
    let player = engine.login(&UserId::new("player"))?;
    let friend = engine.login(&UserId::new("friend"))?;

    let send_money = MissionId::new("mission-3");
    match engine.complete(&player, &send_money) {
        Err(e) => println!("  Before sending anything: {}", e),
        Ok(_) => println!("  Before sending anything: rewarded?"),
    }

    engine.send(&player, friend.account_id, Amount::new(1), Some("hi".to_string()))?;
    let entry = engine.complete(&player, &send_money)?;
    println!("  After a $1 transfer: rewarded ${}", entry.amount);

    match engine.complete(&player, &send_money) {
        Err(e) => println!("  Again: {}", e),
        Ok(_) => println!("  Again: rewarded twice?"),
    }

    engine.stake(&player, Amount::new(10_000_000), StakeDuration::Week)?;
    engine.complete(&player, &MissionId::new("mission-1"))?;

    println!();
    for status in engine.my_missions(&player)? {
        let done = if status.completion.is_some() { "done" } else { "open" };
        println!(
            "  [{}] {:<28} {}/{}",
            done, status.mission.title, status.progress.current, status.progress.target
        );
    }
    Ok(())
}

fn scenario_5_marketplace() -> Result<(), LedgerError> {
    let (engine, _) = manual_engine();
    let shopper = engine.login(&UserId::new("shopper"))?;

    for item in engine.catalog(Some(Category::Houses)) {
        println!("  {:<12} ${}", item.name, item.price);
    }

    let bought = engine.buy(&shopper, ItemId(4))?;
    println!("\n  Bought {} for ${}", bought.inventory.item_name, bought.inventory.purchase_price);
    engine.buy(&shopper, ItemId(1))?;

    let profile = engine.my_profile(&shopper)?;
    println!(
        "  Owns {} items, balance ${}",
        profile.inventory_count, profile.account.balance
    );
    Ok(())
}

fn scenario_6_concurrency() -> Result<(), LedgerError> {
    let mut config = EconomyConfig::development();
    config.starting_balance = Amount::new(1_000);
    let engine = Engine::in_memory(config);

    let users: Vec<Session> = (0..8)
        .map(|i| engine.login(&UserId::new(format!("user-{}", i))))
        .collect::<Result<_, _>>()?;
    let before = engine.total_in_circulation()?;

    // every user sprays transfers at the others; most overdraft attempts must fail
    let outcomes: Vec<(usize, usize)> = std::thread::scope(|s| {
        let handles: Vec<_> = users
            .iter()
            .enumerate()
            .map(|(i, session)| {
                let engine = &engine;
                let users = &users;
                s.spawn(move || {
                    let mut ok = 0usize;
                    let mut refused = 0usize;
                    for round in 0..200 {
                        let to = &users[(i + round % 7 + 1) % users.len()];
                        match engine.send(session, to.account_id, Amount::new(37), None) {
                            Ok(_) => ok += 1,
                            Err(_) => refused += 1,
                        }
                    }
                    (ok, refused)
                })
            })
            .collect();
        handles.into_iter().filter_map(|h| h.join().ok()).collect()
    });

    let ok: usize = outcomes.iter().map(|(o, _)| o).sum();
    let refused: usize = outcomes.iter().map(|(_, r)| r).sum();
    println!("  {} transfers committed, {} refused", ok, refused);
    println!("  Money in circulation: ${} before, ${} after", before, engine.total_in_circulation()?);

    let report = engine.audit()?;
    println!("  Audit: {} accounts, {} entries, journal matches balances", report.accounts, report.entries);
    Ok(())
}

fn scenario_7_leaderboard() -> Result<(), LedgerError> {
    let (engine, clock) = manual_engine();
    let names = ["ana", "ben", "cy", "dee"];
    let sessions: Vec<Session> = names
        .iter()
        .map(|n| engine.login(&UserId::new(*n)))
        .collect::<Result<_, _>>()?;

    engine.send(&sessions[0], sessions[2].account_id, Amount::new(300_000_000), None)?;
    engine.send(&sessions[1], sessions[3].account_id, Amount::new(50_000_000), None)?;
    let stake = engine.stake(&sessions[3], Amount::new(200_000_000), StakeDuration::Month)?;

    for row in engine.leaderboard(None) {
        println!("  #{} {:<4} ${}", row.rank, row.user.as_str(), row.balance);
    }

    clock.advance(StakeDuration::Month.millis());
    engine.claim(&sessions[3], stake.id)?;

    let report = engine.audit()?;
    println!(
        "\n  After dee's stake pays out: ${} in circulation, ${} locked",
        report.total_balances, report.outstanding_principal
    );
    for entry in engine.history(sessions[3].account_id, Some(3))? {
        println!("  {:?} {} {}", entry.kind, entry.signed_for(sessions[3].account_id), entry.note.as_deref().unwrap_or(""));
    }
    Ok(())
}
