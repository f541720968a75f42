//! Property-based tests for money math and conservation.
//!
//! These tests verify invariants hold under random inputs.

use dreamworld_ledger::*;
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::sync::Arc;

// Strategies for generating test data
fn principal_strategy() -> impl Strategy<Value = u64> {
    1u64..10_000_000_000u64
}

fn duration_strategy() -> impl Strategy<Value = StakeDuration> {
    prop_oneof![
        Just(StakeDuration::Day),
        Just(StakeDuration::Week),
        Just(StakeDuration::Month),
    ]
}

fn quantity_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|x| Decimal::new(x, 4)) // 0.0001 to 10,000
}

fn price_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|x| Decimal::new(x, 2)) // 0.01 to 100,000
}

#[derive(Debug, Clone)]
enum Op {
    Transfer { from: usize, to: usize, amount: u64 },
    Stake { who: usize, amount: u64 },
    Trade { who: usize, sell: bool, quantity: u64 },
}

fn op_strategy(users: usize) -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..users, 0..users, 0u64..2_000).prop_map(|(from, to, amount)| Op::Transfer { from, to, amount }),
        1 => (0..users, 0u64..500).prop_map(|(who, amount)| Op::Stake { who, amount }),
        1 => (0..users, any::<bool>(), 1u64..20).prop_map(|(who, sell, quantity)| Op::Trade { who, sell, quantity }),
    ]
}

fn engine_with(users: usize, grant: u64) -> (Engine, ManualClock, Vec<AccountId>) {
    let clock = ManualClock::new(Timestamp::from_millis(0));
    let mut config = EconomyConfig::testing();
    config.starting_balance = Amount::new(grant);
    let engine = Engine::with_clock(config, Arc::new(clock.clone()));
    let ids = (0..users)
        .map(|i| engine.login(&UserId::new(format!("user-{}", i))).unwrap().account_id)
        .collect();
    (engine, clock, ids)
}

proptest! {
    /// Interest is floor(principal * rate) and never exceeds the exact value
    #[test]
    fn interest_is_floored(
        principal in principal_strategy(),
        duration in duration_strategy(),
    ) {
        let rates = StakeRates::default();
        let terms = stake_terms(Amount::new(principal), duration, &rates, Timestamp::from_millis(0)).unwrap();

        let bps = u128::from(rates.rate(duration).value());
        let exact_floor = u128::from(principal) * bps / 10_000;
        prop_assert_eq!(u128::from(terms.interest.value()), exact_floor);
        prop_assert_eq!(terms.total_return.value(), principal + terms.interest.value());
        prop_assert_eq!(terms.maturity.as_millis(), duration.millis());
    }

    /// Buys round up and sells round down, never more than one unit apart
    #[test]
    fn trade_rounding_favours_house(
        quantity in quantity_strategy(),
        price in price_strategy(),
    ) {
        let unit = Price::new_unchecked(price);
        let raw = quantity * price;
        let buy = trade_total(Side::Buy, quantity, unit);
        let sell = trade_total(Side::Sell, quantity, unit);

        if let Ok(buy) = buy {
            prop_assert!(buy.as_decimal() >= raw);
            prop_assert!(buy.as_decimal() - raw < Decimal::ONE);
        }
        match sell {
            Ok(sell) => {
                prop_assert!(sell.as_decimal() <= raw);
                prop_assert!(raw - sell.as_decimal() < Decimal::ONE);
            }
            // only dust is refused
            Err(LedgerError::InvalidAmount(_)) => prop_assert!(raw < Decimal::ONE),
            Err(e) => prop_assert!(false, "unexpected error {}", e),
        }
    }

    /// Every step stays inside the band around the previous price
    #[test]
    fn price_steps_stay_in_band(seed in any::<u64>(), crypto in any::<bool>()) {
        let settings = MarketSettings::default();
        let instrument = if crypto {
            Instrument::new("ETH", "Ethereum", MarketKind::Crypto, Decimal::new(3500, 0)).unwrap()
        } else {
            Instrument::new("GBP/USD", "British Pound / US Dollar", MarketKind::Forex, Decimal::new(125, 2)).unwrap()
        };
        let band = Decimal::new(i64::from(settings.band_ppm(instrument.kind)), 6);
        let slack = Decimal::new(1, settings.price_scale);

        let ticks: Vec<Tick> = PriceProcess::seeded(instrument, &settings, Timestamp::from_millis(0), seed)
            .take(50)
            .collect();
        for pair in ticks.windows(2) {
            let previous = pair[0].price.value();
            let next = pair[1].price.value();
            prop_assert!(next > Decimal::ZERO);
            prop_assert!((next - previous).abs() <= previous * band + slack);
            prop_assert_eq!(pair[1].at.as_millis() - pair[0].at.as_millis(), settings.tick_interval_ms);
            prop_assert_eq!(pair[1].sequence, pair[0].sequence + 1);
        }
    }

    /// Transfers and stakes never create or destroy money:
    /// balances plus locked principal equal the grants
    #[test]
    fn money_is_conserved(ops in prop::collection::vec(op_strategy(4), 1..60)) {
        let (engine, _, ids) = engine_with(4, 5_000);
        let price = Price::new_unchecked(Decimal::new(3, 0));
        let mut trade_net: i128 = 0;

        for op in ops {
            match op {
                Op::Transfer { from, to, amount } => {
                    let _ = engine.transfer(ids[from], ids[to], Amount::new(amount), None);
                }
                Op::Stake { who, amount } => {
                    let _ = engine.open_stake(ids[who], Amount::new(amount), StakeDuration::Day);
                }
                Op::Trade { who, sell, quantity } => {
                    let side = if sell { Side::Sell } else { Side::Buy };
                    if let Ok(entry) = engine.settle_trade(ids[who], side, Decimal::from(quantity), price) {
                        trade_net += i128::from(entry.signed_for(ids[who]).value());
                    }
                }
            }
        }

        let held = i128::from(engine.total_in_circulation().unwrap().value())
            + i128::from(engine.outstanding_principal().unwrap().value());
        prop_assert_eq!(held, 4 * 5_000 + trade_net);
        prop_assert!(engine.audit().is_ok());
    }

    /// Rejected operations leave balances and the journal untouched
    #[test]
    fn failures_change_nothing(amount in 5_001u64..1_000_000u64) {
        let (engine, _, ids) = engine_with(2, 5_000);
        let before = engine.store().snapshot();

        prop_assert!(engine.transfer(ids[0], ids[1], Amount::new(amount), None).is_err());
        prop_assert!(engine.open_stake(ids[0], Amount::new(amount), StakeDuration::Week).is_err());
        prop_assert!(engine
            .settle_trade(ids[0], Side::Buy, Decimal::from(amount), Price::new_unchecked(Decimal::ONE))
            .is_err());

        let after = engine.store().snapshot();
        prop_assert_eq!(before.accounts, after.accounts);
        prop_assert_eq!(after.entries.len(), 0);
        prop_assert_eq!(after.stakes.len(), 0);
    }
}

#[cfg(test)]
mod edge_cases {
    use super::*;

    #[test]
    fn stake_of_entire_balance() {
        let (engine, clock, ids) = engine_with(1, 1_000_000);
        let stake = engine.open_stake(ids[0], Amount::new(1_000_000), StakeDuration::Month).unwrap();
        assert_eq!(engine.balance(ids[0]).unwrap(), Amount::ZERO);

        clock.advance(StakeDuration::Month.millis());
        engine.claim_stake(stake.id).unwrap();
        assert_eq!(engine.balance(ids[0]).unwrap(), Amount::new(1_050_000));
    }

    #[test]
    fn tiny_stake_earns_nothing() {
        let (engine, _, ids) = engine_with(1, 1_000);
        let stake = engine.open_stake(ids[0], Amount::new(999), StakeDuration::Day).unwrap();
        assert_eq!(stake.interest, Amount::ZERO);
        assert_eq!(stake.total_return, Amount::new(999));
    }

    #[test]
    fn price_never_reaches_zero() {
        let settings = MarketSettings {
            crypto_band_ppm: 999_999,
            ..MarketSettings::default()
        };
        let doge = Instrument::new("DOGE", "Dogecoin", MarketKind::Crypto, Decimal::new(15, 2)).unwrap();
        for tick in PriceProcess::seeded(doge, &settings, Timestamp::from_millis(0), 9).take(500) {
            assert!(tick.price.value() > Decimal::ZERO);
        }
    }
}
