//! Simulated crypto and forex prices.
//!
//! Each instrument has a [`PriceProcess`]: an infinite iterator of ticks where
//! every tick nudges the previous price by a uniform random factor inside the
//! instrument's band. Ticks are advisory; settlement reads one tick at call time
//! and nothing here is persisted.

use crate::types::{Price, Timestamp};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketKind {
    Crypto,
    Forex,
}

impl fmt::Display for MarketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketKind::Crypto => f.write_str("crypto"),
            MarketKind::Forex => f.write_str("forex"),
        }
    }
}

/// Most decimal places a simulated price may carry.
pub const MAX_PRICE_SCALE: u32 = 18;

/// Widest per-tick band, just under 100%.
pub const MAX_BAND_PPM: u32 = 999_999;

/// Tick generation settings shared by every instrument of a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSettings {
    /// Wall-clock spacing between ticks
    pub tick_interval_ms: i64,
    /// Max per-tick move for crypto, parts per million (50_000 = 5%)
    pub crypto_band_ppm: u32,
    /// Max per-tick move for forex, parts per million (1_000 = 0.1%)
    pub forex_band_ppm: u32,
    /// Decimal places kept on simulated prices
    pub price_scale: u32,
}

impl Default for MarketSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 5_000,
            crypto_band_ppm: 50_000,
            forex_band_ppm: 1_000,
            price_scale: 6,
        }
    }
}

impl MarketSettings {
    pub fn band_ppm(&self, kind: MarketKind) -> u32 {
        match kind {
            MarketKind::Crypto => self.crypto_band_ppm,
            MarketKind::Forex => self.forex_band_ppm,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: String,
    pub name: String,
    pub kind: MarketKind,
    pub opening_price: Price,
}

impl Instrument {
    /// None unless the opening price is positive.
    #[must_use]
    pub fn new(symbol: &str, name: &str, kind: MarketKind, opening_price: Decimal) -> Option<Self> {
        Some(Self {
            symbol: symbol.to_string(),
            name: name.to_string(),
            kind,
            opening_price: Price::new(opening_price)?,
        })
    }
}

pub fn default_instruments() -> Vec<Instrument> {
    [
        ("BTC", "Bitcoin", MarketKind::Crypto, dec!(65000)),
        ("ETH", "Ethereum", MarketKind::Crypto, dec!(3500)),
        ("SOL", "Solana", MarketKind::Crypto, dec!(150)),
        ("DOGE", "Dogecoin", MarketKind::Crypto, dec!(0.15)),
        ("ADA", "Cardano", MarketKind::Crypto, dec!(0.5)),
        ("EUR/USD", "Euro / US Dollar", MarketKind::Forex, dec!(1.08)),
        ("USD/JPY", "US Dollar / Japanese Yen", MarketKind::Forex, dec!(150.5)),
        ("GBP/USD", "British Pound / US Dollar", MarketKind::Forex, dec!(1.25)),
        ("USD/CHF", "US Dollar / Swiss Franc", MarketKind::Forex, dec!(0.90)),
        ("AUD/USD", "Australian Dollar / US Dollar", MarketKind::Forex, dec!(0.65)),
    ]
    .into_iter()
    .filter_map(|(symbol, name, kind, price)| Instrument::new(symbol, name, kind, price))
    .collect()
}

/// One simulated price observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub symbol: String,
    pub kind: MarketKind,
    /// 0 is the opening price, each step adds one
    pub sequence: u64,
    pub price: Price,
    /// Move versus the opening price, as a fraction
    pub change: Decimal,
    pub at: Timestamp,
}

/// Infinite random walk for a single instrument.
#[derive(Debug, Clone)]
pub struct PriceProcess {
    instrument: Instrument,
    band_ppm: i64,
    interval_ms: i64,
    scale: u32,
    seed: Option<u64>,
    rng: StdRng,
    started_at: Timestamp,
    last: Option<Tick>,
}

impl PriceProcess {
    pub fn new(instrument: Instrument, settings: &MarketSettings, started_at: Timestamp) -> Self {
        Self::build(instrument, settings, started_at, None)
    }

    /// Reproducible walk; restarting replays the same ticks.
    pub fn seeded(instrument: Instrument, settings: &MarketSettings, started_at: Timestamp, seed: u64) -> Self {
        Self::build(instrument, settings, started_at, Some(seed))
    }

    // settings that skipped EconomyConfig::validate are clamped into range here
    fn build(instrument: Instrument, settings: &MarketSettings, started_at: Timestamp, seed: Option<u64>) -> Self {
        let band_ppm = i64::from(settings.band_ppm(instrument.kind).min(MAX_BAND_PPM));
        Self {
            instrument,
            band_ppm,
            interval_ms: settings.tick_interval_ms.max(1),
            scale: settings.price_scale.min(MAX_PRICE_SCALE),
            seed,
            rng: Self::make_rng(seed),
            started_at,
            last: None,
        }
    }

    fn make_rng(seed: Option<u64>) -> StdRng {
        match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    pub fn last(&self) -> Option<&Tick> {
        self.last.as_ref()
    }

    /// Back to the opening price and start time.
    pub fn restart(&mut self) {
        self.rng = Self::make_rng(self.seed);
        self.last = None;
    }

    /// Timestamp the next tick will carry.
    pub fn next_at(&self) -> Timestamp {
        match &self.last {
            Some(tick) => tick.at.plus_millis(self.interval_ms),
            None => self.started_at,
        }
    }

    fn step(&mut self, previous: Price) -> Price {
        let ppm = self.rng.gen_range(-self.band_ppm..=self.band_ppm);
        let factor = Decimal::ONE + Decimal::new(ppm, 6);
        let floor = Decimal::new(1, self.scale);
        match previous.value().checked_mul(factor) {
            Some(moved) => Price::new_unchecked(
                moved
                    .round_dp_with_strategy(self.scale, RoundingStrategy::MidpointNearestEven)
                    .max(floor),
            ),
            None => previous,
        }
    }
}

impl Iterator for PriceProcess {
    type Item = Tick;

    fn next(&mut self) -> Option<Tick> {
        let at = self.next_at();
        let (sequence, price) = match self.last.as_ref().map(|t| (t.sequence, t.price)) {
            Some((sequence, previous)) => (sequence + 1, self.step(previous)),
            None => (0, self.instrument.opening_price),
        };
        let opening = self.instrument.opening_price.value();
        let tick = Tick {
            symbol: self.instrument.symbol.clone(),
            kind: self.instrument.kind,
            sequence,
            price,
            change: (price.value() - opening).checked_div(opening).unwrap_or(Decimal::ZERO),
            at,
        };
        self.last = Some(tick.clone());
        Some(tick)
    }
}

/// Per-session view of every instrument. Catches up lazily when asked for "now".
#[derive(Debug, Clone)]
pub struct MarketBoard {
    processes: BTreeMap<String, PriceProcess>,
}

impl MarketBoard {
    pub fn new(instruments: Vec<Instrument>, settings: &MarketSettings, opened_at: Timestamp) -> Self {
        let processes = instruments
            .into_iter()
            .map(|i| (i.symbol.clone(), PriceProcess::new(i, settings, opened_at)))
            .collect();
        Self { processes }
    }

    pub fn seeded(instruments: Vec<Instrument>, settings: &MarketSettings, opened_at: Timestamp, seed: u64) -> Self {
        let processes = instruments
            .into_iter()
            .enumerate()
            .map(|(i, inst)| {
                let symbol = inst.symbol.clone();
                (symbol, PriceProcess::seeded(inst, settings, opened_at, seed.wrapping_add(i as u64)))
            })
            .collect();
        Self { processes }
    }

    /// Pull every tick stamped at or before `now`. Returns how many were generated.
    pub fn advance_to(&mut self, now: Timestamp) -> usize {
        let mut generated = 0;
        for process in self.processes.values_mut() {
            while process.next_at() <= now {
                if process.next().is_none() {
                    break;
                }
                generated += 1;
            }
        }
        if generated > 0 {
            tracing::debug!(generated, at = now.as_millis(), "market board advanced");
        }
        generated
    }

    pub fn quote(&self, symbol: &str) -> Option<&Tick> {
        self.processes.get(symbol).and_then(|p| p.last())
    }

    pub fn instrument(&self, symbol: &str) -> Option<&Instrument> {
        self.processes.get(symbol).map(|p| p.instrument())
    }

    pub fn quotes(&self, kind: MarketKind) -> Vec<&Tick> {
        self.processes
            .values()
            .filter(|p| p.instrument().kind == kind)
            .filter_map(|p| p.last())
            .collect()
    }

    pub fn restart(&mut self) {
        for process in self.processes.values_mut() {
            process.restart();
        }
    }
}
