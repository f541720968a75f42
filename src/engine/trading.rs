//! Trade settlement against the house.
//!
//! There are no open positions. A buy debits `quantity * unit_price` and a sell
//! credits it; the instrument is only recorded on the journal entry.

use super::core::Engine;
use super::results::LedgerError;
use super::transfers::single_entry;
use crate::journal::{EntryKind, EntryRef, LedgerEntry, NewEntry, TradeFill};
use crate::market::Tick;
use crate::store::{BalanceDelta, ChangeSet, Store};
use crate::types::{AccountId, Amount, Price, Side, SignedAmount};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::info;

/// Notional in minor units. Buys round up, sells round down, so the house never
/// pays out a fraction it did not receive.
pub fn trade_total(side: Side, quantity: Decimal, unit_price: Price) -> Result<Amount, LedgerError> {
    if quantity <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount(format!("quantity {} must be positive", quantity)));
    }
    let raw = quantity
        .checked_mul(unit_price.value())
        .ok_or_else(|| LedgerError::InvalidAmount("trade total overflows".to_string()))?;
    let strategy = match side {
        Side::Buy => RoundingStrategy::AwayFromZero,
        Side::Sell => RoundingStrategy::ToZero,
    };
    let total = Amount::from_decimal(raw, strategy)
        .ok_or_else(|| LedgerError::InvalidAmount("trade total out of range".to_string()))?;
    if total.is_zero() {
        return Err(LedgerError::InvalidAmount(format!(
            "{} x {} rounds to nothing",
            quantity, unit_price
        )));
    }
    Ok(total)
}

impl<S: Store> Engine<S> {
    pub fn settle_trade(
        &self,
        account: AccountId,
        side: Side,
        quantity: Decimal,
        unit_price: Price,
    ) -> Result<LedgerEntry, LedgerError> {
        self.settle(account, side, quantity, unit_price, None)
    }

    /// Settle at the price of one tick, read once by the caller.
    pub fn execute_trade(
        &self,
        account: AccountId,
        tick: &Tick,
        side: Side,
        quantity: Decimal,
    ) -> Result<LedgerEntry, LedgerError> {
        let fill = TradeFill {
            symbol: tick.symbol.clone(),
            market: tick.kind,
            side,
            quantity,
            unit_price: tick.price,
        };
        self.settle(account, side, quantity, tick.price, Some(fill))
    }

    fn settle(
        &self,
        account: AccountId,
        side: Side,
        quantity: Decimal,
        unit_price: Price,
        fill: Option<TradeFill>,
    ) -> Result<LedgerEntry, LedgerError> {
        let total = trade_total(side, quantity, unit_price)?;
        self.ensure_amount(total)?;

        let entry = self.with_retry("trade", || {
            let current = self.load_account(account)?;
            let now = self.now();
            let (delta, draft) = match side {
                Side::Buy => {
                    if !current.can_cover(total) {
                        return Err(LedgerError::InsufficientFunds {
                            account,
                            requested: total,
                            available: current.balance,
                        });
                    }
                    (SignedAmount::debit(total), NewEntry::debit(EntryKind::Trade, account, total, now))
                }
                Side::Sell => (SignedAmount::credit(total), NewEntry::credit(EntryKind::Trade, account, total, now)),
            };
            let draft = match &fill {
                Some(fill) => draft
                    .with_note(format!("{} {} {}", side, fill.quantity, fill.symbol))
                    .with_reference(EntryRef::Trade(fill.clone())),
                None => draft,
            };

            let changes = ChangeSet::new()
                .delta(BalanceDelta::for_account(&current, delta))
                .entry(draft);
            let receipt = self.store.commit(changes)?;
            single_entry(receipt.entries)
        })?;

        info!(
            account = %account,
            side = %side,
            quantity = %quantity,
            price = %unit_price,
            total = %total,
            symbol = fill.as_ref().map(|f| f.symbol.as_str()).unwrap_or("-"),
            "trade settled"
        );
        Ok(entry)
    }
}
