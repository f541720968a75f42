//! Session-scoped facade. Everything a signed-in user can do, acting as
//! `session.account_id`.

use super::core::Engine;
use super::results::{LedgerError, MissionStatus, Profile, Purchase};
use crate::journal::LedgerEntry;
use crate::market::MarketBoard;
use crate::session::Session;
use crate::staking::{Stake, StakeDuration};
use crate::store::Store;
use crate::types::{AccountId, Amount, ItemId, MissionId, Side, StakeId, UserId};
use rust_decimal::Decimal;

impl<S: Store> Engine<S> {
    pub fn send(&self, session: &Session, to: AccountId, amount: Amount, note: Option<String>) -> Result<LedgerEntry, LedgerError> {
        self.transfer(session.account_id, to, amount, note)
    }

    /// Send by recipient identity instead of account id.
    pub fn send_to_user(
        &self,
        session: &Session,
        recipient: &UserId,
        amount: Amount,
        note: Option<String>,
    ) -> Result<LedgerEntry, LedgerError> {
        let to = self
            .store
            .account_by_user(recipient)
            .ok_or_else(|| LedgerError::UnknownUser(recipient.clone()))?;
        self.transfer(session.account_id, to.id, amount, note)
    }

    /// Trade at the board's latest tick for `symbol`. The board is caught up to
    /// now first, then read once.
    pub fn trade(
        &self,
        session: &Session,
        board: &mut MarketBoard,
        symbol: &str,
        side: Side,
        quantity: Decimal,
    ) -> Result<LedgerEntry, LedgerError> {
        board.advance_to(self.now());
        let tick = board
            .quote(symbol)
            .cloned()
            .ok_or_else(|| LedgerError::UnknownInstrument(symbol.to_string()))?;
        self.execute_trade(session.account_id, &tick, side, quantity)
    }

    pub fn stake(&self, session: &Session, principal: Amount, duration: StakeDuration) -> Result<Stake, LedgerError> {
        self.open_stake(session.account_id, principal, duration)
    }

    /// Someone else's stake looks the same as a missing one.
    pub fn claim(&self, session: &Session, stake_id: StakeId) -> Result<LedgerEntry, LedgerError> {
        match self.store.stake(stake_id) {
            Some(stake) if stake.owner == session.account_id => self.claim_stake(stake_id),
            _ => Err(LedgerError::UnknownStake(stake_id)),
        }
    }

    pub fn complete(&self, session: &Session, mission: &MissionId) -> Result<LedgerEntry, LedgerError> {
        self.complete_mission(session.account_id, mission)
    }

    pub fn buy(&self, session: &Session, item: ItemId) -> Result<Purchase, LedgerError> {
        self.purchase(session.account_id, item)
    }

    pub fn my_balance(&self, session: &Session) -> Result<Amount, LedgerError> {
        self.balance(session.account_id)
    }

    pub fn my_profile(&self, session: &Session) -> Result<Profile, LedgerError> {
        self.profile(session.account_id)
    }

    pub fn my_missions(&self, session: &Session) -> Result<Vec<MissionStatus>, LedgerError> {
        self.mission_board(session.account_id)
    }
}
