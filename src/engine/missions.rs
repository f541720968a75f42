//! Mission completion and reward payout.

use super::core::Engine;
use super::results::LedgerError;
use super::transfers::single_entry;
use crate::journal::{EntryKind, EntryRef, LedgerEntry, NewEntry};
use crate::mission::{progress, MissionCompletion};
use crate::store::{BalanceDelta, ChangeSet, Store};
use crate::types::{AccountId, MissionId, SignedAmount};
use tracing::info;

impl<S: Store> Engine<S> {
    /// Record the completion and credit the reward in one commit. The store
    /// rejects a second completion for the same (account, mission).
    pub fn complete_mission(&self, account: AccountId, mission_id: &MissionId) -> Result<LedgerEntry, LedgerError> {
        let mission = self
            .mission(mission_id)
            .cloned()
            .ok_or_else(|| LedgerError::UnknownMission(mission_id.clone()))?;

        let entry = self.with_retry("complete_mission", || {
            if self.store.completion(account, mission_id).is_some() {
                return Err(LedgerError::AlreadyCompleted {
                    account,
                    mission: mission_id.clone(),
                });
            }
            let current = self.load_account(account)?;

            if self.config.missions.verify_requirements {
                let progress = progress(&mission.requirement, account, &self.store.entries_for(account));
                if !progress.is_met() {
                    return Err(LedgerError::RequirementNotMet {
                        mission: mission_id.clone(),
                        progress,
                    });
                }
            }

            let now = self.now();
            let changes = ChangeSet::new()
                .delta(BalanceDelta::for_account(&current, SignedAmount::credit(mission.reward)))
                .entry(
                    NewEntry::credit(EntryKind::MissionReward, account, mission.reward, now)
                        .with_note(format!("Completed: {}", mission.title))
                        .with_reference(EntryRef::Mission {
                            mission_id: mission_id.clone(),
                        }),
                )
                .completion(MissionCompletion {
                    account_id: account,
                    mission_id: mission_id.clone(),
                    title: mission.title.clone(),
                    reward: mission.reward,
                    completed_at: now,
                });
            let receipt = self.store.commit(changes)?;
            single_entry(receipt.entries)
        })?;

        info!(account = %account, mission = %mission_id, reward = %mission.reward, "mission completed");
        Ok(entry)
    }
}
