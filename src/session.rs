// 9.0: explicit caller context. the auth provider hands us a user id; login turns
// it into a Session that every user-facing operation takes as its first argument.

use crate::types::{AccountId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user: UserId,
    pub account_id: AccountId,
    pub started_at: Timestamp,
}

impl Session {
    pub fn new(user: UserId, account_id: AccountId, started_at: Timestamp) -> Self {
        Self {
            user,
            account_id,
            started_at,
        }
    }
}
