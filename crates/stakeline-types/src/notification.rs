//! Events published to connected clients after a change commits.
//!
//! Notifications are fire-and-forget: they are built inside an atomic unit but
//! only handed to the dispatcher once the unit has committed. Losing one never
//! affects balances or game state.

use serde::{Deserialize, Serialize};

use crate::{Game, UserId};

/// Who should receive a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Audience {
    /// A single user's room.
    User(UserId),
    /// Creator and opponent of a game.
    Players(Vec<UserId>),
    /// Every connected client (the open-games lobby).
    Everyone,
}

impl Audience {
    #[must_use]
    pub fn includes(&self, user: &UserId) -> bool {
        match self {
            Self::User(id) => id == user,
            Self::Players(ids) => ids.contains(user),
            Self::Everyone => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Notification {
    BalanceChanged {
        user: UserId,
        balance: u64,
        /// True only when the change came from a confirmed deposit/withdraw.
        is_deposit: bool,
    },
    GameCreated { game: Game },
    GameUpdated { game: Game },
}

impl Notification {
    #[must_use]
    pub fn audience(&self) -> Audience {
        match self {
            Self::BalanceChanged { user, .. } => Audience::User(user.clone()),
            Self::GameCreated { .. } => Audience::Everyone,
            Self::GameUpdated { game } => {
                let mut players = vec![game.creator.clone()];
                players.extend(game.opponent.clone());
                Audience::Players(players)
            }
        }
    }

    /// Short event name, for log lines.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BalanceChanged { .. } => "balance_changed",
            Self::GameCreated { .. } => "game_created",
            Self::GameUpdated { .. } => "game_updated",
        }
    }
}
