//! Notification dispatch.
//!
//! The ledger never waits on delivery. A [`Notifier`] receives events only
//! after the unit that produced them has committed; if nobody is listening
//! the event is dropped.

use stakeline_types::{Game, Notification, UserId};
use tokio::sync::broadcast;

/// Fire-and-forget publish interface used after commit.
pub trait Notifier: Send + Sync {
    fn publish(&self, event: Notification);

    fn notify_balance_changed(&self, user: &UserId, balance: u64, is_deposit: bool) {
        self.publish(Notification::BalanceChanged {
            user: user.clone(),
            balance,
            is_deposit,
        });
    }

    fn notify_game_created(&self, game: &Game) {
        self.publish(Notification::GameCreated { game: game.clone() });
    }

    fn notify_game_updated(&self, game: &Game) {
        self.publish(Notification::GameUpdated { game: game.clone() });
    }
}

/// Fans events out over a `tokio` broadcast channel.
///
/// A transport layer subscribes and routes each event to the rooms named by
/// [`Notification::audience`]. Slow subscribers lag and lose the oldest
/// events; they never slow down settlement.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<Notification>,
}

impl BroadcastNotifier {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Notifier for BroadcastNotifier {
    fn publish(&self, event: Notification) {
        let kind = event.kind();
        if self.tx.send(event).is_err() {
            tracing::debug!(event = kind, "Notification dropped: no subscribers");
        }
    }
}

/// Keeps every published event in memory. **Tests only.**
#[cfg(any(test, feature = "test-helpers"))]
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: std::sync::Mutex<Vec<Notification>>,
}

#[cfg(any(test, feature = "test-helpers"))]
impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything published so far, in order.
    pub fn events(&self) -> Vec<Notification> {
        self.lock().clone()
    }

    /// Drain the recorded events.
    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.lock())
    }

    /// `(balance, is_deposit)` of every balance event for `user`.
    pub fn balance_events_for(&self, user: &UserId) -> Vec<(u64, bool)> {
        self.lock()
            .iter()
            .filter_map(|event| match event {
                Notification::BalanceChanged {
                    user: u,
                    balance,
                    is_deposit,
                } if u == user => Some((*balance, *is_deposit)),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Notification>> {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl Notifier for RecordingNotifier {
    fn publish(&self, event: Notification) {
        self.lock().push(event);
    }
}
