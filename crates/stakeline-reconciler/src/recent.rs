//! Transfers this process has already credited or debited.
//!
//! Lets a reconcile pass skip the chain lookup for a deposit or withdrawal it
//! confirmed recently. The stored status, re-read inside the confirmation
//! unit, stays the only authority: forgetting a transfer here costs one extra
//! chain call, never a second balance change.

use std::collections::{HashSet, VecDeque};

use stakeline_types::TransactionKey;

/// The last `capacity` confirmed transfers, keyed by `(owner, signature)`.
#[derive(Debug)]
pub struct RecentConfirmations {
    keys: HashSet<TransactionKey>,
    arrival: VecDeque<TransactionKey>,
    capacity: usize,
}

impl RecentConfirmations {
    /// Remembers at most `capacity` transfers; zero is treated as one.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            keys: HashSet::with_capacity(capacity),
            arrival: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Note that `key` was confirmed. Returns `false` if it was already known.
    ///
    /// The earliest-confirmed transfer is dropped once over capacity.
    pub fn remember(&mut self, key: TransactionKey) -> bool {
        if !self.keys.insert(key.clone()) {
            return false;
        }
        self.arrival.push_back(key);
        while self.arrival.len() > self.capacity {
            if let Some(expired) = self.arrival.pop_front() {
                self.keys.remove(&expired);
            }
        }
        true
    }

    #[must_use]
    pub fn contains(&self, key: &TransactionKey) -> bool {
        self.keys.contains(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.arrival.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.arrival.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use stakeline_types::{TxSignature, UserId};

    use super::*;

    fn transfer(owner: &str, sig: &str) -> TransactionKey {
        TransactionKey::new(UserId::new(owner), TxSignature::new(sig))
    }

    #[test]
    fn repeated_confirmation_is_reported() {
        let mut recent = RecentConfirmations::with_capacity(10);
        assert!(recent.remember(transfer("alice", "dep1")));
        assert!(recent.contains(&transfer("alice", "dep1")));
        assert!(!recent.remember(transfer("alice", "dep1")));
        assert_eq!(recent.len(), 1);
    }

    #[test]
    fn signature_is_scoped_to_owner() {
        let mut recent = RecentConfirmations::with_capacity(10);
        assert!(recent.remember(transfer("alice", "dep1")));
        assert!(recent.remember(transfer("bob", "dep1")));
        assert!(!recent.contains(&transfer("carol", "dep1")));
        assert_eq!(recent.len(), 2);
    }

    #[test]
    fn earliest_transfer_expires_first() {
        let mut recent = RecentConfirmations::with_capacity(2);
        for sig in ["dep1", "wd1", "dep2"] {
            assert!(recent.remember(transfer("alice", sig)));
        }

        assert_eq!(recent.len(), 2);
        assert!(!recent.contains(&transfer("alice", "dep1")));
        assert!(recent.contains(&transfer("alice", "wd1")));
        assert!(recent.contains(&transfer("alice", "dep2")));

        // Expired transfers can be remembered again.
        assert!(recent.remember(transfer("alice", "dep1")));
        assert!(!recent.contains(&transfer("alice", "wd1")));
    }

    #[test]
    fn zero_capacity_keeps_latest() {
        let mut recent = RecentConfirmations::with_capacity(0);
        assert!(recent.is_empty());
        recent.remember(transfer("alice", "dep1"));
        recent.remember(transfer("alice", "dep2"));
        assert_eq!(recent.len(), 1);
        assert!(recent.contains(&transfer("alice", "dep2")));
    }
}
