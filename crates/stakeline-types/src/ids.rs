//! Identifiers used throughout Stakeline.
//!
//! Users are identified by their wallet public key (an opaque string).
//! Games use UUIDv7 for time-ordered sorting. Deposit transactions are
//! identified by their on-chain signature, unique per owner.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// UserId
// ---------------------------------------------------------------------------

/// Identity of a user: the base58 public key of their wallet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    #[must_use]
    pub fn new(public_key: impl Into<String>) -> Self {
        Self(public_key.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First few characters, for compact log lines.
    #[must_use]
    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(8)
            .map_or(self.0.len(), |(idx, _)| idx);
        &self.0[..end]
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// ---------------------------------------------------------------------------
// GameId
// ---------------------------------------------------------------------------

/// Unique identifier of a wager. Uses UUIDv7 for time-ordered sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct GameId(pub Uuid);

impl GameId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }
}

impl Default for GameId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "game:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// TxSignature
// ---------------------------------------------------------------------------

/// On-chain transaction signature backing a deposit or withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxSignature(String);

impl TxSignature {
    #[must_use]
    pub fn new(signature: impl Into<String>) -> Self {
        Self(signature.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TxSignature {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Key of a deposit ledger entry. Signatures are only unique per owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct TransactionKey {
    pub owner: UserId,
    pub signature: TxSignature,
}

impl TransactionKey {
    #[must_use]
    pub fn new(owner: UserId, signature: TxSignature) -> Self {
        Self { owner, signature }
    }
}

impl fmt::Display for TransactionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.signature, self.owner.short())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_ids_are_time_ordered() {
        let a = GameId::new();
        let b = GameId::new();
        assert!(a <= b);
        assert_ne!(a, b);
    }

    #[test]
    fn game_id_display_prefix() {
        let id = GameId::from_bytes([0u8; 16]);
        assert!(format!("{id}").starts_with("game:"));
    }

    #[test]
    fn user_id_short_truncates() {
        let user = UserId::new("9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin");
        assert_eq!(user.short(), "9xQeWvG8");
        assert_eq!(UserId::new("abc").short(), "abc");
    }

    #[test]
    fn user_id_serializes_as_plain_string() {
        let user = UserId::new("alice");
        assert_eq!(serde_json::to_string(&user).unwrap(), "\"alice\"");
    }

    #[test]
    fn transaction_key_equality_includes_owner() {
        let sig = TxSignature::new("5h3k");
        let a = TransactionKey::new(UserId::new("alice"), sig.clone());
        let b = TransactionKey::new(UserId::new("bob"), sig);
        assert_ne!(a, b);
    }
}
