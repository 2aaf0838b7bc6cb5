//! System-wide constants for the Stakeline ledger.

/// Default platform fee, in basis points (4%).
pub const DEFAULT_FEE_BPS: u32 = 400;

/// Maximum open games a single user may have at once.
pub const DEFAULT_MAX_ACTIVE_GAMES: usize = 5;

/// Default deposit reconciliation cadence in milliseconds.
pub const DEFAULT_RECONCILE_INTERVAL_MS: u64 = 5_000;

/// How many confirmed deposit signatures the reconciler remembers in-process.
pub const DEFAULT_CONFIRMED_CACHE_SIZE: usize = 100_000;

/// Capacity of the notification broadcast channel.
pub const DEFAULT_NOTIFICATION_BUFFER: usize = 1_024;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "Stakeline";
