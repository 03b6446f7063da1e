//! Streakdex Progress Engine
//!
//! Platform-agnostic core for habit tracking with XP and collectible rewards.
//! This crate owns streak, XP and unlock rules without UI, storage or network
//! dependencies; hosts plug those in through [`KeyValueStore`],
//! [`MetadataLookup`] and [`Clock`].

pub mod catalog;
pub mod clock;
pub mod constants;
pub mod engine;
pub mod habit;
pub mod metadata;
pub mod observer;
pub mod rewards;
pub mod state;
pub mod stats;
pub mod storage;

// Re-export commonly used types
pub use catalog::{CatalogError, Rarity, RewardCatalog};
pub use clock::{Clock, SystemClock, days_ago, format_day, is_previous_day, last_n_days, parse_day};
pub use engine::{CompletionOutcome, CompletionReceipt, ProgressEngine};
pub use habit::{Frequency, Habit, HabitPatch, HabitValidationError, NewHabit};
pub use metadata::{
    CachedLookup, ItemMetadata, MetadataLookup, OfflineLookup, StaticLookup, placeholder_name,
};
pub use observer::{PendingReward, StateChange, StateView, SubscriptionId};
pub use rewards::{RewardDecision, RewardItem, next_unlock_xp, resolve_reward};
pub use state::{AppState, Completion, EarnedReward, UserProgress};
pub use stats::{DayCount, ProgressStats};
pub use storage::{MemoryStore, MemoryStoreError, PersistenceError, PersistenceGateway};

/// Trait for abstracting key-value persistence.
/// Platform-specific implementations should provide this
pub trait KeyValueStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Read the value stored under `key`
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, Self::Error>;

    /// Store `value` under `key`, replacing any previous value
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), Self::Error>;

    /// Remove every stored key
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be cleared.
    fn clear(&self) -> Result<(), Self::Error>;
}
