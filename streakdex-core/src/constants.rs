//! Centralized reward tuning and persistence constants for Streakdex.
//!
//! These values are the default unlock schedule behind
//! `RewardCatalog::default()`. Hosts may load a different catalog from JSON.

// Logging keys -------------------------------------------------------------
pub(crate) const DEBUG_ENV_VAR: &str = "STREAKDEX_DEBUG_LOGS";

// Persistence --------------------------------------------------------------
/// Single key under which the whole application state blob is stored.
pub const STORAGE_KEY: &str = "streakdex:state";

// Reward schedule ----------------------------------------------------------
pub const XP_PER_COMPLETION: u32 = 10;
pub const COMMON_XP_THRESHOLD: u32 = 50;
pub const RARE_XP_THRESHOLD: u32 = 150;
pub const LEGENDARY_XP_THRESHOLD: u32 = 300;

/// Commons unlock first at 50 XP and again on every further 50 XP milestone.
pub const COMMON_REWARD_IDS: [u32; 15] = [1, 4, 7, 10, 13, 16, 19, 21, 25, 27, 29, 32, 43, 46, 48];
pub const RARE_REWARD_IDS: [u32; 7] = [37, 52, 58, 77, 92, 133, 147];
pub const LEGENDARY_REWARD_IDS: [u32; 4] = [144, 145, 146, 150];

// Views --------------------------------------------------------------------
/// Window used by the weekly completion count.
pub const WEEK_DAYS: u32 = 7;
