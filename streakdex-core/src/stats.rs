//! Read-only progress summaries shared by every host.
use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Reverse;

use crate::catalog::{Rarity, RewardCatalog};
use crate::clock::{Clock, days_ago, last_n_days};
use crate::constants::WEEK_DAYS;
use crate::habit::Habit;
use crate::rewards::next_unlock_xp;
use crate::state::{AppState, EarnedReward, UserProgress};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressStats {
    pub total_xp: u32,
    /// Completion records dated within the last seven days, today included.
    pub weekly_completions: usize,
    pub earned_total: usize,
    pub common: usize,
    pub rare: usize,
    pub legendary: usize,
    pub next_unlock_xp: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayCount {
    pub day: NaiveDate,
    pub count: u32,
}

#[must_use]
pub fn progress_stats<C: Clock + ?Sized>(
    state: &AppState,
    clock: &C,
    catalog: &RewardCatalog,
) -> ProgressStats {
    let today = clock.today();
    let window_start = days_ago(clock, WEEK_DAYS.saturating_sub(1));
    let weekly_completions = state
        .completions
        .iter()
        .filter(|entry| entry.date >= window_start && entry.date <= today)
        .count();
    let progress = &state.progress;
    ProgressStats {
        total_xp: progress.xp,
        weekly_completions,
        earned_total: progress.earned_rewards.len(),
        common: progress.earned_count(Rarity::Common),
        rare: progress.earned_count(Rarity::Rare),
        legendary: progress.earned_count(Rarity::Legendary),
        next_unlock_xp: next_unlock_xp(catalog, progress.xp, &progress.earned_rewards),
    }
}

/// Active habits, longest current streak first; ties keep creation order.
#[must_use]
pub fn habits_by_streak(state: &AppState) -> Vec<&Habit> {
    let mut habits: Vec<&Habit> = state.habits.iter().filter(|h| h.is_active()).collect();
    habits.sort_by_key(|habit| Reverse(state.progress.streak(&habit.id)));
    habits
}

/// Per-day completion counts for the last `days` days, oldest first.
#[must_use]
pub fn habit_history<C: Clock + ?Sized>(
    state: &AppState,
    clock: &C,
    habit_id: &str,
    days: u32,
) -> Vec<DayCount> {
    last_n_days(clock, days)
        .into_iter()
        .map(|day| DayCount {
            day,
            count: state.completion(habit_id, day).map_or(0, |entry| entry.count),
        })
        .collect()
}

/// Earned rewards in earn order, optionally limited to one rarity.
#[must_use]
pub fn rewards_by_rarity(progress: &UserProgress, filter: Option<Rarity>) -> Vec<&EarnedReward> {
    progress
        .earned_rewards
        .iter()
        .filter(|reward| filter.is_none_or(|rarity| reward.rarity == rarity))
        .collect()
}
