//! Persisted application state: habits, completions and user progress.
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::catalog::Rarity;
use crate::habit::Habit;

/// How many times a habit was completed on one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Completion {
    pub habit_id: String,
    pub date: NaiveDate,
    pub count: u32,
}

/// A collectible granted when XP crossed an unlock point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarnedReward {
    pub id: u32,
    pub name: String,
    pub rarity: Rarity,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub earned_at: DateTime<Utc>,
}

/// XP, streaks and the reward ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    #[serde(default)]
    pub xp: u32,
    #[serde(default)]
    pub streak_by_habit: BTreeMap<String, u32>,
    #[serde(default)]
    pub earned_rewards: Vec<EarnedReward>,
    /// XP at the last grant; a crossing at or below it never grants again.
    #[serde(default)]
    pub last_reward_checkpoint_xp: u32,
}

impl UserProgress {
    #[must_use]
    pub fn streak(&self, habit_id: &str) -> u32 {
        self.streak_by_habit.get(habit_id).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn has_earned(&self, reward_id: u32) -> bool {
        self.earned_rewards.iter().any(|reward| reward.id == reward_id)
    }

    #[must_use]
    pub fn earned_count(&self, rarity: Rarity) -> usize {
        self.earned_rewards
            .iter()
            .filter(|reward| reward.rarity == rarity)
            .count()
    }
}

/// The unit written to storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppState {
    #[serde(default)]
    pub habits: Vec<Habit>,
    #[serde(default)]
    pub completions: Vec<Completion>,
    #[serde(default)]
    pub progress: UserProgress,
}

impl AppState {
    #[must_use]
    pub fn habit(&self, habit_id: &str) -> Option<&Habit> {
        self.habits.iter().find(|habit| habit.id == habit_id)
    }

    pub fn habit_mut(&mut self, habit_id: &str) -> Option<&mut Habit> {
        self.habits.iter_mut().find(|habit| habit.id == habit_id)
    }

    #[must_use]
    pub fn completion(&self, habit_id: &str, day: NaiveDate) -> Option<&Completion> {
        self.completions
            .iter()
            .find(|entry| entry.habit_id == habit_id && entry.date == day)
    }

    pub fn completion_mut(&mut self, habit_id: &str, day: NaiveDate) -> Option<&mut Completion> {
        self.completions
            .iter_mut()
            .find(|entry| entry.habit_id == habit_id && entry.date == day)
    }

    /// Latest completion day for a habit strictly before `day`.
    #[must_use]
    pub fn last_completion_before(&self, habit_id: &str, day: NaiveDate) -> Option<NaiveDate> {
        self.completions
            .iter()
            .filter(|entry| entry.habit_id == habit_id && entry.date < day)
            .map(|entry| entry.date)
            .max()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.habits.is_empty() && self.completions.is_empty() && self.progress == UserProgress::default()
    }

    /// Repair invariant violations in a loaded blob, returning how many repairs were made.
    ///
    /// Duplicate (habit, day) completions merge keeping the highest count, repeated
    /// reward ids keep their first occurrence, and the reward watermark is clamped
    /// to the current XP.
    pub fn normalize(&mut self) -> usize {
        let mut repairs = 0;

        let mut slots: HashMap<(String, NaiveDate), usize> = HashMap::new();
        let mut merged: Vec<Completion> = Vec::with_capacity(self.completions.len());
        for entry in self.completions.drain(..) {
            let key = (entry.habit_id.clone(), entry.date);
            if let Some(&slot) = slots.get(&key) {
                log::warn!(
                    "merging duplicate completion for habit {} on {}",
                    entry.habit_id,
                    entry.date
                );
                merged[slot].count = merged[slot].count.max(entry.count);
                repairs += 1;
            } else {
                slots.insert(key, merged.len());
                merged.push(entry);
            }
        }
        self.completions = merged;

        let mut seen = HashSet::new();
        let before = self.progress.earned_rewards.len();
        self.progress
            .earned_rewards
            .retain(|reward| seen.insert(reward.id));
        let dropped = before - self.progress.earned_rewards.len();
        if dropped > 0 {
            log::warn!("dropped {dropped} repeated earned reward(s)");
            repairs += dropped;
        }

        if self.progress.last_reward_checkpoint_xp > self.progress.xp {
            log::warn!(
                "reward checkpoint {} exceeded xp {}; clamping",
                self.progress.last_reward_checkpoint_xp,
                self.progress.xp
            );
            self.progress.last_reward_checkpoint_xp = self.progress.xp;
            repairs += 1;
        }

        repairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, d).unwrap()
    }

    fn reward(id: u32) -> EarnedReward {
        EarnedReward {
            id,
            name: format!("item #{id}"),
            rarity: Rarity::Common,
            earned_at: DateTime::from_timestamp_millis(0).unwrap(),
        }
    }

    #[test]
    fn missing_sections_load_as_defaults() {
        let state: AppState = serde_json::from_str(r#"{"habits":[]}"#).unwrap();
        assert!(state.is_empty());

        let progress: UserProgress = serde_json::from_str(r#"{"xp":40}"#).unwrap();
        assert_eq!(progress.xp, 40);
        assert_eq!(progress.last_reward_checkpoint_xp, 0);
    }

    #[test]
    fn completion_dates_serialize_as_calendar_strings() {
        let entry = Completion {
            habit_id: "h".into(),
            date: day(9),
            count: 2,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["date"], "2024-04-09");
        assert_eq!(json["habitId"], "h");
    }

    #[test]
    fn last_completion_before_ignores_today_and_other_habits() {
        let mut state = AppState::default();
        for (habit, d) in [("a", 1), ("a", 3), ("b", 4), ("a", 5)] {
            state.completions.push(Completion {
                habit_id: habit.into(),
                date: day(d),
                count: 1,
            });
        }
        assert_eq!(state.last_completion_before("a", day(5)), Some(day(3)));
        assert_eq!(state.last_completion_before("a", day(1)), None);
        assert_eq!(state.last_completion_before("c", day(9)), None);
    }

    #[test]
    fn completion_mut_edits_only_the_matching_day() {
        let mut state = AppState::default();
        for d in [1, 2] {
            state.completions.push(Completion {
                habit_id: "a".into(),
                date: day(d),
                count: 1,
            });
        }
        if let Some(entry) = state.completion_mut("a", day(2)) {
            entry.count += 1;
        }
        assert_eq!(state.completion("a", day(2)).map(|c| c.count), Some(2));
        assert_eq!(state.completion("a", day(1)).map(|c| c.count), Some(1));
        assert!(state.completion_mut("b", day(2)).is_none());
    }

    #[test]
    fn normalize_repairs_broken_blob() {
        let mut state = AppState::default();
        state.completions = vec![
            Completion {
                habit_id: "a".into(),
                date: day(1),
                count: 1,
            },
            Completion {
                habit_id: "a".into(),
                date: day(1),
                count: 3,
            },
            Completion {
                habit_id: "a".into(),
                date: day(2),
                count: 1,
            },
        ];
        state.progress.xp = 60;
        state.progress.last_reward_checkpoint_xp = 90;
        state.progress.earned_rewards = vec![reward(1), reward(4), reward(1)];

        assert_eq!(state.normalize(), 3);
        assert_eq!(state.completions.len(), 2);
        assert_eq!(state.completion("a", day(1)).map(|c| c.count), Some(3));
        assert_eq!(state.progress.last_reward_checkpoint_xp, 60);
        let ids: Vec<u32> = state.progress.earned_rewards.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 4]);

        assert_eq!(state.normalize(), 0);
    }
}
