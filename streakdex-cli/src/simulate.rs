//! Seeded multi-day runs of the progress engine against an in-memory store.
use chrono::NaiveDate;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::Serialize;

use streakdex_core::{
    Clock, MemoryStore, NewHabit, ProgressEngine, Rarity, RewardCatalog, SystemClock,
};

/// Inputs for a simulated run.
#[derive(Debug, Clone, Copy)]
pub struct SimulationPlan {
    pub days: u32,
    pub habits: u32,
    pub goal: u32,
    /// Probability that a habit is skipped entirely on a given day.
    pub miss_rate: f64,
    pub seed: u64,
    pub start: NaiveDate,
}

impl SimulationPlan {
    #[must_use]
    pub const fn new(start: NaiveDate, seed: u64) -> Self {
        Self {
            days: 30,
            habits: 1,
            goal: 1,
            miss_rate: 0.0,
            seed,
            start,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockEvent {
    pub day: NaiveDate,
    pub xp: u32,
    pub id: u32,
    pub rarity: Rarity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitSummary {
    pub title: String,
    pub completed_days: u32,
    pub missed_days: u32,
    pub final_streak: u32,
    pub longest_streak: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationReport {
    pub seed: u64,
    pub days: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub miss_rate: f64,
    pub total_xp: u32,
    pub completions: u32,
    pub habits: Vec<HabitSummary>,
    pub unlocks: Vec<UnlockEvent>,
}

/// Walk `plan.days` days forward from `plan.start`, completing each habit up
/// to its goal unless the RNG marks the day as missed.
#[must_use]
pub fn run_simulation(plan: &SimulationPlan, catalog: RewardCatalog) -> SimulationReport {
    let clock = SystemClock::pinned(plan.start);
    let mut engine =
        ProgressEngine::new(MemoryStore::new(), clock.clone()).with_catalog(catalog);
    engine.load_state();
    let mut rng = ChaCha20Rng::seed_from_u64(plan.seed);

    let ids: Vec<String> = (1..=plan.habits)
        .map(|n| engine.add_habit(NewHabit::new(format!("Habit {n}")).with_goal(plan.goal.max(1))))
        .collect();
    let mut summaries: Vec<HabitSummary> = ids
        .iter()
        .filter_map(|id| engine.habit(id))
        .map(|habit| HabitSummary {
            title: habit.title.clone(),
            completed_days: 0,
            missed_days: 0,
            final_streak: 0,
            longest_streak: 0,
        })
        .collect();

    let mut unlocks = Vec::new();
    let mut completions = 0;
    for _ in 0..plan.days {
        let today = clock.today();
        for (id, summary) in ids.iter().zip(summaries.iter_mut()) {
            if rng.gen_bool(plan.miss_rate) {
                summary.missed_days += 1;
                summary.final_streak = 0;
                continue;
            }
            for _ in 0..plan.goal.max(1) {
                let outcome = engine.complete_habit(id);
                let Some(receipt) = outcome.receipt() else {
                    break;
                };
                completions += 1;
                if let Some(item) = receipt.reward {
                    unlocks.push(UnlockEvent {
                        day: today,
                        xp: receipt.xp,
                        id: item.id,
                        rarity: item.rarity,
                    });
                    engine.dismiss_pending_reward();
                }
            }
            summary.completed_days += 1;
            summary.final_streak = engine.streak_for(id);
            summary.longest_streak = summary.longest_streak.max(summary.final_streak);
        }
        clock.advance_days(1);
    }

    log::debug!(
        "simulated {} days for {} habits: {} unlocks",
        plan.days,
        plan.habits,
        unlocks.len()
    );

    SimulationReport {
        seed: plan.seed,
        days: plan.days,
        start: plan.start,
        end: streakdex_core::days_ago(&clock, 1).max(plan.start),
        miss_rate: plan.miss_rate,
        total_xp: engine.progress().xp,
        completions,
        habits: summaries,
        unlocks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn perfect_month_follows_default_schedule() {
        let plan = SimulationPlan {
            days: 30,
            ..SimulationPlan::new(start(), 7)
        };
        let report = run_simulation(&plan, RewardCatalog::default());

        assert_eq!(report.total_xp, 300);
        assert_eq!(report.completions, 30);
        let ids: Vec<u32> = report.unlocks.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![1, 4, 37, 7, 10, 144]);
        assert_eq!(report.unlocks[2].day, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        assert_eq!(report.habits[0].longest_streak, 30);
        assert_eq!(report.end, NaiveDate::from_ymd_opt(2024, 3, 30).unwrap());
    }

    #[test]
    fn same_seed_gives_same_report() {
        let plan = SimulationPlan {
            days: 60,
            habits: 3,
            goal: 2,
            miss_rate: 0.3,
            ..SimulationPlan::new(start(), 99)
        };
        let first = run_simulation(&plan, RewardCatalog::default());
        let second = run_simulation(&plan, RewardCatalog::default());
        assert_eq!(first, second);

        let missed: u32 = first.habits.iter().map(|h| h.missed_days).sum();
        assert!(missed > 0);
        assert_eq!(first.completions, first.total_xp / 10);
        for habit in &first.habits {
            assert_eq!(habit.completed_days + habit.missed_days, 60);
            assert!(habit.longest_streak <= habit.completed_days);
        }
    }

    #[test]
    fn always_missing_earns_nothing() {
        let plan = SimulationPlan {
            days: 10,
            habits: 2,
            miss_rate: 1.0,
            ..SimulationPlan::new(start(), 1)
        };
        let report = run_simulation(&plan, RewardCatalog::default());
        assert_eq!(report.total_xp, 0);
        assert!(report.unlocks.is_empty());
        assert!(report.habits.iter().all(|h| h.longest_streak == 0));
    }
}
