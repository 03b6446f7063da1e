use chrono::NaiveDate;
use std::collections::HashSet;
use streakdex_core::{
    CompletionOutcome, MemoryStore, NewHabit, ProgressEngine, Rarity, RewardCatalog, SystemClock,
};

fn start_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn fresh_engine(catalog: RewardCatalog) -> (ProgressEngine<MemoryStore>, SystemClock, String) {
    let clock = SystemClock::pinned(start_day());
    let mut engine = ProgressEngine::new(MemoryStore::new(), clock.clone()).with_catalog(catalog);
    engine.load_state();
    let habit = engine.add_habit(NewHabit::new("Daily walk"));
    (engine, clock, habit)
}

/// Complete the habit once per day for `days` days, returning (xp, reward id) for each grant.
fn run_days(
    engine: &mut ProgressEngine<MemoryStore>,
    clock: &SystemClock,
    habit: &str,
    days: u32,
) -> Vec<(u32, u32)> {
    let mut grants = Vec::new();
    for _ in 0..days {
        if let CompletionOutcome::Recorded(receipt) = engine.complete_habit(habit) {
            if let Some(item) = receipt.reward {
                grants.push((receipt.xp, item.id));
            }
        }
        let progress = engine.progress();
        assert!(progress.last_reward_checkpoint_xp <= progress.xp);
        clock.advance_days(1);
    }
    grants
}

#[test]
fn default_catalog_unlock_points() {
    let (mut engine, clock, habit) = fresh_engine(RewardCatalog::default());
    let grants = run_days(&mut engine, &clock, &habit, 30);

    assert_eq!(
        grants,
        vec![(50, 1), (100, 4), (150, 37), (200, 7), (250, 10), (300, 144)]
    );
    let rarities: Vec<Rarity> = engine
        .progress()
        .earned_rewards
        .iter()
        .map(|reward| reward.rarity)
        .collect();
    assert_eq!(
        rarities,
        vec![
            Rarity::Common,
            Rarity::Common,
            Rarity::Rare,
            Rarity::Common,
            Rarity::Common,
            Rarity::Legendary,
        ]
    );
    assert_eq!(engine.streak_for(&habit), 30);
}

#[test]
fn long_runs_never_repeat_rewards_and_xp_only_grows() {
    let (mut engine, clock, habit) = fresh_engine(RewardCatalog::default());
    let mut last_xp = 0;
    for _ in 0..200 {
        engine.complete_habit(&habit);
        assert!(engine.progress().xp >= last_xp);
        last_xp = engine.progress().xp;
        clock.advance_days(1);
    }

    let earned = &engine.progress().earned_rewards;
    let unique: HashSet<u32> = earned.iter().map(|reward| reward.id).collect();
    assert_eq!(unique.len(), earned.len());
    // 1 rare + 1 legendary + every common once the milestones outnumber them.
    assert_eq!(earned.len(), 2 + RewardCatalog::default().commons.len());
    assert_eq!(last_xp, 2_000);
}

#[test]
fn exhausted_tier_leaves_watermark_until_next_grant() {
    let catalog = RewardCatalog {
        commons: vec![1],
        rares: vec![2],
        legendaries: vec![3],
        ..RewardCatalog::default()
    };
    let (mut engine, clock, habit) = fresh_engine(catalog);

    let grants = run_days(&mut engine, &clock, &habit, 10);
    assert_eq!(grants, vec![(50, 1)]);
    assert_eq!(engine.progress().xp, 100);
    assert_eq!(engine.progress().last_reward_checkpoint_xp, 50);

    let grants = run_days(&mut engine, &clock, &habit, 25);
    assert_eq!(grants, vec![(150, 2), (300, 3)]);
    assert_eq!(engine.progress().last_reward_checkpoint_xp, 300);
    assert!(engine.pending_reward().visible);
}

#[test]
fn same_day_repeats_do_not_earn_past_goal() {
    let (mut engine, _clock, habit) = fresh_engine(RewardCatalog::default());
    for _ in 0..10 {
        engine.complete_habit(&habit);
    }
    assert_eq!(engine.progress().xp, 10);
    assert_eq!(engine.completions().len(), 1);
    assert_eq!(engine.completions()[0].count, 1);
}

#[test]
fn completed_catalog_reports_no_next_unlock() {
    let (mut engine, clock, habit) = fresh_engine(RewardCatalog::default());
    assert_eq!(engine.stats().next_unlock_xp, Some(50));
    for _ in 0..300 {
        engine.complete_habit(&habit);
        clock.advance_days(1);
    }

    let stats = engine.stats();
    assert_eq!(stats.total_xp, 3_000);
    assert_eq!(stats.earned_total, 17);
    assert_eq!(stats.next_unlock_xp, None);

    for _ in 0..5 {
        engine.complete_habit(&habit);
        clock.advance_days(1);
    }
    assert_eq!(engine.stats().earned_total, 17);
}
