//! Command handlers: validate input, drive the engine, hand results to reports.
use anyhow::{Context, Result, bail};

use streakdex_core::{
    Clock, CompletionOutcome, HabitPatch, MetadataLookup, NewHabit, ProgressEngine, Rarity,
    SystemClock,
};

use crate::file_store::JsonFileStore;
use crate::reports::{
    self, CompletionReport, CompletionStatus, HabitDetail, HabitRow, ReportFormat, RewardDetail,
};

pub type Engine = ProgressEngine<JsonFileStore, SystemClock>;

const HISTORY_DAYS: u32 = 14;

/// Resolve a full id or an unambiguous id prefix to a habit id.
pub fn resolve_habit_id(engine: &Engine, needle: &str) -> Result<String> {
    if engine.habit(needle).is_some() {
        return Ok(needle.to_string());
    }
    let matches: Vec<&str> = engine
        .habits()
        .iter()
        .filter(|habit| habit.id.starts_with(needle))
        .map(|habit| habit.id.as_str())
        .collect();
    match matches.as_slice() {
        [only] => Ok((*only).to_string()),
        [] => bail!("no habit matches id {needle:?}"),
        _ => bail!(
            "id prefix {needle:?} is ambiguous ({} habits match)",
            matches.len()
        ),
    }
}

fn habit_row(engine: &Engine, id: &str) -> Option<HabitRow> {
    let habit = engine.habit(id)?;
    Some(HabitRow {
        id: habit.id.clone(),
        title: habit.title.clone(),
        description: habit.description.clone(),
        frequency: habit.frequency,
        goal_per_period: habit.goal_per_period,
        done_today: engine.completed_today(id),
        streak: engine.streak_for(id),
        archived: habit.archived,
    })
}

pub fn add(engine: &mut Engine, format: ReportFormat, data: NewHabit) -> Result<()> {
    let data = data.validated().context("invalid habit")?;
    let id = engine.add_habit(data);
    reports::print_message(format, "added", &id)
}

pub fn edit(engine: &mut Engine, format: ReportFormat, needle: &str, patch: HabitPatch) -> Result<()> {
    let patch = patch.validated().context("invalid habit update")?;
    if patch.is_empty() {
        bail!("nothing to change; pass at least one field to edit");
    }
    let id = resolve_habit_id(engine, needle)?;
    if !engine.update_habit(&id, patch) {
        bail!("habit {id} disappeared before it could be updated");
    }
    reports::print_message(format, "updated", &id)
}

pub fn archive(engine: &mut Engine, format: ReportFormat, needle: &str) -> Result<()> {
    let id = resolve_habit_id(engine, needle)?;
    engine.archive_habit(&id);
    reports::print_message(format, "archived", &id)
}

pub async fn complete(
    engine: &mut Engine,
    format: ReportFormat,
    needle: &str,
    lookup: &dyn MetadataLookup,
) -> Result<()> {
    let id = resolve_habit_id(engine, needle)?;
    let outcome = engine.complete_habit_with_lookup(&id, lookup).await;

    let status = match outcome {
        CompletionOutcome::Recorded(_) => CompletionStatus::Recorded,
        CompletionOutcome::GoalAlreadyMet => CompletionStatus::GoalAlreadyMet,
        CompletionOutcome::UnknownHabit => CompletionStatus::UnknownHabit,
    };
    let reward = outcome.reward().and_then(|item| {
        engine
            .progress()
            .earned_rewards
            .iter()
            .find(|earned| earned.id == item.id)
            .cloned()
    });
    let habit = engine.habit(&id);
    let report = CompletionReport {
        habit_id: id.clone(),
        title: habit.map(|h| h.title.clone()).unwrap_or_default(),
        status,
        day: engine.clock().today(),
        count: engine.completed_today(&id),
        goal_per_period: habit.map_or(1, |h| h.goal_per_period),
        streak: engine.streak_for(&id),
        xp: engine.progress().xp,
        reward,
    };
    reports::print_completion(format, &report)?;
    // The reward has been shown, so the pending signal is done.
    engine.dismiss_pending_reward();
    Ok(())
}

pub fn list(engine: &Engine, format: ReportFormat, include_archived: bool) -> Result<()> {
    let rows: Vec<HabitRow> = engine
        .habits()
        .iter()
        .filter(|habit| include_archived || habit.is_active())
        .filter_map(|habit| habit_row(engine, &habit.id))
        .collect();
    reports::print_habits(format, &rows)
}

pub fn show(engine: &Engine, format: ReportFormat, needle: &str) -> Result<()> {
    let id = resolve_habit_id(engine, needle)?;
    let row = habit_row(engine, &id).with_context(|| format!("habit {id} not found"))?;
    let created_on = engine
        .habit(&id)
        .map_or_else(|| engine.clock().today(), |habit| habit.created_at.date_naive());
    let detail = HabitDetail {
        row,
        created_on,
        history: engine.habit_history(&id, HISTORY_DAYS),
    };
    reports::print_habit_detail(format, &detail)
}

pub fn stats(engine: &Engine, format: ReportFormat) -> Result<()> {
    reports::print_stats(format, &engine.stats())
}

pub fn rewards(engine: &Engine, format: ReportFormat, rarity: Option<Rarity>) -> Result<()> {
    reports::print_rewards(format, &engine.rewards_by_rarity(rarity))
}

/// Show one earned reward, filling in its name and artwork through `lookup`.
pub async fn reward(
    engine: &mut Engine,
    format: ReportFormat,
    reward_id: u32,
    lookup: &dyn MetadataLookup,
) -> Result<()> {
    if !engine.progress().has_earned(reward_id) {
        bail!("reward #{reward_id} has not been earned");
    }
    let metadata = engine.enrich_reward(reward_id, lookup).await;
    let earned = engine
        .progress()
        .earned_rewards
        .iter()
        .find(|earned| earned.id == reward_id)
        .with_context(|| format!("reward #{reward_id} not found"))?;
    let detail = RewardDetail {
        id: earned.id,
        name: earned.name.clone(),
        rarity: earned.rarity,
        earned_on: earned.earned_at.date_naive(),
        image_url: metadata.and_then(|metadata| metadata.image_url),
    };
    reports::print_reward_detail(format, &detail)
}

pub fn reset(engine: &mut Engine, format: ReportFormat, confirmed: bool) -> Result<()> {
    if !confirmed {
        bail!("reset deletes every habit, completion and reward; rerun with --yes to confirm");
    }
    engine.reset_all_data();
    reports::print_message(format, "reset", &engine.store().dir().display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use streakdex_core::{ItemMetadata, KeyValueStore, MemoryStore, OfflineLookup, StaticLookup};

    use crate::lookup::StoreCachedLookup;

    fn engine_in(dir: &std::path::Path) -> Engine {
        let clock = SystemClock::pinned(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        let mut engine = ProgressEngine::new(JsonFileStore::new(dir), clock);
        engine.load_state();
        engine
    }

    #[test]
    fn ids_resolve_by_unique_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine_in(dir.path());
        let first = engine.add_habit(NewHabit::new("Stretch"));
        let second = engine.add_habit(NewHabit::new("Journal"));

        assert_eq!(resolve_habit_id(&engine, &first).unwrap(), first);
        let prefix_len = (1..=first.len())
            .find(|&n| !second.starts_with(&first[..n]))
            .unwrap();
        assert_eq!(resolve_habit_id(&engine, &first[..prefix_len]).unwrap(), first);
        assert!(resolve_habit_id(&engine, "").is_err());
        assert!(resolve_habit_id(&engine, "no-such-habit").is_err());
    }

    #[test]
    fn invalid_input_is_rejected_before_the_engine() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine_in(dir.path());
        assert!(add(&mut engine, ReportFormat::Json, NewHabit::new("   ")).is_err());
        assert!(engine.habits().is_empty());

        let id = engine.add_habit(NewHabit::new("Run"));
        let patch = HabitPatch {
            goal_per_period: Some(0),
            ..HabitPatch::default()
        };
        assert!(edit(&mut engine, ReportFormat::Json, &id, patch).is_err());
        assert!(edit(&mut engine, ReportFormat::Json, &id, HabitPatch::default()).is_err());
        assert_eq!(engine.habit(&id).map(|h| h.goal_per_period), Some(1));
    }

    #[test]
    fn reset_requires_confirmation() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine_in(dir.path());
        engine.add_habit(NewHabit::new("Read"));
        assert!(reset(&mut engine, ReportFormat::Json, false).is_err());
        assert_eq!(engine.habits().len(), 1);
        reset(&mut engine, ReportFormat::Json, true).unwrap();
        assert!(engine.habits().is_empty());
    }

    #[tokio::test]
    async fn reward_command_names_offline_rewards_later() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine_in(dir.path());
        let id = engine.add_habit(NewHabit::new("Walk"));
        for _ in 0..5 {
            complete(&mut engine, ReportFormat::Json, &id, &OfflineLookup)
                .await
                .unwrap();
            engine.clock().advance_days(1);
        }
        assert_eq!(engine.progress().earned_rewards[0].name, "item #1");
        assert!(reward(&mut engine, ReportFormat::Json, 4, &OfflineLookup).await.is_err());

        let cache = MemoryStore::new();
        let lookup = StoreCachedLookup::new(StaticLookup::new([(1, "bulbasaur")]), cache.clone());
        reward(&mut engine, ReportFormat::Json, 1, &lookup).await.unwrap();
        assert_eq!(engine.progress().earned_rewards[0].name, "bulbasaur");
        assert_eq!(cache.len(), 1);

        let reopened = engine_in(dir.path());
        assert_eq!(reopened.progress().earned_rewards[0].name, "bulbasaur");
        let cached: ItemMetadata =
            serde_json::from_str(&cache.get("metadata:1").unwrap().unwrap()).unwrap();
        assert_eq!(cached.name, "bulbasaur");
    }
}
