//! The progress engine: sole owner of [`AppState`].
//!
//! Every mutation takes `&mut self`, persists the whole state through the
//! gateway and then notifies subscribers. Persistence failures are logged and
//! swallowed; the in-memory state stays authoritative for the session.
use chrono::NaiveDate;
use uuid::Uuid;

use crate::KeyValueStore;
use crate::catalog::{Rarity, RewardCatalog};
use crate::clock::{Clock, SystemClock, is_previous_day};
use crate::constants::DEBUG_ENV_VAR;
use crate::habit::{Habit, HabitPatch, NewHabit};
use crate::metadata::{ItemMetadata, MetadataLookup, placeholder_name};
use crate::observer::{PendingReward, StateChange, StateView, SubscriptionId, Subscribers};
use crate::rewards::{RewardItem, resolve_reward};
use crate::state::{AppState, Completion, EarnedReward, UserProgress};
use crate::stats::{self, DayCount, ProgressStats};
use crate::storage::PersistenceGateway;

#[cfg(debug_assertions)]
fn debug_log_enabled() -> bool {
    matches!(std::env::var(DEBUG_ENV_VAR), Ok(val) if val != "0")
}

#[cfg(not(debug_assertions))]
const fn debug_log_enabled() -> bool {
    false
}

/// Summary of a completion that changed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionReceipt {
    pub day: NaiveDate,
    /// Completions recorded for the habit today, including this one.
    pub count: u32,
    pub streak: u32,
    pub xp: u32,
    pub reward: Option<RewardItem>,
}

/// Result of [`ProgressEngine::complete_habit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// No habit with that id; nothing changed.
    UnknownHabit,
    /// Today's goal was already met; nothing changed.
    GoalAlreadyMet,
    Recorded(CompletionReceipt),
}

impl CompletionOutcome {
    #[must_use]
    pub const fn receipt(&self) -> Option<&CompletionReceipt> {
        match self {
            Self::Recorded(receipt) => Some(receipt),
            Self::UnknownHabit | Self::GoalAlreadyMet => None,
        }
    }

    #[must_use]
    pub const fn reward(&self) -> Option<RewardItem> {
        match self {
            Self::Recorded(receipt) => receipt.reward,
            Self::UnknownHabit | Self::GoalAlreadyMet => None,
        }
    }
}

/// Stateful core owning habits, completions, streaks, XP and earned rewards.
#[derive(Debug)]
pub struct ProgressEngine<K, C = SystemClock> {
    state: AppState,
    is_loaded: bool,
    pending_reward: PendingReward,
    gateway: PersistenceGateway<K>,
    clock: C,
    catalog: RewardCatalog,
    subscribers: Subscribers,
}

impl<K, C> ProgressEngine<K, C>
where
    K: KeyValueStore,
    C: Clock,
{
    /// Create an engine with empty, not yet loaded state and the default catalog.
    pub fn new(store: K, clock: C) -> Self {
        Self {
            state: AppState::default(),
            is_loaded: false,
            pending_reward: PendingReward::default(),
            gateway: PersistenceGateway::new(store),
            clock,
            catalog: RewardCatalog::default(),
            subscribers: Subscribers::default(),
        }
    }

    /// Replace the reward catalog.
    #[must_use]
    pub fn with_catalog(mut self, catalog: RewardCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    // Persistence ----------------------------------------------------------

    /// Read the persisted blob, repair it, and mark the engine loaded.
    ///
    /// A missing blob starts fresh; a failed read or undecodable blob is logged
    /// and also starts fresh.
    pub fn load_state(&mut self) {
        match self.gateway.load() {
            Ok(Some(mut state)) => {
                let repairs = state.normalize();
                if repairs > 0 {
                    log::warn!("repaired {repairs} inconsistencies in saved state");
                }
                log::info!(
                    "loaded {} habit(s), {} xp, {} reward(s)",
                    state.habits.len(),
                    state.progress.xp,
                    state.progress.earned_rewards.len()
                );
                self.state = state;
            }
            Ok(None) => log::debug!("no saved state; starting fresh"),
            Err(err) => log::error!("Failed to load state: {err}"),
        }
        self.is_loaded = true;
        self.emit(StateChange::Loaded);
    }

    /// Persist the full state now. Returns whether the write succeeded.
    pub fn save_state(&self) -> bool {
        match self.gateway.save(&self.state) {
            Ok(()) => true,
            Err(err) => {
                log::error!("Failed to save state: {err}");
                false
            }
        }
    }

    /// Clear storage and return to empty habits, completions and zeroed progress.
    ///
    /// The in-memory reset happens even if clearing storage fails.
    pub fn reset_all_data(&mut self) {
        if let Err(err) = self.gateway.clear() {
            log::error!("Failed to reset data: {err}");
        }
        self.state = AppState::default();
        self.pending_reward.dismiss();
        log::info!("all habit and progress data reset");
        self.emit(StateChange::Reset);
    }

    // Habits ---------------------------------------------------------------

    /// Append a new habit and return its generated id.
    ///
    /// Input is expected to be validated by the caller (see [`NewHabit::validated`]).
    pub fn add_habit(&mut self, data: NewHabit) -> String {
        let mut id = Uuid::new_v4().to_string();
        while self.state.habit(&id).is_some() {
            id = Uuid::new_v4().to_string();
        }
        let habit = Habit::from_new(id.clone(), data, self.clock.now());
        log::debug!("adding habit {id} ({})", habit.title);
        self.state.habits.push(habit);
        self.commit(StateChange::HabitsChanged);
        id
    }

    /// Merge `patch` into the habit with `id`. Unknown ids are ignored (`false`).
    pub fn update_habit(&mut self, id: &str, patch: HabitPatch) -> bool {
        let Some(habit) = self.state.habit_mut(id) else {
            log::debug!("update ignored: unknown habit {id}");
            return false;
        };
        habit.apply(patch);
        self.commit(StateChange::HabitsChanged);
        true
    }

    /// Hide a habit from active lists while keeping its history.
    pub fn archive_habit(&mut self, id: &str) -> bool {
        self.update_habit(id, HabitPatch::archive())
    }

    // Completions ----------------------------------------------------------

    /// Record one completion of `habit_id` for today.
    ///
    /// Updates the streak on the first completion of the day, awards XP while
    /// today's goal is unmet, and grants at most one reward. A granted reward
    /// carries a placeholder name until [`Self::apply_reward_name`] patches it.
    pub fn complete_habit(&mut self, habit_id: &str) -> CompletionOutcome {
        let Some(goal) = self.state.habit(habit_id).map(|habit| habit.goal_per_period) else {
            log::debug!("completion ignored: unknown habit {habit_id}");
            return CompletionOutcome::UnknownHabit;
        };
        let today = self.clock.today();

        let current_streak = self.state.progress.streak(habit_id);
        let (count, streak) = if let Some(entry) = self.state.completion_mut(habit_id, today) {
            if entry.count >= goal {
                log::debug!("goal already met for {habit_id} on {today}");
                return CompletionOutcome::GoalAlreadyMet;
            }
            entry.count += 1;
            (entry.count, current_streak)
        } else {
            let streak = match self.state.last_completion_before(habit_id, today) {
                Some(prior) if is_previous_day(prior, today) => current_streak.saturating_add(1),
                _ => 1,
            };
            self.state
                .progress
                .streak_by_habit
                .insert(habit_id.to_string(), streak);
            self.state.completions.push(Completion {
                habit_id: habit_id.to_string(),
                date: today,
                count: 1,
            });
            (1, streak)
        };

        let progress = &mut self.state.progress;
        progress.xp = progress.xp.saturating_add(self.catalog.xp_per_completion);
        let xp = progress.xp;

        let reward = resolve_reward(
            &self.catalog,
            xp,
            progress.last_reward_checkpoint_xp,
            &progress.earned_rewards,
        )
        .item();

        let change = if let Some(item) = reward {
            let earned = EarnedReward {
                id: item.id,
                name: placeholder_name(item.id),
                rarity: item.rarity,
                earned_at: self.clock.now(),
            };
            progress.earned_rewards.push(earned.clone());
            progress.last_reward_checkpoint_xp = xp;
            self.pending_reward.show(earned);
            log::info!("granted {} reward {} at {xp} xp", item.rarity, item.id);
            StateChange::RewardGranted { id: item.id }
        } else {
            if debug_log_enabled() {
                log::debug!(
                    "no reward at {xp} xp (checkpoint {})",
                    progress.last_reward_checkpoint_xp
                );
            }
            StateChange::CompletionRecorded
        };

        self.commit(change);
        CompletionOutcome::Recorded(CompletionReceipt {
            day: today,
            count,
            streak,
            xp,
            reward,
        })
    }

    /// Second-phase commit: set the display name of an earned reward.
    pub fn apply_reward_name(&mut self, reward_id: u32, name: &str) -> bool {
        let Some(reward) = self
            .state
            .progress
            .earned_rewards
            .iter_mut()
            .find(|reward| reward.id == reward_id)
        else {
            log::debug!("name patch ignored: reward {reward_id} not earned");
            return false;
        };
        reward.name = name.to_string();
        if let Some(item) = self.pending_reward.item.as_mut() {
            if item.id == reward_id {
                item.name = name.to_string();
            }
        }
        self.commit(StateChange::RewardNamed { id: reward_id });
        true
    }

    /// Resolve a reward's metadata through `lookup` and patch its display
    /// name when it differs. Works for any earned reward, so names left as
    /// placeholders by an earlier failed lookup can be filled in later.
    ///
    /// Returns the metadata, or `None` when the lookup has no answer and the
    /// current name is kept.
    pub async fn enrich_reward<M>(&mut self, reward_id: u32, lookup: &M) -> Option<ItemMetadata>
    where
        M: MetadataLookup + ?Sized,
    {
        let Some(metadata) = lookup.lookup(reward_id).await else {
            log::warn!("metadata unavailable for item {reward_id}; keeping current name");
            return None;
        };
        let stale = self
            .state
            .progress
            .earned_rewards
            .iter()
            .any(|reward| reward.id == reward_id && reward.name != metadata.name);
        if stale {
            self.apply_reward_name(reward_id, &metadata.name);
        }
        Some(metadata)
    }

    /// [`Self::complete_habit`] followed by reward enrichment.
    pub async fn complete_habit_with_lookup<M>(
        &mut self,
        habit_id: &str,
        lookup: &M,
    ) -> CompletionOutcome
    where
        M: MetadataLookup + ?Sized,
    {
        let outcome = self.complete_habit(habit_id);
        if let Some(item) = outcome.reward() {
            self.enrich_reward(item.id, lookup).await;
        }
        outcome
    }

    /// Clear the pending reward signal.
    pub fn dismiss_pending_reward(&mut self) {
        if self.pending_reward.visible || self.pending_reward.item.is_some() {
            self.pending_reward.dismiss();
            self.emit(StateChange::PendingRewardDismissed);
        }
    }

    // Observation ----------------------------------------------------------

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(StateChange, &StateView<'_>) + Send + 'static,
    {
        self.subscribers.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    #[must_use]
    pub const fn view(&self) -> StateView<'_> {
        StateView {
            state: &self.state,
            is_loaded: self.is_loaded,
            pending_reward: &self.pending_reward,
        }
    }

    fn emit(&mut self, change: StateChange) {
        let view = StateView {
            state: &self.state,
            is_loaded: self.is_loaded,
            pending_reward: &self.pending_reward,
        };
        self.subscribers.notify(change, &view);
    }

    fn commit(&mut self, change: StateChange) {
        self.save_state();
        self.emit(change);
    }

    // Accessors ------------------------------------------------------------

    #[must_use]
    pub const fn state(&self) -> &AppState {
        &self.state
    }

    #[must_use]
    pub fn habits(&self) -> &[Habit] {
        &self.state.habits
    }

    /// Habits that are not archived, in creation order.
    #[must_use]
    pub fn active_habits(&self) -> Vec<&Habit> {
        self.state.habits.iter().filter(|habit| habit.is_active()).collect()
    }

    #[must_use]
    pub fn habit(&self, id: &str) -> Option<&Habit> {
        self.state.habit(id)
    }

    #[must_use]
    pub fn completions(&self) -> &[Completion] {
        &self.state.completions
    }

    #[must_use]
    pub const fn progress(&self) -> &UserProgress {
        &self.state.progress
    }

    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.is_loaded
    }

    #[must_use]
    pub const fn pending_reward(&self) -> &PendingReward {
        &self.pending_reward
    }

    #[must_use]
    pub fn streak_for(&self, habit_id: &str) -> u32 {
        self.state.progress.streak(habit_id)
    }

    /// Completion count recorded for a habit on `day` (zero when absent).
    #[must_use]
    pub fn completion_on(&self, habit_id: &str, day: NaiveDate) -> u32 {
        self.state
            .completion(habit_id, day)
            .map_or(0, |entry| entry.count)
    }

    #[must_use]
    pub fn completed_today(&self, habit_id: &str) -> u32 {
        self.completion_on(habit_id, self.clock.today())
    }

    #[must_use]
    pub const fn catalog(&self) -> &RewardCatalog {
        &self.catalog
    }

    #[must_use]
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    #[must_use]
    pub const fn store(&self) -> &K {
        self.gateway.store()
    }

    // Derived views --------------------------------------------------------

    #[must_use]
    pub fn stats(&self) -> ProgressStats {
        stats::progress_stats(&self.state, &self.clock, &self.catalog)
    }

    #[must_use]
    pub fn habits_by_streak(&self) -> Vec<&Habit> {
        stats::habits_by_streak(&self.state)
    }

    #[must_use]
    pub fn habit_history(&self, habit_id: &str, days: u32) -> Vec<DayCount> {
        stats::habit_history(&self.state, &self.clock, habit_id, days)
    }

    #[must_use]
    pub fn rewards_by_rarity(&self, filter: Option<Rarity>) -> Vec<&EarnedReward> {
        stats::rewards_by_rarity(&self.state.progress, filter)
    }
}
