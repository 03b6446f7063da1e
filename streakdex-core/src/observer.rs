//! Change notification for presentation layers.
use std::fmt;

use crate::state::{AppState, Completion, EarnedReward, UserProgress};
use crate::habit::Habit;

/// What kind of mutation a notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChange {
    Loaded,
    HabitsChanged,
    CompletionRecorded,
    RewardGranted { id: u32 },
    RewardNamed { id: u32 },
    PendingRewardDismissed,
    Reset,
}

/// Transient "you earned something" signal; hosts clear it with an explicit dismiss.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingReward {
    pub visible: bool,
    pub item: Option<EarnedReward>,
}

impl PendingReward {
    pub fn show(&mut self, item: EarnedReward) {
        self.visible = true;
        self.item = Some(item);
    }

    pub fn dismiss(&mut self) {
        self.visible = false;
        self.item = None;
    }
}

/// Read-only snapshot handed to listeners.
#[derive(Debug, Clone, Copy)]
pub struct StateView<'a> {
    pub state: &'a AppState,
    pub is_loaded: bool,
    pub pending_reward: &'a PendingReward,
}

impl<'a> StateView<'a> {
    #[must_use]
    pub fn habits(&self) -> &'a [Habit] {
        &self.state.habits
    }

    #[must_use]
    pub fn completions(&self) -> &'a [Completion] {
        &self.state.completions
    }

    #[must_use]
    pub const fn progress(&self) -> &'a UserProgress {
        &self.state.progress
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(StateChange, &StateView<'_>) + Send>;

/// Ordered listener list; listeners run in subscription order.
#[derive(Default)]
pub struct Subscribers {
    next_id: u64,
    listeners: Vec<(SubscriptionId, Listener)>,
}

impl Subscribers {
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(StateChange, &StateView<'_>) + Send + 'static,
    {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener; `false` if the id was unknown.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    pub fn notify(&mut self, change: StateChange, view: &StateView<'_>) {
        for (_, listener) in &mut self.listeners {
            listener(change, view);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscribers")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
