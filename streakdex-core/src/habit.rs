//! Habit definitions and the payloads used to create and edit them.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[default]
    Daily,
    Weekly,
}

impl Frequency {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            _ => Err(()),
        }
    }
}

/// A recurring user-defined task with a per-period completion goal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub frequency: Frequency,
    pub goal_per_period: u32,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub archived: bool,
}

impl Habit {
    /// Build a habit from a creation payload.
    #[must_use]
    pub fn from_new(id: String, data: NewHabit, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            title: data.title,
            description: data.description,
            frequency: data.frequency,
            goal_per_period: data.goal_per_period,
            created_at,
            archived: false,
        }
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        !self.archived
    }

    /// Merge the fields present in `patch`.
    pub fn apply(&mut self, patch: HabitPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(frequency) = patch.frequency {
            self.frequency = frequency;
        }
        if let Some(goal) = patch.goal_per_period {
            self.goal_per_period = goal;
        }
        if let Some(archived) = patch.archived {
            self.archived = archived;
        }
    }
}

/// Rejections for habit input. Hosts check these before calling the engine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HabitValidationError {
    #[error("title is required")]
    EmptyTitle,
    #[error("goal must be at least 1 (got {0})")]
    GoalBelowOne(u32),
}

fn clean_title(title: &str) -> Result<String, HabitValidationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(HabitValidationError::EmptyTitle);
    }
    Ok(trimmed.to_string())
}

fn clean_description(description: Option<String>) -> Option<String> {
    description
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

const fn check_goal(goal: u32) -> Result<u32, HabitValidationError> {
    if goal < 1 {
        return Err(HabitValidationError::GoalBelowOne(goal));
    }
    Ok(goal)
}

/// Creation payload for a habit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHabit {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub frequency: Frequency,
    pub goal_per_period: u32,
}

impl NewHabit {
    /// A daily habit with a goal of one completion.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            frequency: Frequency::Daily,
            goal_per_period: 1,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub const fn with_frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = frequency;
        self
    }

    #[must_use]
    pub const fn with_goal(mut self, goal_per_period: u32) -> Self {
        self.goal_per_period = goal_per_period;
        self
    }

    /// Trim text fields and enforce the habit invariants.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty title or a goal below one.
    pub fn validated(self) -> Result<Self, HabitValidationError> {
        Ok(Self {
            title: clean_title(&self.title)?,
            description: clean_description(self.description),
            frequency: self.frequency,
            goal_per_period: check_goal(self.goal_per_period)?,
        })
    }
}

/// Partial update for a habit; `None` leaves a field untouched.
///
/// `description` is doubly optional: `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HabitPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub frequency: Option<Frequency>,
    pub goal_per_period: Option<u32>,
    pub archived: Option<bool>,
}

impl HabitPatch {
    #[must_use]
    pub fn archive() -> Self {
        Self {
            archived: Some(true),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Trim text fields and enforce the habit invariants on present fields.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty title or a goal below one.
    pub fn validated(self) -> Result<Self, HabitValidationError> {
        Ok(Self {
            title: self.title.as_deref().map(clean_title).transpose()?,
            description: self.description.map(clean_description),
            frequency: self.frequency,
            goal_per_period: self.goal_per_period.map(check_goal).transpose()?,
            archived: self.archived,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_habit_validation_trims_and_rejects() {
        let habit = NewHabit::new("  Read  ")
            .with_description("   ")
            .with_goal(2)
            .validated()
            .unwrap();
        assert_eq!(habit.title, "Read");
        assert_eq!(habit.description, None);

        assert_eq!(
            NewHabit::new(" ").validated(),
            Err(HabitValidationError::EmptyTitle)
        );
        assert_eq!(
            NewHabit::new("Run").with_goal(0).validated(),
            Err(HabitValidationError::GoalBelowOne(0))
        );
    }

    #[test]
    fn patch_merges_present_fields_only() {
        let now = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        let mut habit = Habit::from_new(
            "h1".into(),
            NewHabit::new("Stretch").with_description("mornings"),
            now,
        );
        habit.apply(HabitPatch {
            goal_per_period: Some(3),
            ..HabitPatch::default()
        });
        assert_eq!(habit.title, "Stretch");
        assert_eq!(habit.goal_per_period, 3);
        assert_eq!(habit.description.as_deref(), Some("mornings"));

        habit.apply(HabitPatch {
            description: Some(None),
            ..HabitPatch::archive()
        });
        assert!(!habit.is_active());
        assert_eq!(habit.description, None);
    }

    #[test]
    fn patch_validation_checks_present_fields() {
        assert!(HabitPatch::default().is_empty());
        assert_eq!(
            HabitPatch {
                goal_per_period: Some(0),
                ..HabitPatch::default()
            }
            .validated(),
            Err(HabitValidationError::GoalBelowOne(0))
        );
        let patch = HabitPatch {
            title: Some(" Walk ".into()),
            description: Some(Some(String::new())),
            ..HabitPatch::default()
        }
        .validated()
        .unwrap();
        assert_eq!(patch.title.as_deref(), Some("Walk"));
        assert_eq!(patch.description, Some(None));
    }

    #[test]
    fn habit_serializes_camel_case_millis() {
        let now = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        let habit = Habit::from_new("h1".into(), NewHabit::new("Read").with_goal(2), now);
        let json = serde_json::to_value(&habit).unwrap();
        assert_eq!(json["goalPerPeriod"], 2);
        assert_eq!(json["createdAt"], 1_700_000_000_123_i64);
        assert_eq!(json["frequency"], "daily");
        assert!(json.get("description").is_none());
    }
}
