//! Deterministic reward resolution.
//!
//! [`resolve_reward`] is a pure function of the catalog, the XP totals and the
//! earned ledger. Advancing the checkpoint watermark after a grant is the
//! caller's job, so evaluating the same inputs twice can never grant twice.
use std::collections::HashSet;

use crate::catalog::{Rarity, RewardCatalog};
use crate::state::EarnedReward;

/// A catalog entry selected for granting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RewardItem {
    pub id: u32,
    pub rarity: Rarity,
}

/// Outcome of one resolver evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RewardDecision {
    #[default]
    NoGrant,
    Grant(RewardItem),
}

impl RewardDecision {
    #[must_use]
    pub const fn is_grant(self) -> bool {
        matches!(self, Self::Grant(_))
    }

    #[must_use]
    pub const fn item(self) -> Option<RewardItem> {
        match self {
            Self::Grant(item) => Some(item),
            Self::NoGrant => None,
        }
    }
}

fn next_unearned(
    catalog: &RewardCatalog,
    rarity: Rarity,
    earned_ids: &HashSet<u32>,
) -> Option<RewardItem> {
    catalog
        .tier(rarity)
        .iter()
        .find(|id| !earned_ids.contains(*id))
        .map(|&id| RewardItem { id, rarity })
}

/// Decide whether reaching `current_xp` grants a reward, and which one.
///
/// Rules, first match wins:
/// 1. legendary threshold crossed since the checkpoint
/// 2. rare threshold crossed since the checkpoint
/// 3. common threshold crossed since the checkpoint
/// 4. a new multiple of the common threshold reached (repeat commons)
///
/// A rule whose tier is exhausted does not match and evaluation continues
/// with the next rule.
#[must_use]
pub fn resolve_reward(
    catalog: &RewardCatalog,
    current_xp: u32,
    last_checkpoint_xp: u32,
    earned: &[EarnedReward],
) -> RewardDecision {
    let earned_ids: HashSet<u32> = earned.iter().map(|reward| reward.id).collect();

    for rarity in Rarity::BY_PRIORITY {
        let threshold = catalog.threshold(rarity);
        if current_xp >= threshold && last_checkpoint_xp < threshold {
            if let Some(item) = next_unearned(catalog, rarity, &earned_ids) {
                return RewardDecision::Grant(item);
            }
        }
    }

    let interval = catalog.common_threshold;
    let (Some(last_milestone), Some(current_milestone)) = (
        last_checkpoint_xp.checked_div(interval),
        current_xp.checked_div(interval),
    ) else {
        return RewardDecision::NoGrant;
    };
    if current_milestone > last_milestone && current_milestone >= 1 {
        if let Some(item) = next_unearned(catalog, Rarity::Common, &earned_ids) {
            return RewardDecision::Grant(item);
        }
    }

    RewardDecision::NoGrant
}

/// Smallest XP total above `current_xp` at which a resolver rule can grant.
///
/// Rules whose tier is already fully earned are skipped, so a completed
/// catalog yields `None`.
#[must_use]
pub fn next_unlock_xp(
    catalog: &RewardCatalog,
    current_xp: u32,
    earned: &[EarnedReward],
) -> Option<u32> {
    let earned_ids: HashSet<u32> = earned.iter().map(|reward| reward.id).collect();
    let has_unearned =
        |rarity: Rarity| next_unearned(catalog, rarity, &earned_ids).is_some();

    let interval = catalog.common_threshold;
    let next_milestone = current_xp
        .checked_div(interval)
        .and_then(|milestone| milestone.checked_add(1))
        .and_then(|milestone| milestone.checked_mul(interval))
        .filter(|_| has_unearned(Rarity::Common));
    Rarity::BY_PRIORITY
        .into_iter()
        .filter(|&rarity| has_unearned(rarity))
        .map(|rarity| catalog.threshold(rarity))
        .filter(|threshold| *threshold > current_xp)
        .chain(next_milestone)
        .min()
}
