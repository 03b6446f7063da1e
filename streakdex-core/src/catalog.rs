//! Reward catalog: ordered reward ids per rarity tier plus the XP schedule.
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::constants::{
    COMMON_REWARD_IDS, COMMON_XP_THRESHOLD, LEGENDARY_REWARD_IDS, LEGENDARY_XP_THRESHOLD,
    RARE_REWARD_IDS, RARE_XP_THRESHOLD, XP_PER_COMPLETION,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Rare,
    Legendary,
}

impl Rarity {
    /// Tiers in resolver priority order, highest first.
    pub const BY_PRIORITY: [Self; 3] = [Self::Legendary, Self::Rare, Self::Common];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Rare => "rare",
            Self::Legendary => "legendary",
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rarity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "common" => Ok(Self::Common),
            "rare" => Ok(Self::Rare),
            "legendary" => Ok(Self::Legendary),
            _ => Err(()),
        }
    }
}

/// Errors raised when a catalog violates the unlock schedule invariants.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("{rarity} tier has no reward ids")]
    EmptyTier { rarity: Rarity },
    #[error("reward id {id} appears more than once")]
    DuplicateId { id: u32 },
    #[error("{rarity} threshold must be positive")]
    ZeroThreshold { rarity: Rarity },
    #[error("thresholds must ascend common < rare < legendary (got {common}, {rare}, {legendary})")]
    ThresholdOrder { common: u32, rare: u32, legendary: u32 },
    #[error("xp per completion must be positive")]
    ZeroXpPerCompletion,
    #[error("catalog JSON parsing error: {0}")]
    Json(String),
}

/// Static unlock configuration consumed by the reward resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardCatalog {
    pub commons: Vec<u32>,
    pub rares: Vec<u32>,
    pub legendaries: Vec<u32>,
    #[serde(default = "RewardCatalog::default_common_threshold")]
    pub common_threshold: u32,
    #[serde(default = "RewardCatalog::default_rare_threshold")]
    pub rare_threshold: u32,
    #[serde(default = "RewardCatalog::default_legendary_threshold")]
    pub legendary_threshold: u32,
    #[serde(default = "RewardCatalog::default_xp_per_completion")]
    pub xp_per_completion: u32,
}

impl RewardCatalog {
    const fn default_common_threshold() -> u32 {
        COMMON_XP_THRESHOLD
    }

    const fn default_rare_threshold() -> u32 {
        RARE_XP_THRESHOLD
    }

    const fn default_legendary_threshold() -> u32 {
        LEGENDARY_XP_THRESHOLD
    }

    const fn default_xp_per_completion() -> u32 {
        XP_PER_COMPLETION
    }

    /// Parse and validate a catalog from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the catalog is invalid.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let catalog: Self =
            serde_json::from_str(json).map_err(|err| CatalogError::Json(err.to_string()))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Ordered ids of one tier.
    #[must_use]
    pub fn tier(&self, rarity: Rarity) -> &[u32] {
        match rarity {
            Rarity::Common => &self.commons,
            Rarity::Rare => &self.rares,
            Rarity::Legendary => &self.legendaries,
        }
    }

    #[must_use]
    pub const fn threshold(&self, rarity: Rarity) -> u32 {
        match rarity {
            Rarity::Common => self.common_threshold,
            Rarity::Rare => self.rare_threshold,
            Rarity::Legendary => self.legendary_threshold,
        }
    }

    /// Rarity of a catalog id, if the catalog knows it.
    #[must_use]
    pub fn rarity_of(&self, id: u32) -> Option<Rarity> {
        Rarity::BY_PRIORITY
            .into_iter()
            .find(|rarity| self.tier(*rarity).contains(&id))
    }

    /// Check the invariants the resolver relies on.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = HashSet::new();
        for rarity in Rarity::BY_PRIORITY {
            let ids = self.tier(rarity);
            if ids.is_empty() {
                return Err(CatalogError::EmptyTier { rarity });
            }
            if let Some(id) = ids.iter().find(|id| !seen.insert(**id)) {
                return Err(CatalogError::DuplicateId { id: *id });
            }
            if self.threshold(rarity) == 0 {
                return Err(CatalogError::ZeroThreshold { rarity });
            }
        }
        if !(self.common_threshold < self.rare_threshold
            && self.rare_threshold < self.legendary_threshold)
        {
            return Err(CatalogError::ThresholdOrder {
                common: self.common_threshold,
                rare: self.rare_threshold,
                legendary: self.legendary_threshold,
            });
        }
        if self.xp_per_completion == 0 {
            return Err(CatalogError::ZeroXpPerCompletion);
        }
        Ok(())
    }
}

impl Default for RewardCatalog {
    fn default() -> Self {
        Self {
            commons: COMMON_REWARD_IDS.to_vec(),
            rares: RARE_REWARD_IDS.to_vec(),
            legendaries: LEGENDARY_REWARD_IDS.to_vec(),
            common_threshold: COMMON_XP_THRESHOLD,
            rare_threshold: RARE_XP_THRESHOLD,
            legendary_threshold: LEGENDARY_XP_THRESHOLD,
            xp_per_completion: XP_PER_COMPLETION,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_is_valid() {
        let catalog = RewardCatalog::default();
        assert_eq!(catalog.validate(), Ok(()));
        assert_eq!(catalog.tier(Rarity::Common)[0], 1);
        assert_eq!(catalog.tier(Rarity::Rare)[0], 37);
        assert_eq!(catalog.tier(Rarity::Legendary)[0], 144);
        assert_eq!(catalog.rarity_of(150), Some(Rarity::Legendary));
        assert_eq!(catalog.rarity_of(999), None);
    }

    #[test]
    fn json_catalog_fills_default_schedule() {
        let catalog =
            RewardCatalog::from_json(r#"{"commons":[1,2],"rares":[3],"legendaries":[4]}"#)
                .unwrap();
        assert_eq!(catalog.common_threshold, 50);
        assert_eq!(catalog.legendary_threshold, 300);
        assert_eq!(catalog.xp_per_completion, 10);
    }

    #[test]
    fn invalid_catalogs_are_rejected() {
        let dup = RewardCatalog::from_json(r#"{"commons":[1,2],"rares":[2],"legendaries":[4]}"#);
        assert_eq!(dup, Err(CatalogError::DuplicateId { id: 2 }));

        let empty = RewardCatalog::from_json(r#"{"commons":[],"rares":[2],"legendaries":[4]}"#);
        assert_eq!(
            empty,
            Err(CatalogError::EmptyTier {
                rarity: Rarity::Common
            })
        );

        let mut misordered = RewardCatalog::default();
        misordered.rare_threshold = 400;
        assert!(matches!(
            misordered.validate(),
            Err(CatalogError::ThresholdOrder { .. })
        ));

        assert!(matches!(
            RewardCatalog::from_json("not json"),
            Err(CatalogError::Json(_))
        ));
    }

    #[test]
    fn rarity_parses_and_displays() {
        assert_eq!("rare".parse::<Rarity>(), Ok(Rarity::Rare));
        assert!("mythic".parse::<Rarity>().is_err());
        assert_eq!(Rarity::Legendary.to_string(), "legendary");
    }
}
