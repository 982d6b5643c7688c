//! Achievement catalog: the locked achievements a profile starts with.
//!
//! ```yaml
//! achievements:
//!   - id: 1
//!     type: accuracy
//!     description: Reach 100% accuracy in one session
//! ```

use std::fs;
use std::path::Path;

use kindle_core::{Achievement, AchievementId, ProfileId};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::loader::{Result, RuleError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: AchievementId,
    /// XP category (`streak`, `accuracy`, `word_count`, `speed`, `rare`).
    #[serde(rename = "type")]
    pub achievement_type: String,
    #[serde(default)]
    pub description: String,
}

impl CatalogEntry {
    /// A locked achievement for `profile_id`.
    pub fn for_profile(&self, profile_id: ProfileId) -> Achievement {
        Achievement::locked(self.id, self.achievement_type.clone(), self.description.clone(), profile_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementCatalog {
    pub achievements: Vec<CatalogEntry>,
}

impl AchievementCatalog {
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let catalog: Self = serde_yaml::from_str(contents)?;
        let mut ids: Vec<AchievementId> = catalog.achievements.iter().map(|e| e.id).collect();
        ids.sort_unstable();
        if let Some(pair) = ids.windows(2).find(|w| w[0] == w[1]) {
            return Err(RuleError::Validation(format!("duplicate achievement id {}", pair[0])));
        }
        if let Some(bad) = ids.iter().find(|id| **id <= 0) {
            return Err(RuleError::Validation(format!("achievement id must be positive, got {}", bad)));
        }
        Ok(catalog)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let catalog = Self::from_yaml(&fs::read_to_string(path)?)?;
        info!(path = %path.display(), achievements = catalog.achievements.len(), "loaded achievement catalog");
        Ok(catalog)
    }

    /// Every entry as a locked achievement owned by `profile_id`.
    pub fn seed(&self, profile_id: ProfileId) -> Vec<Achievement> {
        self.achievements.iter().map(|e| e.for_profile(profile_id)).collect()
    }
}
