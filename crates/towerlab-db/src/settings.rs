//! Editor settings
//!
//! Stored as RON next to the database:
//!
//! ```ron
//! (
//!     database: Some("towerlab.db"),
//!     default_skin: "Default",
//!     buffs: (
//!         towers: (damage: 0.15, discount: 0.1),
//!         units: (health: 0.5),
//!     ),
//! )
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use towerlab_core::{BuffState, DEFAULT_SKIN};

/// Settings for opening the store and reading derived values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Database file; in-memory when `None`
    pub database: Option<PathBuf>,
    /// Active combat buffs
    pub buffs: BuffState,
    /// Skin shown when none is selected
    pub default_skin: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: None,
            buffs: BuffState::none(),
            default_skin: DEFAULT_SKIN.to_string(),
        }
    }
}

impl Settings {
    /// Parse settings from RON text
    pub fn from_ron(content: &str) -> Result<Self> {
        Ok(ron::from_str(content)?)
    }

    /// Load settings from a RON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_ron(&content)
    }

    /// Load settings from `path` if it exists, defaults otherwise
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Serialize to pretty RON text
    pub fn to_ron(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Write settings to a RON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_ron()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings_use_defaults() {
        let settings = Settings::from_ron("(buffs: (towers: (damage: 0.15)))").unwrap();
        assert_eq!(settings.database, None);
        assert_eq!(settings.default_skin, "Default");
        assert_eq!(settings.buffs.towers.damage, 0.15);
        assert_eq!(settings.buffs.units, Default::default());
    }

    #[test]
    fn test_ron_round_trip() {
        let mut settings = Settings {
            database: Some(PathBuf::from("towerlab.db")),
            ..Default::default()
        };
        settings.buffs.units.health = 0.5;

        let text = settings.to_ron().unwrap();
        assert_eq!(Settings::from_ron(&text).unwrap(), settings);
    }

    #[test]
    fn test_invalid_settings() {
        assert!(matches!(Settings::from_ron("(buffs: 3)"), Err(Error::Config(_))));
        assert!(matches!(
            Settings::load("/nonexistent/towerlab.ron"),
            Err(Error::Io(_))
        ));
        assert_eq!(
            Settings::load_or_default("/nonexistent/towerlab.ron").unwrap(),
            Settings::default()
        );
    }
}
