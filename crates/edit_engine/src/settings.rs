//! Editor settings management
//!
//! Settings that tune the editing engine, persisted as a JSON file. A
//! missing file means defaults; an unreadable one is logged and replaced by
//! defaults.

use crate::{FindOptions, IdentityAssigner, Result};
use doc_model::NodeType;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main editor settings container
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EditorSettings {
    /// AI content placement
    pub placement: PlacementSettings,
    /// Find engine
    pub find: FindSettings,
    /// Identity pass
    pub identity: IdentitySettings,
}

impl EditorSettings {
    /// Parse settings from a JSON string; absent sections take defaults
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn find_options(&self) -> FindOptions {
        FindOptions::new().digit_guard(self.find.digit_guard)
    }

    pub fn identity_assigner(&self) -> IdentityAssigner {
        match &self.identity.tracked_types {
            Some(types) => IdentityAssigner::with_tracked(types.iter().copied()),
            None => IdentityAssigner::new(),
        }
    }
}

/// AI content placement settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlacementSettings {
    /// Header paragraph that collects content with no usable target
    pub fallback_header: String,
    /// Highlight color for inserted text; `None` uses the default highlight
    pub highlight_color: Option<String>,
}

impl Default for PlacementSettings {
    fn default() -> Self {
        Self {
            fallback_header: "Uncategorized".to_string(),
            highlight_color: None,
        }
    }
}

/// Find engine settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FindSettings {
    /// Reject matches that directly follow a digit
    pub digit_guard: bool,
}

impl Default for FindSettings {
    fn default() -> Self {
        Self { digit_guard: true }
    }
}

/// Identity pass settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IdentitySettings {
    /// Block types that receive ids; `None` tracks every block type
    pub tracked_types: Option<Vec<NodeType>>,
}

/// Settings manager for loading and saving editor settings
pub struct SettingsManager {
    /// Path to the settings file
    settings_path: PathBuf,
    /// Current settings (cached)
    current: EditorSettings,
}

impl SettingsManager {
    /// Create a settings manager storing `editor_settings.json` in `dir`
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            settings_path: dir.as_ref().join("editor_settings.json"),
            current: EditorSettings::default(),
        }
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    /// Load settings from disk, or return defaults if the file doesn't exist
    pub fn load_sync(&mut self) -> Result<&EditorSettings> {
        self.current = if self.settings_path.exists() {
            let content = std::fs::read_to_string(&self.settings_path)?;
            match EditorSettings::from_json(&content) {
                Ok(settings) => settings,
                Err(e) => {
                    tracing::warn!(
                        path = %self.settings_path.display(),
                        "Failed to parse editor settings, using defaults: {}",
                        e
                    );
                    EditorSettings::default()
                }
            }
        } else {
            EditorSettings::default()
        };
        Ok(&self.current)
    }

    /// Save current settings to disk
    pub fn save_sync(&self) -> Result<()> {
        if let Some(parent) = self.settings_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.current)?;
        std::fs::write(&self.settings_path, content)?;
        Ok(())
    }

    pub fn get(&self) -> &EditorSettings {
        &self.current
    }

    /// Update settings and save to disk
    pub fn update_sync(&mut self, settings: EditorSettings) -> Result<()> {
        self.current = settings;
        self.save_sync()
    }

    /// Reset settings to defaults and save
    pub fn reset_sync(&mut self) -> Result<&EditorSettings> {
        self.current = EditorSettings::default();
        self.save_sync()?;
        Ok(&self.current)
    }
}
