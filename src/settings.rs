//! User preferences, and where they live between sessions

use crate::util::Color;
use anyhow::Context;
use log::info;
use serde::{Deserialize, Serialize};
use std::{fs, io, path::PathBuf};

/// User-facing preferences. Field names on disk match the original web
/// widget's record, so an existing record stays readable.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub text_color: Color,
    pub bg_color: Color,
    /// City to look up automatically on startup. Empty means none
    pub fav_city: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            text_color: Color::BLACK,
            bg_color: Color::WHITE,
            fav_city: String::new(),
        }
    }
}

impl Settings {
    /// Shallow merge: every field present in the change replaces ours
    pub fn apply(&mut self, change: SettingsChange) {
        let SettingsChange {
            text_color,
            bg_color,
            fav_city,
        } = change;
        if let Some(text_color) = text_color {
            self.text_color = text_color;
        }
        if let Some(bg_color) = bg_color {
            self.bg_color = bg_color;
        }
        if let Some(fav_city) = fav_city {
            self.fav_city = fav_city;
        }
    }
}

/// A partial update to [Settings]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SettingsChange {
    pub text_color: Option<Color>,
    pub bg_color: Option<Color>,
    pub fav_city: Option<String>,
}

impl SettingsChange {
    pub fn text_color(color: Color) -> Self {
        Self {
            text_color: Some(color),
            ..Default::default()
        }
    }

    pub fn bg_color(color: Color) -> Self {
        Self {
            bg_color: Some(color),
            ..Default::default()
        }
    }

    pub fn fav_city(city: impl Into<String>) -> Self {
        Self {
            fav_city: Some(city.into()),
            ..Default::default()
        }
    }
}

/// Durable storage for a single [Settings] record
pub trait SettingsStore {
    /// Load the stored record. `Ok(None)` if nothing has been saved yet
    fn load(&self) -> anyhow::Result<Option<Settings>>;

    /// Overwrite the stored record
    fn save(&self, settings: &Settings) -> anyhow::Result<()>;
}

/// Settings stored as pretty JSON in a single file
#[derive(Debug)]
pub struct SettingsFile {
    path: PathBuf,
}

impl SettingsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SettingsStore for SettingsFile {
    fn load(&self) -> anyhow::Result<Option<Settings>> {
        let contents = match fs::read(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!("No settings at {}, using defaults", self.path.display());
                return Ok(None);
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!(
                        "Error reading settings from {}",
                        self.path.display()
                    )
                })
            }
        };
        let settings = serde_json::from_slice(&contents).with_context(|| {
            format!("Error parsing settings from {}", self.path.display())
        })?;
        Ok(Some(settings))
    }

    fn save(&self, settings: &Settings) -> anyhow::Result<()> {
        info!("Saving settings: {settings:?}");
        let serialized = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, serialized).with_context(|| {
            format!("Error saving settings to {}", self.path.display())
        })?;
        Ok(())
    }
}
