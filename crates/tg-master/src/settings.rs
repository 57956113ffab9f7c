//! User settings file (TOML).

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tg_core::{NUM_ENGINES, NUM_PARTS};
use tg_engine::{DEFAULT_BPM, DEFAULT_DENSITY, DEFAULT_MASTER_BEATS, DEFAULT_MAX_RATE};

use crate::midi_clock::ClockResolution;

#[derive(Debug)]
pub enum SettingsError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Serialize(toml::ser::Error),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::Io(e) => write!(f, "failed to read settings: {}", e),
            SettingsError::Parse(e) => write!(f, "invalid settings: {}", e),
            SettingsError::Serialize(e) => write!(f, "failed to write settings: {}", e),
        }
    }
}

impl std::error::Error for SettingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SettingsError::Io(e) => Some(e),
            SettingsError::Parse(e) => Some(e),
            SettingsError::Serialize(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for SettingsError {
    fn from(e: std::io::Error) -> Self {
        SettingsError::Io(e)
    }
}

impl From<toml::de::Error> for SettingsError {
    fn from(e: toml::de::Error) -> Self {
        SettingsError::Parse(e)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineSettings {
    pub x: u8,
    pub y: u8,
    pub randomness: u8,
    pub density: [u8; NUM_PARTS],
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self { x: 0, y: 0, randomness: 0, density: [DEFAULT_DENSITY; NUM_PARTS] }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub bpm: f32,
    pub swing: f32,
    pub clock_resolution: ClockResolution,
    pub morph: f32,
    pub link_mode: bool,
    pub external_sync: bool,
    pub max_cc_rate: u32,
    pub master_beats: f32,
    pub engines: [EngineSettings; NUM_ENGINES],
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bpm: DEFAULT_BPM,
            swing: 0.0,
            clock_resolution: ClockResolution::default(),
            morph: 0.0,
            link_mode: false,
            external_sync: false,
            max_cc_rate: DEFAULT_MAX_RATE,
            master_beats: DEFAULT_MASTER_BEATS,
            engines: Default::default(),
        }
    }
}

impl Settings {
    pub fn from_toml(text: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn to_toml(&self) -> Result<String, SettingsError> {
        toml::to_string_pretty(self).map_err(SettingsError::Serialize)
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }
}
