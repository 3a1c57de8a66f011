// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Configuration system for KEYDRUM.
//!
//! This module provides data structures for loading and managing
//! the key mapping, player timing parameters and keyboard bindings.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::score::Score;

/// Root application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AppConfig {
    /// Semantic key identifier to physical key
    #[serde(default)]
    pub key_mapping: KeyMapping,
    /// Playback timing parameters
    #[serde(default)]
    pub player: PlayerSettings,
    /// Keyboard shortcuts for the terminal control surface
    #[serde(default)]
    pub keyboard: HashMap<String, String>,
}

impl AppConfig {
    /// Load configuration from a YAML or JSON file (by extension)
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        if is_json {
            Self::from_json(&contents)
        } else {
            Self::from_yaml(&contents)
        }
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse YAML configuration")
    }

    /// Parse configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse JSON configuration")
    }

    /// Serialize to YAML string
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize configuration to YAML")
    }

    /// Save configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = self.to_yaml()?;
        fs::write(path.as_ref(), yaml)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))
    }
}

/// Mapping from semantic key identifiers ("snare") to physical keys ("d")
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(transparent)]
pub struct KeyMapping {
    keys: BTreeMap<String, String>,
}

impl KeyMapping {
    /// Create an empty mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a mapping
    pub fn insert(&mut self, name: impl Into<String>, physical: impl Into<String>) {
        self.keys.insert(name.into(), physical.into());
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, physical: impl Into<String>) -> Self {
        self.insert(name, physical);
        self
    }

    /// Physical key for a semantic identifier
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.keys.get(name).map(String::as_str)
    }

    /// Number of mapped identifiers
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether nothing is mapped
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Identifiers used by `score` that have no mapping
    pub fn unmapped(&self, score: &Score) -> BTreeSet<String> {
        score
            .key_names()
            .into_iter()
            .filter(|name| !self.keys.contains_key(*name))
            .map(str::to_string)
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for KeyMapping {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Player timing parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PlayerSettings {
    /// How long each key is held down
    #[serde(default = "default_hold_ms")]
    pub hold_ms: u64,
    /// Delay before the first event, to switch focus to the target window
    #[serde(default = "default_pre_roll_ms")]
    pub pre_roll_ms: u64,
}

fn default_hold_ms() -> u64 {
    50
}
fn default_pre_roll_ms() -> u64 {
    3000
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            hold_ms: default_hold_ms(),
            pre_roll_ms: default_pre_roll_ms(),
        }
    }
}

impl PlayerSettings {
    /// Key hold duration
    pub fn hold(&self) -> Duration {
        Duration::from_millis(self.hold_ms)
    }

    /// Pre-roll duration
    pub fn pre_roll(&self) -> Duration {
        Duration::from_millis(self.pre_roll_ms)
    }

    /// Override the pre-roll
    pub fn with_pre_roll_ms(mut self, pre_roll_ms: u64) -> Self {
        self.pre_roll_ms = pre_roll_ms;
        self
    }

    /// Override the hold
    pub fn with_hold_ms(mut self, hold_ms: u64) -> Self {
        self.hold_ms = hold_ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::NoteGroup;

    #[test]
    fn test_parse_config() {
        let yaml = r#"
key_mapping:
  bass_drum: "s"
  snare: "d"
  close_hi_hat: "j"

player:
  hold_ms: 40
  pre_roll_ms: 1000

keyboard:
  space: toggle_play
  l: toggle_loop
"#;

        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.key_mapping.len(), 3);
        assert_eq!(config.key_mapping.resolve("snare"), Some("d"));
        assert_eq!(config.player.hold(), Duration::from_millis(40));
        assert_eq!(config.player.pre_roll(), Duration::from_secs(1));
        assert_eq!(config.keyboard.get("space"), Some(&"toggle_play".to_string()));
    }

    #[test]
    fn test_parse_json_config() {
        let json = r#"{"key_mapping": {"snare": "d", "bass_drum": "s"}}"#;

        let config = AppConfig::from_json(json).unwrap();
        assert_eq!(config.key_mapping.resolve("bass_drum"), Some("s"));
        assert_eq!(config.player, PlayerSettings::default());
        assert!(config.keyboard.is_empty());
    }

    #[test]
    fn test_default_values() {
        let config = AppConfig::from_yaml("{}").unwrap();
        assert!(config.key_mapping.is_empty());
        assert_eq!(config.player.hold_ms, 50);
        assert_eq!(config.player.pre_roll_ms, 3000);
    }

    #[test]
    fn test_partial_player_settings() {
        let config = AppConfig::from_yaml("player:\n  hold_ms: 20\n").unwrap();
        assert_eq!(config.player.hold_ms, 20);
        assert_eq!(config.player.pre_roll_ms, 3000);
    }

    #[test]
    fn test_round_trip() {
        let original = AppConfig {
            key_mapping: KeyMapping::new().with("snare", "d").with("crash_cymbal", "u"),
            player: PlayerSettings::default().with_pre_roll_ms(500),
            keyboard: HashMap::new(),
        };

        let yaml = original.to_yaml().unwrap();
        let parsed = AppConfig::from_yaml(&yaml).unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn test_load_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let json_path = dir.path().join("config.json");
        fs::write(&json_path, r#"{"key_mapping": {"snare": "d"}}"#).unwrap();
        assert_eq!(
            AppConfig::load(&json_path).unwrap().key_mapping.resolve("snare"),
            Some("d")
        );

        let yaml_path = dir.path().join("config.yaml");
        AppConfig::default().save(&yaml_path).unwrap();
        assert_eq!(AppConfig::load(&yaml_path).unwrap(), AppConfig::default());
    }

    #[test]
    fn test_unmapped_keys() {
        let mapping: KeyMapping = [("snare", "d"), ("bass_drum", "s")].into_iter().collect();
        let score = Score::new(
            "t",
            120.0,
            vec![
                NoteGroup::new(0, ["bass_drum", "cowbell"]),
                NoteGroup::new(500, ["snare", "triangle"]),
            ],
        )
        .unwrap();

        let missing: Vec<String> = mapping.unmapped(&score).into_iter().collect();
        assert_eq!(missing, vec!["cowbell".to_string(), "triangle".to_string()]);
    }
}
