// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Score file loading (JSON, YAML, XML and Standard MIDI Files).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use super::{midi, NoteGroup, Score, ScoreError, DEFAULT_BPM};

/// Score file extensions that [`load`] understands
pub const SCORE_EXTENSIONS: &[&str] = &["json", "yaml", "yml", "xml"];

/// On-disk representation of a score
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreFile {
    /// Display title
    #[serde(default = "default_title")]
    pub title: String,
    /// Tempo in BPM
    #[serde(default = "default_bpm")]
    pub bpm: f64,
    /// Note entries, in any order
    #[serde(default)]
    pub notes: Vec<RawNote>,
}

/// A single note entry as written in a score file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawNote {
    /// Offset in milliseconds
    #[serde(alias = "offset_ms")]
    pub time: u64,
    /// Key identifiers struck at this offset
    #[serde(alias = "keys")]
    pub note: Vec<String>,
    /// Inclusion probability in variation mode
    #[serde(default = "default_probability")]
    pub probability: f64,
}

fn default_title() -> String {
    "Untitled".to_string()
}
fn default_bpm() -> f64 {
    DEFAULT_BPM
}
fn default_probability() -> f64 {
    1.0
}

impl ScoreFile {
    /// Parse a score from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse JSON score")
    }

    /// Parse a score from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse YAML score")
    }

    /// Parse a score from an XML string.
    ///
    /// Layout: `<score>` with `<title>`, `<bpm>` and `<notes>`, each `<note>`
    /// holding a `<time>` and one `<note_name>` per key.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let doc: XmlScore = quick_xml::de::from_str(xml).context("Failed to parse XML score")?;
        Ok(Self {
            title: doc.title,
            bpm: doc.bpm,
            notes: doc
                .notes
                .note
                .into_iter()
                .map(|n| RawNote {
                    time: n.time,
                    note: n.note_name,
                    probability: n.probability,
                })
                .collect(),
        })
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize score to JSON")
    }
}

#[derive(Deserialize)]
struct XmlScore {
    #[serde(default = "default_title")]
    title: String,
    #[serde(default = "default_bpm")]
    bpm: f64,
    #[serde(default)]
    notes: XmlNotes,
}

#[derive(Deserialize, Default)]
struct XmlNotes {
    #[serde(default)]
    note: Vec<XmlNote>,
}

#[derive(Deserialize)]
struct XmlNote {
    time: u64,
    #[serde(default)]
    note_name: Vec<String>,
    #[serde(default = "default_probability")]
    probability: f64,
}

impl TryFrom<ScoreFile> for Score {
    type Error = ScoreError;

    fn try_from(file: ScoreFile) -> Result<Self, Self::Error> {
        let notes = file.notes.into_iter().map(|raw| {
            NoteGroup::new(raw.time, raw.note).with_probability(raw.probability)
        });
        Score::new(file.title, file.bpm, notes)
    }
}

impl From<&Score> for ScoreFile {
    fn from(score: &Score) -> Self {
        Self {
            title: score.title().to_string(),
            bpm: score.bpm(),
            notes: score
                .notes()
                .iter()
                .map(|n| RawNote {
                    time: n.offset_ms,
                    note: n.keys.iter().cloned().collect(),
                    probability: n.probability,
                })
                .collect(),
        }
    }
}

/// Load and validate a score, choosing the format from the file extension.
///
/// `.mid`/`.midi` files are converted from their drum track on the fly.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Score> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let file = match extension.as_str() {
        "mid" | "midi" => midi::read(path)?,
        "json" | "yaml" | "yml" | "xml" => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read score file: {:?}", path))?;
            match extension.as_str() {
                "json" => ScoreFile::from_json(&contents),
                "xml" => ScoreFile::from_xml(&contents),
                _ => ScoreFile::from_yaml(&contents),
            }
            .with_context(|| format!("Invalid score file: {:?}", path))?
        }
        other => bail!("Unsupported score format '.{}': {:?}", other, path),
    };

    Score::try_from(file).with_context(|| format!("Invalid score: {:?}", path))
}

/// List score files in a directory, sorted by file name
pub fn list_dir<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read score directory: {:?}", dir))?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let is_score = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| SCORE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if is_score {
            paths.push(path);
        }
    }

    paths.sort();
    Ok(paths)
}
