// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Score data model.
//!
//! A score is an immutable, time-ordered list of note groups plus tempo
//! metadata. Construction goes through [`Score::new`], which validates the
//! tempo and probabilities and merges groups that share an offset.

pub mod file;
pub mod midi;

use std::collections::BTreeSet;

use thiserror::Error;

pub use file::{list_dir, load, RawNote, ScoreFile};

/// Default tempo when a score does not specify one
pub const DEFAULT_BPM: f64 = 120.0;

/// Errors raised while building a score
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoreError {
    #[error("Invalid tempo: {0} BPM (must be a positive, finite number)")]
    InvalidTempo(f64),

    #[error("Invalid probability {probability} at {offset_ms}ms (must be within 0.0..=1.0)")]
    InvalidProbability { offset_ms: u64, probability: f64 },
}

/// A set of keys struck together at one point of the timeline
#[derive(Debug, Clone, PartialEq)]
pub struct NoteGroup {
    /// Time since the start of a cycle, in milliseconds
    pub offset_ms: u64,
    /// Semantic key identifiers ("snare", "bass_drum", ...)
    pub keys: BTreeSet<String>,
    /// Chance of being played in a cycle when variation is on
    pub probability: f64,
}

impl NoteGroup {
    /// Create a group that always plays
    pub fn new<I, S>(offset_ms: u64, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            offset_ms,
            keys: keys.into_iter().map(Into::into).collect(),
            probability: 1.0,
        }
    }

    /// Set the inclusion probability
    pub fn with_probability(mut self, probability: f64) -> Self {
        self.probability = probability;
        self
    }

    fn absorb(&mut self, other: NoteGroup) {
        self.keys.extend(other.keys);
        self.probability = self.probability.max(other.probability);
    }
}

/// An immutable, validated score
#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    title: String,
    bpm: f64,
    notes: Vec<NoteGroup>,
}

impl Score {
    /// Build a score from unordered note groups.
    ///
    /// Groups are sorted by offset (stable) and groups sharing an offset are
    /// merged: their keys are unioned and the highest probability wins.
    pub fn new(
        title: impl Into<String>,
        bpm: f64,
        notes: impl IntoIterator<Item = NoteGroup>,
    ) -> Result<Self, ScoreError> {
        if !bpm.is_finite() || bpm <= 0.0 {
            return Err(ScoreError::InvalidTempo(bpm));
        }

        let mut notes: Vec<NoteGroup> = notes.into_iter().collect();
        for note in &notes {
            if !(0.0..=1.0).contains(&note.probability) {
                return Err(ScoreError::InvalidProbability {
                    offset_ms: note.offset_ms,
                    probability: note.probability,
                });
            }
        }

        notes.sort_by_key(|n| n.offset_ms);

        let mut merged: Vec<NoteGroup> = Vec::with_capacity(notes.len());
        for note in notes {
            match merged.last_mut() {
                Some(last) if last.offset_ms == note.offset_ms => last.absorb(note),
                _ => merged.push(note),
            }
        }

        Ok(Self {
            title: title.into(),
            bpm,
            notes: merged,
        })
    }

    /// Score title
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Tempo in BPM
    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Note groups in ascending offset order
    pub fn notes(&self) -> &[NoteGroup] {
        &self.notes
    }

    /// Whether the score has no note groups
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Offset of the last note group
    pub fn last_offset_ms(&self) -> Option<u64> {
        self.notes.last().map(|n| n.offset_ms)
    }

    /// Every key identifier used anywhere in the score
    pub fn key_names(&self) -> BTreeSet<&str> {
        self.notes
            .iter()
            .flat_map(|n| n.keys.iter().map(String::as_str))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_same_offset() {
        let score = Score::new(
            "merge",
            120.0,
            vec![
                NoteGroup::new(500, ["snare"]),
                NoteGroup::new(0, ["bass_drum"]),
                NoteGroup::new(500, ["snare", "close_hi_hat"]),
            ],
        )
        .unwrap();

        assert_eq!(score.notes().len(), 2);
        let group = &score.notes()[1];
        assert_eq!(group.offset_ms, 500);
        let keys: Vec<&str> = group.keys.iter().map(String::as_str).collect();
        assert_eq!(keys, vec!["close_hi_hat", "snare"]);
    }

    #[test]
    fn test_merge_keeps_highest_probability() {
        let score = Score::new(
            "p",
            120.0,
            vec![
                NoteGroup::new(250, ["snare"]).with_probability(0.2),
                NoteGroup::new(250, ["crash_cymbal"]).with_probability(0.7),
            ],
        )
        .unwrap();

        assert_eq!(score.notes().len(), 1);
        assert_eq!(score.notes()[0].probability, 0.7);
    }

    #[test]
    fn test_sorted_by_offset() {
        let score = Score::new(
            "order",
            90.0,
            vec![
                NoteGroup::new(1500, ["snare"]),
                NoteGroup::new(10, ["bass_drum"]),
                NoteGroup::new(700, ["low_tom"]),
            ],
        )
        .unwrap();

        let offsets: Vec<u64> = score.notes().iter().map(|n| n.offset_ms).collect();
        assert_eq!(offsets, vec![10, 700, 1500]);
        assert_eq!(score.last_offset_ms(), Some(1500));
    }

    #[test]
    fn test_invalid_tempo() {
        assert_eq!(
            Score::new("t", 0.0, Vec::new()),
            Err(ScoreError::InvalidTempo(0.0))
        );
        assert!(Score::new("t", -60.0, Vec::new()).is_err());
        assert!(Score::new("t", f64::NAN, Vec::new()).is_err());
        assert!(Score::new("t", f64::INFINITY, Vec::new()).is_err());
    }

    #[test]
    fn test_invalid_probability() {
        let result = Score::new(
            "t",
            120.0,
            vec![NoteGroup::new(40, ["snare"]).with_probability(1.5)],
        );
        assert!(matches!(
            result,
            Err(ScoreError::InvalidProbability { offset_ms: 40, .. })
        ));

        let nan = Score::new(
            "t",
            120.0,
            vec![NoteGroup::new(0, ["snare"]).with_probability(f64::NAN)],
        );
        assert!(nan.is_err());
    }

    #[test]
    fn test_key_names() {
        let score = Score::new(
            "keys",
            120.0,
            vec![
                NoteGroup::new(0, ["bass_drum", "close_hi_hat"]),
                NoteGroup::new(500, ["snare", "close_hi_hat"]),
            ],
        )
        .unwrap();

        let names: Vec<&str> = score.key_names().into_iter().collect();
        assert_eq!(names, vec!["bass_drum", "close_hi_hat", "snare"]);
    }

    #[test]
    fn test_empty_score() {
        let score = Score::new("empty", DEFAULT_BPM, Vec::new()).unwrap();
        assert!(score.is_empty());
        assert_eq!(score.last_offset_ms(), None);
    }
}
