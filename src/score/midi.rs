// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Drum score import from Standard MIDI Files.
//!
//! Only the drum track is read: the first track carrying events on MIDI
//! channel 10 (index 9), or the first track when none does. Note-ons are
//! mapped through the General MIDI percussion key map, grouped by their
//! millisecond offset, and shifted so the first hit lands at 0.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use tracing::{debug, info, warn};

use super::{RawNote, ScoreFile};

/// MIDI file extensions that [`convert_dir`] picks up
pub const MIDI_EXTENSIONS: &[&str] = &["mid", "midi"];

/// Channel 10 in 0-based numbering
pub const DRUM_CHANNEL: u8 = 9;

const DEFAULT_TICKS_PER_BEAT: f64 = 480.0;
const DEFAULT_US_PER_BEAT: u32 = 500_000;

/// Key identifier for a General MIDI percussion note
pub fn gm_drum_name(key: u8) -> Option<&'static str> {
    let name = match key {
        35 | 36 => "bass_drum",
        38 | 40 => "snare",
        // Closed, pedal and open hi-hat
        42 | 44 | 46 => "close_hi_hat",
        41 | 43 => "floor_tom",
        45 | 47 => "low_tom",
        48 | 50 => "high_tom",
        49 | 57 => "crash_cymbal",
        // Ride 1, ride 2 and ride bell
        51 | 53 | 59 => "ride_cymbal",
        _ => return None,
    };
    Some(name)
}

fn is_drum_track(track: &[TrackEvent<'_>]) -> bool {
    track.iter().any(|event| {
        matches!(event.kind, TrackEventKind::Midi { channel, .. } if channel.as_int() == DRUM_CHANNEL)
    })
}

/// Convert an in-memory MIDI file into a score
pub fn convert(data: &[u8], title: &str) -> Result<ScoreFile> {
    let smf = Smf::parse(data).context("Failed to parse MIDI data")?;

    let ticks_per_beat = match smf.header.timing {
        Timing::Metrical(ticks) if ticks.as_int() > 0 => ticks.as_int() as f64,
        _ => DEFAULT_TICKS_PER_BEAT,
    };

    // A tempo in a conductor track still applies to the drum track
    let mut us_per_beat = smf
        .tracks
        .iter()
        .flatten()
        .find_map(|event| match event.kind {
            TrackEventKind::Meta(MetaMessage::Tempo(tempo)) => Some(tempo.as_int()),
            _ => None,
        })
        .unwrap_or(DEFAULT_US_PER_BEAT);

    let track = match smf.tracks.iter().position(|t| is_drum_track(t)) {
        Some(index) => {
            debug!(track = index, "Found drum track");
            &smf.tracks[index]
        }
        None => {
            warn!("No track on MIDI channel 10, reading the first track");
            match smf.tracks.first() {
                Some(track) => track,
                None => bail!("MIDI file has no tracks"),
            }
        }
    };

    let mut hits: BTreeMap<u64, BTreeSet<String>> = BTreeMap::new();
    let mut now_ms = 0.0f64;
    for event in track {
        now_ms += event.delta.as_int() as f64 * us_per_beat as f64 / ticks_per_beat / 1000.0;

        match event.kind {
            TrackEventKind::Meta(MetaMessage::Tempo(tempo)) => us_per_beat = tempo.as_int(),
            TrackEventKind::Midi {
                channel,
                message: MidiMessage::NoteOn { key, vel },
            } if channel.as_int() == DRUM_CHANNEL && vel.as_int() > 0 => {
                match gm_drum_name(key.as_int()) {
                    Some(name) => {
                        hits.entry(now_ms.round() as u64)
                            .or_default()
                            .insert(name.to_string());
                    }
                    None => debug!(key = key.as_int(), "Unmapped percussion note"),
                }
            }
            _ => {}
        }
    }

    let Some(&first) = hits.keys().next() else {
        bail!("No drum notes found in MIDI data");
    };

    let bpm = (60_000_000.0 / us_per_beat.max(1) as f64).round();
    Ok(ScoreFile {
        title: title.to_string(),
        bpm,
        notes: hits
            .into_iter()
            .map(|(time, keys)| RawNote {
                time: time - first,
                note: keys.into_iter().collect(),
                probability: 1.0,
            })
            .collect(),
    })
}

/// Read a MIDI file, titling the score after the file stem
pub fn read<P: AsRef<Path>>(path: P) -> Result<ScoreFile> {
    let path = path.as_ref();
    let data = fs::read(path).with_context(|| format!("Failed to read MIDI file: {:?}", path))?;
    let title = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Untitled");
    convert(&data, title).with_context(|| format!("Failed to convert MIDI file: {:?}", path))
}

/// Outcome of a batch conversion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionSummary {
    /// JSON scores written
    pub converted: Vec<PathBuf>,
    /// MIDI files skipped because a score with the same name exists
    pub skipped: Vec<PathBuf>,
    /// MIDI files that failed to convert
    pub failed: Vec<PathBuf>,
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Convert every MIDI file in `midi_dir` into a JSON score in `out_dir`.
///
/// Unless `overwrite` is set, a MIDI file is skipped when `out_dir` already
/// holds a file with the same stem. Files that fail to convert are logged and
/// counted, they do not abort the batch.
pub fn convert_dir<P: AsRef<Path>, Q: AsRef<Path>>(
    midi_dir: P,
    out_dir: Q,
    overwrite: bool,
) -> Result<ConversionSummary> {
    let midi_dir = midi_dir.as_ref();
    let out_dir = out_dir.as_ref();
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create score directory: {:?}", out_dir))?;

    let existing: BTreeSet<String> = fs::read_dir(out_dir)
        .with_context(|| format!("Failed to read score directory: {:?}", out_dir))?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            entry
                .path()
                .file_stem()
                .and_then(|s| s.to_str())
                .map(str::to_string)
        })
        .collect();

    let mut sources = Vec::new();
    for entry in fs::read_dir(midi_dir)
        .with_context(|| format!("Failed to read MIDI directory: {:?}", midi_dir))?
    {
        let path = entry?.path();
        if path.is_file() && has_extension(&path, MIDI_EXTENSIONS) {
            sources.push(path);
        }
    }
    sources.sort();

    let mut summary = ConversionSummary::default();
    for source in sources {
        let Some(stem) = source.file_stem().and_then(|s| s.to_str()) else {
            summary.failed.push(source);
            continue;
        };
        if !overwrite && existing.contains(stem) {
            debug!(file = ?source, "Score already exists, skipping");
            summary.skipped.push(source);
            continue;
        }

        let target = out_dir.join(format!("{}.json", stem));
        let written = read(&source).and_then(|score| {
            let json = score.to_json()?;
            fs::write(&target, json)
                .with_context(|| format!("Failed to write score file: {:?}", target))
        });

        match written {
            Ok(()) => {
                info!(from = ?source, to = ?target, "Converted MIDI file");
                summary.converted.push(target);
            }
            Err(e) => {
                warn!("Skipping {:?}: {:#}", source, e);
                summary.failed.push(source);
            }
        }
    }

    Ok(summary)
}
