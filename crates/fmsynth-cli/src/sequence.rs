//! Note sequences given on the command line.
//!
//! A sequence is a comma-separated list of `note:velocity:start:duration`
//! entries, with times in seconds: `"60:100:0:1,64:100:0.5:1"`.

use fmsynth_synth::{MIDI_MAX, MidiMessage};
use std::str::FromStr;

/// Sequence played when none is given: A4 for one second.
pub const DEFAULT_SEQUENCE: &str = "69:100:0:1";

/// Longest sequence, and longest release tail, in seconds.
///
/// Bounds the sample buffer `render` allocates.
pub const MAX_SECONDS: f64 = 300.0;

/// One note of a sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteEvent {
    /// MIDI note number.
    pub note: u8,
    /// Note-on velocity, 1-127.
    pub velocity: u8,
    /// Onset in seconds.
    pub start: f64,
    /// Gate length in seconds.
    pub duration: f64,
}

impl FromStr for NoteEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.trim().split(':').collect();
        let &[note, velocity, start, duration] = fields.as_slice() else {
            return Err(format!(
                "invalid note '{s}' (expected note:velocity:start:duration)"
            ));
        };

        let note: u8 = note
            .parse()
            .map_err(|_| format!("invalid note number '{note}'"))?;
        if note > MIDI_MAX {
            return Err(format!("note {note} out of range [0, {MIDI_MAX}]"));
        }
        let velocity: u8 = velocity
            .parse()
            .map_err(|_| format!("invalid velocity '{velocity}'"))?;
        if !(1..=127).contains(&velocity) {
            return Err(format!("velocity {velocity} out of range [1, 127]"));
        }
        let start = parse_seconds("start", start)?;
        let duration = parse_seconds("duration", duration)?;

        Ok(Self {
            note,
            velocity,
            start,
            duration,
        })
    }
}

fn parse_seconds(what: &str, s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|_| format!("invalid {what} '{s}'"))?;
    if !value.is_finite() || value < 0.0 {
        return Err(format!("{what} must be a non-negative number of seconds"));
    }
    if value > MAX_SECONDS {
        return Err(format!("{what} {value}s exceeds the {MAX_SECONDS}s limit"));
    }
    Ok(value)
}

/// Parse a release tail in seconds, for `--tail`.
pub fn parse_tail(s: &str) -> Result<f64, String> {
    parse_seconds("tail", s)
}

/// A MIDI message due at a sample offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedMessage {
    /// Offset from the start of the sequence, in samples.
    pub sample: u64,
    /// The message.
    pub message: MidiMessage,
}

/// A parsed note sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    events: Vec<NoteEvent>,
}

impl Sequence {
    /// Parse a comma-separated sequence.
    pub fn parse(s: &str) -> Result<Self, String> {
        let events = s
            .split(',')
            .filter(|entry| !entry.trim().is_empty())
            .map(str::parse)
            .collect::<Result<Vec<NoteEvent>, _>>()?;
        if events.is_empty() {
            return Err("sequence has no notes".to_string());
        }
        let seq = Self { events };
        if seq.end() > MAX_SECONDS {
            return Err(format!(
                "sequence ends at {}s, past the {MAX_SECONDS}s limit",
                seq.end()
            ));
        }
        Ok(seq)
    }

    /// The notes in the order given.
    pub fn events(&self) -> &[NoteEvent] {
        &self.events
    }

    /// Time of the last note-off, in seconds.
    pub fn end(&self) -> f64 {
        self.events
            .iter()
            .map(|e| e.start + e.duration)
            .fold(0.0, f64::max)
    }

    /// Note-on and note-off messages at `sample_rate`, sorted by time.
    ///
    /// At equal times note-offs come first, so a note that ends exactly
    /// where its repeat begins is retriggered rather than cut. Every note
    /// is held for at least one sample.
    pub fn timeline(&self, sample_rate: u32) -> Vec<TimedMessage> {
        let to_samples = |secs: f64| (secs * f64::from(sample_rate)).round() as u64;

        let mut timeline: Vec<TimedMessage> = self
            .events
            .iter()
            .flat_map(|e| {
                let on = to_samples(e.start);
                let off = to_samples(e.start + e.duration).max(on + 1);
                [
                    TimedMessage {
                        sample: on,
                        message: MidiMessage::NoteOn {
                            channel: 0,
                            note: e.note,
                            velocity: e.velocity,
                        },
                    },
                    TimedMessage {
                        sample: off,
                        message: MidiMessage::NoteOff {
                            channel: 0,
                            note: e.note,
                            velocity: 0,
                        },
                    },
                ]
            })
            .collect();

        timeline.sort_by_key(|t| (t.sample, matches!(t.message, MidiMessage::NoteOn { .. })));
        timeline
    }
}

impl FromStr for Sequence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
