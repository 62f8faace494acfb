//! Polyphonic engine: voice allocation, MIDI dispatch and mixing.
//!
//! The engine owns a fixed pool of [`Voice`]s sharing one [`Patch`] and one
//! sine table. A note goes to the first idle voice; with none idle, the voice
//! whose current note is nearest in pitch is stolen, which keeps the jump in
//! pitch on the stolen voice small. The note keeps that voice until it is
//! released, so note-off always reaches the voice that owns it.

use crate::algorithm::OperatorLayout;
use crate::error::{Error, Result};
use crate::four_op::algorithm_count;
use crate::midi::{CC_ALL_NOTES_OFF, MidiMessage};
use crate::mixer::Mixer;
use crate::voice::{MIDI_MAX, Voice};
use fmsynth_core::{Fp32, Patch, SineTable};
use std::sync::Arc;

/// Number of MIDI notes.
pub const NOTE_COUNT: usize = MIDI_MAX as usize + 1;

/// The synthesis engine.
///
/// ```rust
/// use fmsynth_core::Fp32;
/// use fmsynth_synth::{Engine, OperatorLayout};
///
/// let mut engine = Engine::new(48000, 8, OperatorLayout::FourOp).unwrap();
/// engine.note_on(69, 100);
///
/// let mut block = vec![Fp32::ZERO; 256];
/// engine.render(&mut block);
/// assert!(block.iter().any(|s| !s.is_zero()));
/// ```
#[derive(Debug)]
pub struct Engine {
    sample_rate: u32,
    layout: OperatorLayout,
    table: Arc<SineTable>,
    patch: Arc<Patch>,
    voices: Vec<Voice>,
    mixer: Mixer,
    note_map: [Option<usize>; NOTE_COUNT],
}

impl Engine {
    /// Build an engine with the initial patch.
    pub fn new(sample_rate: u32, voice_count: usize, layout: OperatorLayout) -> Result<Self> {
        let patch = Arc::new(Patch::initial(algorithm_count())?);
        Self::with_patch(sample_rate, voice_count, layout, patch)
    }

    /// Build an engine reading `patch`.
    pub fn with_patch(
        sample_rate: u32,
        voice_count: usize,
        layout: OperatorLayout,
        patch: Arc<Patch>,
    ) -> Result<Self> {
        if sample_rate == 0 {
            return Err(Error::InvalidSampleRate(sample_rate));
        }
        if voice_count == 0 {
            return Err(Error::InvalidVoiceCount(voice_count));
        }

        let table = SineTable::shared(sample_rate);
        let voices = (0..voice_count)
            .map(|_| Voice::with_layout(layout, Arc::clone(&table), &patch))
            .collect::<Result<Vec<_>>>()?;

        tracing::info!(
            sample_rate,
            voices = voice_count,
            %layout,
            algorithm = voices[0].algorithm_name(),
            "engine ready"
        );

        Ok(Self {
            sample_rate,
            layout,
            table,
            patch,
            mixer: Mixer::new(voice_count),
            voices,
            note_map: [None; NOTE_COUNT],
        })
    }

    /// Sample rate the sine table was built for.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Algorithm family of every voice.
    pub fn layout(&self) -> OperatorLayout {
        self.layout
    }

    /// The shared patch.
    pub fn patch(&self) -> &Arc<Patch> {
        &self.patch
    }

    /// The shared sine table.
    pub fn table(&self) -> &Arc<SineTable> {
        &self.table
    }

    /// Number of voices.
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    /// Voice `index`.
    pub fn voice(&self, index: usize) -> Option<&Voice> {
        self.voices.get(index)
    }

    /// All voices.
    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    /// Voices whose VCA is still producing output.
    pub fn active_voice_count(&self) -> usize {
        self.voices.iter().filter(|v| v.is_sounding()).count()
    }

    /// The mixer, for per-voice levels.
    pub fn mixer_mut(&mut self) -> &mut Mixer {
        &mut self.mixer
    }

    /// Voice currently owning `note`.
    pub fn owner(&self, note: u8) -> Option<usize> {
        self.note_map
            .get(usize::from(note.min(MIDI_MAX)))
            .copied()
            .flatten()
    }

    /// The voice a note-on for `note` would use.
    ///
    /// A note that already owns a voice keeps it. Otherwise the first voice
    /// with no held note wins, then the voice whose current note is nearest
    /// in semitones; ties keep the lower index.
    pub fn voice_for(&self, note: u8) -> Option<usize> {
        let note = note.min(MIDI_MAX);
        if let Some(owner) = self.owner(note) {
            return Some(owner);
        }

        let mut best: Option<(usize, u8)> = None;
        for (i, voice) in self.voices.iter().enumerate() {
            let current = voice.cur_note();
            if current == 0 {
                return Some(i);
            }
            let distance = current.abs_diff(note);
            if best.is_none_or(|(_, d)| distance < d) {
                best = Some((i, distance));
            }
        }
        best.map(|(i, _)| i)
    }

    /// Start a note. Out-of-range values are clamped.
    pub fn note_on(&mut self, note: u8, velocity: u8) {
        let note = note.min(MIDI_MAX);
        let Some(index) = self.voice_for(note) else {
            tracing::warn!(note, "no voice available");
            return;
        };

        let voice = &mut self.voices[index];
        tracing::debug!(
            note,
            velocity,
            voice = index,
            replacing = voice.cur_note(),
            "note on"
        );
        self.note_map[usize::from(note)] = Some(index);
        voice.note_on(note, velocity);
    }

    /// Release a note on the voice that owns it. Unowned notes are ignored.
    pub fn note_off(&mut self, note: u8) {
        let note = note.min(MIDI_MAX);
        match self.note_map[usize::from(note)].take() {
            Some(index) => {
                tracing::debug!(note, voice = index, "note off");
                self.voices[index].note_off(note);
            }
            None => tracing::debug!(note, "note off for unowned note"),
        }
    }

    /// Route a control change. CC 123 releases every note; other numbers go
    /// to the patch. Returns whether anything consumed it.
    pub fn control_change(&mut self, controller: u8, value: u8) -> bool {
        if controller == CC_ALL_NOTES_OFF {
            self.all_notes_off();
            return true;
        }
        self.patch.handle_cc(controller, value.min(MIDI_MAX))
    }

    /// Release every voice and forget all note ownership.
    pub fn all_notes_off(&mut self) {
        tracing::debug!("all notes off");
        self.note_map = [None; NOTE_COUNT];
        for voice in &mut self.voices {
            voice.release_all();
        }
    }

    /// Dispatch a decoded MIDI message.
    pub fn handle_midi(&mut self, message: MidiMessage) {
        match message {
            MidiMessage::NoteOn { note, velocity, .. } => self.note_on(note, velocity),
            MidiMessage::NoteOff { note, .. } => self.note_off(note),
            MidiMessage::ControlChange {
                controller, value, ..
            } => {
                self.control_change(controller, value);
            }
            MidiMessage::Other { status } => {
                tracing::debug!(status = format_args!("{status:#04x}"), "ignoring MIDI message");
            }
        }
    }

    /// Rewire every voice to `patch`.
    ///
    /// Every voice is rewired on a copy first; the copies replace the live
    /// voices only once all of them succeed, so on error the engine keeps
    /// the old patch throughout. Held notes and envelope state carry over.
    pub fn apply_patch(&mut self, patch: Arc<Patch>) -> Result<()> {
        let staged = self
            .voices
            .iter()
            .map(|voice| voice.stage_patch(&patch))
            .collect::<Result<Vec<_>>>()?;
        for (voice, staged) in self.voices.iter_mut().zip(staged) {
            voice.commit(staged);
        }
        tracing::debug!(params = patch.len(), "patch applied");
        self.patch = patch;
        Ok(())
    }

    /// Render and mix all voices into `out`.
    pub fn render(&mut self, out: &mut [Fp32]) {
        self.mixer.render(&mut self.voices, out);
    }
}
