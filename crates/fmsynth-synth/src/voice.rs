//! A single synthesis voice and pitch helpers.
//!
//! A voice is one [`Algorithm`] behind one VCA [`AdsrEnvelope`]. It has no
//! explicit on/off state; instead it keeps the stack of notes currently held
//! on it. The top of the stack is the sounding pitch, so releasing the top
//! note while others are still held glides back to the previous one.

use crate::algorithm::{Algorithm, OperatorLayout, create_algorithm};
use crate::envelope::{AdsrEnvelope, Envelope};
use crate::error::Result;
use crate::mixer::Source;
use fmsynth_core::{Fp32, ParamId, Patch, SineTable};
use std::sync::Arc;

/// Highest MIDI note or velocity value.
pub const MIDI_MAX: u8 = 127;

/// Held notes per voice; every MIDI note fits without reallocating.
pub const NOTE_STACK_CAPACITY: usize = MIDI_MAX as usize + 1;

/// Convert a MIDI note number to a frequency in Hz (A4 = 69 = 440 Hz).
///
/// ```rust
/// use fmsynth_core::Fp32;
/// use fmsynth_synth::note_to_freq;
///
/// assert_eq!(note_to_freq(69), Fp32::from_int(440));
/// assert_eq!(note_to_freq(81), Fp32::from_int(880));
/// ```
pub fn note_to_freq(note: u8) -> Fp32 {
    let semitones = f64::from(note.min(MIDI_MAX)) - 69.0;
    Fp32::from_f64(440.0 * libm::pow(2.0, semitones / 12.0))
}

/// A voice's algorithm and VCA already wired to a new patch.
pub(crate) struct StagedVoice {
    algorithm: Box<dyn Algorithm>,
    vca: AdsrEnvelope,
}

/// One polyphonic voice.
pub struct Voice {
    algorithm: Box<dyn Algorithm>,
    vca: AdsrEnvelope,
    notes: Vec<u8>,
}

impl core::fmt::Debug for Voice {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Voice")
            .field("algorithm", &self.algorithm.name())
            .field("vca", &self.vca.state())
            .field("notes", &self.notes)
            .finish()
    }
}

impl Voice {
    /// Wrap an algorithm with a VCA wired to `patch`.
    pub fn new(algorithm: Box<dyn Algorithm>, patch: &Patch) -> Result<Self> {
        Ok(Self {
            algorithm,
            vca: AdsrEnvelope::new(ParamId::GROUP_VCA, patch)?,
            notes: Vec::with_capacity(NOTE_STACK_CAPACITY),
        })
    }

    /// Build a voice with a fresh algorithm of `layout`.
    pub fn with_layout(
        layout: OperatorLayout,
        table: Arc<SineTable>,
        patch: &Patch,
    ) -> Result<Self> {
        Self::new(create_algorithm(layout, table, patch)?, patch)
    }

    /// Press a note. Out-of-range values are clamped.
    ///
    /// The first held note triggers the envelopes; further notes retrigger
    /// them, which only restarts envelopes whose retrigger flag is set.
    pub fn note_on(&mut self, note: u8, velocity: u8) {
        let note = note.min(MIDI_MAX);
        let velocity = velocity.min(MIDI_MAX);

        // A re-pressed note moves to the top rather than staying where it
        // was: the top must be the pitch just triggered, or a later note-off
        // of the top would glide to a note the player pressed again.
        self.notes.retain(|&n| n != note);
        let legato = !self.notes.is_empty();
        self.notes.push(note);

        let freq = note_to_freq(note);
        if legato {
            self.algorithm.retrigger(freq);
            self.vca.retrigger();
        } else {
            self.algorithm.trigger(freq, velocity);
            self.vca.trigger();
        }
    }

    /// Release a note. Notes not held on this voice are ignored.
    pub fn note_off(&mut self, note: u8) {
        let note = note.min(MIDI_MAX);
        let before = self.notes.len();
        self.notes.retain(|&n| n != note);
        if self.notes.len() == before {
            return;
        }

        match self.notes.last() {
            Some(&top) => {
                self.algorithm.retrigger(note_to_freq(top));
                self.vca.retrigger();
            }
            None => {
                self.algorithm.release();
                self.vca.release();
            }
        }
    }

    /// Drop every held note and release.
    pub fn release_all(&mut self) {
        if self.notes.is_empty() {
            return;
        }
        self.notes.clear();
        self.algorithm.release();
        self.vca.release();
    }

    /// The most recently pressed held note, or 0 when none is held.
    pub fn cur_note(&self) -> u8 {
        self.notes.last().copied().unwrap_or(0)
    }

    /// Held notes, oldest first.
    pub fn notes(&self) -> &[u8] {
        &self.notes
    }

    /// Returns `true` while the VCA is producing output.
    pub fn is_sounding(&self) -> bool {
        self.vca.is_active()
    }

    /// The amplifier envelope.
    pub fn vca(&self) -> &AdsrEnvelope {
        &self.vca
    }

    /// Name of the algorithm topology in use.
    pub fn algorithm_name(&self) -> &'static str {
        self.algorithm.name()
    }

    /// Re-resolve parameter handles for the algorithm and VCA.
    ///
    /// On error the voice keeps its previous wiring.
    pub fn apply_patch(&mut self, patch: &Patch) -> Result<()> {
        let staged = self.stage_patch(patch)?;
        self.commit(staged);
        Ok(())
    }

    /// Rewired copies of the algorithm and VCA, with their current state.
    pub(crate) fn stage_patch(&self, patch: &Patch) -> Result<StagedVoice> {
        let mut algorithm = self.algorithm.clone();
        algorithm.apply_patch(patch)?;
        let mut vca = self.vca.clone();
        vca.apply_patch(patch)?;
        Ok(StagedVoice { algorithm, vca })
    }

    /// Swap in a staged rewiring. Held notes are kept.
    pub(crate) fn commit(&mut self, staged: StagedVoice) {
        self.algorithm = staged.algorithm;
        self.vca = staged.vca;
    }

    /// Render the next block: algorithm output through the VCA.
    pub fn render(&mut self, out: &mut [Fp32]) {
        self.algorithm.render(out);
        for sample in out.iter_mut() {
            *sample = self.vca.scale(*sample);
        }
    }
}

impl Source for Voice {
    fn render(&mut self, out: &mut [Fp32]) {
        Voice::render(self, out);
    }
}
