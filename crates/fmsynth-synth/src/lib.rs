//! fmsynth Synth - FM synthesis engine
//!
//! This crate turns a [`Patch`](fmsynth_core::Patch) and a stream of MIDI
//! events into fixed-point audio.
//!
//! # Core Components
//!
//! ## Envelopes
//!
//! Tick-based envelopes that read their times and levels live from the patch:
//!
//! - [`AdeEnvelope`] - attack/decay/end-level envelope scaling a modulation index
//! - [`AdsrEnvelope`] - attack/decay/sustain/release amplifier envelope
//! - [`EnvelopeState`] - stage tracking shared by both
//!
//! ## Operators and Algorithms
//!
//! - [`Operator`] - phase-accumulating sine oscillator with a frequency ratio
//!   and optional self-feedback
//! - [`TwoOpAlgorithm`] - one modulator into one carrier
//! - [`FourOpAlgorithm`] - four operators, switching between the
//!   [`TOPOLOGIES`] at render time
//!
//! ## Voices and the Engine
//!
//! - [`Voice`] - an algorithm behind a VCA, with a stack of held notes
//! - [`Mixer`] - sums voices with `1/N` attenuation
//! - [`Engine`] - voice allocation, MIDI dispatch and mixing
//!
//! # Example
//!
//! ```rust
//! use fmsynth_core::Fp32;
//! use fmsynth_synth::{Engine, MidiMessage, OperatorLayout};
//!
//! let mut engine = Engine::new(48000, 4, OperatorLayout::FourOp).unwrap();
//! engine.handle_midi(MidiMessage::from_bytes(&[0x90, 60, 100]).unwrap());
//!
//! let mut block = vec![Fp32::ZERO; 512];
//! engine.render(&mut block);
//! let pcm: Vec<i16> = block.iter().map(|s| s.to_i16()).collect();
//! assert!(pcm.iter().any(|&s| s != 0));
//! ```

pub mod algorithm;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod four_op;
pub mod midi;
pub mod mixer;
pub mod operator;
pub mod two_op;
pub mod voice;

pub use algorithm::{Algorithm, OperatorLayout, create_algorithm, cross_mix};
pub use engine::{Engine, NOTE_COUNT};
pub use envelope::{AdeEnvelope, AdsrEnvelope, Envelope, EnvelopeState, TICK_SAMPLES};
pub use error::{Error, Result};
pub use four_op::{
    ALGORITHM_COUNT, FourOpAlgorithm, OperatorSlot, Operators, TOPOLOGIES, Topology,
    algorithm_count, topology_index,
};
pub use midi::{CC_ALL_NOTES_OFF, MidiMessage};
pub use mixer::{Mixer, Source};
pub use operator::Operator;
pub use two_op::TwoOpAlgorithm;
pub use voice::{MIDI_MAX, Voice, note_to_freq};
