//! Error types for engine construction and patch wiring.

use fmsynth_core::PatchError;
use thiserror::Error;

/// Errors raised while building or rewiring the synthesis engine.
///
/// All of these are wiring errors: they occur in constructors and
/// `apply_patch`, never while rendering.
#[derive(Debug, Error)]
pub enum Error {
    /// A parameter the engine reads is missing or has the wrong kind.
    #[error("patch wiring failed: {0}")]
    Patch(#[from] PatchError),

    /// A topology left other than exactly one operator carrying feedback.
    #[error("algorithm '{algorithm}' wired feedback to {count} operators, expected exactly one")]
    FeedbackWiring {
        /// Topology name.
        algorithm: &'static str,
        /// Operators found with feedback bound.
        count: usize,
    },

    /// The voice pool must hold at least one voice.
    #[error("invalid voice count: {0}")]
    InvalidVoiceCount(usize),

    /// The sine table needs a positive sample rate.
    #[error("invalid sample rate: {0}")]
    InvalidSampleRate(u32),
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
