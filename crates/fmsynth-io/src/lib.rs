//! Audio I/O layer for fmsynth.
//!
//! This crate provides:
//!
//! - **Render thread**: [`RenderThread`] owns the [`Engine`](fmsynth_synth::Engine)
//!   and applies [`EngineCommand`]s between blocks
//! - **Sample queue**: [`sample_queue`] hands blocks to the audio callback
//!   without blocking either side
//! - **Instrumentation**: [`RenderStats`] counts blocks, render time,
//!   underruns and dropped samples
//! - **Audio output**: the [`AudioBackend`] trait and its [`CpalBackend`]
//!   implementation
//! - **WAV export**: [`write_wav_i16`] / [`write_wav_fp32`] for offline renders
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use fmsynth_io::{BackendStreamConfig, CpalBackend, RenderStats, RenderThread, play_queue, sample_queue};
//! use fmsynth_synth::{Engine, OperatorLayout};
//!
//! let engine = Engine::new(48000, 8, OperatorLayout::FourOp)?;
//! let stats = Arc::new(RenderStats::new(256, 48000));
//! let (producer, consumer) = sample_queue(256 * 8, Arc::clone(&stats));
//!
//! let render = RenderThread::spawn(engine, producer, 256, stats)?;
//! let _stream = play_queue(&CpalBackend::new(), &BackendStreamConfig::default(), consumer)?;
//! ```

pub mod backend;
mod cpal_backend;
mod queue;
mod render;
mod stats;
mod wav;

pub use backend::{
    AudioBackend, BackendStreamConfig, ErrorCallback, OutputCallback, StreamHandle, play_queue,
    queue_callback,
};
pub use cpal_backend::CpalBackend;
pub use queue::{FillStatus, SampleConsumer, SampleProducer, sample_queue};
pub use render::{COMMAND_QUEUE_CAPACITY, EngineCommand, IDLE_SLEEP, RenderThread};
pub use stats::{RenderStats, StatsSnapshot};
pub use wav::{read_wav_i16, write_wav_fp32, write_wav_i16};

/// Error types for audio I/O.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// Audio stream setup or runtime error.
    #[error("Audio stream error: {0}")]
    Stream(String),

    /// No audio device available on the system.
    #[error("No audio device available")]
    NoDevice,

    /// The requested audio device was not found.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The render thread could not be started.
    #[error("failed to spawn render thread: {0}")]
    ThreadSpawn(#[source] std::io::Error),
}

/// Convenience result type for audio I/O.
pub type Result<T> = std::result::Result<T, Error>;
