//! Pluggable audio output abstraction.
//!
//! [`AudioBackend`] keeps the synthesizer independent of the platform audio
//! API. [`CpalBackend`](crate::CpalBackend) is the default implementation;
//! tests and offline rendering need no backend at all.
//!
//! Callbacks are boxed closures so the trait stays object-safe, and streams
//! come back as a type-erased [`StreamHandle`] that stops playback on drop.

use crate::Result;
use crate::queue::SampleConsumer;

/// Configuration for an output stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendStreamConfig {
    /// Requested sample rate in Hz.
    pub sample_rate: u32,
    /// Preferred buffer size in frames.
    pub buffer_size: u32,
    /// Number of interleaved output channels.
    pub channels: u16,
    /// Device name filter; the system default when `None`.
    pub device_name: Option<String>,
}

impl Default for BackendStreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            buffer_size: 256,
            channels: 2,
            device_name: None,
        }
    }
}

/// Type-erased stream handle. The stream runs until this is dropped.
pub struct StreamHandle {
    _inner: Box<dyn Send>,
}

impl StreamHandle {
    /// Keep `stream` alive for the lifetime of the handle.
    pub fn new<T: Send + 'static>(stream: T) -> Self {
        Self {
            _inner: Box::new(stream),
        }
    }
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle").finish_non_exhaustive()
    }
}

/// Fills an interleaved f32 buffer on the audio thread.
///
/// Runs in real time: no allocation, no locks, no I/O.
pub type OutputCallback = Box<dyn FnMut(&mut [f32]) + Send>;

/// Receives stream errors as text.
pub type ErrorCallback = Box<dyn FnMut(&str) + Send>;

/// A platform audio output.
pub trait AudioBackend: Send {
    /// Backend name, e.g. `"cpal"`.
    fn name(&self) -> &str;

    /// Name of the default output device, if there is one.
    fn default_output_device(&self) -> Result<Option<String>>;

    /// Names of all output devices.
    fn output_devices(&self) -> Result<Vec<String>>;

    /// Build and start an output stream driven by `callback`.
    fn build_output_stream(
        &self,
        config: &BackendStreamConfig,
        callback: OutputCallback,
        error_callback: ErrorCallback,
    ) -> Result<StreamHandle>;
}

/// Adapt a [`SampleConsumer`] into an [`OutputCallback`] for `channels`
/// interleaved channels.
pub fn queue_callback(mut consumer: SampleConsumer, channels: u16) -> OutputCallback {
    let channels = usize::from(channels);
    Box::new(move |data: &mut [f32]| {
        // underruns are counted by the queue
        consumer.fill_f32(data, channels);
    })
}

/// Play a sample queue through `backend`.
pub fn play_queue(
    backend: &dyn AudioBackend,
    config: &BackendStreamConfig,
    consumer: SampleConsumer,
) -> Result<StreamHandle> {
    backend.build_output_stream(
        config,
        queue_callback(consumer, config.channels),
        Box::new(|err: &str| tracing::error!(error = err, "audio stream error")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::sample_queue;
    use crate::stats::RenderStats;
    use fmsynth_core::Fp32;
    use std::sync::{Arc, Mutex};

    /// Calls the output callback once, synchronously, with a fixed buffer.
    struct OneShotBackend {
        frames: usize,
        captured: Arc<Mutex<Vec<f32>>>,
    }

    impl AudioBackend for OneShotBackend {
        fn name(&self) -> &str {
            "one-shot"
        }

        fn default_output_device(&self) -> Result<Option<String>> {
            Ok(None)
        }

        fn output_devices(&self) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        fn build_output_stream(
            &self,
            config: &BackendStreamConfig,
            mut callback: OutputCallback,
            _error_callback: ErrorCallback,
        ) -> Result<StreamHandle> {
            let mut buffer = vec![0.5f32; self.frames * usize::from(config.channels)];
            callback(&mut buffer);
            *self.captured.lock().unwrap() = buffer;
            Ok(StreamHandle::new(()))
        }
    }

    #[test]
    fn test_default_config() {
        let config = BackendStreamConfig::default();
        assert_eq!(config.sample_rate, 48000);
        assert_eq!(config.buffer_size, 256);
        assert_eq!(config.channels, 2);
        assert!(config.device_name.is_none());
    }

    #[test]
    fn test_stream_handle_debug() {
        let handle = StreamHandle::new(42u32);
        assert!(format!("{handle:?}").contains("StreamHandle"));
    }

    #[test]
    fn test_play_queue_interleaves_mono() {
        let stats = Arc::new(RenderStats::new(4, 48000));
        let (mut tx, rx) = sample_queue(16, Arc::clone(&stats));
        tx.push(&[Fp32::ONE, Fp32::from_f64(0.5), Fp32::ZERO]);

        let captured = Arc::new(Mutex::new(Vec::new()));
        let backend = OneShotBackend {
            frames: 4,
            captured: Arc::clone(&captured),
        };
        let _stream = play_queue(&backend, &BackendStreamConfig::default(), rx).unwrap();

        assert_eq!(
            *captured.lock().unwrap(),
            vec![1.0, 1.0, 0.5, 0.5, 0.0, 0.0, 0.0, 0.0]
        );
        assert_eq!(stats.underruns(), 1);
    }
}
