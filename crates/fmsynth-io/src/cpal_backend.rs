//! cpal output backend.
//!
//! Wraps [cpal](https://crates.io/crates/cpal): ALSA on Linux, CoreAudio on
//! macOS, WASAPI on Windows.
//!
//! ```rust,ignore
//! use fmsynth_io::{AudioBackend, BackendStreamConfig, CpalBackend};
//!
//! let backend = CpalBackend::new();
//! let stream = backend.build_output_stream(
//!     &BackendStreamConfig::default(),
//!     Box::new(|buffer: &mut [f32]| buffer.fill(0.0)),
//!     Box::new(|err: &str| eprintln!("audio error: {err}")),
//! )?;
//! // plays until `stream` is dropped
//! ```

use crate::backend::{
    AudioBackend, BackendStreamConfig, ErrorCallback, OutputCallback, StreamHandle,
};
use crate::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Host};

/// Device name via `description()` (cpal 0.17+).
fn device_name(device: &Device) -> std::result::Result<String, cpal::DeviceNameError> {
    device.description().map(|d| d.name().to_string())
}

/// Output through the platform's default cpal host.
pub struct CpalBackend {
    host: Host,
}

impl CpalBackend {
    /// Connect to the default host.
    pub fn new() -> Self {
        let host = cpal::default_host();
        tracing::info!(host = host.id().name(), "cpal backend initialized");
        Self { host }
    }

    /// First output device whose name contains `name` (case-insensitive), or
    /// the default device.
    fn find_output_device(&self, name: Option<&str>) -> Result<Device> {
        let Some(search) = name else {
            return self.host.default_output_device().ok_or(Error::NoDevice);
        };

        let search_lower = search.to_lowercase();
        let devices = self
            .host
            .output_devices()
            .map_err(|e| Error::Stream(e.to_string()))?;

        for device in devices {
            if let Ok(dev_name) = device_name(&device)
                && dev_name.to_lowercase().contains(&search_lower)
            {
                return Ok(device);
            }
        }
        Err(Error::DeviceNotFound(format!(
            "no output device matching '{search}'"
        )))
    }
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for CpalBackend {
    fn name(&self) -> &'static str {
        "cpal"
    }

    fn default_output_device(&self) -> Result<Option<String>> {
        Ok(self
            .host
            .default_output_device()
            .and_then(|d| device_name(&d).ok()))
    }

    fn output_devices(&self) -> Result<Vec<String>> {
        let devices = self
            .host
            .output_devices()
            .map_err(|e| Error::Stream(e.to_string()))?;
        Ok(devices.filter_map(|d| device_name(&d).ok()).collect())
    }

    fn build_output_stream(
        &self,
        config: &BackendStreamConfig,
        mut callback: OutputCallback,
        mut error_callback: ErrorCallback,
    ) -> Result<StreamHandle> {
        let device = self.find_output_device(config.device_name.as_deref())?;
        let name = device_name(&device).unwrap_or_else(|_| "<unnamed>".to_string());

        let stream_config = cpal::StreamConfig {
            channels: config.channels,
            sample_rate: config.sample_rate,
            buffer_size: cpal::BufferSize::Fixed(config.buffer_size),
        };

        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    callback(data);
                },
                move |err| {
                    error_callback(&err.to_string());
                },
                None,
            )
            .map_err(|e| Error::Stream(e.to_string()))?;

        stream.play().map_err(|e| Error::Stream(e.to_string()))?;
        tracing::info!(
            device = %name,
            channels = config.channels,
            sample_rate = config.sample_rate,
            buffer_size = config.buffer_size,
            "output stream started"
        );

        Ok(StreamHandle::new(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpal_backend_name() {
        let backend = CpalBackend::new();
        assert_eq!(backend.name(), "cpal");
    }

    #[test]
    fn test_default_output_device_does_not_fail() {
        // Availability depends on the machine; the query itself must succeed.
        let backend = CpalBackend::new();
        assert!(backend.default_output_device().is_ok());
    }

    #[test]
    fn test_unknown_device_name() {
        let backend = CpalBackend::new();
        let config = BackendStreamConfig {
            device_name: Some("no-such-device-fmsynth-test".to_string()),
            ..BackendStreamConfig::default()
        };
        let result = backend.build_output_stream(
            &config,
            Box::new(|_: &mut [f32]| {}),
            Box::new(|_: &str| {}),
        );
        assert!(matches!(
            result,
            Err(Error::DeviceNotFound(_) | Error::Stream(_))
        ));
    }
}
