//! 16-bit mono WAV export for offline renders.

use crate::Result;
use fmsynth_core::Fp32;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::Path;

fn mono_spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// Write 16-bit PCM samples as a mono WAV file.
pub fn write_wav_i16<P: AsRef<Path>>(path: P, samples: &[i16], sample_rate: u32) -> Result<()> {
    let mut writer = WavWriter::create(path, mono_spec(sample_rate))?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Write fixed-point samples as a mono 16-bit WAV file, clipping to full
/// scale.
pub fn write_wav_fp32<P: AsRef<Path>>(path: P, samples: &[Fp32], sample_rate: u32) -> Result<()> {
    let mut writer = WavWriter::create(path, mono_spec(sample_rate))?;
    for &sample in samples {
        writer.write_sample(sample.to_i16())?;
    }
    writer.finalize()?;
    Ok(())
}

/// Read the first channel of a 16-bit WAV file. Returns the samples and the
/// sample rate.
pub fn read_wav_i16<P: AsRef<Path>>(path: P) -> Result<(Vec<i16>, u32)> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));
    let samples = reader
        .into_samples::<i16>()
        .step_by(channels)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok((samples, spec.sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_header_is_mono_16_bit() {
        let file = NamedTempFile::new().unwrap();
        write_wav_i16(file.path(), &[0, 1, -1], 44100).unwrap();

        let reader = WavReader::open(file.path()).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.sample_rate, 44100);
        assert_eq!(reader.len(), 3);
    }

    #[test]
    fn test_fp32_export_clips() {
        let file = NamedTempFile::new().unwrap();
        let samples = [
            Fp32::ZERO,
            Fp32::from_f64(0.5),
            Fp32::from_int(2),
            Fp32::from_int(-2),
        ];
        write_wav_fp32(file.path(), &samples, 48000).unwrap();

        let (read, rate) = read_wav_i16(file.path()).unwrap();
        assert_eq!(rate, 48000);
        assert_eq!(read, vec![0, 16384, i16::MAX, i16::MIN]);
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_wav_i16(dir.path().join("missing.wav")).is_err());
    }
}
