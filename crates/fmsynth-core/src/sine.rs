//! One-second sine lookup table.
//!
//! The table holds exactly one cycle of a sine over `sample_rate` entries,
//! i.e. a 1 Hz wave at the engine's sample rate. Advancing a phase index by a
//! frequency in whole Hz therefore produces that pitch directly, without a
//! separate `table_len / sample_rate` factor.

use crate::fixed::Fp32;
use std::sync::Arc;

/// Shared sine lookup table, built once per engine.
#[derive(Debug, Clone)]
pub struct SineTable {
    samples: Box<[Fp32]>,
}

impl SineTable {
    /// Build a table spanning `sample_rate` entries.
    ///
    /// A zero sample rate yields a single-entry silent table.
    pub fn new(sample_rate: u32) -> Self {
        let len = sample_rate.max(1) as usize;
        let samples = (0..len)
            .map(|i| {
                let phase = i as f64 / len as f64;
                Fp32::from_f64(libm::sin(2.0 * core::f64::consts::PI * phase))
            })
            .collect();
        Self { samples }
    }

    /// Build a table and wrap it for sharing between operators.
    pub fn shared(sample_rate: u32) -> Arc<Self> {
        Arc::new(Self::new(sample_rate))
    }

    /// Number of entries, equal to the sample rate it was built for.
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always `false`; a table has at least one entry.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Look up the sample at `phase`, wrapping out-of-range indices.
    #[inline]
    pub fn at(&self, phase: usize) -> Fp32 {
        self.samples[phase % self.samples.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_length_matches_rate() {
        let table = SineTable::new(48000);
        assert_eq!(table.len(), 48000);
    }

    #[test]
    fn test_quadrature_points() {
        let table = SineTable::new(48000);
        assert_eq!(table.at(0), Fp32::ZERO);
        assert_eq!(table.at(12000), Fp32::ONE);
        assert_eq!(table.at(36000), Fp32::MINUS_ONE);
        assert!(table.at(24000).abs().raw() <= 1);
    }

    #[test]
    fn test_lookup_wraps() {
        let table = SineTable::new(1000);
        assert_eq!(table.at(1250), table.at(250));
    }

    #[test]
    fn test_zero_rate_is_safe() {
        let table = SineTable::new(0);
        assert_eq!(table.len(), 1);
        assert_eq!(table.at(7), Fp32::ZERO);
    }
}
