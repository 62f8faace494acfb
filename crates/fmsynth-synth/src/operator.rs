//! Phase-modulated sine operator.

use crate::error::Result;
use fmsynth_core::{Fp32, Fp32Param, ParamId, Patch, SineTable};
use std::sync::Arc;

/// A single sine oscillator whose phase can be modulated.
///
/// The phase is an index into a [`SineTable`] spanning one second, so
/// advancing it by a frequency in whole Hz yields that pitch.
///
/// ```rust
/// use fmsynth_core::{Fp32, ParamId, Patch, SineTable};
/// use fmsynth_synth::Operator;
///
/// let patch = Patch::initial(4).unwrap();
/// let table = SineTable::shared(48000);
/// let mut op = Operator::new(ParamId::GROUP_C, table, &patch).unwrap();
///
/// // 12 kHz is a quarter of the table per sample
/// let peak = op.rotate(Fp32::from_int(12000), Fp32::ZERO);
/// assert_eq!(peak, Fp32::ONE);
/// ```
#[derive(Debug, Clone)]
pub struct Operator {
    group: ParamId,
    table: Arc<SineTable>,
    phase: usize,
    ratio: Fp32Param,
    feedback: Option<Fp32Param>,
}

impl Operator {
    /// Build an operator reading the ratio of `group`.
    pub fn new(group: ParamId, table: Arc<SineTable>, patch: &Patch) -> Result<Self> {
        Ok(Self {
            group,
            table,
            phase: 0,
            ratio: patch.fp32_param(ParamId::OPR_RATIO | group)?,
            feedback: None,
        })
    }

    /// Operator group (A, B1, B2 or C).
    pub fn group(&self) -> ParamId {
        self.group
    }

    /// Re-resolve the ratio handle.
    pub fn apply_patch(&mut self, patch: &Patch) -> Result<()> {
        self.ratio = patch.fp32_param(ParamId::OPR_RATIO | self.group)?;
        Ok(())
    }

    /// Route a feedback amount to this operator.
    pub fn bind_feedback(&mut self, feedback: Fp32Param) {
        self.feedback = Some(feedback);
    }

    /// Remove any feedback routing.
    pub fn clear_feedback(&mut self) {
        self.feedback = None;
    }

    /// Returns `true` if a feedback amount is routed here.
    pub fn has_feedback(&self) -> bool {
        self.feedback.is_some()
    }

    /// Current table index.
    pub fn phase(&self) -> usize {
        self.phase
    }

    /// Return to phase zero.
    pub fn reset(&mut self) {
        self.phase = 0;
    }

    #[inline]
    fn advance(&mut self, step: i32) {
        let len = self.table.len() as i64;
        self.phase = (self.phase as i64 + i64::from(step)).rem_euclid(len) as usize;
    }

    /// Advance one sample at `freq * ratio + phase_mod` and return the output.
    ///
    /// With feedback bound and non-zero, the first sample offsets the phase a
    /// second time and the re-read sample is returned.
    #[inline]
    pub fn rotate(&mut self, freq: Fp32, phase_mod: Fp32) -> Fp32 {
        let f = freq.mul(self.ratio.value()) + phase_mod;
        self.advance(f.raw() >> 16);
        let sample = self.table.at(self.phase);

        match &self.feedback {
            Some(fb) => {
                let amount = fb.value();
                if amount.is_zero() {
                    return sample;
                }
                self.advance(sample.mul(amount).raw() >> 16);
                self.table.at(self.phase)
            }
            None => sample,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: u32 = 48000;

    fn operator(group: ParamId) -> (Patch, Operator) {
        let patch = Patch::initial(4).unwrap();
        let op = Operator::new(group, SineTable::shared(SR), &patch).unwrap();
        (patch, op)
    }

    #[test]
    fn test_phase_advances_by_frequency() {
        let (_patch, mut op) = operator(ParamId::GROUP_A);
        op.rotate(Fp32::from_int(440), Fp32::ZERO);
        assert_eq!(op.phase(), 440);
        op.rotate(Fp32::from_int(440), Fp32::ZERO);
        assert_eq!(op.phase(), 880);
    }

    #[test]
    fn test_ratio_scales_frequency() {
        let (patch, mut op) = operator(ParamId::GROUP_B1);
        patch
            .set(ParamId::OPR_RATIO | ParamId::GROUP_B1, Fp32::from_f64(2.0))
            .unwrap();
        op.rotate(Fp32::from_int(100), Fp32::ZERO);
        assert_eq!(op.phase(), 200);
    }

    #[test]
    fn test_phase_wraps() {
        let (_patch, mut op) = operator(ParamId::GROUP_C);
        for _ in 0..5 {
            op.rotate(Fp32::from_int(10000), Fp32::ZERO);
        }
        assert_eq!(op.phase(), 2000);
    }

    #[test]
    fn test_negative_modulation_never_goes_below_zero() {
        let (_patch, mut op) = operator(ParamId::GROUP_C);
        let sample = op.rotate(Fp32::ZERO, Fp32::from_int(-100));
        assert_eq!(op.phase(), (SR - 100) as usize);
        assert!(sample < Fp32::ZERO);
    }

    #[test]
    fn test_full_cycle_returns_to_start() {
        let (_patch, mut op) = operator(ParamId::GROUP_A);
        let mut out = Vec::new();
        for _ in 0..(SR / 1000) {
            out.push(op.rotate(Fp32::from_int(1000), Fp32::ZERO));
        }
        assert_eq!(op.phase(), 0);
        assert!(out.iter().any(|s| *s > Fp32::from_f64(0.9)));
        assert!(out.iter().any(|s| *s < Fp32::from_f64(-0.9)));
    }

    #[test]
    fn test_zero_feedback_is_transparent() {
        let (patch, mut plain) = operator(ParamId::GROUP_A);
        let mut with_fb = plain.clone();
        with_fb.bind_feedback(patch.fp32_param(ParamId::PATCH_FEEDBACK).unwrap());
        for _ in 0..100 {
            assert_eq!(
                plain.rotate(Fp32::from_int(440), Fp32::ZERO),
                with_fb.rotate(Fp32::from_int(440), Fp32::ZERO)
            );
        }
    }

    #[test]
    fn test_feedback_offsets_phase() {
        let (patch, mut op) = operator(ParamId::GROUP_A);
        patch
            .set(ParamId::PATCH_FEEDBACK, Fp32::from_int(100))
            .unwrap();
        op.bind_feedback(patch.fp32_param(ParamId::PATCH_FEEDBACK).unwrap());
        assert!(op.has_feedback());

        // quarter cycle lands on the peak, feedback pushes 100 further
        op.rotate(Fp32::from_int(12000), Fp32::ZERO);
        assert_eq!(op.phase(), 12100);

        op.clear_feedback();
        op.reset();
        op.rotate(Fp32::from_int(12000), Fp32::ZERO);
        assert_eq!(op.phase(), 12000);
    }
}
