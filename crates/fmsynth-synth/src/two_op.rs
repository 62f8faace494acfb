//! Two-operator algorithm: one modulator into one carrier.

use crate::algorithm::Algorithm;
use crate::envelope::{AdeEnvelope, Envelope};
use crate::error::Result;
use crate::operator::Operator;
use fmsynth_core::{Fp32, ParamId, Patch, SineTable};
use std::sync::Arc;

/// Modulator M (group A, carrying the global feedback) phase-modulates
/// carrier C (group C). Envelope A scales the modulation index.
#[derive(Debug, Clone)]
pub struct TwoOpAlgorithm {
    modulator: Operator,
    carrier: Operator,
    env: AdeEnvelope,
    freq: Fp32,
}

impl TwoOpAlgorithm {
    /// Build and wire to `patch`.
    pub fn new(table: Arc<SineTable>, patch: &Patch) -> Result<Self> {
        let mut modulator = Operator::new(ParamId::GROUP_A, Arc::clone(&table), patch)?;
        modulator.bind_feedback(patch.fp32_param(ParamId::PATCH_FEEDBACK)?);
        Ok(Self {
            modulator,
            carrier: Operator::new(ParamId::GROUP_C, table, patch)?,
            env: AdeEnvelope::new(ParamId::GROUP_A, patch)?,
            freq: Fp32::ZERO,
        })
    }

    /// Pitch set by the last trigger.
    pub fn freq(&self) -> Fp32 {
        self.freq
    }
}

impl Algorithm for TwoOpAlgorithm {
    fn trigger(&mut self, pitch: Fp32, _velocity: u8) {
        self.freq = pitch;
        self.env.trigger();
    }

    fn retrigger(&mut self, pitch: Fp32) {
        self.freq = pitch;
        self.env.retrigger();
    }

    fn release(&mut self) {
        self.env.release();
    }

    fn render(&mut self, out: &mut [Fp32]) {
        for sample in out.iter_mut() {
            let index = self.env.scaled_index();
            let m = self.modulator.rotate(self.freq, Fp32::ZERO);
            *sample = self.carrier.rotate(self.freq, m.mul(index));
        }
    }

    fn apply_patch(&mut self, patch: &Patch) -> Result<()> {
        let feedback = patch.fp32_param(ParamId::PATCH_FEEDBACK)?;
        let mut modulator = self.modulator.clone();
        modulator.apply_patch(patch)?;
        let mut carrier = self.carrier.clone();
        carrier.apply_patch(patch)?;
        let mut env = self.env.clone();
        env.apply_patch(patch)?;

        modulator.bind_feedback(feedback);
        self.modulator = modulator;
        self.carrier = carrier;
        self.env = env;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "two-op"
    }

    fn dyn_clone(&self) -> Box<dyn Algorithm> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(alg: &mut TwoOpAlgorithm, n: usize) -> Vec<Fp32> {
        let mut out = vec![Fp32::ZERO; n];
        alg.render(&mut out);
        out
    }

    #[test]
    fn test_unmodulated_carrier_is_pure_sine() {
        let patch = Patch::initial(4).unwrap();
        patch
            .set(ParamId::ENV_INDEX | ParamId::GROUP_A, Fp32::ZERO)
            .unwrap();
        let table = SineTable::shared(48000);
        let mut alg = TwoOpAlgorithm::new(Arc::clone(&table), &patch).unwrap();
        alg.trigger(Fp32::from_int(1000), 100);

        let out = render(&mut alg, 48);
        for (i, s) in out.iter().enumerate() {
            assert_eq!(*s, table.at((i + 1) * 1000));
        }
    }

    #[test]
    fn test_modulation_changes_output() {
        let patch = Patch::initial(4).unwrap();
        let table = SineTable::shared(48000);

        patch
            .set(ParamId::ENV_INDEX | ParamId::GROUP_A, Fp32::ZERO)
            .unwrap();
        let mut plain = TwoOpAlgorithm::new(Arc::clone(&table), &patch).unwrap();
        plain.trigger(Fp32::from_int(440), 100);
        let dry = render(&mut plain, 256);

        patch
            .set(ParamId::ENV_INDEX | ParamId::GROUP_A, Fp32::from_int(500))
            .unwrap();
        let mut fm = TwoOpAlgorithm::new(table, &patch).unwrap();
        fm.trigger(Fp32::from_int(440), 100);
        let wet = render(&mut fm, 256);

        assert_ne!(dry, wet);
        assert!(wet.iter().all(|s| s.abs() <= Fp32::ONE));
    }

    #[test]
    fn test_trigger_stores_pitch() {
        let patch = Patch::initial(4).unwrap();
        let mut alg = TwoOpAlgorithm::new(SineTable::shared(48000), &patch).unwrap();
        alg.trigger(Fp32::from_int(220), 90);
        assert_eq!(alg.freq(), Fp32::from_int(220));
        alg.retrigger(Fp32::from_int(330));
        assert_eq!(alg.freq(), Fp32::from_int(330));
    }
}
