//! FM algorithm interface and factory.
//!
//! An algorithm is a fixed wiring of operators and modulation envelopes.
//! Voices own one boxed [`Algorithm`] each, picked by [`OperatorLayout`].

use crate::error::Result;
use crate::four_op::FourOpAlgorithm;
use crate::two_op::TwoOpAlgorithm;
use core::fmt;
use core::str::FromStr;
use fmsynth_core::{Fp32, Patch, SineTable};
use std::sync::Arc;

/// A renderable operator topology.
pub trait Algorithm: Send {
    /// Start a note at `pitch` Hz.
    fn trigger(&mut self, pitch: Fp32, velocity: u8);

    /// Move to a new pitch for a legato note.
    fn retrigger(&mut self, pitch: Fp32);

    /// Key released.
    fn release(&mut self);

    /// Fill `out` with the next samples.
    fn render(&mut self, out: &mut [Fp32]);

    /// Re-resolve every parameter handle from `patch`.
    ///
    /// On error the algorithm is left exactly as it was.
    fn apply_patch(&mut self, patch: &Patch) -> Result<()>;

    /// Display name of the active topology.
    fn name(&self) -> &'static str;

    /// Clone into a new box, keeping oscillator and envelope state.
    fn dyn_clone(&self) -> Box<dyn Algorithm>;
}

impl Clone for Box<dyn Algorithm> {
    fn clone(&self) -> Self {
        self.dyn_clone()
    }
}

/// Which algorithm family a voice uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum OperatorLayout {
    /// One modulator, one carrier.
    TwoOp,
    /// Four operators arranged by the selected topology.
    #[default]
    FourOp,
}

impl fmt::Display for OperatorLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::TwoOp => "two-op",
            Self::FourOp => "four-op",
        })
    }
}

impl FromStr for OperatorLayout {
    type Err = String;

    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "two-op" | "twoop" | "2op" => Ok(Self::TwoOp),
            "four-op" | "fourop" | "4op" => Ok(Self::FourOp),
            other => Err(format!("unknown operator layout '{other}'")),
        }
    }
}

/// Build an algorithm wired to `patch`.
pub fn create_algorithm(
    layout: OperatorLayout,
    table: Arc<SineTable>,
    patch: &Patch,
) -> Result<Box<dyn Algorithm>> {
    Ok(match layout {
        OperatorLayout::TwoOp => Box::new(TwoOpAlgorithm::new(table, patch)?),
        OperatorLayout::FourOp => Box::new(FourOpAlgorithm::new(table, patch)?),
    })
}

/// Mix two signals, `mix = 0` is all `x`, `mix = 1` all `y`.
///
/// `mix` is clamped to `[0, 1]` and the sum is halved.
#[inline]
pub fn cross_mix(x: Fp32, y: Fp32, mix: Fp32) -> Fp32 {
    let mix = mix.clamp(Fp32::ZERO, Fp32::ONE);
    (x.mul(Fp32::ONE - mix) + y.mul(mix)) >> 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cross_mix_endpoints() {
        let x = Fp32::ONE;
        let y = Fp32::MINUS_ONE;
        assert_eq!(cross_mix(x, y, Fp32::ZERO), Fp32::from_f64(0.5));
        assert_eq!(cross_mix(x, y, Fp32::ONE), Fp32::from_f64(-0.5));
        assert_eq!(cross_mix(x, x, Fp32::from_f64(0.5)), Fp32::from_f64(0.5));
    }

    #[test]
    fn test_cross_mix_clamps() {
        let x = Fp32::ONE;
        let y = Fp32::ZERO;
        assert_eq!(
            cross_mix(x, y, Fp32::from_int(-3)),
            cross_mix(x, y, Fp32::ZERO)
        );
        assert_eq!(
            cross_mix(x, y, Fp32::from_int(3)),
            cross_mix(x, y, Fp32::ONE)
        );
    }

    #[test]
    fn test_layout_parse() {
        assert_eq!("four-op".parse::<OperatorLayout>(), Ok(OperatorLayout::FourOp));
        assert_eq!("Two-Op".parse::<OperatorLayout>(), Ok(OperatorLayout::TwoOp));
        assert!("six-op".parse::<OperatorLayout>().is_err());
        assert_eq!(OperatorLayout::TwoOp.to_string(), "two-op");
    }

    #[test]
    fn test_factory_names() {
        let patch = Patch::initial(4).unwrap();
        let table = SineTable::shared(48000);
        let two = create_algorithm(OperatorLayout::TwoOp, Arc::clone(&table), &patch).unwrap();
        assert_eq!(two.name(), "two-op");
        let four = create_algorithm(OperatorLayout::FourOp, table, &patch).unwrap();
        assert_eq!(four.name(), crate::four_op::TOPOLOGIES[0].name);
    }
}
