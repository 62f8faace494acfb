//! Four-operator algorithm and its topology registry.
//!
//! Operators A, B1, B2 and C are wired by one of the [`TOPOLOGIES`]. Each
//! topology produces two signals `(x, y)` per sample, which are blended by
//! the patch mix. Envelope A scales operator A's modulation index and
//! envelope B scales the B operators'.
//!
//! Notation in the topology docs: `P → Q` means P phase-modulates Q, `+`
//! means summed and halved, and a `f` subscript marks the operator carrying
//! the global feedback amount.

use crate::algorithm::{Algorithm, cross_mix};
use crate::envelope::{AdeEnvelope, Envelope};
use crate::error::{Error, Result};
use crate::operator::Operator;
use fmsynth_core::{ByteParam, Fp32, Fp32Param, ParamId, Patch, SineTable};
use std::sync::Arc;

/// One of the four operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorSlot {
    /// Operator A.
    A,
    /// Operator B1.
    B1,
    /// Operator B2.
    B2,
    /// Operator C.
    C,
}

/// The four operators of a [`FourOpAlgorithm`].
#[derive(Debug, Clone)]
pub struct Operators {
    /// Operator A.
    pub a: Operator,
    /// Operator B1.
    pub b1: Operator,
    /// Operator B2.
    pub b2: Operator,
    /// Operator C.
    pub c: Operator,
}

impl Operators {
    fn new(table: &Arc<SineTable>, patch: &Patch) -> Result<Self> {
        Ok(Self {
            a: Operator::new(ParamId::GROUP_A, Arc::clone(table), patch)?,
            b1: Operator::new(ParamId::GROUP_B1, Arc::clone(table), patch)?,
            b2: Operator::new(ParamId::GROUP_B2, Arc::clone(table), patch)?,
            c: Operator::new(ParamId::GROUP_C, Arc::clone(table), patch)?,
        })
    }

    /// Mutable access by slot.
    pub fn get_mut(&mut self, slot: OperatorSlot) -> &mut Operator {
        match slot {
            OperatorSlot::A => &mut self.a,
            OperatorSlot::B1 => &mut self.b1,
            OperatorSlot::B2 => &mut self.b2,
            OperatorSlot::C => &mut self.c,
        }
    }

    /// All four operators.
    pub fn iter(&self) -> impl Iterator<Item = &Operator> {
        [&self.a, &self.b1, &self.b2, &self.c].into_iter()
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = &mut Operator> {
        [&mut self.a, &mut self.b1, &mut self.b2, &mut self.c].into_iter()
    }
}

/// Per-sample topology render: `(operators, pitch, index_a, index_b) -> (x, y)`.
pub type RenderFn = fn(&mut Operators, Fp32, Fp32, Fp32) -> (Fp32, Fp32);

/// A registered operator wiring.
#[derive(Debug, Clone, Copy)]
pub struct Topology {
    /// Display name.
    pub name: &'static str,
    /// One sample of output.
    pub render: RenderFn,
    /// The only operator that receives the global feedback.
    pub feedback: OperatorSlot,
}

/// Number of registered topologies.
pub const ALGORITHM_COUNT: usize = 4;

/// Available topologies, indexed by the algorithm parameter.
pub static TOPOLOGIES: [Topology; ALGORITHM_COUNT] = [
    Topology {
        name: "B2>B1, (Af+B1)>C",
        render: render_parallel_into_c,
        feedback: OperatorSlot::A,
    },
    Topology {
        name: "A>C, B2f>B1",
        render: render_two_stacks,
        feedback: OperatorSlot::B2,
    },
    Topology {
        name: "Af>(C+B1), Af>B2",
        render: render_fan_out,
        feedback: OperatorSlot::A,
    },
    Topology {
        name: "B2f>B1>A>C",
        render: render_serial,
        feedback: OperatorSlot::B2,
    },
];

/// Number of registered topologies, as the algorithm parameter's range.
pub const fn algorithm_count() -> u8 {
    ALGORITHM_COUNT as u8
}

/// Registry index for an algorithm parameter value; out of range clamps.
#[inline]
pub fn topology_index(value: u8) -> usize {
    usize::from(value).min(TOPOLOGIES.len() - 1)
}

/// `y = B2 → B1`, `x = (Af + y) → C`.
fn render_parallel_into_c(ops: &mut Operators, freq: Fp32, ia: Fp32, ib: Fp32) -> (Fp32, Fp32) {
    let a = ops.a.rotate(freq, Fp32::ZERO).mul(ia);
    let b2 = ops.b2.rotate(freq, Fp32::ZERO);
    let b1 = ops.b1.rotate(freq, b2).mul(ib);
    let x = ops.c.rotate(freq, (a + b1) >> 1);
    (x, b1)
}

/// `x = A → C`, `y = B2f → B1`.
fn render_two_stacks(ops: &mut Operators, freq: Fp32, ia: Fp32, ib: Fp32) -> (Fp32, Fp32) {
    let a = ops.a.rotate(freq, Fp32::ZERO).mul(ia);
    let x = ops.c.rotate(freq, a);
    let b2 = ops.b2.rotate(freq, Fp32::ZERO);
    let y = ops.b1.rotate(freq, b2).mul(ib);
    (x, y)
}

/// `x = (Af → C + Af → B1)`, `y = Af → B2`.
fn render_fan_out(ops: &mut Operators, freq: Fp32, ia: Fp32, ib: Fp32) -> (Fp32, Fp32) {
    let a = ops.a.rotate(freq, Fp32::ZERO).mul(ia);
    let y = ops.b2.rotate(freq, a).mul(ib);
    let b1 = ops.b1.rotate(freq, a).mul(ib);
    let c = ops.c.rotate(freq, a);
    ((c + b1) >> 1, y)
}

/// `x = B2f → B1 → A → C`, `y = A`.
fn render_serial(ops: &mut Operators, freq: Fp32, ia: Fp32, ib: Fp32) -> (Fp32, Fp32) {
    let b2 = ops.b2.rotate(freq, Fp32::ZERO);
    let b1 = ops.b1.rotate(freq, b2).mul(ib);
    let a = ops.a.rotate(freq, b1).mul(ia);
    let x = ops.c.rotate(freq, a);
    (x, a)
}

/// Four operators, two modulation envelopes and a selectable topology.
///
/// The algorithm parameter is re-read on every render; a change rewires
/// feedback before the block is rendered.
///
/// ```rust
/// use fmsynth_core::{Fp32, ParamId, Patch, SineTable};
/// use fmsynth_synth::{Algorithm, FourOpAlgorithm};
///
/// let patch = Patch::initial(4).unwrap();
/// let mut alg = FourOpAlgorithm::new(SineTable::shared(48000), &patch).unwrap();
///
/// patch.set(ParamId::PATCH_ALGORITHM, 3u8).unwrap();
/// alg.trigger(Fp32::from_int(440), 100);
/// let mut out = [Fp32::ZERO; 64];
/// alg.render(&mut out);
/// assert_eq!(alg.topology_index(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct FourOpAlgorithm {
    ops: Operators,
    env_a: AdeEnvelope,
    env_b: AdeEnvelope,
    algorithm: ByteParam,
    mix: Fp32Param,
    feedback: Fp32Param,
    topology: usize,
    freq: Fp32,
}

impl FourOpAlgorithm {
    /// Build and wire to `patch`.
    pub fn new(table: Arc<SineTable>, patch: &Patch) -> Result<Self> {
        let algorithm = patch.byte_param(ParamId::PATCH_ALGORITHM)?;
        let topology = topology_index(algorithm.value());
        let mut alg = Self {
            ops: Operators::new(&table, patch)?,
            env_a: AdeEnvelope::new(ParamId::GROUP_A, patch)?,
            env_b: AdeEnvelope::new(ParamId::GROUP_B, patch)?,
            algorithm,
            mix: patch.fp32_param(ParamId::PATCH_MIX)?,
            feedback: patch.fp32_param(ParamId::PATCH_FEEDBACK)?,
            topology,
            freq: Fp32::ZERO,
        };
        alg.wire_feedback(topology);
        alg.check_feedback()?;
        Ok(alg)
    }

    /// Index of the topology currently wired.
    pub fn topology_index(&self) -> usize {
        self.topology
    }

    /// The operators, for inspection.
    pub fn operators(&self) -> &Operators {
        &self.ops
    }

    fn wire_feedback(&mut self, topology: usize) {
        for op in self.ops.iter_mut() {
            op.clear_feedback();
        }
        let slot = TOPOLOGIES[topology].feedback;
        self.ops.get_mut(slot).bind_feedback(self.feedback.clone());
        self.topology = topology;
    }

    /// Resolve every handle from `patch` in place. Leaves `self` partly
    /// rewired on error, so callers run it on a copy.
    fn rebind(&mut self, patch: &Patch) -> Result<()> {
        self.algorithm = patch.byte_param(ParamId::PATCH_ALGORITHM)?;
        self.mix = patch.fp32_param(ParamId::PATCH_MIX)?;
        self.feedback = patch.fp32_param(ParamId::PATCH_FEEDBACK)?;
        for op in self.ops.iter_mut() {
            op.apply_patch(patch)?;
        }
        self.env_a.apply_patch(patch)?;
        self.env_b.apply_patch(patch)?;
        self.wire_feedback(topology_index(self.algorithm.value()));
        self.check_feedback()
    }

    fn check_feedback(&self) -> Result<()> {
        let count = self.ops.iter().filter(|op| op.has_feedback()).count();
        if count == 1 {
            Ok(())
        } else {
            Err(Error::FeedbackWiring {
                algorithm: TOPOLOGIES[self.topology].name,
                count,
            })
        }
    }
}

impl Algorithm for FourOpAlgorithm {
    fn trigger(&mut self, pitch: Fp32, _velocity: u8) {
        self.freq = pitch;
        self.env_a.trigger();
        self.env_b.trigger();
    }

    fn retrigger(&mut self, pitch: Fp32) {
        self.freq = pitch;
        self.env_a.retrigger();
        self.env_b.retrigger();
    }

    fn release(&mut self) {
        self.env_a.release();
        self.env_b.release();
    }

    fn render(&mut self, out: &mut [Fp32]) {
        let selected = topology_index(self.algorithm.value());
        if selected != self.topology {
            tracing::debug!(
                from = TOPOLOGIES[self.topology].name,
                to = TOPOLOGIES[selected].name,
                "rewiring four-op topology"
            );
            self.wire_feedback(selected);
            debug_assert!(self.check_feedback().is_ok());
        }

        let render = TOPOLOGIES[self.topology].render;
        for sample in out.iter_mut() {
            let ia = self.env_a.scaled_index();
            let ib = self.env_b.scaled_index();
            let (x, y) = render(&mut self.ops, self.freq, ia, ib);
            *sample = cross_mix(x, y, self.mix.value());
        }
    }

    fn apply_patch(&mut self, patch: &Patch) -> Result<()> {
        let mut staged = self.clone();
        staged.rebind(patch)?;
        *self = staged;
        Ok(())
    }

    fn name(&self) -> &'static str {
        TOPOLOGIES[self.topology].name
    }

    fn dyn_clone(&self) -> Box<dyn Algorithm> {
        Box::new(self.clone())
    }
}
