//! Envelope generators driven by patch parameters.
//!
//! Two variants share the [`Envelope`] trait:
//!
//! - [`AdeEnvelope`] - attack/decay with an end level, scales an FM
//!   modulation index
//! - [`AdsrEnvelope`] - attack/decay/sustain/release, the voice amplifier
//!
//! Times are read from `u16` parameters in ticks of [`TICK_SAMPLES`] samples:
//! a ramp is `(sample_count << 11) / time` and reaches full scale after
//! `32 * time` samples. A zero time is treated as one tick so that no stage
//! ever jumps discontinuously. Ramps are linear.
//!
//! Parameter handles are resolved when the envelope is built or rewired with
//! `apply_patch`; a missing or mistyped parameter fails there, so
//! [`Envelope::scale`] has no failure path.

use crate::error::Result;
use fmsynth_core::{BoolParam, Fp32, Fp32Param, ParamId, Patch, Uint16Param};

/// Samples per envelope time unit.
pub const TICK_SAMPLES: u32 = 32;

/// Envelope stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EnvelopeState {
    /// Finished; output holds the resting level.
    #[default]
    Complete,
    /// Ramping up to full scale.
    Attack,
    /// Ramping down to the end or sustain level.
    Decay,
    /// Holding while the key is down.
    Sustain,
    /// Ramping from the release level to zero.
    Release,
}

/// Common interface of the envelope variants.
pub trait Envelope {
    /// Start from the attack stage.
    fn trigger(&mut self);

    /// Restart for a legato note, if the envelope's retrigger flag is set.
    fn retrigger(&mut self);

    /// Key released.
    fn release(&mut self);

    /// Advance one sample and return `s` scaled by the new level.
    fn scale(&mut self, s: Fp32) -> Fp32;

    /// Current stage.
    fn state(&self) -> EnvelopeState;

    /// Current level.
    fn level(&self) -> Fp32;

    /// Re-resolve parameter handles from `patch`.
    fn apply_patch(&mut self, patch: &Patch) -> Result<()>;
}

#[inline]
fn ramp(count: u32, time: u16) -> Fp32 {
    let time = u64::from(time.max(1));
    let value = (u64::from(count) << 11) / time;
    Fp32::from_raw(value.min(i32::MAX as u64) as i32)
}

#[derive(Debug, Clone)]
struct AdeParams {
    gated: BoolParam,
    retrigger: BoolParam,
    attack: Uint16Param,
    decay: Uint16Param,
    end_level: Fp32Param,
    index: Fp32Param,
}

impl AdeParams {
    fn resolve(patch: &Patch, group: ParamId) -> Result<Self> {
        Ok(Self {
            gated: patch.bool_param(ParamId::ENV_GATED | group)?,
            retrigger: patch.bool_param(ParamId::ENV_RETRIGGER | group)?,
            attack: patch.uint16_param(ParamId::ENV_ATTACK | group)?,
            decay: patch.uint16_param(ParamId::ENV_DECAY | group)?,
            end_level: patch.fp32_param(ParamId::ENV_ENDLEVEL | group)?,
            index: patch.fp32_param(ParamId::ENV_INDEX | group)?,
        })
    }
}

/// Attack-decay envelope carrying a modulation index.
///
/// While gated it holds full scale after the attack until released; ungated
/// it decays straight after the attack. The decay settles at the end level.
///
/// ```rust
/// use fmsynth_core::{ParamId, Patch};
/// use fmsynth_synth::{AdeEnvelope, Envelope, EnvelopeState};
///
/// let patch = Patch::initial(4).unwrap();
/// let mut env = AdeEnvelope::new(ParamId::GROUP_A, &patch).unwrap();
///
/// env.trigger();
/// for _ in 0..64 {
///     env.scaled_index();
/// }
/// assert_eq!(env.state(), EnvelopeState::Sustain);
/// ```
#[derive(Debug, Clone)]
pub struct AdeEnvelope {
    group: ParamId,
    params: AdeParams,
    state: EnvelopeState,
    sample_count: u32,
    current: Fp32,
    /// Level the decay starts from.
    decay_from: Fp32,
}

impl AdeEnvelope {
    /// Build an envelope reading the parameters of `group`.
    pub fn new(group: ParamId, patch: &Patch) -> Result<Self> {
        Ok(Self {
            group,
            params: AdeParams::resolve(patch, group)?,
            state: EnvelopeState::Complete,
            sample_count: 0,
            current: Fp32::ZERO,
            decay_from: Fp32::ONE,
        })
    }

    /// Parameter group this envelope reads.
    pub fn group(&self) -> ParamId {
        self.group
    }

    /// Advance one sample and return the index parameter scaled by the level.
    #[inline]
    pub fn scaled_index(&mut self) -> Fp32 {
        let index = self.params.index.value();
        self.scale(index)
    }

    fn enter_decay(&mut self) {
        self.state = EnvelopeState::Decay;
        self.sample_count = 0;
        self.decay_from = self.current;
    }
}

impl Envelope for AdeEnvelope {
    fn trigger(&mut self) {
        self.state = EnvelopeState::Attack;
        self.current = Fp32::ZERO;
        self.sample_count = 0;
    }

    fn retrigger(&mut self) {
        if self.params.retrigger.value() {
            self.trigger();
        }
    }

    fn release(&mut self) {
        if self.params.gated.value() {
            self.enter_decay();
        }
    }

    fn scale(&mut self, s: Fp32) -> Fp32 {
        self.sample_count = self.sample_count.saturating_add(1);
        let end_level = self.params.end_level.value();

        match self.state {
            EnvelopeState::Attack => {
                if self.current >= Fp32::ONE {
                    self.current = Fp32::ONE;
                    if self.params.gated.value() {
                        self.state = EnvelopeState::Sustain;
                        self.sample_count = 0;
                    } else {
                        self.enter_decay();
                    }
                } else {
                    self.current = ramp(self.sample_count, self.params.attack.value()).min(Fp32::ONE);
                }
            }
            EnvelopeState::Decay => {
                if self.current <= end_level {
                    self.current = end_level;
                    self.state = EnvelopeState::Complete;
                    self.sample_count = 0;
                } else {
                    let fall = ramp(self.sample_count, self.params.decay.value())
                        .min(Fp32::ONE)
                        .mul(self.decay_from - end_level);
                    self.current = (self.decay_from - fall).max(end_level);
                }
            }
            EnvelopeState::Sustain => self.current = Fp32::ONE,
            EnvelopeState::Complete | EnvelopeState::Release => self.current = end_level,
        }

        s.mul(self.current)
    }

    fn state(&self) -> EnvelopeState {
        self.state
    }

    fn level(&self) -> Fp32 {
        self.current
    }

    fn apply_patch(&mut self, patch: &Patch) -> Result<()> {
        self.params = AdeParams::resolve(patch, self.group)?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct AdsrParams {
    gated: BoolParam,
    retrigger: BoolParam,
    attack: Uint16Param,
    decay: Uint16Param,
    sustain: Fp32Param,
    release: Uint16Param,
}

impl AdsrParams {
    fn resolve(patch: &Patch, group: ParamId) -> Result<Self> {
        Ok(Self {
            gated: patch.bool_param(ParamId::ENV_GATED | group)?,
            retrigger: patch.bool_param(ParamId::ENV_RETRIGGER | group)?,
            attack: patch.uint16_param(ParamId::ENV_ATTACK | group)?,
            decay: patch.uint16_param(ParamId::ENV_DECAY | group)?,
            sustain: patch.fp32_param(ParamId::ENV_SUSTAIN | group)?,
            release: patch.uint16_param(ParamId::ENV_RELEASE | group)?,
        })
    }
}

/// Attack-decay-sustain-release amplifier envelope.
///
/// Triggering captures the current level as a floor for the attack ramp, so
/// a note restarted during a release continues from where it was instead of
/// dropping to zero.
///
/// ```rust
/// use fmsynth_core::{ParamId, Patch};
/// use fmsynth_synth::{AdsrEnvelope, Envelope, EnvelopeState};
///
/// let patch = Patch::initial(4).unwrap();
/// let mut vca = AdsrEnvelope::new(ParamId::GROUP_VCA, &patch).unwrap();
///
/// vca.trigger();
/// for _ in 0..100 {
///     vca.scale(fmsynth_core::Fp32::ONE);
/// }
/// assert_eq!(vca.state(), EnvelopeState::Sustain);
///
/// vca.release();
/// for _ in 0..100 {
///     vca.scale(fmsynth_core::Fp32::ONE);
/// }
/// assert_eq!(vca.state(), EnvelopeState::Complete);
/// ```
#[derive(Debug, Clone)]
pub struct AdsrEnvelope {
    group: ParamId,
    params: AdsrParams,
    state: EnvelopeState,
    sample_count: u32,
    current: Fp32,
    /// Attack floor, or release starting level.
    reference: Fp32,
}

impl AdsrEnvelope {
    /// Build an envelope reading the parameters of `group`.
    pub fn new(group: ParamId, patch: &Patch) -> Result<Self> {
        Ok(Self {
            group,
            params: AdsrParams::resolve(patch, group)?,
            state: EnvelopeState::Complete,
            sample_count: 0,
            current: Fp32::ZERO,
            reference: Fp32::ZERO,
        })
    }

    /// Parameter group this envelope reads.
    pub fn group(&self) -> ParamId {
        self.group
    }

    /// Level captured at the last trigger or release.
    pub fn reference(&self) -> Fp32 {
        self.reference
    }

    /// Returns `true` until the release has finished.
    pub fn is_active(&self) -> bool {
        self.state != EnvelopeState::Complete
    }

    fn enter_release(&mut self, from: Fp32) {
        self.state = EnvelopeState::Release;
        self.reference = from;
        self.sample_count = 0;
    }
}

impl Envelope for AdsrEnvelope {
    fn trigger(&mut self) {
        self.state = EnvelopeState::Attack;
        self.reference = self.current;
        self.sample_count = 0;
    }

    fn retrigger(&mut self) {
        if self.params.retrigger.value() {
            self.trigger();
        }
    }

    fn release(&mut self) {
        self.enter_release(self.current);
    }

    fn scale(&mut self, s: Fp32) -> Fp32 {
        self.sample_count = self.sample_count.saturating_add(1);
        let sustain = self.params.sustain.value();

        match self.state {
            EnvelopeState::Attack => {
                if self.current >= Fp32::ONE {
                    self.current = Fp32::ONE;
                    if self.params.gated.value() {
                        self.state = EnvelopeState::Decay;
                        self.sample_count = 0;
                    } else {
                        self.enter_release(Fp32::ONE);
                    }
                } else {
                    let rise = ramp(self.sample_count, self.params.attack.value());
                    self.current = rise.max(self.reference).min(Fp32::ONE);
                }
            }
            EnvelopeState::Decay => {
                if self.current <= sustain {
                    self.current = sustain;
                    self.state = EnvelopeState::Sustain;
                    self.reference = sustain;
                    self.sample_count = 0;
                } else {
                    let fall = ramp(self.sample_count, self.params.decay.value())
                        .min(Fp32::ONE)
                        .mul(Fp32::ONE - sustain);
                    self.current = (Fp32::ONE - fall).max(sustain);
                }
            }
            EnvelopeState::Sustain => self.current = sustain,
            EnvelopeState::Release => {
                if self.current <= Fp32::ZERO {
                    self.current = Fp32::ZERO;
                    self.state = EnvelopeState::Complete;
                    self.sample_count = 0;
                } else {
                    let remaining = Fp32::ONE - ramp(self.sample_count, self.params.release.value());
                    self.current = remaining.mul(self.reference).max(Fp32::ZERO);
                }
            }
            EnvelopeState::Complete => self.current = Fp32::ZERO,
        }

        s.mul(self.current)
    }

    fn state(&self) -> EnvelopeState {
        self.state
    }

    fn level(&self) -> Fp32 {
        self.current
    }

    fn apply_patch(&mut self, patch: &Patch) -> Result<()> {
        self.params = AdsrParams::resolve(patch, self.group)?;
        Ok(())
    }
}
