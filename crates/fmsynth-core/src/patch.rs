//! The live patch: every parameter of the current sound.
//!
//! A [`Patch`] is built once, shared behind an `Arc`, and then mutated only
//! through [`Patch::set`], [`Patch::set_value`] and [`Patch::handle_cc`].
//! Each mutation stores the new value first and then publishes the
//! [`ParamId`] to every listener registered with [`Patch::changes`], so a
//! listener that reads the parameter after receiving the id always sees the
//! new value. Each listener has its own bounded channel; a full channel
//! drops that listener's notification rather than blocking the writer, and
//! a dropped receiver is unregistered on the next change.
//!
//! ```rust
//! use fmsynth_core::{Fp32, ParamId, Patch};
//!
//! let patch = Patch::initial(4).unwrap();
//! let changes = patch.changes();
//! let mix = patch.fp32_param(ParamId::PATCH_MIX).unwrap();
//!
//! patch.set(ParamId::PATCH_MIX, Fp32::ONE).unwrap();
//! assert_eq!(mix.value(), Fp32::ONE);
//! assert_eq!(changes.try_recv().unwrap(), ParamId::PATCH_MIX);
//! ```

use crate::fixed::Fp32;
use crate::param::{
    BoolParam, ByteParam, CcScale, Fp32Param, Param, ParamId, ParamKind, ParamRef, ParamType,
    ParamValue, Uint16Param,
};
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

/// Capacity of each listener's change-notification channel.
pub const CHANGE_QUEUE_CAPACITY: usize = 256;

/// Highest valid MIDI CC number.
pub const MAX_CC: u8 = 127;

/// CC bound to the algorithm selector in the initial patch.
pub const CC_ALGORITHM: u8 = 3;
/// CC bound to the VCA attack time in the initial patch.
pub const CC_VCA_ATTACK: u8 = 0x14;
/// CC bound to the VCA decay time in the initial patch.
pub const CC_VCA_DECAY: u8 = 0x15;
/// CC bound to the VCA sustain level in the initial patch.
pub const CC_VCA_SUSTAIN: u8 = 0x16;
/// CC bound to the VCA release time in the initial patch.
pub const CC_VCA_RELEASE: u8 = 0x17;

/// Errors raised while building a patch or wiring to it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    /// No parameter with this id.
    #[error("parameter {0} not found")]
    NotFound(ParamId),

    /// The parameter exists with a different kind.
    #[error("parameter {id} is {actual}, expected {expected}")]
    WrongKind {
        /// Requested parameter.
        id: ParamId,
        /// Kind the caller asked for.
        expected: ParamKind,
        /// Kind the parameter actually has.
        actual: ParamKind,
    },

    /// A parameter with this id was already added.
    #[error("parameter {0} already exists")]
    DuplicateId(ParamId),

    /// The CC number is already bound to another parameter.
    #[error("CC {cc} is already bound to {existing}")]
    DuplicateCc {
        /// The contested CC number.
        cc: u8,
        /// Parameter that already owns it.
        existing: ParamId,
    },

    /// CC numbers are 7-bit.
    #[error("CC {0} is outside 0..=127")]
    InvalidCc(u8),
}

/// Owner of all patch parameters.
#[derive(Debug)]
pub struct Patch {
    params: Vec<Param>,
    by_id: HashMap<ParamId, usize>,
    by_cc: HashMap<u8, usize>,
    listeners: Mutex<Vec<Sender<ParamId>>>,
}

impl Default for Patch {
    fn default() -> Self {
        Self::new()
    }
}

impl Patch {
    /// An empty patch.
    pub fn new() -> Self {
        Self {
            params: Vec::new(),
            by_id: HashMap::new(),
            by_cc: HashMap::new(),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// The default sound: every parameter the algorithms and the VCA read.
    ///
    /// `algorithm_count` bounds the CC range of the algorithm selector.
    pub fn initial(algorithm_count: u8) -> Result<Self, PatchError> {
        let mut p = Self::new();

        p.add_byte_ranged(
            ParamId::PATCH_ALGORITHM,
            0,
            "ALG",
            Some(CC_ALGORITHM),
            0,
            algorithm_count.saturating_sub(1),
        )?;
        p.add_fp32(ParamId::PATCH_FEEDBACK, 0.0, "FEEDBK", None)?;
        p.add_fp32(ParamId::PATCH_MIX, 0.5, "MIX", None)?;

        p.add_fp32(ParamId::OPR_RATIO | ParamId::GROUP_A, 1.0, "A", None)?;
        p.add_fp32(ParamId::OPR_RATIO | ParamId::GROUP_B1, 1.0, "B1", None)?;
        p.add_fp32(ParamId::OPR_RATIO | ParamId::GROUP_B2, 1.0, "B2", None)?;
        p.add_fp32(ParamId::OPR_RATIO | ParamId::GROUP_C, 1.0, "C", None)?;

        for group in [ParamId::GROUP_A, ParamId::GROUP_B] {
            p.add_bool(ParamId::ENV_GATED | group, true, "GATE", None)?;
            p.add_bool(ParamId::ENV_RETRIGGER | group, true, "RETRIG", None)?;
            p.add_uint16(ParamId::ENV_ATTACK | group, 0, "ATTACK", None)?;
            p.add_uint16(ParamId::ENV_DECAY | group, 0, "DECAY", None)?;
            p.add_fp32(ParamId::ENV_ENDLEVEL | group, 0.0, "ENDLVL", None)?;
            p.add_fp32(ParamId::ENV_INDEX | group, 1.0, "INDEX", None)?;
        }

        let vca = ParamId::GROUP_VCA;
        p.add_bool(ParamId::ENV_GATED | vca, true, "GATE", None)?;
        p.add_bool(ParamId::ENV_RETRIGGER | vca, false, "RETRIG", None)?;
        p.add_uint16(ParamId::ENV_ATTACK | vca, 0, "ATTACK", Some(CC_VCA_ATTACK))?;
        p.add_uint16(ParamId::ENV_DECAY | vca, 0, "DECAY", Some(CC_VCA_DECAY))?;
        p.add_fp32(ParamId::ENV_SUSTAIN | vca, 1.0, "SUSTN", Some(CC_VCA_SUSTAIN))?;
        p.add_uint16(ParamId::ENV_RELEASE | vca, 0, "RELEASE", Some(CC_VCA_RELEASE))?;

        tracing::debug!(params = p.len(), "initial patch built");
        Ok(p)
    }

    /// Add a byte parameter whose CC maps identically onto `0..=127`.
    pub fn add_byte(
        &mut self,
        id: ParamId,
        default: u8,
        label: impl Into<String>,
        cc: Option<u8>,
    ) -> Result<ByteParam, PatchError> {
        self.add_byte_ranged(id, default, label, cc, 0, 127)
    }

    /// Add a byte parameter whose CC maps onto `min..=max`.
    pub fn add_byte_ranged(
        &mut self,
        id: ParamId,
        default: u8,
        label: impl Into<String>,
        cc: Option<u8>,
        min: u8,
        max: u8,
    ) -> Result<ByteParam, PatchError> {
        self.insert(
            id,
            label.into(),
            ParamValue::Byte(default),
            cc,
            CcScale::Byte { min, max },
        )
    }

    /// Add a bool parameter.
    pub fn add_bool(
        &mut self,
        id: ParamId,
        default: bool,
        label: impl Into<String>,
        cc: Option<u8>,
    ) -> Result<BoolParam, PatchError> {
        self.insert(id, label.into(), ParamValue::Bool(default), cc, CcScale::Bool)
    }

    /// Add a uint16 parameter whose CC spans the full 16-bit range.
    pub fn add_uint16(
        &mut self,
        id: ParamId,
        default: u16,
        label: impl Into<String>,
        cc: Option<u8>,
    ) -> Result<Uint16Param, PatchError> {
        self.add_uint16_ranged(id, default, label, cc, 0, u16::MAX)
    }

    /// Add a uint16 parameter whose CC maps onto `min..=max`.
    pub fn add_uint16_ranged(
        &mut self,
        id: ParamId,
        default: u16,
        label: impl Into<String>,
        cc: Option<u8>,
        min: u16,
        max: u16,
    ) -> Result<Uint16Param, PatchError> {
        self.insert(
            id,
            label.into(),
            ParamValue::Uint16(default),
            cc,
            CcScale::Uint16 { min, max },
        )
    }

    /// Add a fixed-point parameter, default given as a float.
    pub fn add_fp32(
        &mut self,
        id: ParamId,
        default: f64,
        label: impl Into<String>,
        cc: Option<u8>,
    ) -> Result<Fp32Param, PatchError> {
        self.insert(
            id,
            label.into(),
            ParamValue::Fp32(Fp32::from_f64(default)),
            cc,
            CcScale::Fp32,
        )
    }

    fn insert<T: ParamType>(
        &mut self,
        id: ParamId,
        label: String,
        default: ParamValue,
        cc: Option<u8>,
        scale: CcScale,
    ) -> Result<ParamRef<T>, PatchError> {
        if self.by_id.contains_key(&id) {
            return Err(PatchError::DuplicateId(id));
        }
        if let Some(cc) = cc {
            if cc > MAX_CC {
                return Err(PatchError::InvalidCc(cc));
            }
            if let Some(&existing) = self.by_cc.get(&cc) {
                return Err(PatchError::DuplicateCc {
                    cc,
                    existing: self.params[existing].id(),
                });
            }
        }

        let param = Param::new(id, label, default, cc, scale);
        let handle = param.handle::<T>().ok_or(PatchError::WrongKind {
            id,
            expected: T::KIND,
            actual: default.kind(),
        })?;

        let index = self.params.len();
        self.params.push(param);
        self.by_id.insert(id, index);
        if let Some(cc) = cc {
            self.by_cc.insert(cc, index);
        }
        Ok(handle)
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Returns `true` if the patch has no parameters.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Look up a parameter by id.
    pub fn get(&self, id: ParamId) -> Option<&Param> {
        self.by_id.get(&id).map(|&i| &self.params[i])
    }

    /// Look up the parameter bound to a CC number.
    pub fn by_cc(&self, cc: u8) -> Option<&Param> {
        self.by_cc.get(&cc).map(|&i| &self.params[i])
    }

    /// All parameters in insertion order.
    pub fn params(&self) -> impl Iterator<Item = &Param> {
        self.params.iter()
    }

    /// Register a listener for change notifications.
    ///
    /// Every listener receives every change made after it registered.
    /// Changes made earlier are not replayed.
    pub fn changes(&self) -> Receiver<ParamId> {
        let (tx, rx) = bounded(CHANGE_QUEUE_CAPACITY);
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// Number of registered listeners whose receivers were still alive at
    /// the last change.
    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Typed handle for any parameter kind.
    pub fn param<T: ParamType>(&self, id: ParamId) -> Result<ParamRef<T>, PatchError> {
        let param = self.get(id).ok_or(PatchError::NotFound(id))?;
        param.handle::<T>().ok_or(PatchError::WrongKind {
            id,
            expected: T::KIND,
            actual: param.kind(),
        })
    }

    /// Handle to a byte parameter.
    pub fn byte_param(&self, id: ParamId) -> Result<ByteParam, PatchError> {
        self.param(id)
    }

    /// Handle to a bool parameter.
    pub fn bool_param(&self, id: ParamId) -> Result<BoolParam, PatchError> {
        self.param(id)
    }

    /// Handle to a uint16 parameter.
    pub fn uint16_param(&self, id: ParamId) -> Result<Uint16Param, PatchError> {
        self.param(id)
    }

    /// Handle to a fixed-point parameter.
    pub fn fp32_param(&self, id: ParamId) -> Result<Fp32Param, PatchError> {
        self.param(id)
    }

    /// Store a typed value and notify listeners.
    pub fn set<T: ParamType>(&self, id: ParamId, value: T) -> Result<(), PatchError> {
        self.set_value(id, value.into_value())
    }

    /// Store a tagged value and notify listeners.
    pub fn set_value(&self, id: ParamId, value: ParamValue) -> Result<(), PatchError> {
        let param = self.get(id).ok_or(PatchError::NotFound(id))?;
        if !param.store(value) {
            return Err(PatchError::WrongKind {
                id,
                expected: value.kind(),
                actual: param.kind(),
            });
        }
        self.notify(id);
        Ok(())
    }

    /// Apply a MIDI control change to the bound parameter.
    ///
    /// Returns `false` if no parameter is bound to `num`.
    pub fn handle_cc(&self, num: u8, val: u8) -> bool {
        let Some(param) = self.by_cc(num) else {
            tracing::debug!(cc = num, value = val, "ignoring unbound control change");
            return false;
        };
        param.store_cc(val);
        tracing::trace!(id = %param.id(), value = %param.value(), "control change applied");
        self.notify(param.id());
        true
    }

    fn notify(&self, id: ParamId) {
        let mut listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        listeners.retain(|tx| match tx.try_send(id) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::trace!(%id, "change queue full, notification dropped");
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }
}
