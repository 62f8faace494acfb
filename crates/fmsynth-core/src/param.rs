//! Parameter identity, value kinds and lock-free value cells.
//!
//! A parameter is identified by a packed [`ParamId`] and stores its value in
//! a shared atomic cell. The [`Patch`](crate::Patch) owns every [`Param`];
//! audio-side code resolves typed [`ParamRef`] handles once when it is wired
//! to a patch and then reads them with a single relaxed load per access.
//!
//! # ParamId layout
//!
//! ```text
//!  7   6   5   4   3   2   1   0
//! [   subtype     ][ type ][group]
//! ```
//!
//! Ids are composed by OR-ing a group onto a type|subtype constant:
//!
//! ```rust
//! use fmsynth_core::ParamId;
//!
//! let id = ParamId::ENV_ATTACK | ParamId::GROUP_VCA;
//! assert_eq!(id.to_string(), "ENV_VCA-ATTACK");
//! assert_eq!(ParamId::OPR_RATIO.with_group(ParamId::GROUP_B2).to_string(), "OPR_B2-RATIO");
//! ```

use crate::fixed::Fp32;
use core::fmt;
use core::marker::PhantomData;
use core::ops::BitOr;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

/// Packed 8-bit parameter identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParamId(u8);

impl ParamId {
    const GROUP_MASK: u8 = 0x03;
    const TYPE_MASK: u8 = 0x0C;

    /// Group A: operator A, envelope A.
    pub const GROUP_A: Self = Self(0x0);
    /// Group B: envelope B.
    pub const GROUP_B: Self = Self(0x1);
    /// Operator B1, an alias for [`GROUP_B`](Self::GROUP_B).
    pub const GROUP_B1: Self = Self(0x1);
    /// Group C: operator C.
    pub const GROUP_C: Self = Self(0x2);
    /// Group D.
    pub const GROUP_D: Self = Self(0x3);
    /// Operator B2, an alias for [`GROUP_D`](Self::GROUP_D).
    pub const GROUP_B2: Self = Self(0x3);
    /// The voice amplifier envelope, an alias for [`GROUP_D`](Self::GROUP_D).
    pub const GROUP_VCA: Self = Self(0x3);

    /// Patch-wide parameter type.
    pub const TYPE_PATCH: Self = Self(0x0 << 2);
    /// Per-operator parameter type.
    pub const TYPE_OPERATOR: Self = Self(0x1 << 2);
    /// Per-envelope parameter type.
    pub const TYPE_ENVELOPE: Self = Self(0x2 << 2);

    /// Four-operator topology index.
    pub const PATCH_ALGORITHM: Self = Self::TYPE_PATCH.union(Self(0x0 << 4));
    /// Global feedback amount, wired to one operator by the topology.
    pub const PATCH_FEEDBACK: Self = Self::TYPE_PATCH.union(Self(0x1 << 4));
    /// Cross-mix between the two topology outputs.
    pub const PATCH_MIX: Self = Self::TYPE_PATCH.union(Self(0x2 << 4));

    /// Operator frequency ratio.
    pub const OPR_RATIO: Self = Self::TYPE_OPERATOR.union(Self(0x0 << 4));

    /// Attack time in 32-sample ticks.
    pub const ENV_ATTACK: Self = Self::TYPE_ENVELOPE.union(Self(0x0 << 4));
    /// Decay time in 32-sample ticks.
    pub const ENV_DECAY: Self = Self::TYPE_ENVELOPE.union(Self(0x1 << 4));
    /// Level an attack-decay envelope settles at.
    pub const ENV_ENDLEVEL: Self = Self::TYPE_ENVELOPE.union(Self(0x2 << 4));
    /// Modulation index carried by an attack-decay envelope.
    pub const ENV_INDEX: Self = Self::TYPE_ENVELOPE.union(Self(0x3 << 4));
    /// Whether the envelope holds while the key is down.
    pub const ENV_GATED: Self = Self::TYPE_ENVELOPE.union(Self(0x4 << 4));
    /// Whether legato notes restart the envelope.
    pub const ENV_RETRIGGER: Self = Self::TYPE_ENVELOPE.union(Self(0x5 << 4));
    /// Sustain level.
    pub const ENV_SUSTAIN: Self = Self::TYPE_ENVELOPE.union(Self(0x6 << 4));
    /// Release time in 32-sample ticks.
    pub const ENV_RELEASE: Self = Self::TYPE_ENVELOPE.union(Self(0x7 << 4));

    /// Wrap a raw id byte.
    #[inline]
    pub const fn from_raw(raw: u8) -> Self {
        Self(raw)
    }

    /// The raw id byte.
    #[inline]
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// Bitwise union of two ids.
    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Replace the group bits.
    #[inline]
    pub const fn with_group(self, group: Self) -> Self {
        Self((self.0 & !Self::GROUP_MASK) | (group.0 & Self::GROUP_MASK))
    }

    /// The group bits alone.
    #[inline]
    pub const fn group(self) -> Self {
        Self(self.0 & Self::GROUP_MASK)
    }

    /// The type|subtype bits with the group cleared.
    #[inline]
    pub const fn base(self) -> Self {
        Self(self.0 & !Self::GROUP_MASK)
    }

    fn operator_name(self) -> &'static str {
        match self.0 & Self::GROUP_MASK {
            0 => "A",
            1 => "B1",
            2 => "C",
            _ => "B2",
        }
    }

    fn envelope_name(self) -> &'static str {
        match self.0 & Self::GROUP_MASK {
            0 => "A",
            1 => "B",
            2 => "C",
            _ => "VCA",
        }
    }

    fn subtype_name(self) -> &'static str {
        match self.base() {
            Self::PATCH_ALGORITHM => "ALGORITHM",
            Self::PATCH_FEEDBACK => "FEEDBACK",
            Self::PATCH_MIX => "MIX",
            Self::OPR_RATIO => "RATIO",
            Self::ENV_ATTACK => "ATTACK",
            Self::ENV_DECAY => "DECAY",
            Self::ENV_ENDLEVEL => "ENDLEVEL",
            Self::ENV_INDEX => "INDEX",
            Self::ENV_GATED => "GATED",
            Self::ENV_RETRIGGER => "RETRIGGER",
            Self::ENV_SUSTAIN => "SUSTAIN",
            Self::ENV_RELEASE => "RELEASE",
            _ => "UNDEF",
        }
    }
}

impl BitOr for ParamId {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 & Self::TYPE_MASK {
            t if t == Self::TYPE_PATCH.0 => write!(f, "PATCH_{}", self.subtype_name()),
            t if t == Self::TYPE_OPERATOR.0 => {
                write!(f, "OPR_{}-{}", self.operator_name(), self.subtype_name())
            }
            t if t == Self::TYPE_ENVELOPE.0 => {
                write!(f, "ENV_{}-{}", self.envelope_name(), self.subtype_name())
            }
            _ => write!(f, "UNDEF_{:#04x}", self.0),
        }
    }
}

impl fmt::Debug for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ParamId({:#04x} {self})", self.0)
    }
}

/// The storage kind of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// Small integer, e.g. the algorithm index.
    Byte,
    /// On/off flag.
    Bool,
    /// Unsigned 16-bit, used for envelope times.
    Uint16,
    /// 16.16 fixed point, used for levels and ratios.
    Fp32,
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Byte => "byte",
            Self::Bool => "bool",
            Self::Uint16 => "uint16",
            Self::Fp32 => "fp32",
        })
    }
}

/// A parameter value tagged with its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamValue {
    /// A [`ParamKind::Byte`] value.
    Byte(u8),
    /// A [`ParamKind::Bool`] value.
    Bool(bool),
    /// A [`ParamKind::Uint16`] value.
    Uint16(u16),
    /// A [`ParamKind::Fp32`] value.
    Fp32(Fp32),
}

impl ParamValue {
    /// The kind tag.
    pub const fn kind(self) -> ParamKind {
        match self {
            Self::Byte(_) => ParamKind::Byte,
            Self::Bool(_) => ParamKind::Bool,
            Self::Uint16(_) => ParamKind::Uint16,
            Self::Fp32(_) => ParamKind::Fp32,
        }
    }

    fn into_raw(self) -> i32 {
        match self {
            Self::Byte(v) => v.into_raw(),
            Self::Bool(v) => v.into_raw(),
            Self::Uint16(v) => v.into_raw(),
            Self::Fp32(v) => v.into_raw(),
        }
    }

    fn from_raw(kind: ParamKind, raw: i32) -> Self {
        match kind {
            ParamKind::Byte => Self::Byte(u8::from_raw(raw)),
            ParamKind::Bool => Self::Bool(bool::from_raw(raw)),
            ParamKind::Uint16 => Self::Uint16(u16::from_raw(raw)),
            ParamKind::Fp32 => Self::Fp32(Fp32::from_raw(raw)),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Byte(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Uint16(v) => write!(f, "{v}"),
            Self::Fp32(v) => write!(f, "{v}"),
        }
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for u8 {}
    impl Sealed for bool {}
    impl Sealed for u16 {}
    impl Sealed for crate::Fp32 {}
}

/// Rust types that can back a parameter.
///
/// Implemented for `u8`, `bool`, `u16` and [`Fp32`]; sealed.
pub trait ParamType: sealed::Sealed + Copy + Send + Sync + 'static {
    /// The kind tag stored alongside values of this type.
    const KIND: ParamKind;

    /// Decode from the atomic cell representation.
    fn from_raw(raw: i32) -> Self;

    /// Encode into the atomic cell representation.
    fn into_raw(self) -> i32;

    /// Wrap in the tagged enum.
    fn into_value(self) -> ParamValue;
}

impl ParamType for u8 {
    const KIND: ParamKind = ParamKind::Byte;

    #[inline]
    fn from_raw(raw: i32) -> Self {
        raw as u8
    }

    #[inline]
    fn into_raw(self) -> i32 {
        i32::from(self)
    }

    fn into_value(self) -> ParamValue {
        ParamValue::Byte(self)
    }
}

impl ParamType for bool {
    const KIND: ParamKind = ParamKind::Bool;

    #[inline]
    fn from_raw(raw: i32) -> Self {
        raw != 0
    }

    #[inline]
    fn into_raw(self) -> i32 {
        i32::from(self)
    }

    fn into_value(self) -> ParamValue {
        ParamValue::Bool(self)
    }
}

impl ParamType for u16 {
    const KIND: ParamKind = ParamKind::Uint16;

    #[inline]
    fn from_raw(raw: i32) -> Self {
        raw as u16
    }

    #[inline]
    fn into_raw(self) -> i32 {
        i32::from(self)
    }

    fn into_value(self) -> ParamValue {
        ParamValue::Uint16(self)
    }
}

impl ParamType for Fp32 {
    const KIND: ParamKind = ParamKind::Fp32;

    #[inline]
    fn from_raw(raw: i32) -> Self {
        Fp32::from_raw(raw)
    }

    #[inline]
    fn into_raw(self) -> i32 {
        self.raw()
    }

    fn into_value(self) -> ParamValue {
        ParamValue::Fp32(self)
    }
}

/// How a 7-bit MIDI CC value maps onto a parameter's native range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CcScale {
    /// `val >= 64`.
    Bool,
    /// Byte range `min..=max`.
    Byte {
        /// Value at CC 0.
        min: u8,
        /// Upper bound of the range.
        max: u8,
    },
    /// Unsigned 16-bit range `min..=max`.
    Uint16 {
        /// Value at CC 0.
        min: u16,
        /// Upper bound of the range.
        max: u16,
    },
    /// Bipolar fixed point, `(val - 64) << 8`.
    Fp32,
}

impl CcScale {
    /// The canonical scaling for a kind, spanning its full native range.
    pub const fn full(kind: ParamKind) -> Self {
        match kind {
            ParamKind::Byte => Self::Byte { min: 0, max: 127 },
            ParamKind::Bool => Self::Bool,
            ParamKind::Uint16 => Self::Uint16 {
                min: 0,
                max: u16::MAX,
            },
            ParamKind::Fp32 => Self::Fp32,
        }
    }

    /// The parameter kind this scaling produces.
    pub const fn kind(self) -> ParamKind {
        match self {
            Self::Bool => ParamKind::Bool,
            Self::Byte { .. } => ParamKind::Byte,
            Self::Uint16 { .. } => ParamKind::Uint16,
            Self::Fp32 => ParamKind::Fp32,
        }
    }

    /// Convert a CC value. Values above 127 are clamped first.
    pub fn convert(self, val: u8) -> ParamValue {
        let val = val.min(127);
        match self {
            Self::Bool => ParamValue::Bool(val >= 64),
            Self::Byte { min: 0, max: 127 } => ParamValue::Byte(val),
            Self::Byte { min: 0, max: 255 } => ParamValue::Byte(val << 1),
            Self::Byte { min, max } => {
                let span = u32::from(max).saturating_sub(u32::from(min)) + 1;
                let scaled = ((u32::from(val) * span) >> 7) + u32::from(min);
                ParamValue::Byte(scaled.min(u32::from(u8::MAX)) as u8)
            }
            Self::Uint16 { min: 0, max: u16::MAX } => ParamValue::Uint16(u16::from(val) << 9),
            Self::Uint16 { min, max } => {
                let span = u32::from(max).saturating_sub(u32::from(min)) + 1;
                let scaled = ((u32::from(val) * span) >> 7) + u32::from(min);
                ParamValue::Uint16(scaled.min(u32::from(u16::MAX)) as u16)
            }
            Self::Fp32 => ParamValue::Fp32(Fp32::from_raw((i32::from(val) - 64) << 8)),
        }
    }
}

/// A typed, read-only handle to a parameter's value cell.
///
/// Obtained from [`Patch`](crate::Patch) accessors once the kind has been
/// checked, so reads never fail.
pub struct ParamRef<T> {
    id: ParamId,
    cell: Arc<AtomicI32>,
    _marker: PhantomData<fn() -> T>,
}

/// Handle to a byte parameter.
pub type ByteParam = ParamRef<u8>;
/// Handle to a bool parameter.
pub type BoolParam = ParamRef<bool>;
/// Handle to a uint16 parameter.
pub type Uint16Param = ParamRef<u16>;
/// Handle to a fixed-point parameter.
pub type Fp32Param = ParamRef<Fp32>;

impl<T: ParamType> ParamRef<T> {
    /// The parameter this handle reads.
    pub fn id(&self) -> ParamId {
        self.id
    }

    /// Current value.
    #[inline]
    pub fn value(&self) -> T {
        T::from_raw(self.cell.load(Ordering::Relaxed))
    }
}

impl<T> Clone for ParamRef<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            cell: Arc::clone(&self.cell),
            _marker: PhantomData,
        }
    }
}

impl<T: ParamType + fmt::Debug> fmt::Debug for ParamRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamRef")
            .field("id", &self.id)
            .field("value", &self.value())
            .finish()
    }
}

/// A single patch parameter.
#[derive(Debug)]
pub struct Param {
    id: ParamId,
    label: String,
    kind: ParamKind,
    cc: Option<u8>,
    scale: CcScale,
    cell: Arc<AtomicI32>,
}

impl Param {
    pub(crate) fn new(
        id: ParamId,
        label: String,
        default: ParamValue,
        cc: Option<u8>,
        scale: CcScale,
    ) -> Self {
        Self {
            id,
            label,
            kind: default.kind(),
            cc,
            scale,
            cell: Arc::new(AtomicI32::new(default.into_raw())),
        }
    }

    /// Identifier.
    pub fn id(&self) -> ParamId {
        self.id
    }

    /// Short display label, e.g. `"ATTACK"`.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Storage kind.
    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    /// Bound MIDI CC number, if any.
    pub fn cc(&self) -> Option<u8> {
        self.cc
    }

    /// CC conversion for this parameter.
    pub fn cc_scale(&self) -> CcScale {
        self.scale
    }

    /// Current value tagged with its kind.
    pub fn value(&self) -> ParamValue {
        ParamValue::from_raw(self.kind, self.cell.load(Ordering::Relaxed))
    }

    /// A typed handle, or `None` if `T` is not this parameter's kind.
    pub fn handle<T: ParamType>(&self) -> Option<ParamRef<T>> {
        (T::KIND == self.kind).then(|| ParamRef {
            id: self.id,
            cell: Arc::clone(&self.cell),
            _marker: PhantomData,
        })
    }

    /// Store a value of the right kind. Returns `false` on a kind mismatch.
    pub(crate) fn store(&self, value: ParamValue) -> bool {
        if value.kind() != self.kind {
            return false;
        }
        self.cell.store(value.into_raw(), Ordering::Relaxed);
        true
    }

    /// Store the converted CC value.
    pub(crate) fn store_cc(&self, val: u8) {
        self.cell
            .store(self.scale.convert(val).into_raw(), Ordering::Relaxed);
    }
}
