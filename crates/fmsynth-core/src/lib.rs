//! fmsynth Core - Fixed-point arithmetic and the parameter store
//!
//! This crate holds the types every other fmsynth crate builds on:
//!
//! - [`Fp32`] - 16.16 fixed-point sample and control value
//! - [`SineTable`] - one-second sine lookup shared by all operators
//! - [`ParamId`] - packed group/type/subtype parameter identifier
//! - [`Param`] / [`ParamRef`] - atomic parameter cells and typed read handles
//! - [`Patch`] - owner of every parameter, with MIDI CC binding and change
//!   notification
//!
//! # Example
//!
//! ```rust
//! use fmsynth_core::{Fp32, ParamId, Patch};
//!
//! let patch = Patch::initial(4).unwrap();
//! let sustain = patch
//!     .fp32_param(ParamId::ENV_SUSTAIN | ParamId::GROUP_VCA)
//!     .unwrap();
//!
//! // CC 0x16 is bound to the VCA sustain level; 64 is the bipolar centre
//! patch.handle_cc(0x16, 64);
//! assert_eq!(sustain.value(), Fp32::ZERO);
//! ```

pub mod fixed;
pub mod param;
pub mod patch;
pub mod sine;

pub use fixed::Fp32;
pub use param::{
    BoolParam, ByteParam, CcScale, Fp32Param, Param, ParamId, ParamKind, ParamRef, ParamType,
    ParamValue, Uint16Param,
};
pub use patch::{Patch, PatchError};
pub use sine::SineTable;
