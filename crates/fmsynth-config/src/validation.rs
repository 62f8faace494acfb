//! Range checks for [`SynthConfig`](crate::SynthConfig).
//!
//! Every field is checked and all failures are reported together, so a user
//! fixing a config file sees every problem at once.

use std::ops::RangeInclusive;
use thiserror::Error;

/// Accepted sample rates in Hz.
pub const SAMPLE_RATE_RANGE: RangeInclusive<u32> = 8_000..=192_000;
/// Accepted render block sizes in samples.
pub const BLOCK_SIZE_RANGE: RangeInclusive<u32> = 16..=4096;
/// Accepted voice counts.
pub const VOICES_RANGE: RangeInclusive<u32> = 1..=64;
/// Accepted output channel counts.
pub const CHANNELS_RANGE: RangeInclusive<u16> = 1..=8;
/// Fewest blocks the sample queue may hold.
pub const MIN_QUEUE_BLOCKS: u32 = 2;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A numeric field outside its range.
    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        /// Dotted field name, e.g. `audio.sample_rate`.
        field: &'static str,
        /// The rejected value.
        value: u64,
        /// Minimum allowed value.
        min: u64,
        /// Maximum allowed value.
        max: u64,
    },

    /// The sample queue cannot double-buffer.
    #[error("audio.queue_blocks = {0} must be at least {min}", min = MIN_QUEUE_BLOCKS)]
    QueueTooShort(u32),

    /// Layout name not recognized.
    #[error("unknown operator layout '{0}'")]
    UnknownLayout(String),

    /// Multiple validation errors.
    #[error("{}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Check `value` against `range`, pushing a failure onto `errors`.
pub(crate) fn check_range<T>(
    errors: &mut Vec<ValidationError>,
    field: &'static str,
    value: T,
    range: &RangeInclusive<T>,
) where
    T: PartialOrd + Copy + Into<u64>,
{
    if !range.contains(&value) {
        errors.push(ValidationError::OutOfRange {
            field,
            value: value.into(),
            min: (*range.start()).into(),
            max: (*range.end()).into(),
        });
    }
}

/// Collapse collected failures into one result.
pub(crate) fn finish(mut errors: Vec<ValidationError>) -> ValidationResult<()> {
    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(ValidationError::Multiple(errors)),
    }
}
