//! Error types for the detection and scoring pipeline.
//!
//! Mirrors the shape of `exceptions.py`'s hierarchy (a base error carrying a
//! message plus structured context) but expressed as `thiserror` enums
//! instead of an exception class tree, per the explicit-Result-at-the-
//! boundary redesign.

use thiserror::Error;

/// Failure constructing or configuring a detector.
///
/// Surfaced at detector construction (via [`crate::detectors::registry`]),
/// never at `detect`: an unconstructable optional detector is simply absent
/// from the orchestrator's detector list.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("setting '{setting_name}' has an invalid value: {setting_value}")]
    InvalidSetting {
        setting_name: String,
        setting_value: String,
    },

    #[error("required resource for detector '{detector_name}' is missing: {resource}")]
    MissingResource {
        detector_name: String,
        resource: String,
    },
}

/// A single detector's failure during a `detect` call.
///
/// Never surfaced to the orchestrator's caller: it is caught at the
/// per-detector boundary, logged, and treated as an empty contribution.
#[derive(Debug, Error)]
#[error("detector '{detector_name}' failed on {input_length}-byte input: {reason}")]
pub struct DetectorFailure {
    pub detector_name: String,
    pub input_length: usize,
    pub reason: String,
}

/// Post-transformation invariant violation (§4.13): a span whose offsets
/// don't agree with its text, or fall outside the input bounds.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("span [{start}, {end}) is out of bounds for input of length {text_len}")]
    OutOfBounds {
        start: usize,
        end: usize,
        text_len: usize,
    },

    #[error("span [{start}, {end}) claims length {expected_len} but the substring there is {actual_len} chars")]
    LengthMismatch {
        start: usize,
        end: usize,
        expected_len: usize,
        actual_len: usize,
    },
}

/// Errors a caller of the public surface can receive.
///
/// `InvalidInput` is the only variant a well-behaved caller should expect in
/// practice (non-UTF-8 input is impossible to construct as `&str` in Rust,
/// so this mostly guards against embedded NUL bytes some downstream
/// extraction step left behind); everything else the pipeline can produce is
/// absorbed internally (see module docs above).
#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("input contains a NUL byte at offset {offset}")]
    InvalidInput { offset: usize },

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Errors from [`crate::scoring::score`].
///
/// The scorer itself is pure and total over well-formed `entity_counts` and
/// `ExposureLevel` values (§4.15); this type exists for callers assembling
/// those values from an untrusted boundary (e.g. deserializing an exposure
/// string that doesn't match any [`crate::types::ExposureLevel`] variant).
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("'{value}' is not a recognized exposure level")]
    UnknownExposureLevel { value: String },
}
