//! Error types of the sketch engine and of the aggregation adapter.
use thiserror::Error;

use crate::config::{MAX_LG_K, MIN_LG_K};
use crate::evaluator::Mode;
use crate::value::DataType;

/// Errors raised by [`CpcSketch`](crate::sketch::CpcSketch) and [`CpcUnion`](crate::union::CpcUnion).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SketchError {
    #[error("lgK must be in [{min}, {max}], got {0}", min = MIN_LG_K, max = MAX_LG_K)]
    InvalidLgK(i64),
    #[error("insufficient data while reading {0}")]
    InsufficientData(&'static str),
    #[error("unsupported serial version: expected {expected}, got {found}")]
    UnsupportedSerialVersion { expected: u8, found: u8 },
    #[error("invalid sketch family: expected {expected}, got {found}")]
    InvalidFamily { expected: u8, found: u8 },
    #[error("seed hash mismatch: expected {expected:#010x}, got {found:#010x}")]
    SeedHashMismatch { expected: u32, found: u32 },
    #[error("corrupt sketch: {0}")]
    Corrupt(String),
}

/// Aggregation level failure surfaced to the host.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AggregateError {
    #[error("invalid sketch configuration: {0}")]
    Config(SketchError),
    #[error("expected {min} to {max} arguments, got {found}")]
    ArgumentCount { min: usize, max: usize, found: usize },
    #[error("argument {position} must be {expected}, got {found}")]
    ArgumentType {
        position: usize,
        expected: &'static str,
        found: DataType,
    },
    #[error("cannot count values of type {0}")]
    UnsupportedValue(&'static str),
    #[error("state is already configured with lgK={lg_k}, seed={seed}")]
    AlreadyConfigured { lg_k: i32, seed: i64 },
    #[error("intermediate record must be a struct, got {0}")]
    InvalidRecord(&'static str),
    #[error("intermediate record is missing field `{0}`")]
    MissingField(&'static str),
    #[error("intermediate record field `{field}` must be {expected}")]
    FieldType {
        field: &'static str,
        expected: DataType,
    },
    #[error("incompatible sketches cannot be merged: {0}")]
    IncompatibleMerge(SketchError),
    #[error(transparent)]
    Sketch(#[from] SketchError),
    #[error("{operation} is not supported by a {flavor} buffer")]
    WrongBuffer {
        operation: &'static str,
        flavor: &'static str,
    },
    #[error("{operation} is not supported in {mode:?} mode")]
    UnsupportedPhase { operation: &'static str, mode: Mode },
    #[error("evaluator used before init")]
    Uninitialized,
}

/// Classify a sketch error raised while folding an incoming sketch into a union.
pub(crate) fn merge_error(err: SketchError) -> AggregateError {
    match err {
        SketchError::SeedHashMismatch { .. } => AggregateError::IncompatibleMerge(err),
        other => AggregateError::Sketch(other),
    }
}

pub type Result<T, E = AggregateError> = std::result::Result<T, E>;
