//! `cpc-aggregate` is a Rust crate adapting Compressed Probabilistic Counting (CPC) sketches to
//! the multi-phase aggregate protocol of SQL query engines.
//!
//! Two aggregates are provided: [`DataToSketch`] builds a sketch from raw column values and
//! [`UnionSketch`] unions a column of serialized sketches. Both exchange partial results as an
//! [`IntermediateRecord`] of `{lgK, seed, sketch}` and emit the canonical sketch bytes.
pub mod config;
mod dense;
pub mod error;
pub mod evaluator;
pub mod harness;
pub mod record;
mod representation;
#[cfg(feature = "with_serde")]
mod serde;
mod serialization;
pub mod sketch;
mod sparse;
pub mod state;
pub mod union;
pub mod value;

pub use config::{SketchConfig, DEFAULT_LG_K, DEFAULT_SEED, MAX_LG_K, MIN_LG_K};
pub use error::{AggregateError, Result, SketchError};
pub use evaluator::{DataToSketch, Mode, SketchEvaluator, UnionSketch};
pub use record::IntermediateRecord;
pub use sketch::CpcSketch;
pub use state::{AggregationState, BuilderState, SketchState, UnionState};
pub use union::CpcUnion;
pub use value::{DataType, Field, StructValue, Value};
