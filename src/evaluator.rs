//! Evaluators driving the host's multi-phase aggregate protocol.
//!
//! The host runs an aggregate in up to two stages separated by a shuffle:
//!
//! | mode       | consumes          | produces            |
//! |------------|-------------------|---------------------|
//! | `Partial1` | raw rows          | intermediate record |
//! | `Partial2` | intermediate rows | intermediate record |
//! | `Final`    | intermediate rows | sketch bytes        |
//! | `Complete` | raw rows          | sketch bytes        |
//!
//! Raw rows are folded in with [`SketchEvaluator::iterate`], intermediate records with
//! [`SketchEvaluator::merge`]. Both bind `lgK` and `seed` from the first non-null row of a group
//! and ignore the values repeated on later rows. Empty groups produce [`Value::Null`].
use tracing::{debug, trace};

use crate::config::{DEFAULT_LG_K, DEFAULT_SEED};
use crate::error::{merge_error, AggregateError, Result, SketchError};
use crate::record::{as_record, IntermediateRecord};
use crate::sketch::CpcSketch;
use crate::state::{AggregationState, BuilderState, SketchState, UnionState};
use crate::value::{DataType, Value};

/// Aggregation phase requested by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Partial1,
    Partial2,
    Final,
    Complete,
}

impl Mode {
    /// Whether `iterate` is called with raw rows
    #[inline]
    pub fn consumes_raw_input(self) -> bool {
        matches!(self, Mode::Partial1 | Mode::Complete)
    }

    /// Whether the result is an intermediate record
    #[inline]
    pub fn produces_partial(self) -> bool {
        matches!(self, Mode::Partial1 | Mode::Partial2)
    }

    /// Declared type of the evaluator's output
    pub fn output_type(self) -> DataType {
        if self.produces_partial() {
            IntermediateRecord::data_type()
        } else {
            DataType::Binary
        }
    }
}

/// Generic aggregate evaluator surface of the host.
///
/// `terminate_partial`, `merge`, `terminate` and `reset` behave the same for every sketch
/// aggregate and are provided.
pub trait SketchEvaluator {
    /// Validate argument types for `mode` and return the output type
    fn init(&mut self, mode: Mode, arg_types: &[DataType]) -> Result<DataType>;

    /// Mode set by the last successful `init`
    fn mode(&self) -> Option<Mode>;

    /// Create empty buffer matching the mode
    fn new_buffer(&self) -> Result<AggregationState>;

    /// Fold one input row into the buffer
    fn iterate(&self, buf: &mut AggregationState, args: &[Value]) -> Result<()>;

    /// Export buffer as intermediate record, `Value::Null` if nothing was aggregated
    fn terminate_partial(&self, buf: &AggregationState) -> Result<Value> {
        let Some(sketch) = buf.result() else {
            return Ok(Value::Null);
        };
        Ok(IntermediateRecord::new(buf.lg_k(), buf.seed(), sketch.serialize()).into_value())
    }

    /// Fold intermediate record produced by `terminate_partial` into the buffer
    fn merge(&self, buf: &mut AggregationState, partial: &Value) -> Result<()> {
        if partial.is_null() {
            return Ok(());
        }
        check_phase(self.mode(), "merge", false)?;
        let state = buf.as_union_mut("merge")?;
        let record = as_record(partial)?;
        if !state.is_initialized() {
            let (lg_k, seed) = IntermediateRecord::read_config(record)?;
            state.init(lg_k, seed)?;
        } else {
            trace!("ignoring configuration of merged record");
        }
        let bytes = IntermediateRecord::read_sketch(record)?;
        let sketch = CpcSketch::deserialize(bytes, state.config().seed()).map_err(merge_error)?;
        trace!(coupons = sketch.num_coupons(), "merging partial sketch");
        state.update(&sketch)
    }

    /// Return final sketch bytes, `Value::Null` if nothing was aggregated
    fn terminate(&self, buf: &AggregationState) -> Result<Value> {
        Ok(buf
            .result()
            .map_or(Value::Null, |sketch| Value::Binary(sketch.serialize())))
    }

    fn reset(&self, buf: &mut AggregationState) {
        buf.reset();
    }
}

/// Check that `operation` is part of the protocol of `mode`
fn check_phase(mode: Option<Mode>, operation: &'static str, raw_input: bool) -> Result<()> {
    match mode {
        None => Err(AggregateError::Uninitialized),
        Some(mode) if mode.consumes_raw_input() != raw_input => {
            Err(AggregateError::UnsupportedPhase { operation, mode })
        }
        Some(_) => Ok(()),
    }
}

/// Layout of the raw-input arguments: `(value [, lgK [, seed]])`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Arguments {
    has_lg_k: bool,
    has_seed: bool,
}

impl Arguments {
    /// Validate raw-input argument types, `accepts` decides on the value argument
    fn resolve(
        arg_types: &[DataType],
        expected: &'static str,
        accepts: impl Fn(&DataType) -> bool,
    ) -> Result<Self> {
        if arg_types.is_empty() || arg_types.len() > 3 {
            return Err(AggregateError::ArgumentCount {
                min: 1,
                max: 3,
                found: arg_types.len(),
            });
        }
        if !accepts(&arg_types[0]) {
            return Err(AggregateError::ArgumentType {
                position: 0,
                expected,
                found: arg_types[0].clone(),
            });
        }
        for (position, data_type) in arg_types.iter().enumerate().skip(1) {
            if !data_type.is_integral() {
                return Err(AggregateError::ArgumentType {
                    position,
                    expected: "an integral type",
                    found: data_type.clone(),
                });
            }
        }
        Ok(Self {
            has_lg_k: arg_types.len() > 1,
            has_seed: arg_types.len() > 2,
        })
    }

    /// Read `lgK` and `seed` from a row, applying defaults for omitted or null arguments
    fn config(&self, args: &[Value]) -> Result<(i32, i64)> {
        let lg_k = match self.integral(args, 1, self.has_lg_k)? {
            Some(v) => i32::try_from(v)
                .map_err(|_| AggregateError::Config(SketchError::InvalidLgK(v)))?,
            None => i32::from(DEFAULT_LG_K),
        };
        let seed = self
            .integral(args, 2, self.has_seed)?
            .unwrap_or(DEFAULT_SEED as i64);
        Ok((lg_k, seed))
    }

    fn integral(&self, args: &[Value], position: usize, declared: bool) -> Result<Option<i64>> {
        if !declared {
            return Ok(None);
        }
        match args.get(position) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_i64()
                .map(Some)
                .ok_or(AggregateError::UnsupportedValue(value.kind())),
        }
    }
}

/// Check the single merge-side argument
fn resolve_intermediate(arg_types: &[DataType]) -> Result<()> {
    match arg_types {
        [data_type] => IntermediateRecord::check_type(data_type),
        _ => Err(AggregateError::ArgumentCount {
            min: 1,
            max: 1,
            found: arg_types.len(),
        }),
    }
}

/// `DataToSketch(value [, lgK [, seed]])`: builds a sketch from raw values.
#[derive(Debug, Clone, Default)]
pub struct DataToSketch {
    mode: Option<Mode>,
    arguments: Arguments,
}

impl DataToSketch {
    pub fn new() -> Self {
        Self::default()
    }

    fn accepts(data_type: &DataType) -> bool {
        matches!(
            data_type,
            DataType::Binary
                | DataType::Byte
                | DataType::Short
                | DataType::Int
                | DataType::Long
                | DataType::Float
                | DataType::Double
                | DataType::String
                | DataType::Char
                | DataType::Varchar
        )
    }
}

impl SketchEvaluator for DataToSketch {
    fn init(&mut self, mode: Mode, arg_types: &[DataType]) -> Result<DataType> {
        if mode.consumes_raw_input() {
            self.arguments = Arguments::resolve(arg_types, "a primitive type", Self::accepts)?;
        } else {
            resolve_intermediate(arg_types)?;
        }
        self.mode = Some(mode);
        debug!(?mode, ?arg_types, "initialized data_to_sketch evaluator");
        Ok(mode.output_type())
    }

    fn mode(&self) -> Option<Mode> {
        self.mode
    }

    fn new_buffer(&self) -> Result<AggregationState> {
        match self.mode {
            Some(mode) if mode.consumes_raw_input() => Ok(BuilderState::new().into()),
            Some(_) => Ok(UnionState::new().into()),
            None => Err(AggregateError::Uninitialized),
        }
    }

    fn iterate(&self, buf: &mut AggregationState, args: &[Value]) -> Result<()> {
        let Some(value) = args.first().filter(|v| !v.is_null()) else {
            return Ok(());
        };
        check_phase(self.mode, "iterate", true)?;
        let state = buf.as_builder_mut("iterate")?;
        if !state.is_initialized() {
            let (lg_k, seed) = self.arguments.config(args)?;
            state.init(lg_k, seed)?;
        }
        state.update(value)
    }
}

/// `UnionSketch(sketch [, lgK [, seed]])`: unions serialized sketches.
#[derive(Debug, Clone, Default)]
pub struct UnionSketch {
    mode: Option<Mode>,
    arguments: Arguments,
}

impl UnionSketch {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SketchEvaluator for UnionSketch {
    fn init(&mut self, mode: Mode, arg_types: &[DataType]) -> Result<DataType> {
        if mode.consumes_raw_input() {
            self.arguments = Arguments::resolve(arg_types, "binary", |t| *t == DataType::Binary)?;
        } else {
            resolve_intermediate(arg_types)?;
        }
        self.mode = Some(mode);
        debug!(?mode, ?arg_types, "initialized union_sketch evaluator");
        Ok(mode.output_type())
    }

    fn mode(&self) -> Option<Mode> {
        self.mode
    }

    fn new_buffer(&self) -> Result<AggregationState> {
        match self.mode {
            Some(_) => Ok(UnionState::new().into()),
            None => Err(AggregateError::Uninitialized),
        }
    }

    fn iterate(&self, buf: &mut AggregationState, args: &[Value]) -> Result<()> {
        let Some(value) = args.first().filter(|v| !v.is_null()) else {
            return Ok(());
        };
        check_phase(self.mode, "iterate", true)?;
        let state = buf.as_union_mut("iterate")?;
        if !state.is_initialized() {
            let (lg_k, seed) = self.arguments.config(args)?;
            state.init(lg_k, seed)?;
        }
        let bytes = value
            .as_binary()
            .ok_or(AggregateError::UnsupportedValue(value.kind()))?;
        let sketch = CpcSketch::deserialize(bytes, state.config().seed()).map_err(merge_error)?;
        state.update(&sketch)
    }
}
