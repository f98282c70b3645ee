//! Per-group aggregation buffers.
//!
//! A buffer is either a [`BuilderState`] folding raw row values into a sketch, or a
//! [`UnionState`] folding already built sketches into a union. Both bind `lgK` and `seed`
//! exactly once and allocate their sketch lazily on the first update, so a buffer that never
//! sees a value owns no heap memory. [`SketchState::reset`] returns a buffer to that
//! post-construction condition so the host can reuse it for the next group.
use enum_dispatch::enum_dispatch;
use tracing::debug;

use crate::config::SketchConfig;
use crate::error::{merge_error, AggregateError, Result};
use crate::sketch::CpcSketch;
use crate::union::CpcUnion;
use crate::value::Value;

/// Capabilities shared by both buffer flavors
#[enum_dispatch]
pub trait SketchState {
    /// Bind `lg_k` and `seed`; fails if the state is already configured
    fn init(&mut self, lg_k: i32, seed: i64) -> Result<()>;
    fn is_initialized(&self) -> bool;
    /// Release the sketch and forget the configuration
    fn reset(&mut self);
    /// Snapshot of the aggregated sketch, `None` if nothing was aggregated yet
    fn result(&self) -> Option<CpcSketch>;
    /// Bound configuration, or the defaults if none is bound
    fn config(&self) -> SketchConfig;

    fn lg_k(&self) -> i32 {
        self.config().host_lg_k()
    }

    fn seed(&self) -> i64 {
        self.config().host_seed()
    }
}

/// Aggregation buffer handed to the host
#[derive(Debug, Clone)]
#[enum_dispatch(SketchState)]
pub enum AggregationState {
    Builder(BuilderState),
    Union(UnionState),
}

impl AggregationState {
    pub fn flavor(&self) -> &'static str {
        match self {
            AggregationState::Builder(_) => "builder",
            AggregationState::Union(_) => "union",
        }
    }

    pub(crate) fn as_builder_mut(&mut self, operation: &'static str) -> Result<&mut BuilderState> {
        match self {
            AggregationState::Builder(state) => Ok(state),
            AggregationState::Union(_) => Err(AggregateError::WrongBuffer {
                operation,
                flavor: "union",
            }),
        }
    }

    pub(crate) fn as_union_mut(&mut self, operation: &'static str) -> Result<&mut UnionState> {
        match self {
            AggregationState::Union(state) => Ok(state),
            AggregationState::Builder(_) => Err(AggregateError::WrongBuffer {
                operation,
                flavor: "builder",
            }),
        }
    }
}

/// Bind configuration unless one is already bound
fn bind(slot: &mut Option<SketchConfig>, lg_k: i32, seed: i64) -> Result<()> {
    if let Some(config) = slot {
        return Err(AggregateError::AlreadyConfigured {
            lg_k: config.host_lg_k(),
            seed: config.host_seed(),
        });
    }
    *slot = Some(SketchConfig::new(lg_k, seed)?);
    Ok(())
}

/// Buffer folding raw values into a sketch
#[derive(Debug, Clone, Default)]
pub struct BuilderState {
    config: Option<SketchConfig>,
    sketch: Option<CpcSketch>,
}

impl BuilderState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold raw value into the sketch, nulls are ignored
    pub fn update(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Null => Ok(()),
            Value::Byte(v) => self.update_with(|s| s.update_i64(i64::from(*v))),
            Value::Short(v) => self.update_with(|s| s.update_i64(i64::from(*v))),
            Value::Int(v) => self.update_with(|s| s.update_i64(i64::from(*v))),
            Value::Long(v) => self.update_with(|s| s.update_i64(*v)),
            Value::Float(v) => self.update_with(|s| s.update_f64(f64::from(*v))),
            Value::Double(v) => self.update_with(|s| s.update_f64(*v)),
            Value::String(v) => self.update_with(|s| s.update_str(v)),
            Value::Binary(v) => self.update_with(|s| s.update_bytes(v)),
            Value::Boolean(_) | Value::Struct(_) => {
                Err(AggregateError::UnsupportedValue(value.kind()))
            }
        }
    }

    /// Allocate sketch on first use and apply `f` to it
    fn update_with(&mut self, f: impl FnOnce(&mut CpcSketch)) -> Result<()> {
        let config = *self.config.get_or_insert_with(SketchConfig::default);
        let sketch = match self.sketch.take() {
            Some(sketch) => sketch,
            None => CpcSketch::with_config(&config),
        };
        f(self.sketch.insert(sketch));
        Ok(())
    }
}

impl SketchState for BuilderState {
    fn init(&mut self, lg_k: i32, seed: i64) -> Result<()> {
        bind(&mut self.config, lg_k, seed)?;
        debug!(lg_k, seed, "configured builder state");
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.config.is_some()
    }

    fn reset(&mut self) {
        self.config = None;
        self.sketch = None;
    }

    fn result(&self) -> Option<CpcSketch> {
        self.sketch.clone()
    }

    fn config(&self) -> SketchConfig {
        self.config.unwrap_or_default()
    }
}

/// Buffer folding serialized sketches into a union
#[derive(Debug, Clone, Default)]
pub struct UnionState {
    config: Option<SketchConfig>,
    union: Option<CpcUnion>,
}

impl UnionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold heapified sketch into the union
    pub fn update(&mut self, sketch: &CpcSketch) -> Result<()> {
        let config = *self.config.get_or_insert_with(SketchConfig::default);
        let union = match self.union.take() {
            Some(union) => union,
            None => CpcUnion::new(config.lg_k(), config.seed())?,
        };
        self.union.insert(union).update(sketch).map_err(merge_error)
    }
}

impl SketchState for UnionState {
    fn init(&mut self, lg_k: i32, seed: i64) -> Result<()> {
        bind(&mut self.config, lg_k, seed)?;
        debug!(lg_k, seed, "configured union state");
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.config.is_some()
    }

    fn reset(&mut self) {
        self.config = None;
        self.union = None;
    }

    fn result(&self) -> Option<CpcSketch> {
        self.union.as_ref().map(CpcUnion::result)
    }

    fn config(&self) -> SketchConfig {
        self.config.unwrap_or_default()
    }
}
