//! Intermediate record exchanged between the partial and merge phases.
//!
//! The record is a struct of three named fields, always written in this order:
//! - `lgK`     - `int`, configuration of the partial sketch
//! - `seed`    - `bigint`, hash seed of the partial sketch
//! - `sketch`  - `binary`, canonical sketch bytes, passed through untouched
//!
//! Readers look fields up by name.
use crate::error::{AggregateError, Result};
use crate::value::{DataType, Field, StructValue, Value};

pub const LG_K_FIELD: &str = "lgK";
pub const SEED_FIELD: &str = "seed";
pub const SKETCH_FIELD: &str = "sketch";

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IntermediateRecord {
    #[cfg_attr(feature = "with_serde", serde(rename = "lgK"))]
    pub lg_k: i32,
    pub seed: i64,
    pub sketch: Vec<u8>,
}

impl IntermediateRecord {
    pub fn new(lg_k: i32, seed: i64, sketch: Vec<u8>) -> Self {
        Self { lg_k, seed, sketch }
    }

    /// Struct type declared for the intermediate phase
    pub fn data_type() -> DataType {
        DataType::Struct(vec![
            Field::new(LG_K_FIELD, DataType::Int),
            Field::new(SEED_FIELD, DataType::Long),
            Field::new(SKETCH_FIELD, DataType::Binary),
        ])
    }

    pub fn into_value(self) -> Value {
        Value::Struct(
            StructValue::new()
                .with_field(LG_K_FIELD, Value::Int(self.lg_k))
                .with_field(SEED_FIELD, Value::Long(self.seed))
                .with_field(SKETCH_FIELD, Value::Binary(self.sketch)),
        )
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        let record = as_record(value)?;
        let (lg_k, seed) = Self::read_config(record)?;
        let sketch = Self::read_sketch(record)?.to_vec();
        Ok(Self { lg_k, seed, sketch })
    }

    /// Read `lgK` and `seed` fields
    pub fn read_config(record: &StructValue) -> Result<(i32, i64)> {
        let lg_k = read_field(record, LG_K_FIELD)?
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .ok_or(AggregateError::FieldType {
                field: LG_K_FIELD,
                expected: DataType::Int,
            })?;
        let seed = read_field(record, SEED_FIELD)?
            .as_i64()
            .ok_or(AggregateError::FieldType {
                field: SEED_FIELD,
                expected: DataType::Long,
            })?;
        Ok((lg_k, seed))
    }

    /// Read `sketch` field
    pub fn read_sketch(record: &StructValue) -> Result<&[u8]> {
        read_field(record, SKETCH_FIELD)?
            .as_binary()
            .ok_or(AggregateError::FieldType {
                field: SKETCH_FIELD,
                expected: DataType::Binary,
            })
    }

    /// Check that a declared type can be read as an intermediate record
    pub fn check_type(data_type: &DataType) -> Result<()> {
        let DataType::Struct(fields) = data_type else {
            return Err(AggregateError::InvalidRecord("non-struct type"));
        };
        let field_type = |name: &'static str| {
            fields
                .iter()
                .find(|f| f.name == name)
                .map(|f| &f.data_type)
                .ok_or(AggregateError::MissingField(name))
        };
        if !field_type(LG_K_FIELD)?.is_integral() {
            return Err(AggregateError::FieldType {
                field: LG_K_FIELD,
                expected: DataType::Int,
            });
        }
        if !field_type(SEED_FIELD)?.is_integral() {
            return Err(AggregateError::FieldType {
                field: SEED_FIELD,
                expected: DataType::Long,
            });
        }
        if *field_type(SKETCH_FIELD)? != DataType::Binary {
            return Err(AggregateError::FieldType {
                field: SKETCH_FIELD,
                expected: DataType::Binary,
            });
        }
        Ok(())
    }
}

impl From<IntermediateRecord> for Value {
    fn from(record: IntermediateRecord) -> Self {
        record.into_value()
    }
}

/// Return structured value of an intermediate record
pub(crate) fn as_record(value: &Value) -> Result<&StructValue> {
    value
        .as_struct()
        .ok_or(AggregateError::InvalidRecord(value.kind()))
}

#[inline]
fn read_field<'a>(record: &'a StructValue, name: &'static str) -> Result<&'a Value> {
    record.field(name).ok_or(AggregateError::MissingField(name))
}
