//! Minimal stand-in for the host query engine.
//!
//! Runs an evaluator through the same call sequences the host uses so that one-phase and
//! two-phase plans can be compared directly.
use tracing::debug;

use crate::error::Result;
use crate::evaluator::{Mode, SketchEvaluator};
use crate::record::IntermediateRecord;
use crate::value::{DataType, Value};

/// Aggregate `rows` with a single `Complete` mode evaluator
pub fn aggregate_complete<E: SketchEvaluator>(
    mut evaluator: E,
    arg_types: &[DataType],
    rows: &[Vec<Value>],
) -> Result<Value> {
    evaluator.init(Mode::Complete, arg_types)?;
    let mut buf = evaluator.new_buffer()?;
    for row in rows {
        evaluator.iterate(&mut buf, row)?;
    }
    evaluator.terminate(&buf)
}

/// Aggregate every partition with a `Partial1` evaluator, then shuffle the partial records into
/// a single `Final` evaluator
pub fn aggregate_two_phase<E: SketchEvaluator + Clone>(
    evaluator: E,
    arg_types: &[DataType],
    partitions: &[Vec<Vec<Value>>],
) -> Result<Value> {
    let mut partial = evaluator.clone();
    partial.init(Mode::Partial1, arg_types)?;
    let records = partitions
        .iter()
        .map(|rows| {
            let mut buf = partial.new_buffer()?;
            for row in rows {
                partial.iterate(&mut buf, row)?;
            }
            partial.terminate_partial(&buf)
        })
        .collect::<Result<Vec<_>>>()?;
    debug!(partitions = records.len(), "shuffling partial records");

    let mut merger = evaluator;
    merger.init(Mode::Final, &[IntermediateRecord::data_type()])?;
    let mut buf = merger.new_buffer()?;
    for record in &records {
        merger.merge(&mut buf, record)?;
    }
    merger.terminate(&buf)
}

/// Aggregate each group in `Complete` mode, reusing one buffer across groups
pub fn aggregate_groups<E: SketchEvaluator>(
    mut evaluator: E,
    arg_types: &[DataType],
    groups: &[Vec<Vec<Value>>],
) -> Result<Vec<Value>> {
    evaluator.init(Mode::Complete, arg_types)?;
    let mut buf = evaluator.new_buffer()?;
    let mut results = Vec::with_capacity(groups.len());
    for rows in groups {
        evaluator.reset(&mut buf);
        for row in rows {
            evaluator.iterate(&mut buf, row)?;
        }
        results.push(evaluator.terminate(&buf)?);
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::{DataToSketch, UnionSketch};
    use crate::sketch::CpcSketch;

    fn rows(range: std::ops::Range<i64>) -> Vec<Vec<Value>> {
        range.map(|i| vec![Value::Long(i), Value::Int(10)]).collect()
    }

    #[test]
    fn test_one_and_two_phase_agree() {
        let arg_types = [DataType::Long, DataType::Int];
        let complete = aggregate_complete(DataToSketch::new(), &arg_types, &rows(0..5_000)).unwrap();
        let partitions = vec![rows(0..1_000), vec![], rows(1_000..4_000), rows(3_500..5_000)];
        let two_phase = aggregate_two_phase(DataToSketch::new(), &arg_types, &partitions).unwrap();
        assert_eq!(complete, two_phase);
    }

    #[test]
    fn test_groups_are_independent() {
        let arg_types = [DataType::Long, DataType::Int];
        let groups = vec![rows(0..100), vec![], rows(100..150)];
        let results = aggregate_groups(DataToSketch::new(), &arg_types, &groups).unwrap();
        assert_eq!(results[0], aggregate_complete(DataToSketch::new(), &arg_types, &groups[0]).unwrap());
        assert_eq!(results[1], Value::Null);
        assert_eq!(results[2], aggregate_complete(DataToSketch::new(), &arg_types, &groups[2]).unwrap());
    }

    #[test]
    fn test_union_of_sketch_column() {
        let sketches: Vec<Vec<Value>> = (0..4i64)
            .map(|p| {
                let mut sketch = CpcSketch::new(10, 7).unwrap();
                for i in p * 100..(p + 1) * 100 {
                    sketch.update_i64(i);
                }
                vec![Value::Binary(sketch.serialize()), Value::Int(10), Value::Long(7)]
            })
            .collect();
        let arg_types = [DataType::Binary, DataType::Int, DataType::Long];
        let complete = aggregate_complete(UnionSketch::new(), &arg_types, &sketches).unwrap();
        let two_phase = aggregate_two_phase(
            UnionSketch::new(),
            &arg_types,
            &[sketches[..1].to_vec(), sketches[1..].to_vec()],
        )
        .unwrap();
        assert_eq!(complete, two_phase);

        let Value::Binary(bytes) = complete else {
            panic!("expected binary result");
        };
        let estimate = CpcSketch::deserialize(&bytes, 7).unwrap().estimate();
        assert!((estimate - 400.0).abs() < 400.0 * 0.1, "estimate {}", estimate);
    }
}
