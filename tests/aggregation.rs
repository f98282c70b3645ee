use cpc_aggregate::harness::{aggregate_complete, aggregate_groups, aggregate_two_phase};
use cpc_aggregate::{
    AggregateError, CpcSketch, DataToSketch, DataType, IntermediateRecord, Mode, SketchError,
    SketchEvaluator, SketchState, UnionSketch, Value,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use test_case::test_case;

const ARG_TYPES: [DataType; 3] = [DataType::String, DataType::Int, DataType::Long];

fn rows(rng: &mut StdRng, n: usize, distinct: usize, lg_k: i32, seed: i64) -> Vec<Vec<Value>> {
    (0..n)
        .map(|_| {
            let item = if rng.gen_bool(0.05) {
                Value::Null
            } else {
                Value::from(format!("item{}", rng.gen_range(0..distinct)))
            };
            vec![item, Value::Int(lg_k), Value::Long(seed)]
        })
        .collect()
}

/// Split `rows` at random points into `parts` partitions, some of which may be empty
fn partition(rng: &mut StdRng, rows: &[Vec<Value>], parts: usize) -> Vec<Vec<Vec<Value>>> {
    let mut cuts: Vec<usize> = (1..parts).map(|_| rng.gen_range(0..=rows.len())).collect();
    cuts.push(0);
    cuts.push(rows.len());
    cuts.sort_unstable();
    cuts.windows(2)
        .map(|w| rows[w[0]..w[1]].to_vec())
        .collect()
}

fn estimate(value: &Value, seed: i64) -> f64 {
    let bytes = value.as_binary().expect("expected sketch bytes");
    CpcSketch::deserialize(bytes, seed as u64).unwrap().estimate()
}

#[test_case(4, 0; "smallest lgK")]
#[test_case(11, 9001; "default config")]
#[test_case(12, -42; "negative seed")]
#[test_case(16, 7; "large lgK")]
fn test_two_phase_is_byte_identical(lg_k: i32, seed: i64) {
    let mut rng = StdRng::seed_from_u64(12345);
    for (n, distinct) in [(0, 1), (1, 1), (200, 50), (5_000, 3_000), (20_000, 100_000)] {
        let rows = rows(&mut rng, n, distinct, lg_k, seed);
        let expected = aggregate_complete(DataToSketch::new(), &ARG_TYPES, &rows).unwrap();
        for parts in [1, 2, 7] {
            let partitions = partition(&mut rng, &rows, parts);
            let actual = aggregate_two_phase(DataToSketch::new(), &ARG_TYPES, &partitions).unwrap();
            assert_eq!(actual, expected, "n={} parts={}", n, parts);
        }
    }
}

#[test]
fn test_permutation_invariance() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut rows = rows(&mut rng, 10_000, 5_000, 10, 1);
    let expected = aggregate_complete(DataToSketch::new(), &ARG_TYPES, &rows).unwrap();
    for _ in 0..5 {
        rows.shuffle(&mut rng);
        assert_eq!(
            aggregate_complete(DataToSketch::new(), &ARG_TYPES, &rows).unwrap(),
            expected
        );
    }
}

#[test_case(10; "ten")]
#[test_case(1_000; "thousand")]
#[test_case(100_000; "hundred thousand")]
fn test_estimate_accuracy(n: i64) {
    let arg_types = [DataType::Long, DataType::Int];
    let rows: Vec<Vec<Value>> = (0..n).map(|i| vec![Value::Long(i), Value::Int(12)]).collect();
    let value = aggregate_complete(DataToSketch::new(), &arg_types, &rows).unwrap();
    let estimate = estimate(&value, 9001);
    let error = (estimate - n as f64).abs() / n as f64;
    assert!(error < 0.05, "n={} estimate={}", n, estimate);
}

#[test]
fn test_reset_matches_fresh_buffer() {
    let mut rng = StdRng::seed_from_u64(7);
    let groups = vec![
        rows(&mut rng, 1_000, 500, 12, 42),
        vec![vec![Value::Null, Value::Int(8), Value::Long(3)]],
        rows(&mut rng, 1_000, 500, 9, 3),
    ];
    let results = aggregate_groups(DataToSketch::new(), &ARG_TYPES, &groups).unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(
        results[0],
        aggregate_complete(DataToSketch::new(), &ARG_TYPES, &groups[0]).unwrap()
    );
    assert_eq!(results[1], Value::Null);
    assert_eq!(
        results[2],
        aggregate_complete(DataToSketch::new(), &ARG_TYPES, &groups[2]).unwrap()
    );
    let bytes = results[2].as_binary().unwrap();
    assert_eq!(CpcSketch::deserialize(bytes, 3).unwrap().lg_k(), 9);
}

#[test]
fn test_partial2_chain() {
    let mut rng = StdRng::seed_from_u64(99);
    let rows = rows(&mut rng, 3_000, 2_000, 11, 5);
    let expected = aggregate_complete(DataToSketch::new(), &ARG_TYPES, &rows).unwrap();

    let mut partial1 = DataToSketch::new();
    partial1.init(Mode::Partial1, &ARG_TYPES).unwrap();
    let mut partial2 = DataToSketch::new();
    partial2
        .init(Mode::Partial2, &[IntermediateRecord::data_type()])
        .unwrap();
    let mut final_evaluator = UnionSketch::new();
    final_evaluator
        .init(Mode::Final, &[IntermediateRecord::data_type()])
        .unwrap();

    let mut combined = partial2.new_buffer().unwrap();
    for chunk in rows.chunks(500) {
        let mut buf = partial1.new_buffer().unwrap();
        for row in chunk {
            partial1.iterate(&mut buf, row).unwrap();
        }
        let record = partial1.terminate_partial(&buf).unwrap();
        partial2.merge(&mut combined, &record).unwrap();
    }
    let record = partial2.terminate_partial(&combined).unwrap();
    assert_eq!(
        IntermediateRecord::from_value(&record).unwrap().seed,
        5
    );

    let mut buf = final_evaluator.new_buffer().unwrap();
    final_evaluator.merge(&mut buf, &record).unwrap();
    assert_eq!(final_evaluator.terminate(&buf).unwrap(), expected);
}

#[test]
fn test_seed_mismatch_across_partitions() {
    let partitions = vec![
        vec![vec![Value::from("a"), Value::Int(11), Value::Long(1)]],
        vec![vec![Value::from("a"), Value::Int(11), Value::Long(2)]],
    ];
    assert!(matches!(
        aggregate_two_phase(DataToSketch::new(), &ARG_TYPES, &partitions).unwrap_err(),
        AggregateError::IncompatibleMerge(SketchError::SeedHashMismatch { .. })
    ));
}

#[test]
fn test_union_sketch_matches_data_to_sketch() {
    let mut rng = StdRng::seed_from_u64(2024);
    let rows = rows(&mut rng, 4_000, 2_500, 10, 11);
    let expected = aggregate_complete(DataToSketch::new(), &ARG_TYPES, &rows).unwrap();

    let sketches: Vec<Vec<Value>> = rows
        .chunks(300)
        .map(|chunk| {
            let value = aggregate_complete(DataToSketch::new(), &ARG_TYPES, chunk).unwrap();
            vec![value, Value::Int(10), Value::Long(11)]
        })
        .collect();
    let arg_types = [DataType::Binary, DataType::Int, DataType::Long];
    assert_eq!(
        aggregate_complete(UnionSketch::new(), &arg_types, &sketches).unwrap(),
        expected
    );
    let partitions = partition(&mut rng, &sketches, 3);
    assert_eq!(
        aggregate_two_phase(UnionSketch::new(), &arg_types, &partitions).unwrap(),
        expected
    );
}

#[test]
fn test_null_merge_keeps_state_uninitialized() {
    let mut evaluator = UnionSketch::new();
    evaluator
        .init(Mode::Partial2, &[IntermediateRecord::data_type()])
        .unwrap();
    let mut buf = evaluator.new_buffer().unwrap();
    evaluator.merge(&mut buf, &Value::Null).unwrap();
    assert!(!buf.is_initialized());
    assert!(evaluator.terminate_partial(&buf).unwrap().is_null());
}
