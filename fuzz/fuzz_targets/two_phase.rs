#![no_main]

use cpc_aggregate::harness::{aggregate_complete, aggregate_two_phase};
use cpc_aggregate::{DataToSketch, DataType, Value};
use libfuzzer_sys::fuzz_target;
use wyhash::wyhash;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let lg_k = 4 + (data[0] % 23) as i32;
    let rows: Vec<Vec<Value>> = data[1..]
        .chunks(3)
        .map(|chunk| vec![Value::Binary(chunk.to_vec()), Value::Int(lg_k)])
        .collect();
    let arg_types = [DataType::Binary, DataType::Int];
    let complete = aggregate_complete(DataToSketch::new(), &arg_types, &rows).unwrap();

    let split_index = wyhash(data, 0) as usize % (rows.len() + 1);
    let (first_half, second_half) = rows.split_at(split_index);
    let partitions = [first_half.to_vec(), second_half.to_vec()];
    let two_phase = aggregate_two_phase(DataToSketch::new(), &arg_types, &partitions).unwrap();
    assert_eq!(complete, two_phase);
});
